//! Protocol logic on top of the `Protocol` state. Every public entry point is
//! a method on `Protocol` taking the collaborators as a `Host`.

pub mod actions;
pub mod funding;
pub mod imbalance;
pub mod liquidation;
pub mod long;
pub mod vault;

pub use liquidation::LiquidationOutcome;

use anchor_lang::prelude::*;
use crate::state::ProtocolAction;

/// Attested price of the asset (18 decimals) and the time it was observed.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceInfo {
    pub price: u128,
    pub timestamp: i64,
}

/// Caller-side context of an entry point.
#[derive(Clone, Copy, Debug)]
pub struct Call {
    pub caller: Pubkey,
    pub now: i64,
    // Lamports the caller offers for the security deposit
    pub value: u64,
}

/// Hints to validate actionable pending actions of other users: one price
/// attestation per raw queue index.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PreviousActionsData {
    pub price_data: Vec<Vec<u8>>,
    pub raw_indices: Vec<u128>,
}

pub trait PriceOracle {
    fn attest(
        &mut self,
        action: ProtocolAction,
        target_timestamp: i64,
        price_data: &[u8],
    ) -> Result<PriceInfo>;
}

pub trait StableLedger {
    fn total_supply(&self) -> Result<u128>;
    fn mint(&mut self, to: Pubkey, amount: u128) -> Result<()>;
    // Move shares from `from` into protocol custody until burned
    fn lock(&mut self, from: Pubkey, amount: u128) -> Result<()>;
    fn burn_locked(&mut self, amount: u128) -> Result<()>;
}

pub trait AssetCustody {
    fn pull(&mut self, from: Pubkey, amount: u128) -> Result<()>;
    fn push(&mut self, to: Pubkey, amount: u128) -> Result<()>;
}

pub trait DepositEscrow {
    fn escrow(&mut self, from: Pubkey, lamports: u64) -> Result<()>;
    fn release(&mut self, to: Pubkey, lamports: u64) -> Result<()>;
}

pub trait Host: PriceOracle + StableLedger + AssetCustody + DepositEscrow {}

impl<T: PriceOracle + StableLedger + AssetCustody + DepositEscrow> Host for T {}
