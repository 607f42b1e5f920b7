//! Scenario tests driving the engine through an in-memory host.

mod long;

use std::collections::HashMap;
use anchor_lang::error::Error;
use anchor_lang::prelude::*;
use crate::{
    constants::PRICE_SCALE,
    engine::*,
    state::*,
    VaultLongError,
};

pub(crate) const UNIT: u128 = 1_000_000_000;
pub(crate) const START: i64 = 1_000;
pub(crate) const SECURITY_DEPOSIT: u64 = 50_000_000;

pub(crate) fn error_code(err: &Error) -> u32 {
    match err {
        Error::AnchorError(e) => e.error_code_number,
        _ => 0,
    }
}

pub(crate) fn price(whole: u128) -> u128 {
    whole * PRICE_SCALE
}

fn take<K: std::hash::Hash + Eq>(balances: &mut HashMap<K, u128>, key: K, amount: u128) -> Result<()> {
    let balance = balances.entry(key).or_default();
    *balance = balance
        .checked_sub(amount)
        .ok_or(error!(VaultLongError::InsufficientFunds))?;
    Ok(())
}

/// Token balances, stable supply and escrowed lamports kept in memory.
/// `price_data` is the borsh encoded `(timestamp, price)` pair.
#[derive(Debug, Default)]
pub(crate) struct MockHost {
    pub now: i64,
    pub assets: HashMap<Pubkey, u128>,
    pub custody: u128,
    pub stable: HashMap<Pubkey, u128>,
    pub locked: u128,
    pub supply: u128,
    pub lamports: HashMap<Pubkey, u128>,
    pub escrowed: u128,
}

impl MockHost {
    pub fn call(&self, caller: Pubkey) -> Call {
        Call {
            caller,
            now: self.now,
            value: SECURITY_DEPOSIT,
        }
    }

    pub fn price_data(&self, price: u128) -> Vec<u8> {
        (self.now, price).try_to_vec().unwrap()
    }

    pub fn asset_balance(&self, owner: &Pubkey) -> u128 {
        self.assets.get(owner).copied().unwrap_or_default()
    }

    pub fn stable_balance(&self, owner: &Pubkey) -> u128 {
        self.stable.get(owner).copied().unwrap_or_default()
    }

    pub fn lamport_balance(&self, owner: &Pubkey) -> u128 {
        self.lamports.get(owner).copied().unwrap_or_default()
    }
}

impl PriceOracle for MockHost {
    fn attest(
        &mut self,
        action: ProtocolAction,
        target_timestamp: i64,
        price_data: &[u8],
    ) -> Result<PriceInfo> {
        let (timestamp, price) = <(i64, u128)>::try_from_slice(price_data)
            .map_err(|_| error!(VaultLongError::InvalidPriceData))?;
        require!(timestamp <= self.now, VaultLongError::InvalidPriceData);
        if action.is_validation() {
            require!(timestamp >= target_timestamp, VaultLongError::PriceTooOld);
        }
        Ok(PriceInfo { price, timestamp })
    }
}

impl StableLedger for MockHost {
    fn total_supply(&self) -> Result<u128> {
        Ok(self.supply)
    }

    fn mint(&mut self, to: Pubkey, amount: u128) -> Result<()> {
        *self.stable.entry(to).or_default() += amount;
        self.supply += amount;
        Ok(())
    }

    fn lock(&mut self, from: Pubkey, amount: u128) -> Result<()> {
        take(&mut self.stable, from, amount)?;
        self.locked += amount;
        Ok(())
    }

    fn burn_locked(&mut self, amount: u128) -> Result<()> {
        self.locked -= amount;
        self.supply -= amount;
        Ok(())
    }
}

impl AssetCustody for MockHost {
    fn pull(&mut self, from: Pubkey, amount: u128) -> Result<()> {
        take(&mut self.assets, from, amount)?;
        self.custody += amount;
        Ok(())
    }

    fn push(&mut self, to: Pubkey, amount: u128) -> Result<()> {
        self.custody = self
            .custody
            .checked_sub(amount)
            .ok_or(error!(VaultLongError::InsufficientFunds))?;
        *self.assets.entry(to).or_default() += amount;
        Ok(())
    }
}

impl DepositEscrow for MockHost {
    fn escrow(&mut self, from: Pubkey, lamports: u64) -> Result<()> {
        take(&mut self.lamports, from, lamports as u128)?;
        self.escrowed += lamports as u128;
        Ok(())
    }

    fn release(&mut self, to: Pubkey, lamports: u64) -> Result<()> {
        self.escrowed -= lamports as u128;
        *self.lamports.entry(to).or_default() += lamports as u128;
        Ok(())
    }
}

/// Each tick aggregate matches its live slots, and the aggregates add up to
/// the protocol totals.
pub(crate) fn check_tick_invariant(protocol: &Protocol) {
    let mut total_expo = 0u128;
    let mut total_pos = 0u64;
    let mut highest = None;
    for entry in &protocol.ticks.entries {
        let data = entry.data;
        let live = &entry.positions[..data.total_pos as usize];
        let expo: u128 = live.iter().map(|p| p.total_expo).sum();
        assert_eq!(data.total_expo, expo, "tick {} aggregate expo", entry.tick);
        assert_eq!(
            data.liquidation_penalty.is_some(),
            data.total_pos > 0,
            "tick {} penalty stamp",
            entry.tick
        );
        if data.total_pos > 0 {
            highest = Some(entry.tick);
        }
        total_expo += expo;
        total_pos += data.total_pos;
    }
    assert_eq!(total_expo, protocol.total_expo(), "protocol expo");
    assert_eq!(total_pos, protocol.total_long_positions(), "position count");
    assert_eq!(protocol.ticks.highest_populated_tick(), highest);
}

/// Risk parameters with fees, funding and imbalance checks turned off so
/// that values can be checked exactly.
pub(crate) fn quiet_config() -> ProtocolConfig {
    ProtocolConfig {
        position_fee_bps: 0,
        vault_fee_bps: 0,
        funding_sf: 0,
        open_expo_imbalance_limit_bps: 0,
        deposit_expo_imbalance_limit_bps: 0,
        withdrawal_expo_imbalance_limit_bps: 0,
        close_expo_imbalance_limit_bps: 0,
        ..ProtocolConfig::default()
    }
}

/// Protocol initialized at 2000 with a 10 unit vault and a 5 unit long
/// liquidated around 1000.
pub(crate) struct Fixture {
    pub protocol: Protocol,
    pub host: MockHost,
    pub deployer: Pubkey,
    pub position: PositionId,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(quiet_config())
    }

    pub fn with_config(config: ProtocolConfig) -> Self {
        let mut host = MockHost {
            now: START,
            ..MockHost::default()
        };
        let deployer = Pubkey::new_unique();
        host.assets.insert(deployer, 100 * UNIT);
        host.lamports.insert(deployer, 1_000_000_000);

        let mut protocol = Protocol::new(config);
        let call = host.call(deployer);
        let price_data = host.price_data(price(2_000));
        let position = protocol
            .initialize(&mut host, &call, 10 * UNIT, 5 * UNIT, price(1_000), &price_data)
            .unwrap();
        Fixture {
            protocol,
            host,
            deployer,
            position,
        }
    }

    /// A funded user.
    pub fn user(&mut self) -> Pubkey {
        let user = Pubkey::new_unique();
        self.host.assets.insert(user, 100 * UNIT);
        self.host.lamports.insert(user, 1_000_000_000);
        user
    }

    pub fn advance(&mut self, seconds: i64) {
        self.host.now += seconds;
    }

    pub fn deadline(&self) -> i64 {
        self.host.now + 60
    }

    pub fn open(&mut self, user: Pubkey, amount: u128, liq_price: u128, at: u128) -> Result<(bool, PositionId)> {
        let call = self.host.call(user);
        let price_data = self.host.price_data(at);
        let deadline = self.deadline();
        self.protocol.initiate_open_position(
            &mut self.host,
            &call,
            amount,
            liq_price,
            user,
            user,
            deadline,
            &price_data,
            &PreviousActionsData::default(),
        )
    }

    pub fn validate_open(&mut self, user: Pubkey, at: u128) -> Result<bool> {
        let call = self.host.call(user);
        let price_data = self.host.price_data(at);
        self.protocol.validate_open_position(
            &mut self.host,
            &call,
            user,
            &price_data,
            &PreviousActionsData::default(),
        )
    }

    pub fn close(&mut self, user: Pubkey, pos_id: PositionId, amount: u128, at: u128) -> Result<bool> {
        let call = self.host.call(user);
        let price_data = self.host.price_data(at);
        let deadline = self.deadline();
        self.protocol.initiate_close_position(
            &mut self.host,
            &call,
            pos_id,
            amount,
            0,
            user,
            user,
            deadline,
            &price_data,
            &PreviousActionsData::default(),
        )
    }

    pub fn validate_close(&mut self, user: Pubkey, at: u128) -> Result<bool> {
        let call = self.host.call(user);
        let price_data = self.host.price_data(at);
        self.protocol.validate_close_position(
            &mut self.host,
            &call,
            user,
            &price_data,
            &PreviousActionsData::default(),
        )
    }

    pub fn deposit(&mut self, user: Pubkey, amount: u128, at: u128) -> Result<bool> {
        let call = self.host.call(user);
        let price_data = self.host.price_data(at);
        let deadline = self.deadline();
        self.protocol.initiate_deposit(
            &mut self.host,
            &call,
            amount,
            user,
            user,
            deadline,
            &price_data,
            &PreviousActionsData::default(),
        )
    }

    pub fn validate_deposit(&mut self, caller: Pubkey, validator: Pubkey, at: u128) -> Result<bool> {
        let call = self.host.call(caller);
        let price_data = self.host.price_data(at);
        self.protocol.validate_deposit(
            &mut self.host,
            &call,
            validator,
            &price_data,
            &PreviousActionsData::default(),
        )
    }

    pub fn withdraw(&mut self, user: Pubkey, shares: u128, at: u128) -> Result<bool> {
        let call = self.host.call(user);
        let price_data = self.host.price_data(at);
        let deadline = self.deadline();
        self.protocol.initiate_withdrawal(
            &mut self.host,
            &call,
            shares,
            user,
            user,
            deadline,
            &price_data,
            &PreviousActionsData::default(),
        )
    }

    pub fn validate_withdrawal(&mut self, user: Pubkey, at: u128) -> Result<bool> {
        let call = self.host.call(user);
        let price_data = self.host.price_data(at);
        self.protocol.validate_withdrawal(
            &mut self.host,
            &call,
            user,
            &price_data,
            &PreviousActionsData::default(),
        )
    }

    pub fn liquidate(&mut self, liquidator: Pubkey, at: u128, iterations: u16) -> Result<u16> {
        let call = self.host.call(liquidator);
        let price_data = self.host.price_data(at);
        self.protocol
            .liquidate(&mut self.host, &call, &price_data, iterations)
    }

    /// Assets in custody that belong to neither balance yet.
    pub fn pending_assets(&self) -> u128 {
        self.protocol
            .pending
            .iter()
            .map(|(_, action)| match action.kind {
                PendingActionKind::Deposit { amount, .. } => amount,
                PendingActionKind::Close { temp_transfer, .. } => temp_transfer,
                _ => 0,
            })
            .sum()
    }

    pub fn assert_conserved(&self) {
        check_tick_invariant(&self.protocol);
        assert_eq!(
            self.host.custody,
            self.protocol.balance_long + self.protocol.balance_vault + self.pending_assets(),
            "custody does not match the protocol balances"
        );
    }
}
