use anchor_lang::prelude::*;
use crate::{constants::*, state::*, utils::HugeUint, VaultLongError};

#[account]
#[derive(Debug)]
pub struct Protocol {
    // Set for the duration of every entry point. Kept first so that it sits
    // at `CALL_IN_PROGRESS_OFFSET` in the account data.
    pub call_in_progress: bool,

    // The authority that initialized the protocol
    pub authority: Pubkey,

    // Collateral mint and the protocol-owned token account holding it
    pub asset_mint: Pubkey,
    pub asset_vault: Pubkey,

    // Stable token mint (authority is this account) and the account holding
    // shares locked by pending withdrawals
    pub stable_mint: Pubkey,
    pub stable_escrow: Pubkey,

    pub price_feed: Pubkey,

    // Bump seed for PDA derivation
    pub bump: u8,

    pub config: ProtocolConfig,

    pub balance_long: u128,
    pub balance_vault: u128,
    // In-flight deposits minus in-flight withdrawals
    pub pending_balance_vault: i128,

    pub total_expo: u128,
    pub total_long_positions: u64,

    // Liquidation multiplier (18 decimals) and sum of expo * unadjusted price
    pub liq_multiplier: u128,
    pub liq_multiplier_accumulator: HugeUint,

    pub last_price: u128,
    pub last_update_timestamp: i64,
    pub last_funding_per_day: i128,
    pub ema: i128,

    pub ticks: TickIndex,
    pub pending: PendingQueue,
}

/// Byte offset of `call_in_progress` in the account data, after the
/// discriminator.
pub const CALL_IN_PROGRESS_OFFSET: usize = 8;

impl Protocol {
    pub fn new(config: ProtocolConfig) -> Self {
        Protocol {
            authority: Pubkey::default(),
            asset_mint: Pubkey::default(),
            asset_vault: Pubkey::default(),
            stable_mint: Pubkey::default(),
            stable_escrow: Pubkey::default(),
            price_feed: Pubkey::default(),
            bump: 0,
            ticks: TickIndex::new(config.tick_spacing),
            config,
            call_in_progress: false,
            balance_long: 0,
            balance_vault: 0,
            pending_balance_vault: 0,
            total_expo: 0,
            total_long_positions: 0,
            liq_multiplier: MULTIPLIER_SCALE,
            liq_multiplier_accumulator: HugeUint::default(),
            last_price: 0,
            last_update_timestamp: 0,
            last_funding_per_day: 0,
            ema: 0,
            pending: PendingQueue::default(),
        }
    }

    /// Run `f` as a public entry point. A nested entry fails without
    /// touching the state. This only sees the in-memory flag; instructions
    /// also write it to the account data with `mark_call_in_progress` so a
    /// self-invocation that deserializes the account is rejected too.
    pub fn non_reentrant<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        require!(!self.call_in_progress, VaultLongError::ReentrantCall);
        self.call_in_progress = true;
        let result = f(self);
        self.call_in_progress = false;
        result
    }

    /// Raise the re-entrancy flag in the serialized account. Cleared again
    /// when the account is written back at the end of the instruction.
    pub fn mark_call_in_progress(info: &AccountInfo) -> Result<()> {
        let mut data = info.try_borrow_mut_data()?;
        let flag = data
            .get_mut(CALL_IN_PROGRESS_OFFSET)
            .ok_or(error!(ErrorCode::AccountDidNotDeserialize))?;
        *flag = 1;
        Ok(())
    }

    /// Account size that keeps `PROTOCOL_SPACE_HEADROOM` free bytes after the
    /// current state. Never shrinks the account.
    pub fn space_for(&self, current_len: usize) -> usize {
        let used = self.try_to_vec().map(|data| data.len()).unwrap_or(0) + 8;
        current_len.max(used + PROTOCOL_SPACE_HEADROOM)
    }

    // Read-only accessors

    pub fn long_position(&self, pos_id: &PositionId) -> Result<(Position, u8)> {
        let position = *self.ticks.position(pos_id)?;
        let penalty = self
            .ticks
            .tick_liquidation_penalty(pos_id.tick, self.config.liquidation_penalty);
        Ok((position, penalty))
    }

    pub fn tick_data(&self, tick: i32) -> TickData {
        self.ticks.tick_data(tick)
    }

    pub fn tick_version(&self, tick: i32) -> u64 {
        self.ticks.tick_version(tick)
    }

    pub fn total_expo(&self) -> u128 {
        self.total_expo
    }

    pub fn balance_long(&self) -> u128 {
        self.balance_long
    }

    pub fn balance_vault(&self) -> u128 {
        self.balance_vault
    }

    pub fn total_long_positions(&self) -> u64 {
        self.total_long_positions
    }

    pub fn liquidation_multiplier(&self) -> u128 {
        self.liq_multiplier
    }

    pub fn pending_action_of(&self, validator: &Pubkey) -> Option<PendingAction> {
        self.pending
            .find_by_validator(validator)
            .map(|(_, action)| action.clone())
    }

    /// Actions `caller` may validate now, with their raw indices.
    pub fn actionable_pending_actions(
        &self,
        caller: &Pubkey,
        now: i64,
    ) -> (Vec<PendingAction>, Vec<u128>) {
        self.pending
            .actionable(caller, now, self.config.validation_deadline)
            .into_iter()
            .map(|(raw, action)| (action, raw))
            .unzip()
    }
}
