use anchor_lang::prelude::*;

#[event]
pub struct ProtocolInitialized {
    pub protocol: Pubkey,
    pub authority: Pubkey,
    pub asset_mint: Pubkey,
    pub stable_mint: Pubkey,
    pub deposit_amount: u128,
    pub long_amount: u128,
    pub timestamp: i64,
}

#[event]
pub struct PricePublished {
    pub price_feed: Pubkey,
    pub price: u128,
    pub timestamp: i64,
}

#[event]
pub struct InitiatedOpenPosition {
    pub owner: Pubkey,
    pub validator: Pubkey,
    pub timestamp: i64,
    pub total_expo: u128,
    pub amount: u128,
    pub start_price: u128,
    pub tick: i32,
    pub tick_version: u64,
    pub index: u64,
}

#[event]
pub struct ValidatedOpenPosition {
    pub owner: Pubkey,
    pub validator: Pubkey,
    pub total_expo: u128,
    pub new_start_price: u128,
    pub tick: i32,
    pub tick_version: u64,
    pub index: u64,
}

#[event]
pub struct LiquidationPriceUpdated {
    pub old_tick: i32,
    pub old_tick_version: u64,
    pub old_index: u64,
    pub new_tick: i32,
    pub new_tick_version: u64,
    pub new_index: u64,
}

#[event]
pub struct PositionMoved {
    pub tick: i32,
    pub tick_version: u64,
    pub old_index: u64,
    pub new_index: u64,
}

#[event]
pub struct InitiatedClosePosition {
    pub owner: Pubkey,
    pub validator: Pubkey,
    pub to: Pubkey,
    pub tick: i32,
    pub tick_version: u64,
    pub index: u64,
    pub original_amount: u128,
    pub amount_to_close: u128,
    pub total_expo_remaining: u128,
}

#[event]
pub struct ValidatedClosePosition {
    pub validator: Pubkey,
    pub to: Pubkey,
    pub tick: i32,
    pub tick_version: u64,
    pub index: u64,
    pub amount_received: u128,
    pub profit: i128,
}

#[event]
pub struct LiquidatedPosition {
    pub validator: Pubkey,
    pub tick: i32,
    pub tick_version: u64,
    pub index: u64,
    pub price: u128,
    pub effective_tick_price: u128,
}

#[event]
pub struct LiquidatedTick {
    pub tick: i32,
    pub old_tick_version: u64,
    pub liquidation_price: u128,
    pub effective_tick_price: u128,
    pub remaining_collateral: i128,
}

#[event]
pub struct StalePendingActionRemoved {
    pub validator: Pubkey,
    pub tick: i32,
    pub tick_version: u64,
    pub index: u64,
}

#[event]
pub struct InitiatedDeposit {
    pub to: Pubkey,
    pub validator: Pubkey,
    pub amount: u128,
    pub timestamp: i64,
}

#[event]
pub struct ValidatedDeposit {
    pub to: Pubkey,
    pub validator: Pubkey,
    pub amount_deposited: u128,
    pub stable_minted: u128,
    pub timestamp: i64,
}

#[event]
pub struct InitiatedWithdrawal {
    pub to: Pubkey,
    pub validator: Pubkey,
    pub shares: u128,
    pub timestamp: i64,
}

#[event]
pub struct ValidatedWithdrawal {
    pub to: Pubkey,
    pub validator: Pubkey,
    pub amount_withdrawn: u128,
    pub shares_burned: u128,
    pub timestamp: i64,
}

#[event]
pub struct LiquidatorRewarded {
    pub liquidator: Pubkey,
    pub reward: u128,
}

#[event]
pub struct SecurityDepositRefunded {
    pub pending_user: Pubkey,
    pub receiver: Pubkey,
    pub amount: u64,
}
