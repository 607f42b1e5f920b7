use anchor_lang::prelude::*;

#[error_code]
pub enum VaultLongError {
    #[msg("Invalid token accounts")]
    InvalidTokenAccounts,

    #[msg("Account required for settlement was not provided")]
    MissingAccount,

    #[msg("Mathematical operation overflow")]
    MathOverflow,

    #[msg("Mathematical operation underflow")]
    MathUnderflow,

    #[msg("Division by zero")]
    DivisionByZero,

    #[msg("Zero amount")]
    ZeroAmount,

    #[msg("Recipient cannot be the default address")]
    InvalidAddressTo,

    #[msg("Validator cannot be the default address")]
    InvalidAddressValidator,

    #[msg("Deadline exceeded")]
    DeadlineExceeded,

    #[msg("Security deposit too low")]
    SecurityDepositTooLow,

    #[msg("Insufficient funds for transaction")]
    InsufficientFunds,

    #[msg("Long position too small")]
    LongPositionTooSmall,

    #[msg("Leverage below the minimum")]
    LeverageTooLow,

    #[msg("Leverage above the maximum")]
    LeverageTooHigh,

    #[msg("Liquidation price too close to the current price")]
    LiquidationPriceSafetyMargin,

    #[msg("Tick out of bounds")]
    TickOutOfBounds,

    #[msg("Tick was liquidated since the position id was issued")]
    OutdatedTick,

    #[msg("Position not found")]
    PositionNotFound,

    #[msg("Position is not validated yet")]
    PositionNotValidated,

    #[msg("Unauthorized operation")]
    Unauthorized,

    #[msg("Amount to close is higher than the position amount")]
    AmountToCloseHigherThanPositionAmount,

    #[msg("Slippage tolerance exceeded")]
    SlippageToleranceExceeded,

    #[msg("Imbalance limit reached")]
    ImbalanceLimitReached,

    #[msg("Reentrant call")]
    ReentrantCall,

    #[msg("Validator already has a pending action")]
    PendingActionExists,

    #[msg("No pending action for this validator")]
    NoPendingAction,

    #[msg("Pending action has an unexpected kind")]
    InvalidPendingAction,

    #[msg("Invalid protocol configuration")]
    InvalidConfig,

    #[msg("Invalid price data")]
    InvalidPriceData,

    #[msg("Price is too old")]
    PriceTooOld,

    #[msg("Stable token amount exceeds the supply")]
    InsufficientStableSupply,

    #[msg("Price feed is full or out of order")]
    InvalidPriceObservation,
}
