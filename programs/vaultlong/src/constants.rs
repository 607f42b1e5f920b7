// Fixed-point scales
pub const PRICE_DECIMALS: u32 = 18;
pub const PRICE_SCALE: u128 = 1_000_000_000_000_000_000;
pub const ASSET_DECIMALS: u32 = 9;
pub const STABLE_DECIMALS: u8 = 9;
pub const LEVERAGE_DECIMALS: u32 = 21;
pub const LEVERAGE_SCALE: u128 = 1_000_000_000_000_000_000_000;
pub const MULTIPLIER_SCALE: u128 = 1_000_000_000_000_000_000;
pub const FUNDING_RATE_DECIMALS: u32 = 18;
pub const FUNDING_SF_DECIMALS: u32 = 3;

pub const BPS_DIVISOR: u128 = 10_000;
pub const SECONDS_PER_DAY: i64 = 86_400;

// Tick range; `1.0001^tick` stays inside u128 with 18 decimals and keeps
// consecutive ticks distinct at the low end.
pub const MIN_TICK: i32 = -200_000;
pub const MAX_TICK: i32 = 460_000;
pub const NO_POSITION_TICK: i32 = i32::MIN;

pub const MAX_ACTIONABLE_PENDING_ACTIONS: usize = 20;
pub const MAX_LIQUIDATION_ITERATION: u16 = 10;

// Account sizing
pub const PROTOCOL_INITIAL_SPACE: usize = 10_240;
pub const PROTOCOL_SPACE_HEADROOM: usize = 4_096;
pub const PRICE_FEED_CAPACITY: usize = 32;

// PDA seeds
pub const PROTOCOL_SEED: &[u8] = b"protocol";
pub const STABLE_MINT_SEED: &[u8] = b"stable";
pub const PRICE_FEED_SEED: &[u8] = b"price_feed";
