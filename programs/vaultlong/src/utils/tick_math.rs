use anchor_lang::prelude::*;
use ethnum::U256;
use crate::{constants::*, VaultLongError};

// 1.0001^(2^k) with 18 decimals, k = 0..=18. 2^19 exceeds the tick range.
const POWERS: [u128; 19] = [
    1_000_100_000_000_000_000,
    1_000_200_010_000_000_000,
    1_000_400_060_004_000_100,
    1_000_800_280_056_007_000,
    1_001_601_200_560_182_043,
    1_003_204_964_963_598_014,
    1_006_420_201_727_613_920,
    1_012_881_622_445_451_097,
    1_025_929_181_087_729_343,
    1_052_530_684_607_338_948,
    1_107_820_842_039_993_613,
    1_227_267_018_058_200_482,
    1_506_184_333_613_467_388,
    2_268_591_246_822_644_826,
    5_146_506_245_160_322_222,
    26_486_526_531_474_198_664,
    701_536_087_702_486_644_953,
    492_152_882_348_911_033_633_683,
    242_214_459_604_341_065_650_571_799_093,
];

pub const MIN_PRICE: u128 = 2_063_215_669;
pub const MAX_PRICE: u128 = 94_743_048_965_431_442_908_304_904_863_337_231_252;

/// Price of `tick` with 18 decimals: `1.0001^tick`.
pub fn price_at_tick(tick: i32) -> Result<u128> {
    require!(
        (MIN_TICK..=MAX_TICK).contains(&tick),
        VaultLongError::TickOutOfBounds
    );
    let scale = U256::from(PRICE_SCALE);
    let abs_tick = tick.unsigned_abs();
    let mut ratio = scale;
    for (k, power) in POWERS.iter().enumerate() {
        if abs_tick & (1 << k) != 0 {
            ratio = ratio * U256::from(*power) / scale;
        }
    }
    if tick < 0 {
        ratio = scale * scale / ratio;
    }
    let (hi, lo) = ratio.into_words();
    if hi != 0 {
        return Err(error!(VaultLongError::MathOverflow));
    }
    Ok(lo)
}

/// Largest tick whose price is at or below `price`, clamped to the tick range.
pub fn tick_at_price(price: u128) -> Result<i32> {
    if price <= MIN_PRICE {
        return Ok(MIN_TICK);
    }
    if price >= MAX_PRICE {
        return Ok(MAX_TICK);
    }
    // price_at_tick(low) <= price < price_at_tick(high)
    let mut low = MIN_TICK;
    let mut high = MAX_TICK;
    while high - low > 1 {
        let mid = low + (high - low) / 2;
        if price_at_tick(mid)? <= price {
            low = mid;
        } else {
            high = mid;
        }
    }
    Ok(low)
}

/// Round `tick` toward negative infinity to a multiple of `spacing`.
pub fn floor_to_spacing(tick: i32, spacing: i32) -> i32 {
    tick.div_euclid(spacing) * spacing
}

pub fn min_usable_tick(spacing: i32) -> i32 {
    let tick = floor_to_spacing(MIN_TICK, spacing);
    if tick < MIN_TICK {
        tick + spacing
    } else {
        tick
    }
}

pub fn max_usable_tick(spacing: i32) -> i32 {
    floor_to_spacing(MAX_TICK, spacing)
}
