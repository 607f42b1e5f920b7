use anchor_lang::prelude::*;
use ethnum::U256;
use crate::{constants::*, VaultLongError};

/// Rounding direction for fixed-point division. For signed results `Down`
/// rounds toward negative infinity and `Up` toward positive infinity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

/// 256-bit unsigned integer as stored in account data.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HugeUint {
    pub hi: u128,
    pub lo: u128,
}

impl From<U256> for HugeUint {
    fn from(value: U256) -> Self {
        let (hi, lo) = value.into_words();
        HugeUint { hi, lo }
    }
}

impl From<HugeUint> for U256 {
    fn from(value: HugeUint) -> Self {
        U256::from_words(value.hi, value.lo)
    }
}

impl HugeUint {
    pub fn checked_add(self, rhs: U256) -> Result<HugeUint> {
        U256::from(self)
            .checked_add(rhs)
            .map(HugeUint::from)
            .ok_or(error!(VaultLongError::MathOverflow))
    }

    pub fn checked_sub(self, rhs: U256) -> Result<HugeUint> {
        U256::from(self)
            .checked_sub(rhs)
            .map(HugeUint::from)
            .ok_or(error!(VaultLongError::MathUnderflow))
    }
}

pub fn to_u128(value: U256) -> Result<u128> {
    let (hi, lo) = value.into_words();
    if hi != 0 {
        return Err(error!(VaultLongError::MathOverflow));
    }
    Ok(lo)
}

pub fn mul_div_u256(a: U256, b: U256, denominator: U256, rounding: Rounding) -> Result<U256> {
    if denominator == U256::ZERO {
        return Err(error!(VaultLongError::DivisionByZero));
    }
    let product = a.checked_mul(b).ok_or(error!(VaultLongError::MathOverflow))?;
    let quotient = product / denominator;
    if rounding == Rounding::Up && product % denominator != U256::ZERO {
        return quotient
            .checked_add(U256::ONE)
            .ok_or(error!(VaultLongError::MathOverflow));
    }
    Ok(quotient)
}

/// `a * b / denominator` with a 256-bit intermediate product.
pub fn mul_div(a: u128, b: u128, denominator: u128, rounding: Rounding) -> Result<u128> {
    to_u128(mul_div_u256(
        U256::from(a),
        U256::from(b),
        U256::from(denominator),
        rounding,
    )?)
}

/// Signed `a * b / denominator`, rounding toward the requested infinity.
pub fn mul_div_signed(a: i128, b: u128, denominator: u128, rounding: Rounding) -> Result<i128> {
    let magnitude_rounding = match (a < 0, rounding) {
        (false, r) => r,
        (true, Rounding::Down) => Rounding::Up,
        (true, Rounding::Up) => Rounding::Down,
    };
    let magnitude = mul_div(a.unsigned_abs(), b, denominator, magnitude_rounding)?;
    let magnitude = to_i128(magnitude)?;
    Ok(if a < 0 { -magnitude } else { magnitude })
}

pub fn to_i128(value: u128) -> Result<i128> {
    i128::try_from(value).map_err(|_| error!(VaultLongError::MathOverflow))
}

pub fn checked_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(error!(VaultLongError::MathOverflow))
}

pub fn checked_sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b).ok_or(error!(VaultLongError::MathUnderflow))
}

pub fn checked_add_signed(a: i128, b: i128) -> Result<i128> {
    a.checked_add(b).ok_or(error!(VaultLongError::MathOverflow))
}

pub fn checked_sub_signed(a: i128, b: i128) -> Result<i128> {
    a.checked_sub(b).ok_or(error!(VaultLongError::MathOverflow))
}

/// Clamp a signed value into `[0, max]`.
pub fn clamp_to_u128(value: i128, max: u128) -> u128 {
    if value <= 0 {
        0
    } else {
        (value as u128).min(max)
    }
}

/// Share of `value` expressed in basis points, rounded down.
pub fn bps_of(value: u128, bps: u16) -> Result<u128> {
    mul_div(value, bps as u128, BPS_DIVISOR, Rounding::Down)
}

/// Leverage with `LEVERAGE_DECIMALS` for a position opened at `start_price`
/// and liquidated (without penalty) at `liq_price`.
pub fn leverage(start_price: u128, liq_price: u128) -> Result<u128> {
    if start_price <= liq_price {
        return Err(error!(VaultLongError::LeverageTooHigh));
    }
    mul_div(start_price, LEVERAGE_SCALE, start_price - liq_price, Rounding::Down)
}

/// Price-independent exposure of `amount` opened at `start_price` with the
/// given liquidation price: `amount * start / (start - liq)`.
pub fn position_total_expo(amount: u128, start_price: u128, liq_price: u128) -> Result<u128> {
    if start_price <= liq_price {
        return Err(error!(VaultLongError::LeverageTooHigh));
    }
    mul_div(amount, start_price, start_price - liq_price, Rounding::Down)
}

/// Value of `total_expo` at `price`: `total_expo * (price - liq) / price`.
/// Negative once the price is below the liquidation price.
pub fn position_value(price: u128, liq_price: u128, total_expo: u128) -> Result<i128> {
    if price == 0 {
        return Err(error!(VaultLongError::DivisionByZero));
    }
    if price >= liq_price {
        to_i128(mul_div(total_expo, price - liq_price, price, Rounding::Down)?)
    } else {
        let loss = to_i128(mul_div(total_expo, liq_price - price, price, Rounding::Up)?)?;
        Ok(-loss)
    }
}

/// Asset value of a stable token amount at `price` when the vault is empty.
pub fn asset_to_stable_at_price(amount: u128, price: u128) -> Result<u128> {
    let decimals = PRICE_DECIMALS + ASSET_DECIMALS - STABLE_DECIMALS as u32;
    mul_div(amount, price, 10u128.pow(decimals), Rounding::Down)
}
