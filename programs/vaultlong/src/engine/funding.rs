use anchor_lang::prelude::*;
use ethnum::U256;
use crate::{constants::*, state::{BalanceSnapshot, Protocol}, utils::*, VaultLongError};

/// Long exposure not covered by the long balance: `total_expo - balance_long`.
pub fn trading_expo(total_expo: u128, balance_long: u128) -> u128 {
    total_expo.saturating_sub(balance_long)
}

/// Value the long side would hold at `price`, starting from balances valued
/// at `last_price`. Negative when the longs are underwater.
pub fn long_asset_available(
    total_expo: u128,
    balance_long: u128,
    last_price: u128,
    price: u128,
) -> Result<i128> {
    let trading = mul_div(
        trading_expo(total_expo, balance_long),
        last_price,
        price,
        Rounding::Down,
    )?;
    checked_sub_signed(to_i128(total_expo)?, to_i128(trading)?)
}

/// Vault balance implied by `snapshot` once revalued at `price`.
pub fn vault_asset_available(snapshot: &BalanceSnapshot, price: u128) -> Result<u128> {
    let total = checked_add(snapshot.balance_vault, snapshot.balance_long)?;
    let long = long_asset_available(
        snapshot.total_expo,
        snapshot.balance_long,
        snapshot.asset_price,
        price,
    )?;
    Ok(total - clamp_to_u128(long, total))
}

impl Protocol {
    pub fn long_trading_expo(&self) -> u128 {
        trading_expo(self.total_expo, self.balance_long)
    }

    /// Funding rate per day (18 decimals) for the current exposures, `ema`
    /// included. Positive when longs pay the vault.
    pub fn funding_per_day(&self, ema: i128) -> Result<i128> {
        let long_expo = self.long_trading_expo();
        let vault_expo = self.balance_vault;
        let scale_factor = to_i128(self.config.funding_sf)?
            .checked_mul(10i128.pow(FUNDING_RATE_DECIMALS - FUNDING_SF_DECIMALS))
            .ok_or(error!(VaultLongError::MathOverflow))?;

        if long_expo == 0 && vault_expo == 0 {
            return Ok(ema);
        }
        if vault_expo == 0 {
            return checked_add_signed(scale_factor, ema);
        }
        if long_expo == 0 {
            return checked_add_signed(-scale_factor, ema);
        }

        let long_sq = U256::from(long_expo) * U256::from(long_expo);
        let vault_sq = U256::from(vault_expo) * U256::from(vault_expo);
        let max_sq = long_sq.max(vault_sq);
        let (numerator, positive) = if long_sq >= vault_sq {
            (long_sq - vault_sq, true)
        } else {
            (vault_sq - long_sq, false)
        };
        let rate = mul_div_u256(
            numerator,
            U256::from(scale_factor as u128),
            max_sq,
            Rounding::Down,
        )?;
        let rate = to_i128(to_u128(rate)?)?;
        checked_add_signed(if positive { rate } else { -rate }, ema)
    }

    /// Funding accrued since the last update, as a rate (18 decimals), and
    /// the per-day rate it was computed with.
    pub fn funding(&self, timestamp: i64) -> Result<(i128, i128)> {
        let elapsed = timestamp.saturating_sub(self.last_update_timestamp);
        if elapsed <= 0 {
            return Ok((0, self.last_funding_per_day));
        }
        let per_day = self.funding_per_day(self.ema)?;
        let fund = mul_div_signed(
            per_day,
            elapsed as u128,
            SECONDS_PER_DAY as u128,
            Rounding::Down,
        )?;
        Ok((fund, per_day))
    }

    fn update_ema(&mut self, elapsed: i64, funding_per_day: i128) -> Result<()> {
        let period = self.config.ema_period;
        if elapsed >= period {
            self.ema = funding_per_day;
            return Ok(());
        }
        let weighted = funding_per_day
            .checked_mul(elapsed as i128)
            .and_then(|v| v.checked_add(self.ema.checked_mul((period - elapsed) as i128)?))
            .ok_or(error!(VaultLongError::MathOverflow))?;
        self.ema = weighted / period as i128;
        Ok(())
    }

    /// Move funding and price PnL between the long and vault balances.
    /// Returns false, changing nothing, for a price older than the last
    /// update.
    pub fn apply_pnl_and_funding(&mut self, price: u128, timestamp: i64) -> Result<bool> {
        require!(price > 0, VaultLongError::InvalidPriceData);
        if timestamp < self.last_update_timestamp {
            return Ok(false);
        }
        if timestamp == self.last_update_timestamp && price == self.last_price {
            return Ok(true);
        }

        let elapsed = timestamp - self.last_update_timestamp;
        let (fund, funding_per_day) = self.funding(timestamp)?;
        let fund_asset = mul_div_signed(fund, self.long_trading_expo(), PRICE_SCALE, Rounding::Down)?;

        let total = checked_add(self.balance_long, self.balance_vault)?;
        let long = long_asset_available(self.total_expo, self.balance_long, self.last_price, price)?;
        let long = clamp_to_u128(checked_sub_signed(long, fund_asset)?, total);
        self.balance_long = long;
        self.balance_vault = total - long;

        if elapsed > 0 {
            self.update_ema(elapsed, funding_per_day)?;
            self.last_funding_per_day = funding_per_day;
        }
        self.last_price = price;
        self.last_update_timestamp = timestamp;
        self.update_liquidation_multiplier(price)?;
        Ok(true)
    }

    /// Recompute the multiplier so that the positions' values add up to the
    /// long balance at `price`.
    pub fn update_liquidation_multiplier(&mut self, price: u128) -> Result<()> {
        let accumulator = U256::from(self.liq_multiplier_accumulator);
        if self.total_expo == 0 || accumulator == U256::ZERO {
            self.liq_multiplier = MULTIPLIER_SCALE;
            return Ok(());
        }
        let multiplier = mul_div_u256(
            U256::from(self.long_trading_expo()) * U256::from(price),
            U256::from(MULTIPLIER_SCALE),
            accumulator,
            Rounding::Down,
        )?;
        self.liq_multiplier = to_u128(multiplier)?.max(1);
        Ok(())
    }
}
