use anchor_lang::prelude::*;
use ethnum::U256;
use crate::{events::*, state::Protocol, utils::*};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LiquidationOutcome {
    pub liquidated_ticks: u16,
    pub liquidated_positions: u64,
    // Sum of the liquidated ticks' values, negative for bad debt
    pub remaining_collateral: i128,
    pub is_liquidation_pending: bool,
}

impl Protocol {
    /// Liquidate, highest first, at most `iterations` ticks whose trigger
    /// price is reached by `price`.
    pub fn liquidate_positions(&mut self, price: u128, iterations: u16) -> Result<LiquidationOutcome> {
        let mut outcome = LiquidationOutcome::default();
        let current_tick = self.effective_tick_for_price(price)?;

        while outcome.liquidated_ticks < iterations {
            let tick = match self.ticks.highest_populated_tick() {
                Some(tick) if tick >= current_tick => tick,
                _ => break,
            };
            let penalty = self
                .ticks
                .tick_liquidation_penalty(tick, self.config.liquidation_penalty);
            let share_tick = tick - penalty as i32 * self.config.tick_spacing;
            let liq_price = self.effective_price_for_tick(share_tick)?;
            let trigger_price = self.effective_price_for_tick(tick)?;

            let (data, old_version) = self.ticks.liquidate_tick(tick)?;
            let value = position_value(price, liq_price, data.total_expo)?;

            self.total_expo = checked_sub(self.total_expo, data.total_expo)?;
            self.total_long_positions = self
                .total_long_positions
                .checked_sub(data.total_pos)
                .ok_or(error!(crate::VaultLongError::MathUnderflow))?;
            self.liq_multiplier_accumulator = self
                .liq_multiplier_accumulator
                .checked_sub(accumulator_share(share_tick, data.total_expo)?)?;

            outcome.liquidated_ticks += 1;
            outcome.liquidated_positions += data.total_pos;
            outcome.remaining_collateral = checked_add_signed(outcome.remaining_collateral, value)?;

            emit!(LiquidatedTick {
                tick,
                old_tick_version: old_version,
                liquidation_price: trigger_price,
                effective_tick_price: price,
                remaining_collateral: value,
            });
        }

        outcome.is_liquidation_pending = matches!(
            self.ticks.highest_populated_tick(),
            Some(tick) if tick >= current_tick
        );

        if outcome.liquidated_ticks > 0 {
            self.settle_liquidated_collateral(outcome.remaining_collateral)?;
            self.update_liquidation_multiplier(price)?;
            msg!(
                "Liquidated {} ticks ({} positions), remaining collateral {}",
                outcome.liquidated_ticks,
                outcome.liquidated_positions,
                outcome.remaining_collateral
            );
        }
        Ok(outcome)
    }

    /// Move the liquidated collateral from the long side to the vault. A side
    /// driven below zero is made whole by the other one.
    fn settle_liquidated_collateral(&mut self, remaining_collateral: i128) -> Result<()> {
        let mut long = checked_sub_signed(to_i128(self.balance_long)?, remaining_collateral)?;
        let mut vault = checked_add_signed(to_i128(self.balance_vault)?, remaining_collateral)?;
        if long < 0 {
            vault = checked_add_signed(vault, long)?;
            long = 0;
        }
        if vault < 0 {
            long = checked_add_signed(long, vault)?;
            vault = 0;
        }
        self.balance_long = long.max(0) as u128;
        self.balance_vault = vault.max(0) as u128;
        Ok(())
    }

    /// Funding and PnL, then liquidations. A price older than the last
    /// update liquidates nothing.
    pub fn apply_pnl_and_liquidate(
        &mut self,
        price: u128,
        timestamp: i64,
        iterations: u16,
    ) -> Result<LiquidationOutcome> {
        if !self.apply_pnl_and_funding(price, timestamp)? {
            return Ok(LiquidationOutcome::default());
        }
        self.liquidate_positions(price, iterations)
    }
}

/// Contribution of `total_expo` at `tick` to the multiplier accumulator.
pub fn accumulator_share(tick: i32, total_expo: u128) -> Result<U256> {
    Ok(U256::from(total_expo) * U256::from(price_at_tick(tick)?))
}
