use anchor_lang::prelude::*;
use ethnum::U256;
use crate::{
    constants::*,
    engine::{liquidation::accumulator_share, Call, Host, PriceInfo},
    events::*,
    state::*,
    utils::*,
    VaultLongError,
};

impl Protocol {
    /// Liquidation price of `tick` under the current multiplier.
    pub fn effective_price_for_tick(&self, tick: i32) -> Result<u128> {
        mul_div(
            price_at_tick(tick)?,
            self.liq_multiplier,
            MULTIPLIER_SCALE,
            Rounding::Down,
        )
    }

    /// Highest usable tick whose effective price is at or below `price`.
    pub fn effective_tick_for_price(&self, price: u128) -> Result<i32> {
        let unadjusted = mul_div_u256(
            U256::from(price),
            U256::from(MULTIPLIER_SCALE),
            U256::from(self.liq_multiplier),
            Rounding::Down,
        )?;
        let tick = match to_u128(unadjusted) {
            Ok(unadjusted) => tick_at_price(unadjusted)?,
            Err(_) => MAX_TICK,
        };
        let spacing = self.config.tick_spacing;
        Ok(floor_to_spacing(tick, spacing).clamp(min_usable_tick(spacing), max_usable_tick(spacing)))
    }

    /// Tick holding a position liquidated (without penalty) at
    /// `desired_liq_price`, and the penalty that tick applies.
    pub fn tick_for_liquidation_price(&self, desired_liq_price: u128) -> Result<(i32, u8)> {
        let spacing = self.config.tick_spacing;
        let current_penalty = self.config.liquidation_penalty;
        let tick = self.effective_tick_for_price(desired_liq_price)? + current_penalty as i32 * spacing;
        require!(tick <= max_usable_tick(spacing), VaultLongError::TickOutOfBounds);
        Ok((tick, self.ticks.tick_liquidation_penalty(tick, current_penalty)))
    }

    /// Liquidation price without penalty for positions of `tick`.
    pub fn liquidation_price_for_tick(&self, tick: i32, penalty: u8) -> Result<u128> {
        self.effective_price_for_tick(tick - penalty as i32 * self.config.tick_spacing)
    }

    pub(crate) fn add_long_expo(&mut self, tick: i32, penalty: u8, total_expo: u128) -> Result<()> {
        let share_tick = tick - penalty as i32 * self.config.tick_spacing;
        self.total_expo = checked_add(self.total_expo, total_expo)?;
        self.liq_multiplier_accumulator = self
            .liq_multiplier_accumulator
            .checked_add(accumulator_share(share_tick, total_expo)?)?;
        Ok(())
    }

    pub(crate) fn remove_long_expo(&mut self, tick: i32, penalty: u8, total_expo: u128) -> Result<()> {
        let share_tick = tick - penalty as i32 * self.config.tick_spacing;
        self.total_expo = checked_sub(self.total_expo, total_expo)?;
        self.liq_multiplier_accumulator = self
            .liq_multiplier_accumulator
            .checked_sub(accumulator_share(share_tick, total_expo)?)?;
        Ok(())
    }

    /// Re-point pending actions at a slot moved by a swap-delete.
    pub(crate) fn on_position_moved(&mut self, moved: Option<MovedSlot>) {
        let Some(moved) = moved else {
            return;
        };
        for action in self.pending.iter_mut() {
            match &mut action.kind {
                PendingActionKind::Open { tick, tick_version, index, .. }
                | PendingActionKind::Close { tick, tick_version, index, .. }
                    if *tick == moved.from.tick
                        && *tick_version == moved.from.tick_version
                        && *index == moved.from.index =>
                {
                    *index = moved.to.index;
                }
                _ => {}
            }
        }
        emit!(PositionMoved {
            tick: moved.to.tick,
            tick_version: moved.to.tick_version,
            old_index: moved.from.index,
            new_index: moved.to.index,
        });
    }

    fn start_price(&self, price: u128) -> Result<u128> {
        checked_add(price, bps_of(price, self.config.position_fee_bps)?)
    }

    fn close_price(&self, price: u128) -> Result<u128> {
        checked_sub(price, bps_of(price, self.config.position_fee_bps)?)
    }

    /// Open a provisional position and queue its validation.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn initiate_open(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        amount: u128,
        desired_liq_price: u128,
        to: Pubkey,
        validator: Pubkey,
        price: PriceInfo,
    ) -> Result<PositionId> {
        let start_price = self.start_price(price.price)?;
        let (tick, penalty) = self.tick_for_liquidation_price(desired_liq_price)?;
        let liq_price = self.liquidation_price_for_tick(tick, penalty)?;

        let leverage = leverage(start_price, liq_price)?;
        require!(leverage >= self.config.min_leverage, VaultLongError::LeverageTooLow);
        require!(leverage <= self.config.max_leverage, VaultLongError::LeverageTooHigh);

        let max_trigger_price = mul_div(
            price.price,
            BPS_DIVISOR - self.config.safety_margin_bps as u128,
            BPS_DIVISOR,
            Rounding::Down,
        )?;
        require!(
            self.effective_price_for_tick(tick)? <= max_trigger_price,
            VaultLongError::LiquidationPriceSafetyMargin
        );
        require!(
            tick < self.effective_tick_for_price(price.price)?,
            VaultLongError::LiquidationPriceSafetyMargin
        );

        let total_expo = position_total_expo(amount, start_price, liq_price)?;
        self.check_open_imbalance(total_expo, amount)?;

        let security_deposit = self.config.security_deposit_value;
        host.pull(call.caller, amount)?;
        host.escrow(call.caller, security_deposit)?;

        let position = Position {
            owner: to,
            validated: false,
            timestamp: call.now,
            total_expo,
            amount,
        };
        let pos_id = self.ticks.append_position(tick, position, penalty)?;
        self.add_long_expo(tick, penalty, total_expo)?;
        self.balance_long = checked_add(self.balance_long, amount)?;
        self.total_long_positions += 1;

        self.pending.push(PendingAction {
            user: call.caller,
            validator,
            to,
            timestamp: call.now,
            security_deposit,
            kind: PendingActionKind::Open {
                tick: pos_id.tick,
                tick_version: pos_id.tick_version,
                index: pos_id.index,
                amount,
            },
        });

        emit!(InitiatedOpenPosition {
            owner: to,
            validator,
            timestamp: call.now,
            total_expo,
            amount,
            start_price,
            tick: pos_id.tick,
            tick_version: pos_id.tick_version,
            index: pos_id.index,
        });
        Ok(pos_id)
    }

    /// Highest tick whose leverage at `start_price`, with the tick's own
    /// penalty, is within the maximum. Returns the tick, its penalty and
    /// the liquidation price.
    fn max_leverage_tick(&self, start_price: u128) -> Result<(i32, u8, u128)> {
        let spacing = self.config.tick_spacing;
        let current_penalty = self.config.liquidation_penalty;
        let target_liq_price = checked_sub(
            start_price,
            mul_div(start_price, LEVERAGE_SCALE, self.config.max_leverage, Rounding::Up)?,
        )?;
        let mut tick = (self.effective_tick_for_price(target_liq_price)?
            + (current_penalty as i32 + 1) * spacing)
            .min(max_usable_tick(spacing));
        loop {
            let penalty = self.ticks.tick_liquidation_penalty(tick, current_penalty);
            let liq_tick = tick - penalty as i32 * spacing;
            if liq_tick >= MIN_TICK {
                let liq_price = self.effective_price_for_tick(liq_tick)?;
                if liq_price < start_price
                    && leverage(start_price, liq_price)? <= self.config.max_leverage
                {
                    return Ok((tick, penalty, liq_price));
                }
            }
            tick -= spacing;
            require!(tick >= min_usable_tick(spacing), VaultLongError::TickOutOfBounds);
        }
    }

    /// Confirm a provisional position at the validation price. A position
    /// now above the maximum leverage moves to a lower tick.
    pub(crate) fn validate_open(&mut self, action: &PendingAction, price: PriceInfo) -> Result<()> {
        let PendingActionKind::Open { tick, tick_version, index, .. } = action.kind else {
            return Err(error!(VaultLongError::InvalidPendingAction));
        };
        if self.ticks.tick_version(tick) != tick_version {
            msg!("Position tick {} was liquidated before validation", tick);
            emit!(StalePendingActionRemoved {
                validator: action.validator,
                tick,
                tick_version,
                index,
            });
            return Ok(());
        }

        let pos_id = PositionId {
            tick,
            tick_version,
            index,
        };
        let start_price = self.start_price(price.price)?;
        let penalty = self
            .ticks
            .tick_liquidation_penalty(tick, self.config.liquidation_penalty);
        let liq_price = self.liquidation_price_for_tick(tick, penalty)?;
        let over_max = liq_price >= start_price
            || leverage(start_price, liq_price)? > self.config.max_leverage;

        let (new_id, total_expo) = if over_max {
            let (new_tick, new_penalty, new_liq_price) = self.max_leverage_tick(start_price)?;
            let (mut position, moved) = self.ticks.remove_position(&pos_id)?;
            self.on_position_moved(moved);
            self.remove_long_expo(tick, penalty, position.total_expo)?;

            position.total_expo = position_total_expo(position.amount, start_price, new_liq_price)?;
            position.validated = true;
            let new_id = self.ticks.append_position(new_tick, position, new_penalty)?;
            self.add_long_expo(new_tick, new_penalty, position.total_expo)?;

            emit!(LiquidationPriceUpdated {
                old_tick: pos_id.tick,
                old_tick_version: pos_id.tick_version,
                old_index: pos_id.index,
                new_tick: new_id.tick,
                new_tick_version: new_id.tick_version,
                new_index: new_id.index,
            });
            (new_id, position.total_expo)
        } else {
            let amount = self.ticks.position(&pos_id)?.amount;
            let total_expo = position_total_expo(amount, start_price, liq_price)?;
            let old_expo = self.ticks.set_position_expo(&pos_id, total_expo)?;
            self.ticks.position_mut(&pos_id)?.validated = true;
            self.remove_long_expo(tick, penalty, old_expo)?;
            self.add_long_expo(tick, penalty, total_expo)?;
            (pos_id, total_expo)
        };

        emit!(ValidatedOpenPosition {
            owner: action.to,
            validator: action.validator,
            total_expo,
            new_start_price: start_price,
            tick: new_id.tick,
            tick_version: new_id.tick_version,
            index: new_id.index,
        });
        Ok(())
    }

    /// Input checks of a close, run before the price is attested.
    pub(crate) fn check_close_inputs(
        &self,
        call: &Call,
        pos_id: &PositionId,
        amount_to_close: u128,
    ) -> Result<()> {
        require!(amount_to_close > 0, VaultLongError::ZeroAmount);
        let position = self.ticks.position(pos_id)?;
        require!(position.owner == call.caller, VaultLongError::Unauthorized);
        require!(position.validated, VaultLongError::PositionNotValidated);
        require!(
            amount_to_close <= position.amount,
            VaultLongError::AmountToCloseHigherThanPositionAmount
        );
        let remaining = position.amount - amount_to_close;
        if remaining > 0
            && remaining < self.config.min_long_position
            && position.owner != self.config.rebalancer
        {
            return Err(error!(VaultLongError::LongPositionTooSmall));
        }
        Ok(())
    }

    /// Take the closed part out of the tick and protocol aggregates, debit
    /// its current value from the long balance and queue the payout.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn initiate_close(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        pos_id: PositionId,
        amount_to_close: u128,
        min_price: u128,
        to: Pubkey,
        validator: Pubkey,
        price: PriceInfo,
    ) -> Result<()> {
        let close_price = self.close_price(price.price)?;
        require!(close_price >= min_price, VaultLongError::SlippageToleranceExceeded);

        let position = *self.ticks.position(&pos_id)?;
        let full_close = amount_to_close == position.amount;
        let total_expo_to_close = if full_close {
            position.total_expo
        } else {
            mul_div(position.total_expo, amount_to_close, position.amount, Rounding::Down)?
        };
        let penalty = self
            .ticks
            .tick_liquidation_penalty(pos_id.tick, self.config.liquidation_penalty);
        let liq_price = self.liquidation_price_for_tick(pos_id.tick, penalty)?;
        let value = position_value(close_price, liq_price, total_expo_to_close)?;
        let temp_transfer = clamp_to_u128(value, self.balance_long);

        self.check_close_imbalance(total_expo_to_close, temp_transfer)?;

        let security_deposit = self.config.security_deposit_value;
        host.escrow(call.caller, security_deposit)?;

        self.remove_long_expo(pos_id.tick, penalty, total_expo_to_close)?;
        if full_close {
            let (_, moved) = self.ticks.remove_position(&pos_id)?;
            self.total_long_positions -= 1;
            self.on_position_moved(moved);
        } else {
            self.ticks
                .reduce_position(&pos_id, amount_to_close, total_expo_to_close)?;
        }
        self.balance_long = checked_sub(self.balance_long, temp_transfer)?;

        self.pending.push(PendingAction {
            user: call.caller,
            validator,
            to,
            timestamp: call.now,
            security_deposit,
            kind: PendingActionKind::Close {
                tick: pos_id.tick,
                tick_version: pos_id.tick_version,
                index: pos_id.index,
                amount: amount_to_close,
                total_expo: total_expo_to_close,
                liquidation_penalty: penalty,
                liq_multiplier: self.liq_multiplier,
                temp_transfer,
            },
        });

        emit!(InitiatedClosePosition {
            owner: position.owner,
            validator,
            to,
            tick: pos_id.tick,
            tick_version: pos_id.tick_version,
            index: pos_id.index,
            original_amount: position.amount,
            amount_to_close,
            total_expo_remaining: position.total_expo - total_expo_to_close,
        });
        Ok(())
    }

    /// Pay out a close at the validation price, or settle it as a
    /// liquidation when its tick was liquidated or its trigger price hit.
    pub(crate) fn validate_close(
        &mut self,
        host: &mut dyn Host,
        action: &PendingAction,
        price: PriceInfo,
    ) -> Result<()> {
        let PendingActionKind::Close {
            tick,
            tick_version,
            index,
            amount,
            total_expo,
            liquidation_penalty,
            liq_multiplier,
            temp_transfer,
        } = action.kind
        else {
            return Err(error!(VaultLongError::InvalidPendingAction));
        };

        let trigger_price = mul_div(
            price_at_tick(tick)?,
            liq_multiplier,
            MULTIPLIER_SCALE,
            Rounding::Down,
        )?;
        if self.ticks.tick_version(tick) != tick_version || price.price <= trigger_price {
            self.balance_vault = checked_add(self.balance_vault, temp_transfer)?;
            emit!(LiquidatedPosition {
                validator: action.validator,
                tick,
                tick_version,
                index,
                price: price.price,
                effective_tick_price: trigger_price,
            });
            return Ok(());
        }

        let close_price = self.close_price(price.price)?;
        let liq_price = mul_div(
            price_at_tick(tick - liquidation_penalty as i32 * self.config.tick_spacing)?,
            liq_multiplier,
            MULTIPLIER_SCALE,
            Rounding::Down,
        )?;
        let value = position_value(close_price, liq_price, total_expo)?;
        let payout = clamp_to_u128(value, checked_add(self.balance_long, temp_transfer)?)
            .min(checked_add(temp_transfer, self.balance_vault)?);
        if payout >= temp_transfer {
            self.balance_vault -= payout - temp_transfer;
        } else {
            self.balance_vault = checked_add(self.balance_vault, temp_transfer - payout)?;
        }

        host.push(action.to, payout)?;

        emit!(ValidatedClosePosition {
            validator: action.validator,
            to: action.to,
            tick,
            tick_version,
            index,
            amount_received: payout,
            profit: checked_sub_signed(to_i128(payout)?, to_i128(amount)?)?,
        });
        Ok(())
    }
}
