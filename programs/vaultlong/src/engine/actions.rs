use anchor_lang::prelude::*;
use crate::{
    constants::MAX_LIQUIDATION_ITERATION,
    engine::{Call, Host, PreviousActionsData},
    events::*,
    state::*,
    utils::*,
    VaultLongError,
};

impl Protocol {
    fn check_initiate(&self, call: &Call, to: Pubkey, validator: Pubkey, deadline: i64) -> Result<()> {
        require!(to != Pubkey::default(), VaultLongError::InvalidAddressTo);
        require!(validator != Pubkey::default(), VaultLongError::InvalidAddressValidator);
        require!(call.now <= deadline, VaultLongError::DeadlineExceeded);
        require!(
            call.value >= self.config.security_deposit_value,
            VaultLongError::SecurityDepositTooLow
        );
        Ok(())
    }

    /// Make room for a new action of `validator`. A stale open is dropped
    /// and its deposit refunded, anything else is in the way.
    fn free_pending_slot(&mut self, host: &mut dyn Host, validator: &Pubkey) -> Result<()> {
        let Some((raw, action)) = self
            .pending
            .find_by_validator(validator)
            .map(|(raw, action)| (raw, action.clone()))
        else {
            return Ok(());
        };
        match action.kind {
            PendingActionKind::Open { tick, tick_version, index, .. }
                if self.ticks.tick_version(tick) != tick_version =>
            {
                self.pending.remove(raw);
                host.release(action.validator, action.security_deposit)?;
                emit!(StalePendingActionRemoved {
                    validator: action.validator,
                    tick,
                    tick_version,
                    index,
                });
                Ok(())
            }
            _ => Err(error!(VaultLongError::PendingActionExists)),
        }
    }

    /// Pending action of `validator` that `call` may validate.
    fn own_pending_action(&self, call: &Call, validator: &Pubkey) -> Result<u128> {
        let (raw, action) = self
            .pending
            .find_by_validator(validator)
            .ok_or(error!(VaultLongError::NoPendingAction))?;
        if call.caller != action.validator {
            require!(
                action.is_actionable(call.now, self.config.validation_deadline),
                VaultLongError::Unauthorized
            );
        }
        Ok(raw)
    }

    /// Validate the pending action at `raw`. Returns false, keeping the
    /// action, while liquidations are pending.
    fn validate_pending(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        raw: u128,
        price_data: &[u8],
    ) -> Result<bool> {
        let action = self
            .pending
            .get(raw)
            .cloned()
            .ok_or(error!(VaultLongError::NoPendingAction))?;
        let target_timestamp = action.timestamp.saturating_add(self.config.validation_delay);
        let price = host.attest(action.validate_action(), target_timestamp, price_data)?;
        let outcome =
            self.apply_pnl_and_liquidate(price.price, price.timestamp, self.config.liquidation_iteration)?;
        if outcome.is_liquidation_pending {
            return Ok(false);
        }

        self.pending.remove(raw);
        match action.kind {
            PendingActionKind::Open { .. } => self.validate_open(&action, price)?,
            PendingActionKind::Close { .. } => self.validate_close(host, &action, price)?,
            PendingActionKind::Deposit { .. } => self.validate_deposit_inner(host, &action, price)?,
            PendingActionKind::Withdrawal { .. } => {
                self.validate_withdrawal_inner(host, &action, price)?
            }
        }

        // Whoever validates collects the deposit
        let receiver = call.caller;
        host.release(receiver, action.security_deposit)?;
        emit!(SecurityDepositRefunded {
            pending_user: action.validator,
            receiver,
            amount: action.security_deposit,
        });
        Ok(true)
    }

    /// Validate at most one actionable pending action named in `previous`.
    fn validate_previous_action(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        previous: &PreviousActionsData,
    ) -> Result<bool> {
        let actionable = self
            .pending
            .actionable(&call.caller, call.now, self.config.validation_deadline);
        for (raw, _) in actionable {
            let Some(i) = previous.raw_indices.iter().position(|hint| *hint == raw) else {
                continue;
            };
            let Some(price_data) = previous.price_data.get(i) else {
                continue;
            };
            return self.validate_pending(host, call, raw, price_data);
        }
        Ok(false)
    }

    /// Seed the vault and open the first long. Runs once, right after the
    /// account is created.
    #[allow(clippy::too_many_arguments)]
    pub fn initialize(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        deposit_amount: u128,
        long_amount: u128,
        desired_liq_price: u128,
        price_data: &[u8],
    ) -> Result<PositionId> {
        self.non_reentrant(|p| {
            require!(deposit_amount > 0 && long_amount > 0, VaultLongError::ZeroAmount);
            require!(
                p.last_update_timestamp == 0 && p.total_expo == 0,
                VaultLongError::Unauthorized
            );
            require!(
                long_amount >= p.config.min_long_position,
                VaultLongError::LongPositionTooSmall
            );
            let price = host.attest(ProtocolAction::Initialize, call.now, price_data)?;
            p.last_price = price.price;
            p.last_update_timestamp = price.timestamp;

            host.pull(call.caller, deposit_amount)?;
            p.balance_vault = deposit_amount;
            host.mint(call.caller, asset_to_stable_at_price(deposit_amount, price.price)?)?;

            let (tick, penalty) = p.tick_for_liquidation_price(desired_liq_price)?;
            let liq_price = p.liquidation_price_for_tick(tick, penalty)?;
            let leverage = leverage(price.price, liq_price)?;
            require!(leverage >= p.config.min_leverage, VaultLongError::LeverageTooLow);
            require!(leverage <= p.config.max_leverage, VaultLongError::LeverageTooHigh);
            let total_expo = position_total_expo(long_amount, price.price, liq_price)?;

            host.pull(call.caller, long_amount)?;
            let position = Position {
                owner: call.caller,
                validated: true,
                timestamp: call.now,
                total_expo,
                amount: long_amount,
            };
            let pos_id = p.ticks.append_position(tick, position, penalty)?;
            p.add_long_expo(tick, penalty, total_expo)?;
            p.balance_long = long_amount;
            p.total_long_positions = 1;

            msg!(
                "Initialized with vault {} and long {} at tick {}",
                deposit_amount,
                long_amount,
                tick
            );
            Ok(pos_id)
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn initiate_open_position(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        amount: u128,
        desired_liq_price: u128,
        to: Pubkey,
        validator: Pubkey,
        deadline: i64,
        price_data: &[u8],
        previous: &PreviousActionsData,
    ) -> Result<(bool, PositionId)> {
        self.non_reentrant(|p| {
            require!(amount > 0, VaultLongError::ZeroAmount);
            p.check_initiate(call, to, validator, deadline)?;
            require!(
                amount >= p.config.min_long_position,
                VaultLongError::LongPositionTooSmall
            );
            p.free_pending_slot(host, &validator)?;

            let price = host.attest(ProtocolAction::InitiateOpenPosition, call.now, price_data)?;
            let outcome =
                p.apply_pnl_and_liquidate(price.price, price.timestamp, p.config.liquidation_iteration)?;
            if outcome.is_liquidation_pending {
                return Ok((false, PositionId::none()));
            }

            let pos_id = p.initiate_open(host, call, amount, desired_liq_price, to, validator, price)?;
            p.validate_previous_action(host, call, previous)?;
            Ok((true, pos_id))
        })
    }

    pub fn validate_open_position(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        validator: Pubkey,
        price_data: &[u8],
        previous: &PreviousActionsData,
    ) -> Result<bool> {
        self.validate_own_action(host, call, validator, price_data, previous, |kind| {
            matches!(kind, PendingActionKind::Open { .. })
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn initiate_close_position(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        pos_id: PositionId,
        amount_to_close: u128,
        min_price: u128,
        to: Pubkey,
        validator: Pubkey,
        deadline: i64,
        price_data: &[u8],
        previous: &PreviousActionsData,
    ) -> Result<bool> {
        self.non_reentrant(|p| {
            p.check_close_inputs(call, &pos_id, amount_to_close)?;
            p.check_initiate(call, to, validator, deadline)?;
            p.free_pending_slot(host, &validator)?;

            let price = host.attest(ProtocolAction::InitiateClosePosition, call.now, price_data)?;
            let outcome =
                p.apply_pnl_and_liquidate(price.price, price.timestamp, p.config.liquidation_iteration)?;
            if outcome.is_liquidation_pending || p.ticks.tick_version(pos_id.tick) != pos_id.tick_version {
                msg!("Close of position at tick {} was not initiated", pos_id.tick);
                return Ok(false);
            }

            p.initiate_close(host, call, pos_id, amount_to_close, min_price, to, validator, price)?;
            p.validate_previous_action(host, call, previous)?;
            Ok(true)
        })
    }

    pub fn validate_close_position(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        validator: Pubkey,
        price_data: &[u8],
        previous: &PreviousActionsData,
    ) -> Result<bool> {
        self.validate_own_action(host, call, validator, price_data, previous, |kind| {
            matches!(kind, PendingActionKind::Close { .. })
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn initiate_deposit(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        amount: u128,
        to: Pubkey,
        validator: Pubkey,
        deadline: i64,
        price_data: &[u8],
        previous: &PreviousActionsData,
    ) -> Result<bool> {
        self.non_reentrant(|p| {
            require!(amount > 0, VaultLongError::ZeroAmount);
            p.check_initiate(call, to, validator, deadline)?;
            p.free_pending_slot(host, &validator)?;

            let price = host.attest(ProtocolAction::InitiateDeposit, call.now, price_data)?;
            let outcome =
                p.apply_pnl_and_liquidate(price.price, price.timestamp, p.config.liquidation_iteration)?;
            if outcome.is_liquidation_pending {
                return Ok(false);
            }

            p.initiate_deposit_inner(host, call, amount, to, validator, price)?;
            p.validate_previous_action(host, call, previous)?;
            Ok(true)
        })
    }

    pub fn validate_deposit(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        validator: Pubkey,
        price_data: &[u8],
        previous: &PreviousActionsData,
    ) -> Result<bool> {
        self.validate_own_action(host, call, validator, price_data, previous, |kind| {
            matches!(kind, PendingActionKind::Deposit { .. })
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn initiate_withdrawal(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        shares: u128,
        to: Pubkey,
        validator: Pubkey,
        deadline: i64,
        price_data: &[u8],
        previous: &PreviousActionsData,
    ) -> Result<bool> {
        self.non_reentrant(|p| {
            require!(shares > 0, VaultLongError::ZeroAmount);
            p.check_initiate(call, to, validator, deadline)?;
            p.free_pending_slot(host, &validator)?;

            let price = host.attest(ProtocolAction::InitiateWithdrawal, call.now, price_data)?;
            let outcome =
                p.apply_pnl_and_liquidate(price.price, price.timestamp, p.config.liquidation_iteration)?;
            if outcome.is_liquidation_pending {
                return Ok(false);
            }

            p.initiate_withdrawal_inner(host, call, shares, to, validator, price)?;
            p.validate_previous_action(host, call, previous)?;
            Ok(true)
        })
    }

    pub fn validate_withdrawal(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        validator: Pubkey,
        price_data: &[u8],
        previous: &PreviousActionsData,
    ) -> Result<bool> {
        self.validate_own_action(host, call, validator, price_data, previous, |kind| {
            matches!(kind, PendingActionKind::Withdrawal { .. })
        })
    }

    fn validate_own_action(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        validator: Pubkey,
        price_data: &[u8],
        previous: &PreviousActionsData,
        expected: fn(&PendingActionKind) -> bool,
    ) -> Result<bool> {
        self.non_reentrant(|p| {
            let raw = p.own_pending_action(call, &validator)?;
            let kind_matches = p.pending.get(raw).map(|a| expected(&a.kind)).unwrap_or(false);
            require!(kind_matches, VaultLongError::InvalidPendingAction);

            let validated = p.validate_pending(host, call, raw, price_data)?;
            if validated {
                p.validate_previous_action(host, call, previous)?;
            }
            Ok(validated)
        })
    }

    /// Validate up to `max_validations` actionable pending actions named in
    /// `previous`. Returns how many were validated.
    pub fn validate_actionable_pending_actions(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        previous: &PreviousActionsData,
        max_validations: u16,
    ) -> Result<u16> {
        self.non_reentrant(|p| {
            let mut validated = 0;
            while validated < max_validations && p.validate_previous_action(host, call, previous)? {
                validated += 1;
            }
            Ok(validated)
        })
    }

    /// Liquidate up to `iterations` ticks at the attested price and reward
    /// the caller when at least one tick was liquidated.
    pub fn liquidate(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        price_data: &[u8],
        iterations: u16,
    ) -> Result<u16> {
        self.non_reentrant(|p| {
            let price = host.attest(ProtocolAction::Liquidation, call.now, price_data)?;
            let iterations = iterations.clamp(1, MAX_LIQUIDATION_ITERATION);
            let outcome = p.apply_pnl_and_liquidate(price.price, price.timestamp, iterations)?;
            if outcome.liquidated_ticks == 0 {
                return Ok(0);
            }

            let reward = checked_add(
                p.config.liquidation_reward_base,
                p.config
                    .liquidation_reward_per_tick
                    .checked_mul(outcome.liquidated_ticks as u128)
                    .ok_or(error!(VaultLongError::MathOverflow))?,
            )?
            .min(p.balance_vault);
            p.balance_vault -= reward;
            host.push(call.caller, reward)?;
            emit!(LiquidatorRewarded {
                liquidator: call.caller,
                reward,
            });
            Ok(outcome.liquidated_ticks)
        })
    }
}
