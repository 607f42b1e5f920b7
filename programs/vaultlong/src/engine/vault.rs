use anchor_lang::prelude::*;
use crate::{
    engine::{funding::vault_asset_available, Call, Host, PriceInfo},
    events::*,
    state::*,
    utils::*,
    VaultLongError,
};

impl Protocol {
    pub fn balance_snapshot(&self, price: u128, stable_supply: u128) -> BalanceSnapshot {
        BalanceSnapshot {
            asset_price: price,
            total_expo: self.total_expo,
            balance_vault: self.balance_vault,
            balance_long: self.balance_long,
            stable_supply,
        }
    }

    pub(crate) fn initiate_deposit_inner(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        amount: u128,
        to: Pubkey,
        validator: Pubkey,
        price: PriceInfo,
    ) -> Result<()> {
        self.check_deposit_imbalance(amount)?;
        let snapshot = self.balance_snapshot(price.price, host.total_supply()?);

        let security_deposit = self.config.security_deposit_value;
        host.pull(call.caller, amount)?;
        host.escrow(call.caller, security_deposit)?;

        self.pending_balance_vault = checked_add_signed(self.pending_balance_vault, to_i128(amount)?)?;
        self.pending.push(PendingAction {
            user: call.caller,
            validator,
            to,
            timestamp: call.now,
            security_deposit,
            kind: PendingActionKind::Deposit { amount, snapshot },
        });

        emit!(InitiatedDeposit {
            to,
            validator,
            amount,
            timestamp: call.now,
        });
        Ok(())
    }

    /// Mint against the larger of the vault values at the initiation and the
    /// validation price.
    pub(crate) fn validate_deposit_inner(
        &mut self,
        host: &mut dyn Host,
        action: &PendingAction,
        price: PriceInfo,
    ) -> Result<()> {
        let PendingActionKind::Deposit { amount, snapshot } = action.kind else {
            return Err(error!(VaultLongError::InvalidPendingAction));
        };
        let amount_after_fees = checked_sub(amount, bps_of(amount, self.config.vault_fee_bps)?)?;
        let available = vault_asset_available(&snapshot, snapshot.asset_price)?
            .max(vault_asset_available(&snapshot, price.price)?);
        let minted = if snapshot.stable_supply == 0 || available == 0 {
            asset_to_stable_at_price(amount_after_fees, price.price)?
        } else {
            mul_div(amount_after_fees, snapshot.stable_supply, available, Rounding::Down)?
        };

        self.pending_balance_vault = checked_sub_signed(self.pending_balance_vault, to_i128(amount)?)?;
        self.balance_vault = checked_add(self.balance_vault, amount)?;
        host.mint(action.to, minted)?;

        emit!(ValidatedDeposit {
            to: action.to,
            validator: action.validator,
            amount_deposited: amount,
            stable_minted: minted,
            timestamp: price.timestamp,
        });
        Ok(())
    }

    pub(crate) fn initiate_withdrawal_inner(
        &mut self,
        host: &mut dyn Host,
        call: &Call,
        shares: u128,
        to: Pubkey,
        validator: Pubkey,
        price: PriceInfo,
    ) -> Result<()> {
        let supply = host.total_supply()?;
        require!(shares <= supply, VaultLongError::InsufficientStableSupply);
        let pending_value = mul_div(shares, self.balance_vault, supply, Rounding::Down)?;
        self.check_withdrawal_imbalance(pending_value)?;
        let snapshot = self.balance_snapshot(price.price, supply);

        let security_deposit = self.config.security_deposit_value;
        host.lock(call.caller, shares)?;
        host.escrow(call.caller, security_deposit)?;

        self.pending_balance_vault =
            checked_sub_signed(self.pending_balance_vault, to_i128(pending_value)?)?;
        self.pending.push(PendingAction {
            user: call.caller,
            validator,
            to,
            timestamp: call.now,
            security_deposit,
            kind: PendingActionKind::Withdrawal {
                shares,
                pending_value,
                snapshot,
            },
        });

        emit!(InitiatedWithdrawal {
            to,
            validator,
            shares,
            timestamp: call.now,
        });
        Ok(())
    }

    /// Redeem against the smaller of the vault values at the initiation and
    /// the validation price.
    pub(crate) fn validate_withdrawal_inner(
        &mut self,
        host: &mut dyn Host,
        action: &PendingAction,
        price: PriceInfo,
    ) -> Result<()> {
        let PendingActionKind::Withdrawal {
            shares,
            pending_value,
            snapshot,
        } = action.kind
        else {
            return Err(error!(VaultLongError::InvalidPendingAction));
        };
        let available = vault_asset_available(&snapshot, snapshot.asset_price)?
            .min(vault_asset_available(&snapshot, price.price)?);
        let asset = mul_div(shares, available, snapshot.stable_supply, Rounding::Down)?;
        let withdrawn = checked_sub(asset, bps_of(asset, self.config.vault_fee_bps)?)?
            .min(self.balance_vault);

        self.pending_balance_vault =
            checked_add_signed(self.pending_balance_vault, to_i128(pending_value)?)?;
        self.balance_vault -= withdrawn;
        host.burn_locked(shares)?;
        host.push(action.to, withdrawn)?;

        emit!(ValidatedWithdrawal {
            to: action.to,
            validator: action.validator,
            amount_withdrawn: withdrawn,
            shares_burned: shares,
            timestamp: price.timestamp,
        });
        Ok(())
    }
}
