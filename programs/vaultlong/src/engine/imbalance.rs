use anchor_lang::prelude::*;
use crate::{constants::BPS_DIVISOR, state::Protocol, utils::*, VaultLongError};

/// `(numerator * 10000) / denominator`, maximal for an empty denominator.
fn imbalance_bps(numerator: i128, denominator: i128) -> Result<i128> {
    if denominator <= 0 {
        return Ok(i128::MAX);
    }
    numerator
        .checked_mul(BPS_DIVISOR as i128)
        .map(|v| v / denominator)
        .ok_or(error!(VaultLongError::MathOverflow))
}

fn check_limit(imbalance: i128, limit_bps: i64) -> Result<()> {
    if limit_bps == 0 {
        return Ok(());
    }
    if imbalance > limit_bps as i128 {
        msg!("Imbalance {} bps over the {} bps limit", imbalance, limit_bps);
        return Err(error!(VaultLongError::ImbalanceLimitReached).with_values((imbalance, limit_bps)));
    }
    Ok(())
}

impl Protocol {
    fn vault_expo(&self) -> Result<i128> {
        checked_add_signed(to_i128(self.balance_vault)?, self.pending_balance_vault)
    }

    fn long_expo(&self) -> Result<i128> {
        checked_sub_signed(to_i128(self.total_expo)?, to_i128(self.balance_long)?)
    }

    pub fn check_open_imbalance(&self, open_total_expo: u128, open_amount: u128) -> Result<()> {
        let limit = self.config.open_expo_imbalance_limit_bps;
        if limit == 0 {
            return Ok(());
        }
        let vault_expo = self.vault_expo()?;
        let long_expo = checked_sub_signed(
            checked_add_signed(to_i128(self.total_expo)?, to_i128(open_total_expo)?)?,
            checked_add_signed(to_i128(self.balance_long)?, to_i128(open_amount)?)?,
        )?;
        let imbalance = imbalance_bps(checked_sub_signed(long_expo, vault_expo)?, vault_expo)?;
        check_limit(imbalance, limit)
    }

    pub fn check_close_imbalance(&self, close_total_expo: u128, close_value: u128) -> Result<()> {
        let limit = self.config.close_expo_imbalance_limit_bps;
        if limit == 0 {
            return Ok(());
        }
        let vault_expo = self.vault_expo()?;
        let long_expo = checked_sub_signed(
            checked_sub_signed(to_i128(self.total_expo)?, to_i128(close_total_expo)?)?,
            checked_sub_signed(to_i128(self.balance_long)?, to_i128(close_value)?)?,
        )?;
        let imbalance = imbalance_bps(checked_sub_signed(vault_expo, long_expo)?, long_expo)?;
        check_limit(imbalance, limit)
    }

    pub fn check_deposit_imbalance(&self, deposit_value: u128) -> Result<()> {
        let limit = self.config.deposit_expo_imbalance_limit_bps;
        if limit == 0 {
            return Ok(());
        }
        let vault_expo = checked_add_signed(self.vault_expo()?, to_i128(deposit_value)?)?;
        let long_expo = self.long_expo()?;
        let imbalance = imbalance_bps(checked_sub_signed(vault_expo, long_expo)?, long_expo)?;
        check_limit(imbalance, limit)
    }

    pub fn check_withdrawal_imbalance(&self, withdrawal_value: u128) -> Result<()> {
        let limit = self.config.withdrawal_expo_imbalance_limit_bps;
        if limit == 0 {
            return Ok(());
        }
        let vault_expo = checked_sub_signed(self.vault_expo()?, to_i128(withdrawal_value)?)?;
        let long_expo = self.long_expo()?;
        let imbalance = imbalance_bps(checked_sub_signed(long_expo, vault_expo)?, vault_expo)?;
        check_limit(imbalance, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{state::ProtocolConfig, tests::error_code};
    use anchor_lang::error::{ComparedValues, Error};

    const UNIT: u128 = 1_000_000_000;

    fn protocol() -> Protocol {
        let mut protocol = Protocol::new(ProtocolConfig::default());
        protocol.balance_vault = 10 * UNIT;
        protocol.balance_long = 5 * UNIT;
        protocol.total_expo = 15 * UNIT;
        protocol
    }

    fn compared_values(err: Error) -> Option<[String; 2]> {
        match err {
            Error::AnchorError(e) => match e.compared_values {
                Some(ComparedValues::Values((lhs, rhs))) => Some([lhs, rhs]),
                _ => None,
            },
            _ => None,
        }
    }

    #[test]
    fn open_at_the_limit_is_admitted() {
        let protocol = protocol();
        // long expo 10 -> 10.5 against a vault of 10 is exactly 500 bps
        assert!(protocol.check_open_imbalance(UNIT, UNIT / 2).is_ok());
        let err = protocol.check_open_imbalance(UNIT + 1_000_000, UNIT / 2).unwrap_err();
        assert_eq!(error_code(&err), u32::from(VaultLongError::ImbalanceLimitReached));
        assert_eq!(
            compared_values(err),
            Some(["501".to_string(), "500".to_string()])
        );
    }

    #[test]
    fn pending_vault_balance_counts_as_vault_expo() {
        let mut protocol = protocol();
        protocol.pending_balance_vault = -(UNIT as i128);
        assert!(protocol.check_open_imbalance(UNIT, UNIT / 2).is_err());
        protocol.pending_balance_vault = UNIT as i128;
        assert!(protocol.check_open_imbalance(UNIT, UNIT / 2).is_ok());
    }

    #[test]
    fn deposit_and_withdrawal_directions() {
        let protocol = protocol();
        // vault 10.5 against long 10
        assert!(protocol.check_deposit_imbalance(UNIT / 2).is_ok());
        assert!(protocol.check_deposit_imbalance(UNIT / 2 + 1_000_000).is_err());
        // long 10 against vault 9.4339..: just under 600 bps
        assert!(protocol.check_withdrawal_imbalance(566_037_735).is_ok());
        assert!(protocol.check_withdrawal_imbalance(600_000_000).is_err());
    }

    #[test]
    fn draining_a_side_is_maximal_imbalance() {
        let protocol = protocol();
        assert!(protocol.check_withdrawal_imbalance(10 * UNIT).is_err());
        assert!(protocol.check_close_imbalance(15 * UNIT, 5 * UNIT).is_err());
    }

    #[test]
    fn zero_limit_disables_the_check() {
        let mut protocol = protocol();
        protocol.config.close_expo_imbalance_limit_bps = 0;
        assert!(protocol.check_close_imbalance(15 * UNIT, 5 * UNIT).is_ok());
    }
}
