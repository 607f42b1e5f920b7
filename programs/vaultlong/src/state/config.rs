use anchor_lang::prelude::*;
use crate::{constants::*, VaultLongError};

/// Risk and fee parameters, fixed at initialization.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProtocolConfig {
    // Distance between two usable ticks
    pub tick_spacing: i32,

    // Leverage bounds (21 decimals)
    pub min_leverage: u128,
    pub max_leverage: u128,

    // Number of tick spacings between the liquidation price and the trigger price
    pub liquidation_penalty: u8,

    // Minimum distance between the current price and a new trigger price
    pub safety_margin_bps: u16,

    // Ticks liquidated at most by the liquidation step of an action
    pub liquidation_iteration: u16,

    pub position_fee_bps: u16,
    pub vault_fee_bps: u16,

    // Funding scale factor (3 decimals) and EMA period in seconds
    pub funding_sf: u128,
    pub ema_period: i64,

    // Imbalance limits in basis points, 0 disables the check
    pub open_expo_imbalance_limit_bps: i64,
    pub deposit_expo_imbalance_limit_bps: i64,
    pub withdrawal_expo_imbalance_limit_bps: i64,
    pub close_expo_imbalance_limit_bps: i64,

    // Smallest collateral for a new position or what remains after a partial close
    pub min_long_position: u128,

    // Lamports escrowed per pending action
    pub security_deposit_value: u64,

    // Oracle observation rules
    pub validation_delay: i64,
    pub price_max_age: i64,

    // Seconds after which anyone can validate a pending action
    pub validation_deadline: i64,

    // Liquidation reward, in asset units
    pub liquidation_reward_base: u128,
    pub liquidation_reward_per_tick: u128,

    // Exempt from the minimum remaining position size on close
    pub rebalancer: Pubkey,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig {
            tick_spacing: 100,
            min_leverage: LEVERAGE_SCALE + 1_000_000_000_000,
            max_leverage: 10 * LEVERAGE_SCALE,
            liquidation_penalty: 2,
            safety_margin_bps: 200,
            liquidation_iteration: 3,
            position_fee_bps: 4,
            vault_fee_bps: 4,
            funding_sf: 12,
            ema_period: 5 * SECONDS_PER_DAY,
            open_expo_imbalance_limit_bps: 500,
            deposit_expo_imbalance_limit_bps: 500,
            withdrawal_expo_imbalance_limit_bps: 600,
            close_expo_imbalance_limit_bps: 600,
            min_long_position: 10_000_000,
            security_deposit_value: 50_000_000,
            validation_delay: 24,
            price_max_age: 60,
            validation_deadline: 1_200,
            liquidation_reward_base: 1_000_000,
            liquidation_reward_per_tick: 100_000,
            rebalancer: Pubkey::default(),
        }
    }
}

/// Optional overrides passed to `initialize`. Unset fields keep their default.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub tick_spacing: Option<i32>,
    pub min_leverage: Option<u128>,
    pub max_leverage: Option<u128>,
    pub liquidation_penalty: Option<u8>,
    pub safety_margin_bps: Option<u16>,
    pub liquidation_iteration: Option<u16>,
    pub position_fee_bps: Option<u16>,
    pub vault_fee_bps: Option<u16>,
    pub funding_sf: Option<u128>,
    pub ema_period: Option<i64>,
    pub open_expo_imbalance_limit_bps: Option<i64>,
    pub deposit_expo_imbalance_limit_bps: Option<i64>,
    pub withdrawal_expo_imbalance_limit_bps: Option<i64>,
    pub close_expo_imbalance_limit_bps: Option<i64>,
    pub min_long_position: Option<u128>,
    pub security_deposit_value: Option<u64>,
    pub validation_delay: Option<i64>,
    pub price_max_age: Option<i64>,
    pub validation_deadline: Option<i64>,
    pub liquidation_reward_base: Option<u128>,
    pub liquidation_reward_per_tick: Option<u128>,
    pub rebalancer: Option<Pubkey>,
}

impl ProtocolConfig {
    pub fn with_overrides(overrides: ConfigOverrides) -> Result<Self> {
        let d = ProtocolConfig::default();
        let config = ProtocolConfig {
            tick_spacing: overrides.tick_spacing.unwrap_or(d.tick_spacing),
            min_leverage: overrides.min_leverage.unwrap_or(d.min_leverage),
            max_leverage: overrides.max_leverage.unwrap_or(d.max_leverage),
            liquidation_penalty: overrides.liquidation_penalty.unwrap_or(d.liquidation_penalty),
            safety_margin_bps: overrides.safety_margin_bps.unwrap_or(d.safety_margin_bps),
            liquidation_iteration: overrides.liquidation_iteration.unwrap_or(d.liquidation_iteration),
            position_fee_bps: overrides.position_fee_bps.unwrap_or(d.position_fee_bps),
            vault_fee_bps: overrides.vault_fee_bps.unwrap_or(d.vault_fee_bps),
            funding_sf: overrides.funding_sf.unwrap_or(d.funding_sf),
            ema_period: overrides.ema_period.unwrap_or(d.ema_period),
            open_expo_imbalance_limit_bps: overrides
                .open_expo_imbalance_limit_bps
                .unwrap_or(d.open_expo_imbalance_limit_bps),
            deposit_expo_imbalance_limit_bps: overrides
                .deposit_expo_imbalance_limit_bps
                .unwrap_or(d.deposit_expo_imbalance_limit_bps),
            withdrawal_expo_imbalance_limit_bps: overrides
                .withdrawal_expo_imbalance_limit_bps
                .unwrap_or(d.withdrawal_expo_imbalance_limit_bps),
            close_expo_imbalance_limit_bps: overrides
                .close_expo_imbalance_limit_bps
                .unwrap_or(d.close_expo_imbalance_limit_bps),
            min_long_position: overrides.min_long_position.unwrap_or(d.min_long_position),
            security_deposit_value: overrides.security_deposit_value.unwrap_or(d.security_deposit_value),
            validation_delay: overrides.validation_delay.unwrap_or(d.validation_delay),
            price_max_age: overrides.price_max_age.unwrap_or(d.price_max_age),
            validation_deadline: overrides.validation_deadline.unwrap_or(d.validation_deadline),
            liquidation_reward_base: overrides.liquidation_reward_base.unwrap_or(d.liquidation_reward_base),
            liquidation_reward_per_tick: overrides
                .liquidation_reward_per_tick
                .unwrap_or(d.liquidation_reward_per_tick),
            rebalancer: overrides.rebalancer.unwrap_or(d.rebalancer),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        require!(
            self.tick_spacing > 0 && self.tick_spacing <= 10_000,
            VaultLongError::InvalidConfig
        );
        require!(self.min_leverage > LEVERAGE_SCALE, VaultLongError::InvalidConfig);
        require!(self.max_leverage > self.min_leverage, VaultLongError::InvalidConfig);
        require!(
            self.max_leverage <= 100 * LEVERAGE_SCALE,
            VaultLongError::InvalidConfig
        );
        require!(
            (self.liquidation_penalty as i32) * self.tick_spacing <= 15_000,
            VaultLongError::InvalidConfig
        );
        require!(
            (self.safety_margin_bps as u128) < BPS_DIVISOR,
            VaultLongError::InvalidConfig
        );
        require!(
            self.liquidation_iteration > 0
                && self.liquidation_iteration <= MAX_LIQUIDATION_ITERATION,
            VaultLongError::InvalidConfig
        );
        require!(
            self.position_fee_bps <= 2_000 && self.vault_fee_bps <= 2_000,
            VaultLongError::InvalidConfig
        );
        require!(self.ema_period > 0, VaultLongError::InvalidConfig);
        require!(
            self.open_expo_imbalance_limit_bps >= 0
                && self.deposit_expo_imbalance_limit_bps >= 0
                && self.withdrawal_expo_imbalance_limit_bps >= 0
                && self.close_expo_imbalance_limit_bps >= 0,
            VaultLongError::InvalidConfig
        );
        require!(
            self.validation_delay >= 0 && self.price_max_age > 0,
            VaultLongError::InvalidConfig
        );
        require!(
            self.validation_deadline > self.validation_delay,
            VaultLongError::InvalidConfig
        );
        Ok(())
    }
}
