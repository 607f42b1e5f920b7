use anchor_lang::prelude::*;

mod constants;
mod engine;
mod error;
mod events;
mod instructions;
mod state;
mod utils;

pub use constants::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use instructions::*;
pub use state::*;
pub use utils::*;

#[cfg(test)]
mod tests;

declare_id!("5Ltz3Bq9oWXyq4RDa4vHsAeM2VcEfS2Lfv8tZ2A3zJmP");

#[program]
pub mod vaultlong {
    use super::*;

    pub fn initialize<'info>(
        ctx: Context<'_, '_, '_, 'info, Initialize<'info>>,
        params: InitializeParams,
    ) -> Result<PositionId> {
        instructions::initialize::handle_initialize(ctx, params)
    }

    pub fn publish_price(ctx: Context<PublishPrice>, price: u128) -> Result<()> {
        instructions::publish_price::handle_publish_price(ctx, price)
    }

    pub fn initiate_open_position<'info>(
        ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
        params: InitiateOpenPositionParams,
    ) -> Result<InitiateOpenPositionResult> {
        instructions::open_position::handle_initiate_open_position(ctx, params)
    }

    pub fn validate_open_position<'info>(
        ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
        params: ValidateActionParams,
    ) -> Result<bool> {
        instructions::open_position::handle_validate_open_position(ctx, params)
    }

    pub fn initiate_close_position<'info>(
        ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
        params: InitiateClosePositionParams,
    ) -> Result<bool> {
        instructions::close_position::handle_initiate_close_position(ctx, params)
    }

    pub fn validate_close_position<'info>(
        ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
        params: ValidateActionParams,
    ) -> Result<bool> {
        instructions::close_position::handle_validate_close_position(ctx, params)
    }

    pub fn initiate_deposit<'info>(
        ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
        params: InitiateVaultActionParams,
    ) -> Result<bool> {
        instructions::deposit::handle_initiate_deposit(ctx, params)
    }

    pub fn validate_deposit<'info>(
        ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
        params: ValidateActionParams,
    ) -> Result<bool> {
        instructions::deposit::handle_validate_deposit(ctx, params)
    }

    pub fn initiate_withdrawal<'info>(
        ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
        params: InitiateVaultActionParams,
    ) -> Result<bool> {
        instructions::withdrawal::handle_initiate_withdrawal(ctx, params)
    }

    pub fn validate_withdrawal<'info>(
        ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
        params: ValidateActionParams,
    ) -> Result<bool> {
        instructions::withdrawal::handle_validate_withdrawal(ctx, params)
    }

    pub fn validate_actionable_pending_actions<'info>(
        ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
        previous_actions: PreviousActionsData,
        max_validations: u16,
    ) -> Result<u16> {
        instructions::liquidate::handle_validate_actionable_pending_actions(
            ctx,
            previous_actions,
            max_validations,
        )
    }

    pub fn liquidate<'info>(
        ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
        price_data: Vec<u8>,
        iterations: u16,
    ) -> Result<u16> {
        instructions::liquidate::handle_liquidate(ctx, price_data, iterations)
    }
}
