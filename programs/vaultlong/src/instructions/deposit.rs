use anchor_lang::prelude::*;
use crate::{
    engine::PreviousActionsData,
    instructions::{UserAction, ValidateActionParams},
};

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug)]
pub struct InitiateVaultActionParams {
    // Asset to deposit, or stable shares to withdraw
    pub amount: u64,
    pub to: Pubkey,
    pub validator: Pubkey,
    pub deadline: i64,
    pub security_deposit: u64,
    pub price_data: Vec<u8>,
    pub previous_actions: PreviousActionsData,
}

pub fn handle_initiate_deposit<'info>(
    ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
    params: InitiateVaultActionParams,
) -> Result<bool> {
    let (protocol, mut host, call) = ctx
        .accounts
        .split(ctx.remaining_accounts, params.security_deposit)?;
    protocol.initiate_deposit(
        &mut host,
        &call,
        params.amount as u128,
        params.to,
        params.validator,
        params.deadline,
        &params.price_data,
        &params.previous_actions,
    )
}

pub fn handle_validate_deposit<'info>(
    ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
    params: ValidateActionParams,
) -> Result<bool> {
    let (protocol, mut host, call) = ctx.accounts.split(ctx.remaining_accounts, 0)?;
    protocol.validate_deposit(
        &mut host,
        &call,
        params.validator,
        &params.price_data,
        &params.previous_actions,
    )
}
