use anchor_lang::prelude::*;
use crate::instructions::{InitiateVaultActionParams, UserAction, ValidateActionParams};

pub fn handle_initiate_withdrawal<'info>(
    ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
    params: InitiateVaultActionParams,
) -> Result<bool> {
    let (protocol, mut host, call) = ctx
        .accounts
        .split(ctx.remaining_accounts, params.security_deposit)?;
    protocol.initiate_withdrawal(
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

pub fn handle_validate_withdrawal<'info>(
    ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
    params: ValidateActionParams,
) -> Result<bool> {
    let (protocol, mut host, call) = ctx.accounts.split(ctx.remaining_accounts, 0)?;
    protocol.validate_withdrawal(
        &mut host,
        &call,
        params.validator,
        &params.price_data,
        &params.previous_actions,
    )
}
