use anchor_lang::prelude::*;
use crate::{
    engine::PreviousActionsData,
    instructions::{UserAction, ValidateActionParams},
    state::PositionId,
};

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug)]
pub struct InitiateOpenPositionParams {
    pub amount: u64,
    // Liquidation price without penalty, 18 decimals
    pub desired_liq_price: u128,
    pub to: Pubkey,
    pub validator: Pubkey,
    pub deadline: i64,
    pub security_deposit: u64,
    pub price_data: Vec<u8>,
    pub previous_actions: PreviousActionsData,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug)]
pub struct InitiateOpenPositionResult {
    pub initiated: bool,
    pub position_id: PositionId,
}

pub fn handle_initiate_open_position<'info>(
    ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
    params: InitiateOpenPositionParams,
) -> Result<InitiateOpenPositionResult> {
    let (protocol, mut host, call) = ctx
        .accounts
        .split(ctx.remaining_accounts, params.security_deposit)?;
    let (initiated, position_id) = protocol.initiate_open_position(
        &mut host,
        &call,
        params.amount as u128,
        params.desired_liq_price,
        params.to,
        params.validator,
        params.deadline,
        &params.price_data,
        &params.previous_actions,
    )?;
    Ok(InitiateOpenPositionResult {
        initiated,
        position_id,
    })
}

pub fn handle_validate_open_position<'info>(
    ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
    params: ValidateActionParams,
) -> Result<bool> {
    let (protocol, mut host, call) = ctx.accounts.split(ctx.remaining_accounts, 0)?;
    protocol.validate_open_position(
        &mut host,
        &call,
        params.validator,
        &params.price_data,
        &params.previous_actions,
    )
}
