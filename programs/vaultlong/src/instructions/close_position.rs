use anchor_lang::prelude::*;
use crate::{
    engine::PreviousActionsData,
    instructions::{UserAction, ValidateActionParams},
    state::PositionId,
};

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug)]
pub struct InitiateClosePositionParams {
    pub position_id: PositionId,
    pub amount_to_close: u64,
    // Lowest acceptable close price, 18 decimals
    pub min_price: u128,
    pub to: Pubkey,
    pub validator: Pubkey,
    pub deadline: i64,
    pub security_deposit: u64,
    pub price_data: Vec<u8>,
    pub previous_actions: PreviousActionsData,
}

pub fn handle_initiate_close_position<'info>(
    ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
    params: InitiateClosePositionParams,
) -> Result<bool> {
    let (protocol, mut host, call) = ctx
        .accounts
        .split(ctx.remaining_accounts, params.security_deposit)?;
    protocol.initiate_close_position(
        &mut host,
        &call,
        params.position_id,
        params.amount_to_close as u128,
        params.min_price,
        params.to,
        params.validator,
        params.deadline,
        &params.price_data,
        &params.previous_actions,
    )
}

pub fn handle_validate_close_position<'info>(
    ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
    params: ValidateActionParams,
) -> Result<bool> {
    let (protocol, mut host, call) = ctx.accounts.split(ctx.remaining_accounts, 0)?;
    protocol.validate_close_position(
        &mut host,
        &call,
        params.validator,
        &params.price_data,
        &params.previous_actions,
    )
}
