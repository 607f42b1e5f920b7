use anchor_lang::prelude::*;
use crate::{engine::PreviousActionsData, instructions::UserAction};

pub fn handle_liquidate<'info>(
    ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
    price_data: Vec<u8>,
    iterations: u16,
) -> Result<u16> {
    let (protocol, mut host, call) = ctx.accounts.split(ctx.remaining_accounts, 0)?;
    let liquidated_ticks = protocol.liquidate(&mut host, &call, &price_data, iterations)?;
    msg!("Liquidated {} ticks", liquidated_ticks);
    Ok(liquidated_ticks)
}

pub fn handle_validate_actionable_pending_actions<'info>(
    ctx: Context<'_, '_, '_, 'info, UserAction<'info>>,
    previous_actions: PreviousActionsData,
    max_validations: u16,
) -> Result<u16> {
    let (protocol, mut host, call) = ctx.accounts.split(ctx.remaining_accounts, 0)?;
    protocol.validate_actionable_pending_actions(&mut host, &call, &previous_actions, max_validations)
}
