use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};
use crate::{
    constants::PROTOCOL_SEED,
    engine::{Call, PreviousActionsData},
    instructions::host::AccountsHost,
    state::*,
    VaultLongError,
};

/// Accounts shared by every user-facing protocol instruction.
#[derive(Accounts)]
pub struct UserAction<'info> {
    #[account(mut)]
    pub user: Signer<'info>,

    #[account(
        mut,
        seeds = [PROTOCOL_SEED, protocol.asset_mint.as_ref()],
        bump = protocol.bump,
        realloc = protocol.space_for(protocol.to_account_info().data_len()),
        realloc::payer = user,
        realloc::zero = false,
    )]
    pub protocol: Box<Account<'info, Protocol>>,

    #[account(
        constraint = price_feed.key() == protocol.price_feed @ VaultLongError::InvalidPriceData,
    )]
    pub price_feed: Box<Account<'info, PriceFeed>>,

    #[account(
        mut,
        constraint = asset_vault.key() == protocol.asset_vault @ VaultLongError::InvalidTokenAccounts,
    )]
    pub asset_vault: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        constraint = stable_mint.key() == protocol.stable_mint @ VaultLongError::InvalidTokenAccounts,
    )]
    pub stable_mint: Box<Account<'info, Mint>>,

    #[account(
        mut,
        constraint = stable_escrow.key() == protocol.stable_escrow @ VaultLongError::InvalidTokenAccounts,
    )]
    pub stable_escrow: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        constraint = user_asset_account.owner == user.key() @ VaultLongError::InvalidTokenAccounts,
        constraint = user_asset_account.mint == protocol.asset_mint @ VaultLongError::InvalidTokenAccounts,
    )]
    pub user_asset_account: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        constraint = user_stable_account.owner == user.key() @ VaultLongError::InvalidTokenAccounts,
        constraint = user_stable_account.mint == protocol.stable_mint @ VaultLongError::InvalidTokenAccounts,
    )]
    pub user_stable_account: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

/// Arguments of the validate instructions.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug)]
pub struct ValidateActionParams {
    pub validator: Pubkey,
    pub price_data: Vec<u8>,
    pub previous_actions: PreviousActionsData,
}

impl<'info> UserAction<'info> {
    /// Protocol state, the host over the other accounts, and the call
    /// context of the signer offering `security_deposit` lamports.
    pub fn split<'a>(
        &'a mut self,
        remaining_accounts: &'a [AccountInfo<'info>],
        security_deposit: u64,
    ) -> Result<(&'a mut Protocol, AccountsHost<'a, 'info>, Call)> {
        Protocol::mark_call_in_progress(&self.protocol.to_account_info())?;
        let now = Clock::get()?.unix_timestamp;
        let call = Call {
            caller: self.user.key(),
            now,
            value: security_deposit,
        };
        let host = AccountsHost {
            price_feed: &self.price_feed,
            now,
            price_max_age: self.protocol.config.price_max_age,
            protocol: self.protocol.to_account_info(),
            asset_mint: self.protocol.asset_mint,
            bump: self.protocol.bump,
            user: self.user.to_account_info(),
            user_asset_account: self.user_asset_account.to_account_info(),
            user_stable_account: self.user_stable_account.to_account_info(),
            asset_vault: self.asset_vault.to_account_info(),
            stable_mint: self.stable_mint.to_account_info(),
            stable_escrow: self.stable_escrow.to_account_info(),
            stable_supply: self.stable_mint.supply as u128,
            token_program: self.token_program.to_account_info(),
            system_program: self.system_program.to_account_info(),
            remaining_accounts,
        };
        let protocol: &mut Protocol = &mut self.protocol;
        Ok((protocol, host, call))
    }
}
