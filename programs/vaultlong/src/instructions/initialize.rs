use anchor_lang::prelude::*;
use anchor_spl::{
    associated_token::AssociatedToken,
    token::{Mint, Token, TokenAccount},
};
use crate::{
    constants::*,
    engine::Call,
    events::*,
    instructions::host::AccountsHost,
    state::*,
    VaultLongError,
};

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug)]
pub struct InitializeParams {
    pub deposit_amount: u64,
    pub long_amount: u64,
    pub desired_liq_price: u128,
    // First observation of the feed, 18 decimals
    pub initial_price: u128,
    pub oracle_authority: Pubkey,
    pub config: ConfigOverrides,
}

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    pub asset_mint: Box<Account<'info, Mint>>,

    #[account(
        init,
        seeds = [PROTOCOL_SEED, asset_mint.key().as_ref()],
        bump,
        payer = authority,
        space = PROTOCOL_INITIAL_SPACE,
    )]
    pub protocol: Box<Account<'info, Protocol>>,

    #[account(
        init,
        seeds = [STABLE_MINT_SEED, protocol.key().as_ref()],
        bump,
        payer = authority,
        mint::decimals = STABLE_DECIMALS,
        mint::authority = protocol,
    )]
    pub stable_mint: Box<Account<'info, Mint>>,

    #[account(
        init,
        payer = authority,
        associated_token::mint = asset_mint,
        associated_token::authority = protocol,
    )]
    pub asset_vault: Box<Account<'info, TokenAccount>>,

    #[account(
        init,
        payer = authority,
        associated_token::mint = stable_mint,
        associated_token::authority = protocol,
    )]
    pub stable_escrow: Box<Account<'info, TokenAccount>>,

    #[account(
        init,
        seeds = [PRICE_FEED_SEED, protocol.key().as_ref()],
        bump,
        payer = authority,
        space = PriceFeed::LEN,
    )]
    pub price_feed: Box<Account<'info, PriceFeed>>,

    #[account(
        mut,
        constraint = authority_asset_account.owner == authority.key() @ VaultLongError::InvalidTokenAccounts,
        constraint = authority_asset_account.mint == asset_mint.key() @ VaultLongError::InvalidTokenAccounts,
    )]
    pub authority_asset_account: Box<Account<'info, TokenAccount>>,

    #[account(
        init_if_needed,
        payer = authority,
        associated_token::mint = stable_mint,
        associated_token::authority = authority,
    )]
    pub authority_stable_account: Box<Account<'info, TokenAccount>>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub rent: Sysvar<'info, Rent>,
}

pub fn handle_initialize<'info>(
    mut ctx: Context<'_, '_, '_, 'info, Initialize<'info>>,
    params: InitializeParams,
) -> Result<PositionId> {
    let config = ProtocolConfig::with_overrides(params.config)?;
    let now = Clock::get()?.unix_timestamp;

    let price_feed = &mut ctx.accounts.price_feed;
    price_feed.authority = params.oracle_authority;
    price_feed.protocol = ctx.accounts.protocol.key();
    price_feed.bump = *ctx.bumps.get("price_feed").ok_or(error!(VaultLongError::MissingAccount))?;
    price_feed.publish(now, params.initial_price)?;

    let mut protocol = Protocol::new(config);
    protocol.authority = ctx.accounts.authority.key();
    protocol.asset_mint = ctx.accounts.asset_mint.key();
    protocol.asset_vault = ctx.accounts.asset_vault.key();
    protocol.stable_mint = ctx.accounts.stable_mint.key();
    protocol.stable_escrow = ctx.accounts.stable_escrow.key();
    protocol.price_feed = ctx.accounts.price_feed.key();
    protocol.bump = *ctx.bumps.get("protocol").ok_or(error!(VaultLongError::MissingAccount))?;

    let accounts = &mut ctx.accounts;
    let mut host = AccountsHost {
        price_feed: &accounts.price_feed,
        now,
        price_max_age: protocol.config.price_max_age,
        protocol: accounts.protocol.to_account_info(),
        asset_mint: protocol.asset_mint,
        bump: protocol.bump,
        user: accounts.authority.to_account_info(),
        user_asset_account: accounts.authority_asset_account.to_account_info(),
        user_stable_account: accounts.authority_stable_account.to_account_info(),
        asset_vault: accounts.asset_vault.to_account_info(),
        stable_mint: accounts.stable_mint.to_account_info(),
        stable_escrow: accounts.stable_escrow.to_account_info(),
        stable_supply: 0,
        token_program: accounts.token_program.to_account_info(),
        system_program: accounts.system_program.to_account_info(),
        remaining_accounts: ctx.remaining_accounts,
    };
    let call = Call {
        caller: accounts.authority.key(),
        now,
        value: 0,
    };
    let price_data = now
        .try_to_vec()
        .map_err(|_| error!(VaultLongError::InvalidPriceData))?;
    let position_id = protocol.initialize(
        &mut host,
        &call,
        params.deposit_amount as u128,
        params.long_amount as u128,
        params.desired_liq_price,
        &price_data,
    )?;

    emit!(ProtocolInitialized {
        protocol: accounts.protocol.key(),
        authority: protocol.authority,
        asset_mint: protocol.asset_mint,
        stable_mint: protocol.stable_mint,
        deposit_amount: params.deposit_amount as u128,
        long_amount: params.long_amount as u128,
        timestamp: now,
    });

    accounts.protocol.set_inner(protocol);
    Ok(position_id)
}
