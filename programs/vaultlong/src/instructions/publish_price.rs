use anchor_lang::prelude::*;
use crate::{constants::PRICE_FEED_SEED, events::*, state::PriceFeed, VaultLongError};

#[derive(Accounts)]
pub struct PublishPrice<'info> {
    pub authority: Signer<'info>,

    #[account(
        mut,
        seeds = [PRICE_FEED_SEED, price_feed.protocol.as_ref()],
        bump = price_feed.bump,
        constraint = price_feed.authority == authority.key() @ VaultLongError::Unauthorized,
    )]
    pub price_feed: Account<'info, PriceFeed>,
}

pub fn handle_publish_price(ctx: Context<PublishPrice>, price: u128) -> Result<()> {
    let timestamp = Clock::get()?.unix_timestamp;
    ctx.accounts.price_feed.publish(timestamp, price)?;

    emit!(PricePublished {
        price_feed: ctx.accounts.price_feed.key(),
        price,
        timestamp,
    });
    Ok(())
}
