use anchor_lang::prelude::*;
use anchor_lang::system_program;
use anchor_spl::token::{self, Burn, MintTo, TokenAccount, Transfer};
use crate::{
    constants::PROTOCOL_SEED,
    engine::{AssetCustody, DepositEscrow, PriceInfo, PriceOracle, StableLedger},
    state::{PriceFeed, ProtocolAction},
    VaultLongError,
};

/// Collaborators of the engine backed by the instruction's accounts. Token
/// accounts and wallets of recipients other than the signer are looked up
/// in the remaining accounts.
pub struct AccountsHost<'a, 'info> {
    pub price_feed: &'a PriceFeed,
    pub now: i64,
    pub price_max_age: i64,

    // Protocol PDA: token authority and security deposit escrow
    pub protocol: AccountInfo<'info>,
    pub asset_mint: Pubkey,
    pub bump: u8,

    pub user: AccountInfo<'info>,
    pub user_asset_account: AccountInfo<'info>,
    pub user_stable_account: AccountInfo<'info>,

    pub asset_vault: AccountInfo<'info>,
    pub stable_mint: AccountInfo<'info>,
    pub stable_escrow: AccountInfo<'info>,
    // Tracked locally, the mint account is not reloaded between CPIs
    pub stable_supply: u128,

    pub token_program: AccountInfo<'info>,
    pub system_program: AccountInfo<'info>,
    pub remaining_accounts: &'a [AccountInfo<'info>],
}

fn to_u64(amount: u128) -> Result<u64> {
    u64::try_from(amount).map_err(|_| error!(VaultLongError::MathOverflow))
}

impl<'a, 'info> AccountsHost<'a, 'info> {
    fn with_protocol_signer<T>(&self, f: impl FnOnce(&[&[&[u8]]]) -> Result<T>) -> Result<T> {
        let bump = [self.bump];
        let seeds: &[&[u8]] = &[PROTOCOL_SEED, self.asset_mint.as_ref(), &bump];
        f(&[seeds])
    }

    fn candidates(&self) -> impl Iterator<Item = &AccountInfo<'info>> {
        [&self.user_asset_account, &self.user_stable_account]
            .into_iter()
            .chain(self.remaining_accounts.iter())
    }

    /// Token account of `mint` owned by `owner`.
    fn token_account_of(&self, owner: Pubkey, mint: Pubkey) -> Result<AccountInfo<'info>> {
        for info in self.candidates() {
            if info.owner != &token::ID || !info.is_writable {
                continue;
            }
            let data = info.try_borrow_data()?;
            let Ok(account) = TokenAccount::try_deserialize(&mut &data[..]) else {
                continue;
            };
            if account.owner == owner && account.mint == mint {
                return Ok(info.clone());
            }
        }
        msg!("No writable token account of mint {} for {}", mint, owner);
        Err(error!(VaultLongError::MissingAccount))
    }

    fn wallet_of(&self, owner: Pubkey) -> Result<AccountInfo<'info>> {
        std::iter::once(&self.user)
            .chain(self.remaining_accounts.iter())
            .find(|info| *info.key == owner && info.is_writable)
            .cloned()
            .ok_or(error!(VaultLongError::MissingAccount))
    }
}

impl<'a, 'info> PriceOracle for AccountsHost<'a, 'info> {
    fn attest(
        &mut self,
        action: ProtocolAction,
        target_timestamp: i64,
        price_data: &[u8],
    ) -> Result<PriceInfo> {
        self.price_feed
            .attest(action, target_timestamp, self.now, self.price_max_age, price_data)
    }
}

impl<'a, 'info> StableLedger for AccountsHost<'a, 'info> {
    fn total_supply(&self) -> Result<u128> {
        Ok(self.stable_supply)
    }

    fn mint(&mut self, to: Pubkey, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let destination = self.token_account_of(to, *self.stable_mint.key)?;
        let cpi_accounts = MintTo {
            mint: self.stable_mint.clone(),
            to: destination,
            authority: self.protocol.clone(),
        };
        self.with_protocol_signer(|signer| {
            let cpi_ctx =
                CpiContext::new_with_signer(self.token_program.clone(), cpi_accounts, signer);
            token::mint_to(cpi_ctx, to_u64(amount)?)
        })?;
        self.stable_supply = self
            .stable_supply
            .checked_add(amount)
            .ok_or(error!(VaultLongError::MathOverflow))?;
        Ok(())
    }

    fn lock(&mut self, from: Pubkey, amount: u128) -> Result<()> {
        require_keys_eq!(from, *self.user.key, VaultLongError::Unauthorized);
        let cpi_accounts = Transfer {
            from: self.user_stable_account.clone(),
            to: self.stable_escrow.clone(),
            authority: self.user.clone(),
        };
        let cpi_ctx = CpiContext::new(self.token_program.clone(), cpi_accounts);
        token::transfer(cpi_ctx, to_u64(amount)?)
    }

    fn burn_locked(&mut self, amount: u128) -> Result<()> {
        let cpi_accounts = Burn {
            mint: self.stable_mint.clone(),
            from: self.stable_escrow.clone(),
            authority: self.protocol.clone(),
        };
        self.with_protocol_signer(|signer| {
            let cpi_ctx =
                CpiContext::new_with_signer(self.token_program.clone(), cpi_accounts, signer);
            token::burn(cpi_ctx, to_u64(amount)?)
        })?;
        self.stable_supply = self
            .stable_supply
            .checked_sub(amount)
            .ok_or(error!(VaultLongError::MathUnderflow))?;
        Ok(())
    }
}

impl<'a, 'info> AssetCustody for AccountsHost<'a, 'info> {
    fn pull(&mut self, from: Pubkey, amount: u128) -> Result<()> {
        require_keys_eq!(from, *self.user.key, VaultLongError::Unauthorized);
        let cpi_accounts = Transfer {
            from: self.user_asset_account.clone(),
            to: self.asset_vault.clone(),
            authority: self.user.clone(),
        };
        let cpi_ctx = CpiContext::new(self.token_program.clone(), cpi_accounts);
        token::transfer(cpi_ctx, to_u64(amount)?)
    }

    fn push(&mut self, to: Pubkey, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let destination = self.token_account_of(to, self.asset_mint)?;
        let cpi_accounts = Transfer {
            from: self.asset_vault.clone(),
            to: destination,
            authority: self.protocol.clone(),
        };
        self.with_protocol_signer(|signer| {
            let cpi_ctx =
                CpiContext::new_with_signer(self.token_program.clone(), cpi_accounts, signer);
            token::transfer(cpi_ctx, to_u64(amount)?)
        })
    }
}

impl<'a, 'info> DepositEscrow for AccountsHost<'a, 'info> {
    fn escrow(&mut self, from: Pubkey, lamports: u64) -> Result<()> {
        require_keys_eq!(from, *self.user.key, VaultLongError::Unauthorized);
        if lamports == 0 {
            return Ok(());
        }
        let cpi_ctx = CpiContext::new(
            self.system_program.clone(),
            system_program::Transfer {
                from: self.user.clone(),
                to: self.protocol.clone(),
            },
        );
        system_program::transfer(cpi_ctx, lamports)
    }

    fn release(&mut self, to: Pubkey, lamports: u64) -> Result<()> {
        if lamports == 0 {
            return Ok(());
        }
        let wallet = self.wallet_of(to)?;
        let mut protocol_lamports = self.protocol.try_borrow_mut_lamports()?;
        **protocol_lamports = protocol_lamports
            .checked_sub(lamports)
            .ok_or(error!(VaultLongError::InsufficientFunds))?;
        let mut wallet_lamports = wallet.try_borrow_mut_lamports()?;
        **wallet_lamports = wallet_lamports
            .checked_add(lamports)
            .ok_or(error!(VaultLongError::MathOverflow))?;
        Ok(())
    }
}
