#![allow(deprecated)]
// Temporary: Anchor macro emits a deprecated realloc; safe to ignore here
use anchor_lang::prelude::*;

declare_id!("HZSqkqsgtJkFLwgyFMQHHbFEsU9jPdGZgBTpbrVRwJ8U");

pub const WISH_SEED: &[u8] = b"wish";

/// Seeds are capped at 32 bytes, and the title is one of them. A longer
/// title fails inside Anchor's address derivation before any handler runs,
/// so it surfaces as a runtime seeds error, not `TitleTooLong`. Clients
/// reject it before submitting.
pub const MAX_TITLE_LEN: usize = 32;

#[program]
pub mod wall_of_wish {
    use super::*;

    pub fn submit_wish(ctx: Context<SubmitWish>, title: String) -> Result<()> {
        require!(title.len() <= MAX_TITLE_LEN, WishError::TitleTooLong);
        let wish = &mut ctx.accounts.wish;
        wish.user = ctx.accounts.user.key();
        wish.title = title;
        msg!("wish created by {}", wish.user);
        Ok(())
    }

    // Closing is done by the `close` constraint once ownership checks pass.
    pub fn delete_wish(ctx: Context<DeleteWish>, _title: String) -> Result<()> {
        msg!("wish deleted by {}", ctx.accounts.user.key());
        Ok(())
    }
}

#[derive(Accounts)]
#[instruction(title: String)]
pub struct SubmitWish<'info> {
    #[account(
        init,
        payer = user,
        space = AWish::space(title.len()),
        seeds = [WISH_SEED, user.key().as_ref(), title.as_bytes()],
        bump
    )]
    pub wish: Account<'info, AWish>,

    #[account(mut)]
    pub user: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(title: String)]
pub struct DeleteWish<'info> {
    // Seeds come from the stored owner; the signer is checked against it below.
    #[account(
        mut,
        seeds = [WISH_SEED, wish.user.as_ref(), title.as_bytes()],
        bump,
        close = user,
        constraint = wish.user == user.key() @ WishError::Unauthorized
    )]
    pub wish: Account<'info, AWish>,

    #[account(mut)]
    pub user: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[account]
pub struct AWish {
    pub user: Pubkey,
    pub title: String,
}

impl AWish {
    /// discriminator + owner + string length prefix + title bytes
    pub const fn space(title_len: usize) -> usize {
        8 + 32 + 4 + title_len
    }
}

// Order fixes the custom codes (6000..) the off-chain client decodes.
#[error_code]
pub enum WishError {
    #[msg("Only the wish creator can delete it")]
    Unauthorized,
    #[msg("Supplied address does not match the derived wish address")]
    AddressMismatch,
    #[msg("A wish already exists at this address")]
    AlreadyExists,
    #[msg("No wish exists at this address")]
    NotFound,
    #[msg("Title does not fit in a wish account")]
    TitleTooLong,
    #[msg("Signer cannot cover the wish account deposit")]
    InsufficientFunds,
    #[msg("Account data is not a wish record")]
    WrongAccountType,
    #[msg("Wish record length prefix does not match its data")]
    CorruptRecord,
    #[msg("No bump produces an off-curve wish address")]
    NoViableBump,
}
