//! Wish address derivation.
//!
//! A wish lives at the program address derived from
//! `[WISH_SEED, owner, title]`. The bump is searched downward from 255 and
//! the first seed set that hashes off the ed25519 curve wins, so nobody holds
//! a private key for the resulting address. Anyone can recompute it without
//! touching the ledger.

use solana_sdk::pubkey::{Pubkey, PubkeyError, MAX_SEED_LEN};
use tracing::debug;

use crate::error::WishError;

/// Namespace tag prefixed to every wish derivation.
pub const WISH_SEED: &[u8] = b"wish";

/// Derive the canonical wish address and bump for `(owner, title)`.
pub fn derive_wish_address(
    program_id: &Pubkey,
    owner: &Pubkey,
    title: &str,
) -> Result<(Pubkey, u8), WishError> {
    if title.len() > MAX_SEED_LEN {
        return Err(WishError::TitleTooLong);
    }
    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let seeds: [&[u8]; 4] = [WISH_SEED, owner.as_ref(), title.as_bytes(), &bump_seed];
        match Pubkey::create_program_address(&seeds, program_id) {
            Ok(address) => {
                debug!(%owner, %address, bump, "derived wish address");
                return Ok((address, bump));
            }
            Err(PubkeyError::InvalidSeeds) => continue,
            Err(PubkeyError::MaxSeedLengthExceeded) => return Err(WishError::TitleTooLong),
            Err(_) => return Err(WishError::NoViableBump),
        }
    }
    Err(WishError::NoViableBump)
}

/// Re-derive the wish address and reject `supplied` unless it matches.
pub fn verify_wish_address(
    program_id: &Pubkey,
    owner: &Pubkey,
    title: &str,
    supplied: &Pubkey,
) -> Result<u8, WishError> {
    let (expected, bump) = derive_wish_address(program_id, owner, title)?;
    if expected != *supplied {
        debug!(%expected, %supplied, "wish address mismatch");
        return Err(WishError::AddressMismatch);
    }
    Ok(bump)
}
