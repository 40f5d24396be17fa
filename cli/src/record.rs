//! Binary layout of a wish account.
//!
//! ```text
//! [discriminator: 8][owner: 32][title_len: u32 LE][title: title_len bytes]
//! ```
//!
//! The discriminator is the Anchor account discriminator of `AWish`, the
//! account type of the deployed wall-of-wish program, so records it writes
//! decode here and vice versa.

use serde::Serialize;
use solana_sdk::pubkey::{Pubkey, MAX_SEED_LEN};

use crate::error::WishError;

/// `sha256("account:AWish")[..8]`
pub const WISH_DISCRIMINATOR: [u8; 8] = [217, 196, 247, 217, 127, 81, 81, 202];

pub const DISCRIMINATOR_LEN: usize = 8;
pub const OWNER_OFFSET: usize = DISCRIMINATOR_LEN;
pub const TITLE_LEN_OFFSET: usize = OWNER_OFFSET + 32;
pub const TITLE_OFFSET: usize = TITLE_LEN_OFFSET + 4;

/// Titles double as derivation seeds, so they share the seed length limit.
pub const MAX_TITLE_LEN: usize = MAX_SEED_LEN;
pub const MAX_RECORD_LEN: usize = TITLE_OFFSET + MAX_TITLE_LEN;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WishRecord {
    #[serde(with = "display")]
    pub owner: Pubkey,
    pub title: String,
}

/// Account size for a title of `title_len` bytes.
pub fn record_space(title_len: usize) -> usize {
    TITLE_OFFSET + title_len
}

impl WishRecord {
    pub fn new(owner: Pubkey, title: impl Into<String>) -> Self {
        Self {
            owner,
            title: title.into(),
        }
    }

    pub fn space(&self) -> usize {
        record_space(self.title.len())
    }

    pub fn encode(&self) -> Result<Vec<u8>, WishError> {
        if self.title.len() > MAX_TITLE_LEN {
            return Err(WishError::TitleTooLong);
        }
        let mut data = Vec::with_capacity(self.space());
        data.extend_from_slice(&WISH_DISCRIMINATOR);
        data.extend_from_slice(self.owner.as_ref());
        data.extend_from_slice(&(self.title.len() as u32).to_le_bytes());
        data.extend_from_slice(self.title.as_bytes());
        Ok(data)
    }

    pub fn decode(data: &[u8]) -> Result<Self, WishError> {
        let discriminator = data
            .get(..DISCRIMINATOR_LEN)
            .ok_or(WishError::WrongAccountType)?;
        if discriminator != WISH_DISCRIMINATOR {
            return Err(WishError::WrongAccountType);
        }
        let owner = data
            .get(OWNER_OFFSET..TITLE_LEN_OFFSET)
            .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
            .map(Pubkey::new_from_array)
            .ok_or(WishError::CorruptRecord)?;
        let title_len = data
            .get(TITLE_LEN_OFFSET..TITLE_OFFSET)
            .and_then(|bytes| <[u8; 4]>::try_from(bytes).ok())
            .map(u32::from_le_bytes)
            .ok_or(WishError::CorruptRecord)? as usize;
        let body = &data[TITLE_OFFSET..];
        if body.len() != title_len {
            return Err(WishError::CorruptRecord);
        }
        let title = std::str::from_utf8(body).map_err(|_| WishError::CorruptRecord)?;
        Ok(Self::new(owner, title))
    }
}

mod display {
    use serde::Serializer;
    use solana_sdk::pubkey::Pubkey;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }
}

#[cfg(test)]
mod tests {
    use sha2::{Digest, Sha256};

    use super::*;

    #[test]
    fn discriminator_is_anchor_account_hash() {
        let hash = Sha256::digest(b"account:AWish");
        assert_eq!(&hash[..8], &WISH_DISCRIMINATOR);
    }

    #[test]
    fn decodes_account_written_by_deployed_program() {
        let owner = Pubkey::new_from_array([7; 32]);
        let mut data = vec![0xd9, 0xc4, 0xf7, 0xd9, 0x7f, 0x51, 0x51, 0xca];
        data.extend_from_slice(&[7; 32]);
        data.extend_from_slice(&[4, 0, 0, 0]);
        data.extend_from_slice(b"rain");
        assert_eq!(WishRecord::decode(&data), Ok(WishRecord::new(owner, "rain")));
    }

    #[test]
    fn encodes_fixed_layout() {
        let owner = Pubkey::new_unique();
        let record = WishRecord::new(owner, "I wish to learn Solana");
        let data = record.encode().unwrap();
        assert_eq!(data.len(), 8 + 32 + 4 + 22);
        assert_eq!(&data[..8], &WISH_DISCRIMINATOR);
        assert_eq!(&data[OWNER_OFFSET..TITLE_LEN_OFFSET], owner.as_ref());
        assert_eq!(&data[TITLE_LEN_OFFSET..TITLE_OFFSET], &22u32.to_le_bytes());
        assert_eq!(&data[TITLE_OFFSET..], b"I wish to learn Solana");
        assert_eq!(WishRecord::decode(&data), Ok(record));
    }

    #[test]
    fn decodes_every_title_length() {
        let owner = Pubkey::new_unique();
        for len in 0..=MAX_TITLE_LEN {
            let record = WishRecord::new(owner, "é".repeat(len / 2) + &"a".repeat(len % 2));
            assert_eq!(record.space(), TITLE_OFFSET + len);
            assert_eq!(WishRecord::decode(&record.encode().unwrap()), Ok(record));
        }
    }

    #[test]
    fn flipped_discriminator_is_wrong_type() {
        let mut data = WishRecord::new(Pubkey::new_unique(), "rain").encode().unwrap();
        data[3] ^= 0xff;
        assert_eq!(WishRecord::decode(&data), Err(WishError::WrongAccountType));
        assert_eq!(WishRecord::decode(&[]), Err(WishError::WrongAccountType));
    }

    #[test]
    fn inconsistent_length_prefix_is_corrupt() {
        let mut data = WishRecord::new(Pubkey::new_unique(), "rain").encode().unwrap();
        data[TITLE_LEN_OFFSET] = 5;
        assert_eq!(WishRecord::decode(&data), Err(WishError::CorruptRecord));
        data[TITLE_LEN_OFFSET] = 4;
        data.push(0);
        assert_eq!(WishRecord::decode(&data), Err(WishError::CorruptRecord));
        assert_eq!(
            WishRecord::decode(&data[..TITLE_OFFSET - 1]),
            Err(WishError::CorruptRecord)
        );
    }

    #[test]
    fn invalid_utf8_title_is_corrupt() {
        let mut data = WishRecord::new(Pubkey::new_unique(), "ab").encode().unwrap();
        data[TITLE_OFFSET] = 0xff;
        assert_eq!(WishRecord::decode(&data), Err(WishError::CorruptRecord));
    }

    #[test]
    fn oversized_title_does_not_encode() {
        let record = WishRecord::new(Pubkey::new_unique(), "x".repeat(MAX_TITLE_LEN + 1));
        assert_eq!(record.encode(), Err(WishError::TitleTooLong));
    }
}
