use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;

use crate::error::WishError;
use crate::pda::derive_wish_address;
use crate::record::MAX_TITLE_LEN;

/// `sha256("global:submit_wish")[..8]`
pub const SUBMIT_WISH_SIGHASH: [u8; 8] = [220, 74, 241, 23, 168, 165, 200, 189];
/// `sha256("global:delete_wish")[..8]`
pub const DELETE_WISH_SIGHASH: [u8; 8] = [26, 228, 152, 182, 148, 121, 243, 224];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WishInstruction {
    Create { title: String },
    Delete { title: String },
}

impl WishInstruction {
    pub fn title(&self) -> &str {
        match self {
            WishInstruction::Create { title } | WishInstruction::Delete { title } => title,
        }
    }

    /// `[sighash: 8][title_len: u32 LE][title]`
    pub fn pack(&self) -> Vec<u8> {
        let sighash = match self {
            WishInstruction::Create { .. } => SUBMIT_WISH_SIGHASH,
            WishInstruction::Delete { .. } => DELETE_WISH_SIGHASH,
        };
        let title = self.title().as_bytes();
        let mut data = Vec::with_capacity(12 + title.len());
        data.extend_from_slice(&sighash);
        data.extend_from_slice(&(title.len() as u32).to_le_bytes());
        data.extend_from_slice(title);
        data
    }

    pub fn unpack(data: &[u8]) -> Option<Self> {
        let (sighash, rest) = data.split_first_chunk::<8>()?;
        let (len, title) = rest.split_first_chunk::<4>()?;
        if title.len() != u32::from_le_bytes(*len) as usize {
            return None;
        }
        let title = std::str::from_utf8(title).ok()?.to_string();
        match *sighash {
            SUBMIT_WISH_SIGHASH => Some(WishInstruction::Create { title }),
            DELETE_WISH_SIGHASH => Some(WishInstruction::Delete { title }),
            _ => None,
        }
    }
}

fn wish_instruction(
    program_id: &Pubkey,
    owner: &Pubkey,
    instruction: WishInstruction,
) -> Result<Instruction, WishError> {
    if instruction.title().len() > MAX_TITLE_LEN {
        return Err(WishError::TitleTooLong);
    }
    let (wish, _) = derive_wish_address(program_id, owner, instruction.title())?;
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(wish, false),
            AccountMeta::new(*owner, true),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
        data: instruction.pack(),
    })
}

/// Ledger instruction recording `title` for `owner`.
pub fn create_wish(program_id: &Pubkey, owner: &Pubkey, title: &str) -> Result<Instruction, WishError> {
    wish_instruction(
        program_id,
        owner,
        WishInstruction::Create {
            title: title.to_string(),
        },
    )
}

/// Ledger instruction removing `owner`'s wish `title` and refunding its deposit.
pub fn delete_wish(program_id: &Pubkey, owner: &Pubkey, title: &str) -> Result<Instruction, WishError> {
    wish_instruction(
        program_id,
        owner,
        WishInstruction::Delete {
            title: title.to_string(),
        },
    )
}
