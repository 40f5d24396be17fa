//! The wish storage program.
//!
//! Each [`SignedInstruction`] is processed to completion against a
//! [`Ledger`]: every precondition is checked before a single write is
//! produced, and the writes are committed as one batch.

use solana_sdk::account::Account;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::rent::Rent;
use solana_sdk::signature::{Signature, Signer};
use solana_sdk::system_program;
use tracing::{debug, info, warn};

use crate::error::WishError;
use crate::instruction::WishInstruction;
use crate::ledger::{AccountWrite, Ledger};
use crate::pda::verify_wish_address;
use crate::record::{record_space, WishRecord, MAX_TITLE_LEN, OWNER_OFFSET, TITLE_LEN_OFFSET};

/// A wish instruction together with the signer's proof of key control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInstruction {
    pub signer: Pubkey,
    pub wish: Pubkey,
    pub instruction: WishInstruction,
    pub signature: Signature,
}

impl SignedInstruction {
    /// Bytes covered by the signature: `[program_id][wish][packed instruction]`.
    pub fn message(program_id: &Pubkey, wish: &Pubkey, instruction: &WishInstruction) -> Vec<u8> {
        let mut message = Vec::with_capacity(64 + 12 + instruction.title().len());
        message.extend_from_slice(program_id.as_ref());
        message.extend_from_slice(wish.as_ref());
        message.extend_from_slice(&instruction.pack());
        message
    }

    pub fn sign<S: Signer + ?Sized>(
        program_id: &Pubkey,
        signer: &S,
        wish: Pubkey,
        instruction: WishInstruction,
    ) -> Self {
        let signature = signer.sign_message(&Self::message(program_id, &wish, &instruction));
        Self {
            signer: signer.pubkey(),
            wish,
            instruction,
            signature,
        }
    }

    pub fn verify(&self, program_id: &Pubkey) -> bool {
        let message = Self::message(program_id, &self.wish, &self.instruction);
        self.signature.verify(self.signer.as_ref(), &message)
    }
}

#[derive(Debug, Clone)]
pub struct WishProgram {
    program_id: Pubkey,
    rent: Rent,
}

impl WishProgram {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            rent: Rent::default(),
        }
    }

    pub fn with_rent(mut self, rent: Rent) -> Self {
        self.rent = rent;
        self
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Minimum balance keeping a wish with a `title_len`-byte title alive.
    pub fn deposit_for(&self, title_len: usize) -> u64 {
        self.rent.minimum_balance(record_space(title_len))
    }

    pub fn process<L: Ledger + ?Sized>(
        &self,
        ledger: &mut L,
        signed: &SignedInstruction,
    ) -> Result<(), WishError> {
        if !signed.verify(&self.program_id) {
            debug!(signer = %signed.signer, "signature does not verify");
            return Err(WishError::Unauthorized);
        }
        let writes = match &signed.instruction {
            WishInstruction::Create { title } => self.create(ledger, signed, title)?,
            WishInstruction::Delete { title } => self.delete(ledger, signed, title)?,
        };
        ledger.commit(writes);
        Ok(())
    }

    fn create<L: Ledger + ?Sized>(
        &self,
        ledger: &L,
        signed: &SignedInstruction,
        title: &str,
    ) -> Result<Vec<AccountWrite>, WishError> {
        if title.len() > MAX_TITLE_LEN {
            return Err(WishError::TitleTooLong);
        }
        verify_wish_address(&self.program_id, &signed.signer, title, &signed.wish)?;

        let existing = ledger.account(&signed.wish);
        if existing
            .as_ref()
            .is_some_and(|account| self.is_occupied(account))
        {
            return Err(WishError::AlreadyExists);
        }
        // Lamports sent to the address ahead of time count toward the deposit.
        let prefunded = existing.map_or(0, |account| account.lamports);

        let record = WishRecord::new(signed.signer, title);
        let data = record.encode()?;
        let deposit = self.rent.minimum_balance(data.len());
        let shortfall = deposit.saturating_sub(prefunded);

        let mut writes = Vec::with_capacity(2);
        if shortfall > 0 {
            let mut payer = ledger
                .account(&signed.signer)
                .ok_or(WishError::InsufficientFunds)?;
            payer.lamports = payer
                .lamports
                .checked_sub(shortfall)
                .ok_or(WishError::InsufficientFunds)?;
            writes.push((signed.signer, Some(payer)));
        }
        writes.push((
            signed.wish,
            Some(Account {
                lamports: prefunded + shortfall,
                data,
                owner: self.program_id,
                executable: false,
                rent_epoch: 0,
            }),
        ));
        info!(wish = %signed.wish, owner = %signed.signer, deposit, "wish created");
        Ok(writes)
    }

    fn delete<L: Ledger + ?Sized>(
        &self,
        ledger: &L,
        signed: &SignedInstruction,
        title: &str,
    ) -> Result<Vec<AccountWrite>, WishError> {
        let account = match ledger.account(&signed.wish) {
            Some(account) if self.is_occupied(&account) => account,
            _ => {
                verify_wish_address(&self.program_id, &signed.signer, title, &signed.wish)?;
                return Err(WishError::NotFound);
            }
        };
        let record = WishRecord::decode(&account.data)?;
        verify_wish_address(&self.program_id, &record.owner, title, &signed.wish)?;
        if record.owner != signed.signer {
            warn!(wish = %signed.wish, signer = %signed.signer, "delete by non-owner rejected");
            return Err(WishError::Unauthorized);
        }

        let mut recipient = ledger
            .account(&signed.signer)
            .unwrap_or_else(|| Account::new(0, 0, &system_program::ID));
        recipient.lamports = recipient.lamports.saturating_add(account.lamports);
        info!(wish = %signed.wish, owner = %signed.signer, refund = account.lamports, "wish deleted");
        Ok(vec![(signed.signer, Some(recipient)), (signed.wish, None)])
    }

    fn is_occupied(&self, account: &Account) -> bool {
        account.owner == self.program_id || !account.data.is_empty()
    }

    /// Read path: the wish stored at `address`, if any.
    pub fn fetch<L: Ledger + ?Sized>(
        &self,
        ledger: &L,
        address: &Pubkey,
    ) -> Result<Option<WishRecord>, WishError> {
        match ledger.account(address) {
            Some(account) if account.owner == self.program_id => {
                WishRecord::decode(&account.data).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Every wish recorded by `owner`, ordered by title.
    ///
    /// Linear scan over all program accounts, matching on the owner field.
    pub fn wishes_of<L: Ledger + ?Sized>(&self, ledger: &L, owner: &Pubkey) -> Vec<(Pubkey, WishRecord)> {
        let mut wishes: Vec<_> = ledger
            .program_accounts(&self.program_id)
            .into_iter()
            .filter(|(_, account)| {
                account.data.get(OWNER_OFFSET..TITLE_LEN_OFFSET) == Some(owner.as_ref())
            })
            .filter_map(|(address, account)| match WishRecord::decode(&account.data) {
                Ok(record) => Some((address, record)),
                Err(err) => {
                    warn!(%address, %err, "skipping undecodable account");
                    None
                }
            })
            .collect();
        wishes.sort_by(|a, b| a.1.title.cmp(&b.1.title));
        wishes
    }
}
