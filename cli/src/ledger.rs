//! Account storage the wish program runs against.
//!
//! The program keeps no state between invocations. Everything it reads comes
//! from a [`Ledger`], and everything it changes is handed back as one batch
//! of writes that the ledger applies all-or-nothing.

use std::collections::HashMap;

use solana_sdk::account::Account;
use solana_sdk::pubkey::Pubkey;

/// Replace (`Some`) or remove (`None`) the account at an address.
pub type AccountWrite = (Pubkey, Option<Account>);

pub trait Ledger {
    fn account(&self, address: &Pubkey) -> Option<Account>;

    /// Apply every write or none of them.
    fn commit(&mut self, writes: Vec<AccountWrite>);

    /// Every account owned by `program_id`, in no particular order.
    fn program_accounts(&self, program_id: &Pubkey) -> Vec<(Pubkey, Account)>;

    fn lamports(&self, address: &Pubkey) -> u64 {
        self.account(address).map_or(0, |account| account.lamports)
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    accounts: HashMap<Pubkey, Account>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `lamports` to a system-owned account, creating it if absent.
    pub fn airdrop(&mut self, address: &Pubkey, lamports: u64) {
        let account = self
            .accounts
            .entry(*address)
            .or_insert_with(|| Account::new(0, 0, &solana_sdk::system_program::ID));
        account.lamports = account.lamports.saturating_add(lamports);
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl Ledger for MemoryLedger {
    fn account(&self, address: &Pubkey) -> Option<Account> {
        self.accounts.get(address).cloned()
    }

    fn commit(&mut self, writes: Vec<AccountWrite>) {
        for (address, account) in writes {
            match account {
                Some(account) => {
                    self.accounts.insert(address, account);
                }
                None => {
                    self.accounts.remove(&address);
                }
            }
        }
    }

    fn program_accounts(&self, program_id: &Pubkey) -> Vec<(Pubkey, Account)> {
        self.accounts
            .iter()
            .filter(|(_, account)| account.owner == *program_id)
            .map(|(address, account)| (*address, account.clone()))
            .collect()
    }
}
