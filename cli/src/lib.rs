//! Wishes recorded on Solana at deterministic, owner-bound program addresses.
//!
//! A wish is stored at `derive(["wish", owner, title])` under the wish program
//! and can only be removed by the key that created it. [`processor`] holds the
//! program logic over an abstract [`ledger`]; [`client`] drives the deployed
//! program over RPC.

pub mod client;
pub mod config;
pub mod error;
pub mod instruction;
pub mod ledger;
pub mod pda;
pub mod processor;
pub mod record;

pub use client::{RetryPolicy, Submission, WishClient};
pub use config::{ConfigError, WishConfig};
pub use error::{ErrorClass, WishError};
pub use instruction::WishInstruction;
pub use ledger::{Ledger, MemoryLedger};
pub use pda::{derive_wish_address, WISH_SEED};
pub use processor::{SignedInstruction, WishProgram};
pub use record::{WishRecord, MAX_TITLE_LEN};
