//! Ledger RPC access for the wish program.
//!
//! Transport failures are retried with exponential backoff, rotating through
//! the configured endpoints. Program failures are never retried: they come
//! back as [`WishError`] inside the returned `anyhow::Error`.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_config::RpcProgramAccountsConfig;
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_client::rpc_request::RpcError;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::{Instruction, InstructionError};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::{Transaction, TransactionError};
use tracing::{debug, info, warn};

use crate::config::WishConfig;
use crate::error::WishError;
use crate::instruction::{create_wish, delete_wish};
use crate::pda::derive_wish_address;
use crate::record::{WishRecord, OWNER_OFFSET};

const NODE_UNHEALTHY: i64 = -32005;
const BLOCK_NOT_AVAILABLE: i64 = -32004;
const TOO_MANY_REQUESTS: u16 = 429;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Wait before retrying after failed attempt `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Result of a state-changing submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Confirmed(Signature),
    /// An earlier attempt whose outcome was unknown turned out to have landed.
    AlreadyApplied,
}

/// Whether `err` is a transport hiccup worth retrying on another endpoint.
pub fn is_transient(err: &ClientError) -> bool {
    match err.kind() {
        ClientErrorKind::Io(_) => true,
        ClientErrorKind::Reqwest(err) => {
            err.is_timeout()
                || err.is_connect()
                || err.status().is_some_and(|status| {
                    status.as_u16() == TOO_MANY_REQUESTS || status.is_server_error()
                })
        }
        ClientErrorKind::RpcError(RpcError::RpcResponseError { code, .. }) => {
            matches!(*code, NODE_UNHEALTHY | BLOCK_NOT_AVAILABLE) || *code == TOO_MANY_REQUESTS as i64
        }
        ClientErrorKind::RpcError(RpcError::ForUser(message)) => {
            message.starts_with("unable to confirm transaction")
        }
        _ => false,
    }
}

/// Map a failed transaction back onto the wish error it represents.
pub fn wish_error_from_transaction(err: &TransactionError) -> Option<WishError> {
    match err {
        TransactionError::InstructionError(_, err) => wish_error_from_instruction(err),
        TransactionError::InsufficientFundsForFee
        | TransactionError::InsufficientFundsForRent { .. } => Some(WishError::InsufficientFunds),
        _ => None,
    }
}

fn wish_error_from_instruction(err: &InstructionError) -> Option<WishError> {
    match err {
        InstructionError::Custom(code) => match *code {
            // system program: AccountAlreadyInUse, ResultWithNegativeLamports
            0 => Some(WishError::AlreadyExists),
            1 => Some(WishError::InsufficientFunds),
            // anchor: ConstraintSeeds, AccountDiscriminatorMismatch,
            // AccountDidNotDeserialize, AccountNotInitialized
            2006 => Some(WishError::AddressMismatch),
            3002 => Some(WishError::WrongAccountType),
            3003 => Some(WishError::CorruptRecord),
            3012 => Some(WishError::NotFound),
            code => WishError::from_code(code),
        },
        InstructionError::InsufficientFunds => Some(WishError::InsufficientFunds),
        InstructionError::MissingRequiredSignature => Some(WishError::Unauthorized),
        _ => None,
    }
}

struct Failure {
    error: anyhow::Error,
    /// At least one attempt failed in transit and may still have landed.
    ambiguous: bool,
}

pub struct WishClient {
    clients: Vec<(String, RpcClient)>,
    program_id: Pubkey,
    retry: RetryPolicy,
}

impl WishClient {
    pub fn new(
        endpoints: Vec<String>,
        commitment: CommitmentConfig,
        program_id: Pubkey,
        retry: RetryPolicy,
    ) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(anyhow!("no RPC endpoint configured"));
        }
        let clients = endpoints
            .into_iter()
            .map(|url| {
                let client = RpcClient::new_with_commitment(url.clone(), commitment);
                (url, client)
            })
            .collect();
        Ok(Self {
            clients,
            program_id,
            retry,
        })
    }

    pub fn from_config(cfg: &WishConfig) -> Result<Self> {
        Self::new(
            cfg.endpoints(),
            cfg.commitment()?,
            cfg.program_id()?,
            cfg.retry_policy(),
        )
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    fn call<T>(
        &self,
        op: &str,
        mut f: impl FnMut(&RpcClient) -> std::result::Result<T, ClientError>,
    ) -> std::result::Result<T, Failure> {
        let mut ambiguous = false;
        let mut attempt = 0;
        loop {
            let (url, client) = &self.clients[attempt as usize % self.clients.len()];
            debug!(op, url = url.as_str(), attempt, "rpc call");
            let err = match f(client) {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if let Some(wish_err) = err
                .get_transaction_error()
                .as_ref()
                .and_then(wish_error_from_transaction)
            {
                return Err(Failure {
                    error: wish_err.into(),
                    ambiguous,
                });
            }
            attempt += 1;
            if !is_transient(&err) || attempt >= self.retry.max_attempts {
                return Err(Failure {
                    error: anyhow::Error::from(err).context(format!("{op} via {url}")),
                    ambiguous,
                });
            }
            ambiguous = true;
            let delay = self.retry.delay(attempt - 1);
            warn!(op, url = url.as_str(), %err, ?delay, "transient rpc failure, rotating endpoint");
            std::thread::sleep(delay);
        }
    }

    fn send(&self, payer: &Keypair, instruction: Instruction) -> std::result::Result<Signature, Failure> {
        self.call("send transaction", |client| {
            let blockhash = client.get_latest_blockhash()?;
            let transaction = Transaction::new_signed_with_payer(
                &[instruction.clone()],
                Some(&payer.pubkey()),
                &[payer],
                blockhash,
            );
            client.send_and_confirm_transaction(&transaction)
        })
    }

    pub fn create_wish(&self, payer: &Keypair, title: &str) -> Result<Submission> {
        let instruction = create_wish(&self.program_id, &payer.pubkey(), title)?;
        match self.send(payer, instruction) {
            Ok(signature) => {
                info!(%signature, title, "wish created");
                Ok(Submission::Confirmed(signature))
            }
            Err(failure) => {
                let expected = WishRecord::new(payer.pubkey(), title);
                reconcile_create(failure, &expected, || {
                    self.fetch_wish(&expected.owner, title)
                        .map(|found| found.map(|(_, record)| record))
                })
            }
        }
    }

    pub fn delete_wish(&self, payer: &Keypair, title: &str) -> Result<Submission> {
        let instruction = delete_wish(&self.program_id, &payer.pubkey(), title)?;
        match self.send(payer, instruction) {
            Ok(signature) => {
                info!(%signature, title, "wish deleted");
                Ok(Submission::Confirmed(signature))
            }
            Err(failure) => reconcile_delete(failure),
        }
    }

    /// Read `owner`'s wish `title`, returning its address alongside.
    pub fn fetch_wish(&self, owner: &Pubkey, title: &str) -> Result<Option<(Pubkey, WishRecord)>> {
        let (address, _) = derive_wish_address(&self.program_id, owner, title)?;
        let account = self
            .call("get account", |client| {
                client
                    .get_account_with_commitment(&address, client.commitment())
                    .map(|response| response.value)
            })
            .map_err(|failure| failure.error)?;
        match account {
            Some(account) if account.owner == self.program_id => {
                let record = WishRecord::decode(&account.data)
                    .with_context(|| format!("decode wish at {address}"))?;
                Ok(Some((address, record)))
            }
            _ => Ok(None),
        }
    }

    /// Every wish recorded by `owner`, ordered by title.
    pub fn wishes_of(&self, owner: &Pubkey) -> Result<Vec<(Pubkey, WishRecord)>> {
        let accounts = self
            .call("get program accounts", |client| {
                let config = RpcProgramAccountsConfig {
                    filters: Some(vec![RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                        OWNER_OFFSET,
                        owner.as_ref(),
                    ))]),
                    ..RpcProgramAccountsConfig::default()
                };
                client.get_program_accounts_with_config(&self.program_id, config)
            })
            .map_err(|failure| failure.error)?;
        let mut wishes: Vec<_> = accounts
            .into_iter()
            .filter_map(|(address, account)| match WishRecord::decode(&account.data) {
                Ok(record) => Some((address, record)),
                Err(err) => {
                    warn!(%address, %err, "skipping undecodable account");
                    None
                }
            })
            .collect();
        wishes.sort_by(|a, b| a.1.title.cmp(&b.1.title));
        Ok(wishes)
    }
}

/// A create that failed in transit and then reported `AlreadyExists` may be
/// our own earlier attempt. It counts as applied only if the stored record is
/// the one we asked for; otherwise, or if it cannot be read, the submission
/// error stands.
fn reconcile_create(
    failure: Failure,
    expected: &WishRecord,
    fetch: impl FnOnce() -> Result<Option<WishRecord>>,
) -> Result<Submission> {
    if !failure.ambiguous || !is_wish_error(&failure.error, WishError::AlreadyExists) {
        return Err(failure.error);
    }
    match fetch() {
        Ok(Some(record)) if &record == expected => {
            info!(title = expected.title.as_str(), "earlier create attempt landed");
            Ok(Submission::AlreadyApplied)
        }
        Ok(_) => Err(failure.error),
        Err(err) => {
            warn!(%err, "could not read back wish after ambiguous create");
            Err(failure.error)
        }
    }
}

fn reconcile_delete(failure: Failure) -> Result<Submission> {
    if failure.ambiguous && is_wish_error(&failure.error, WishError::NotFound) {
        info!("earlier delete attempt landed");
        return Ok(Submission::AlreadyApplied);
    }
    Err(failure.error)
}

fn is_wish_error(err: &anyhow::Error, expected: WishError) -> bool {
    err.downcast_ref::<WishError>() == Some(&expected)
}
