use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::client::RetryPolicy;

/// Program id of the deployed wall-of-wish program.
pub const DEFAULT_PROGRAM_ID: &str = "HZSqkqsgtJkFLwgyFMQHHbFEsU9jPdGZgBTpbrVRwJ8U";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file exists: {0}")]
    ConfigExists(String),
    #[error("config not found: {0}")]
    ConfigNotFound(String),
    #[error("unknown config key: {0}")]
    UnknownConfigKey(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishConfig {
    pub cluster: String,
    pub rpc_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_rpc_urls: Vec<String>,
    pub keypair_path: PathBuf,
    pub commitment: String,
    #[serde(default = "default_program_id")]
    pub program_id: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_program_id() -> String {
    DEFAULT_PROGRAM_ID.to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

impl Default for WishConfig {
    fn default() -> Self {
        Self {
            cluster: "devnet".to_string(),
            rpc_url: default_cluster_rpc_url("devnet"),
            fallback_rpc_urls: Vec::new(),
            keypair_path: default_solana_keypair_path(),
            commitment: "confirmed".to_string(),
            program_id: default_program_id(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl WishConfig {
    pub fn program_id(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.program_id)
            .with_context(|| format!("parse program id {}", self.program_id))
    }

    pub fn commitment(&self) -> Result<CommitmentConfig> {
        CommitmentConfig::from_str(&self.commitment)
            .map_err(|_| invalid_value("commitment", &self.commitment).into())
    }

    /// Primary endpoint first, then fallbacks, without duplicates.
    pub fn endpoints(&self) -> Vec<String> {
        let mut endpoints = vec![self.rpc_url.clone()];
        for url in &self.fallback_rpc_urls {
            if !endpoints.contains(url) {
                endpoints.push(url.clone());
            }
        }
        endpoints
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries.max(1),
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            ..RetryPolicy::default()
        }
    }
}

fn invalid_value(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

pub fn write_config_file(path: &Path, cfg: &WishConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(ConfigError::ConfigExists(path.display().to_string()).into());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let toml_string = toml::to_string_pretty(cfg)?;
    let mut file = fs::File::create(path)
        .with_context(|| format!("create file {}", path.display()))?;
    file.write_all(toml_string.as_bytes())
        .with_context(|| format!("write file {}", path.display()))?;
    Ok(())
}

pub fn save_default_config(cfg: &WishConfig) -> Result<()> {
    let path = default_config_file_path();
    write_config_file(&path, cfg, true)
}

pub fn read_config_file() -> Result<WishConfig> {
    read_config_from(&default_config_file_path())
}

pub fn read_config_from(path: &Path) -> Result<WishConfig> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound(path.display().to_string()).into());
    }
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: WishConfig =
        toml::from_str(&text).with_context(|| format!("parse TOML at {}", path.display()))?;
    Ok(cfg)
}

/// The config at `path`, or defaults when no file exists there yet. A file
/// that exists but cannot be read or parsed is an error.
pub fn read_config_or_default_from(path: &Path) -> Result<WishConfig> {
    match read_config_from(path) {
        Err(err)
            if matches!(
                err.downcast_ref::<ConfigError>(),
                Some(ConfigError::ConfigNotFound(_))
            ) =>
        {
            Ok(WishConfig::default())
        }
        result => result,
    }
}

pub fn read_config_or_default() -> Result<WishConfig> {
    read_config_or_default_from(&default_config_file_path())
}

pub fn load_config_with_overrides(
    rpc_url: Option<String>,
    keypair_path: Option<PathBuf>,
    program_id: Option<String>,
) -> Result<WishConfig> {
    let mut cfg = read_config_or_default()?;
    if let Some(rpc) = rpc_url {
        cfg.rpc_url = rpc;
    } else if let Some(env_rpc) = non_empty_env("SOLANA_RPC_URL") {
        cfg.rpc_url = env_rpc;
    }
    if let Some(kp) = keypair_path.as_deref().map(expand_tilde) {
        cfg.keypair_path = kp;
    } else if let Some(env_kp) = non_empty_env("SOLANA_KEYPAIR") {
        cfg.keypair_path = expand_tilde(Path::new(&env_kp));
    }
    if let Some(id) = program_id {
        cfg.program_id = id;
    } else if let Some(env_id) = non_empty_env("WISHWALL_PROGRAM_ID") {
        cfg.program_id = env_id;
    }
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn get_config_value(cfg: &WishConfig, key: &str) -> Result<String> {
    match key {
        "cluster" => Ok(cfg.cluster.clone()),
        "rpc_url" => Ok(cfg.rpc_url.clone()),
        "fallback_rpc_urls" => Ok(cfg.fallback_rpc_urls.join(",")),
        "keypair_path" => Ok(cfg.keypair_path.display().to_string()),
        "commitment" => Ok(cfg.commitment.clone()),
        "program_id" => Ok(cfg.program_id.clone()),
        "max_retries" => Ok(cfg.max_retries.to_string()),
        "retry_base_delay_ms" => Ok(cfg.retry_base_delay_ms.to_string()),
        _ => Err(ConfigError::UnknownConfigKey(key.to_string()).into()),
    }
}

pub fn set_config_value(cfg: &mut WishConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "cluster" => {
            cfg.cluster = value.to_string();
            cfg.rpc_url = default_cluster_rpc_url(value);
        }
        "rpc_url" => cfg.rpc_url = value.to_string(),
        "fallback_rpc_urls" => {
            cfg.fallback_rpc_urls = value
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect()
        }
        "keypair_path" => cfg.keypair_path = expand_tilde(Path::new(value)),
        "commitment" => {
            CommitmentConfig::from_str(value).map_err(|_| invalid_value(key, value))?;
            cfg.commitment = value.to_string();
        }
        "program_id" => {
            Pubkey::from_str(value).map_err(|_| invalid_value(key, value))?;
            cfg.program_id = value.to_string();
        }
        "max_retries" => cfg.max_retries = value.parse().map_err(|_| invalid_value(key, value))?,
        "retry_base_delay_ms" => {
            cfg.retry_base_delay_ms = value.parse().map_err(|_| invalid_value(key, value))?
        }
        _ => return Err(ConfigError::UnknownConfigKey(key.to_string()).into()),
    }
    Ok(())
}

pub fn default_config_file_path() -> PathBuf {
    xdg_config_home().join("wishwall").join("config.toml")
}

pub fn xdg_config_home() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = xdg.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    let home = dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".config")
}

pub fn default_solana_keypair_path() -> PathBuf {
    if let Some(env_kp) = non_empty_env("SOLANA_KEYPAIR") {
        return expand_tilde(Path::new(&env_kp));
    }
    xdg_config_home().join("solana").join("id.json")
}

pub fn default_cluster_rpc_url(cluster: &str) -> String {
    match cluster {
        "mainnet" | "mainnet-beta" => "https://api.mainnet-beta.solana.com".to_string(),
        "testnet" => "https://api.testnet.solana.com".to_string(),
        "localnet" | "local" => "http://127.0.0.1:8899".to_string(),
        _ => "https://api.devnet.solana.com".to_string(),
    }
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    let p = path.to_string_lossy();
    if let Some(stripped) = p.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rpc_for_devnet() {
        assert_eq!(default_cluster_rpc_url("devnet"), "https://api.devnet.solana.com");
    }

    #[test]
    fn default_program_id_parses() {
        let cfg = WishConfig::default();
        assert_eq!(cfg.program_id().unwrap().to_string(), DEFAULT_PROGRAM_ID);
        assert_eq!(cfg.commitment().unwrap(), CommitmentConfig::confirmed());
    }

    #[test]
    fn endpoints_deduplicate_fallbacks() {
        let mut cfg = WishConfig::default();
        set_config_value(
            &mut cfg,
            "fallback_rpc_urls",
            "https://a.example, https://api.devnet.solana.com,,https://b.example",
        )
        .unwrap();
        assert_eq!(
            cfg.endpoints(),
            [
                "https://api.devnet.solana.com",
                "https://a.example",
                "https://b.example"
            ]
        );
    }

    #[test]
    fn set_rejects_bad_values() {
        let mut cfg = WishConfig::default();
        assert!(set_config_value(&mut cfg, "program_id", "not-a-key").is_err());
        assert!(set_config_value(&mut cfg, "max_retries", "-1").is_err());
        assert!(set_config_value(&mut cfg, "commitment", "eventually").is_err());
        assert!(set_config_value(&mut cfg, "colour", "blue").is_err());
        assert_eq!(cfg, WishConfig::default());
    }

    #[test]
    fn cluster_switch_updates_rpc() {
        let mut cfg = WishConfig::default();
        set_config_value(&mut cfg, "cluster", "localnet").unwrap();
        assert_eq!(cfg.rpc_url, "http://127.0.0.1:8899");
    }

    #[test]
    fn file_round_trip_keeps_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = WishConfig::default();
        cfg.fallback_rpc_urls = vec!["https://a.example".to_string()];
        cfg.max_retries = 2;
        write_config_file(&path, &cfg, false).unwrap();
        assert_eq!(read_config_from(&path).unwrap(), cfg);

        let err = write_config_file(&path, &cfg, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ConfigExists(_))
        ));
    }

    #[test]
    fn only_a_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(read_config_or_default_from(&path).unwrap(), WishConfig::default());

        let broken = "rpc_url = \"http://my-node:8899\"\nmax_retries = \"oops\"\n";
        fs::write(&path, broken).unwrap();
        let err = read_config_or_default_from(&path).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_none());
        assert_eq!(fs::read_to_string(&path).unwrap(), broken);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: WishConfig = toml::from_str(
            "cluster = \"devnet\"\nrpc_url = \"http://x\"\nkeypair_path = \"/k.json\"\ncommitment = \"finalized\"\n",
        )
        .unwrap();
        assert_eq!(cfg.program_id, DEFAULT_PROGRAM_ID);
        assert_eq!(cfg.max_retries, 5);
        assert!(cfg.fallback_rpc_urls.is_empty());
    }
}
