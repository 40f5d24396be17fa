use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair, Signer};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use wishwall::config::{
    default_cluster_rpc_url, default_config_file_path, expand_tilde, get_config_value,
    load_config_with_overrides, read_config_or_default, save_default_config, set_config_value,
    write_config_file,
};
use wishwall::{derive_wish_address, ErrorClass, Submission, WishClient, WishConfig, WishError, WishRecord};

#[derive(Debug, Parser)]
#[command(name = "wishwall", version, about = "Record wishes on Solana")]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print the address a wish is stored at (offline)
    Address(AddressCmd),
    /// Record a wish on-chain
    Create(TitleCmd),
    /// Delete one of your wishes and reclaim its deposit
    Delete(TitleCmd),
    /// Show a single wish
    Show(ShowCmd),
    /// List the wishes recorded by an owner
    List(ListCmd),
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Generate a configuration file (TOML)
    Init(ConfigInitCmd),
    /// Get current config settings
    Get(ConfigGetCmd),
    /// Set a config setting
    Set(ConfigSetCmd),
}

#[derive(Debug, Args)]
struct ConfigInitCmd {
    /// Output path for the config file. Defaults to XDG config dir.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
    /// Overwrite existing file if present
    #[arg(long = "force")]
    force: bool,
    /// Cluster shortcut: devnet|testnet|mainnet-beta|localnet
    #[arg(long = "cluster")]
    cluster: Option<String>,
    /// RPC URL (overrides cluster default)
    #[arg(long = "rpc-url")]
    rpc_url: Option<String>,
    /// Path to Solana keypair (id.json)
    #[arg(long = "keypair")]
    keypair_path: Option<PathBuf>,
    /// Wish program id
    #[arg(long = "program-id")]
    program_id: Option<String>,
}

#[derive(Debug, Args)]
struct ConfigGetCmd {
    /// Optional config key to read. If omitted, prints full config.
    key: Option<String>,
}

#[derive(Debug, Args)]
struct ConfigSetCmd {
    /// Config key to set (cluster|rpc_url|fallback_rpc_urls|keypair_path|commitment|program_id|max_retries|retry_base_delay_ms)
    key: String,
    /// Value to set
    value: String,
}

#[derive(Debug, Args)]
struct Connection {
    /// RPC URL (overrides config and env)
    #[arg(long = "rpc-url")]
    rpc_url: Option<String>,
    /// Path to Solana keypair (id.json) (overrides config and env)
    #[arg(long = "keypair")]
    keypair_path: Option<PathBuf>,
    /// Wish program id (overrides config and env)
    #[arg(long = "program-id")]
    program_id: Option<String>,
}

impl Connection {
    fn config(&self) -> Result<WishConfig> {
        load_config_with_overrides(
            self.rpc_url.clone(),
            self.keypair_path.clone(),
            self.program_id.clone(),
        )
    }
}

#[derive(Debug, Args)]
struct TitleCmd {
    /// Wish text (at most 32 bytes)
    title: String,
    #[command(flatten)]
    connection: Connection,
}

#[derive(Debug, Args)]
struct AddressCmd {
    /// Wish text
    title: String,
    /// Owner public key. Defaults to the configured keypair.
    #[arg(long = "owner")]
    owner: Option<String>,
    #[command(flatten)]
    connection: Connection,
}

#[derive(Debug, Args)]
struct ShowCmd {
    /// Wish text
    title: String,
    /// Owner public key. Defaults to the configured keypair.
    #[arg(long = "owner")]
    owner: Option<String>,
    /// Also print the stored account bytes as hex
    #[arg(long = "raw")]
    raw: bool,
    #[command(flatten)]
    connection: Connection,
}

#[derive(Debug, Args)]
struct ListCmd {
    /// Owner public key. Defaults to the configured keypair.
    #[arg(long = "owner")]
    owner: Option<String>,
    /// Print JSON instead of text
    #[arg(long = "json")]
    json: bool,
    #[command(flatten)]
    connection: Connection,
}

#[derive(Serialize)]
struct ListedWish<'a> {
    address: String,
    #[serde(flatten)]
    record: &'a WishRecord,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_keypair(cfg: &WishConfig) -> Result<Keypair> {
    read_keypair_file(&cfg.keypair_path)
        .map_err(|e| anyhow!("read keypair at {}: {}", cfg.keypair_path.display(), e))
}

fn resolve_owner(owner: Option<&str>, cfg: &WishConfig) -> Result<Pubkey> {
    match owner {
        Some(owner) => Pubkey::from_str(owner).map_err(|e| anyhow!("parse owner {owner}: {e}")),
        None => Ok(load_keypair(cfg)?.pubkey()),
    }
}

fn print_submission(action: &str, title: &str, submission: Submission) {
    match submission {
        Submission::Confirmed(signature) => println!("Signature={signature}"),
        Submission::AlreadyApplied => println!("{action} of \"{title}\" had already been applied"),
    }
}

/// Caller guidance for failures the program reports.
fn hint(err: &anyhow::Error) -> Option<&'static str> {
    let class = err.downcast_ref::<WishError>()?.class();
    Some(match class {
        ErrorClass::Validation => "check the title and program id",
        ErrorClass::Authorization => "only the key that created a wish can delete it",
        ErrorClass::StateConflict => "a previous submission may already have taken effect",
        ErrorClass::Resource => "fund the keypair and try again",
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli).inspect_err(|err| {
        if let Some(hint) = hint(err) {
            eprintln!("hint: {hint}");
        }
    })
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Config(cmd) => match cmd {
            ConfigCommand::Init(cmd) => {
                let mut cfg = WishConfig::default();
                if let Some(cluster) = cmd.cluster.as_deref() {
                    cfg.cluster = cluster.to_string();
                    cfg.rpc_url = default_cluster_rpc_url(cluster);
                }
                if let Some(rpc) = cmd.rpc_url.as_deref() {
                    cfg.rpc_url = rpc.to_string();
                }
                if let Some(path) = cmd.keypair_path.as_deref() {
                    cfg.keypair_path = expand_tilde(path);
                }
                if let Some(program_id) = cmd.program_id.as_deref() {
                    set_config_value(&mut cfg, "program_id", program_id)?;
                }

                let output_path = cmd
                    .output
                    .as_deref()
                    .map(expand_tilde)
                    .unwrap_or_else(default_config_file_path);

                write_config_file(&output_path, &cfg, cmd.force)?;
                println!(
                    "Wrote config to {}\ncluster={}\nrpc_url={}\nkeypair_path={}\nprogram_id={}",
                    output_path.display(),
                    cfg.cluster,
                    cfg.rpc_url,
                    cfg.keypair_path.display(),
                    cfg.program_id
                );
                Ok(())
            }
            ConfigCommand::Get(cmd) => {
                let cfg = read_config_or_default()?;
                if !default_config_file_path().exists() {
                    save_default_config(&cfg).ok();
                }
                if let Some(key) = cmd.key.as_deref() {
                    let value = get_config_value(&cfg, key)?;
                    println!("{}", value);
                } else {
                    let toml_string = toml::to_string_pretty(&cfg)?;
                    println!("{}", toml_string);
                }
                Ok(())
            }
            ConfigCommand::Set(cmd) => {
                let mut cfg = read_config_or_default()?;
                set_config_value(&mut cfg, &cmd.key, &cmd.value)?;
                save_default_config(&cfg)?;
                println!("updated {}", cmd.key);
                Ok(())
            }
        },
        Commands::Address(cmd) => {
            let cfg = cmd.connection.config()?;
            let owner = resolve_owner(cmd.owner.as_deref(), &cfg)?;
            let (address, bump) = derive_wish_address(&cfg.program_id()?, &owner, &cmd.title)?;
            println!("Address={address}\nBump={bump}");
            Ok(())
        }
        Commands::Create(cmd) => {
            let cfg = cmd.connection.config()?;
            let payer = load_keypair(&cfg)?;
            let client = WishClient::from_config(&cfg)?;
            let submission = client.create_wish(&payer, &cmd.title)?;
            info!(title = cmd.title.as_str(), "create finished");
            print_submission("create", &cmd.title, submission);
            Ok(())
        }
        Commands::Delete(cmd) => {
            let cfg = cmd.connection.config()?;
            let payer = load_keypair(&cfg)?;
            let client = WishClient::from_config(&cfg)?;
            let submission = client.delete_wish(&payer, &cmd.title)?;
            info!(title = cmd.title.as_str(), "delete finished");
            print_submission("delete", &cmd.title, submission);
            Ok(())
        }
        Commands::Show(cmd) => {
            let cfg = cmd.connection.config()?;
            let owner = resolve_owner(cmd.owner.as_deref(), &cfg)?;
            let client = WishClient::from_config(&cfg)?;
            match client.fetch_wish(&owner, &cmd.title)? {
                Some((address, record)) => {
                    println!("Address={address}\nOwner={}\nTitle={}", record.owner, record.title);
                    if cmd.raw {
                        println!("Data={}", hex::encode(record.encode()?));
                    }
                }
                None => return Err(WishError::NotFound.into()),
            }
            Ok(())
        }
        Commands::List(cmd) => {
            let cfg = cmd.connection.config()?;
            let owner = resolve_owner(cmd.owner.as_deref(), &cfg)?;
            let client = WishClient::from_config(&cfg)?;
            let wishes = client.wishes_of(&owner)?;
            if cmd.json {
                let listed: Vec<_> = wishes
                    .iter()
                    .map(|(address, record)| ListedWish {
                        address: address.to_string(),
                        record,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&listed)?);
            } else {
                for (address, record) in &wishes {
                    println!("{address}  {}", record.title);
                }
                info!(count = wishes.len(), %owner, "listed wishes");
            }
            Ok(())
        }
    }
}
