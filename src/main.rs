use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use ethers::types::{Address, H256};
use sendop::config::{load_config, BundlerConfig};
use sendop::encoding::{fmt_address, fmt_h256, parse_h256};
use sendop::{Bundler, UserOperation, UserOperationHandle, ENTRY_POINT_V07};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "sendop", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pack a UserOperation JSON file and print its hash (offline).
    Hash(HashArgs),

    /// Run the configured vendor's gas pricing on a draft UserOperation.
    Gas(GasArgs),

    /// Fetch (or wait for) a UserOperation receipt.
    Receipt(ReceiptArgs),

    /// List the entry points the bundler supports.
    EntryPoints(CommonArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Bundler config file (chainId, bundlerUrl, vendor, ...).
    #[arg(long, env = "SENDOP_CONFIG", default_value = "sendop.json")]
    config: PathBuf,

    /// Override the bundler URL (otherwise uses the config file).
    #[arg(long, env = "SENDOP_BUNDLER_URL")]
    bundler_url: Option<String>,
}

#[derive(Args, Debug)]
struct HashArgs {
    /// Unpacked UserOperation, as sent to `eth_sendUserOperation`.
    #[arg(long)]
    op: PathBuf,

    #[arg(long)]
    chain_id: u64,

    #[arg(long)]
    entry_point: Option<String>,

    /// Also print the packed struct.
    #[arg(long, default_value_t = false)]
    packed: bool,
}

#[derive(Args, Debug)]
struct GasArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Draft UserOperation (sender, nonce, callData, dummy signature, ...).
    #[arg(long)]
    op: PathBuf,
}

#[derive(Args, Debug)]
struct ReceiptArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// UserOperation hash.
    #[arg(long)]
    hash: String,

    /// Keep polling until the receipt is available.
    #[arg(long, default_value_t = false)]
    wait: bool,

    /// Give up waiting after this many seconds (0 = no limit).
    #[arg(long, default_value_t = 0)]
    max_wait_seconds: u64,

    #[arg(long, default_value_t = 1000)]
    poll_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        // stdout carries the JSON results
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Hash(args) => cmd_hash(args),
        Command::Gas(args) => cmd_gas(args).await,
        Command::Receipt(args) => cmd_receipt(args).await,
        Command::EntryPoints(args) => cmd_entry_points(args).await,
    }
}

fn cmd_hash(args: HashArgs) -> Result<()> {
    let op = read_op(&args.op)?;
    let entry_point = match args.entry_point.as_deref() {
        Some(s) => Address::from_str(s).context("invalid --entry-point address")?,
        None => ENTRY_POINT_V07,
    };

    let packed = op.pack();
    let hash = packed.hash(entry_point, args.chain_id);

    if args.packed {
        let out = serde_json::json!({
            "userOpHash": fmt_h256(hash),
            "entryPoint": fmt_address(entry_point),
            "chainId": args.chain_id,
            "packed": packed,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", fmt_h256(hash));
    }
    Ok(())
}

async fn cmd_gas(args: GasArgs) -> Result<()> {
    let cfg = config(&args.common)?;
    let op = read_op(&args.op)?;
    let bundler = cfg.bundler();
    tracing::info!(vendor = bundler.vendor(), url = %cfg.bundler_url, sender = ?op.sender, "estimating gas");

    let gas = bundler
        .get_gas_values(&op)
        .await
        .context("gas pricing failed")?;
    println!("{}", serde_json::to_string_pretty(&gas)?);
    Ok(())
}

async fn cmd_receipt(args: ReceiptArgs) -> Result<()> {
    let cfg = config(&args.common)?;
    let hash: H256 = parse_h256(&args.hash).context("invalid --hash")?;
    let bundler = cfg.bundler();

    let receipt = if args.wait {
        let handle = UserOperationHandle::new(hash, &bundler)
            .with_poll_interval(Duration::from_millis(args.poll_ms.max(1)));
        let token = CancellationToken::new();
        let ctrl_c = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });
        if args.max_wait_seconds > 0 {
            let deadline = token.clone();
            let limit = Duration::from_secs(args.max_wait_seconds);
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                deadline.cancel();
            });
        }

        tracing::info!(user_op_hash = %fmt_h256(hash), "waiting for receipt");
        Some(handle.wait_with_cancellation(&token).await?)
    } else {
        bundler.get_user_operation_receipt(hash).await?
    };

    match receipt {
        Some(r) => {
            println!("{}", serde_json::to_string_pretty(&r)?);
            if !r.success {
                return Err(anyhow!(
                    "user operation reverted: {}",
                    r.reason.as_deref().unwrap_or("no reason given")
                ));
            }
        }
        None => println!("null"),
    }
    Ok(())
}

async fn cmd_entry_points(args: CommonArgs) -> Result<()> {
    let cfg = config(&args)?;
    let bundler = cfg.bundler();

    let (entry_points, chain_id) =
        tokio::try_join!(bundler.supported_entry_points(), bundler.remote_chain_id())?;
    if chain_id != cfg.chain_id {
        return Err(anyhow!(
            "chainId mismatch: config has {}, bundler returned {}",
            cfg.chain_id,
            chain_id
        ));
    }

    for ep in &entry_points {
        let marker = if *ep == ENTRY_POINT_V07 { " (v0.7)" } else { "" };
        println!("{}{}", fmt_address(*ep), marker);
    }
    if !entry_points.contains(&ENTRY_POINT_V07) {
        tracing::warn!("bundler does not list EntryPoint v0.7");
    }
    Ok(())
}

fn config(args: &CommonArgs) -> Result<BundlerConfig> {
    load_config(&args.config, args.bundler_url.clone())
        .with_context(|| format!("failed to load config {}", args.config.display()))
}

fn read_op(path: &Path) -> Result<UserOperation> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read user operation at {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse user operation at {}", path.display()))
}
