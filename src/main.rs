//! EVM Transactor - build, sign and broadcast a transaction from the command line
//!
//! Usage:
//!   evm-transactor send <args.json> [last_used_nonce]
//!   evm-transactor raw <0x-encoded signed transaction>
//!   evm-transactor nonce <address>

use anyhow::{bail, Context, Result};
use ethers::types::Address;
use tracing::{info, warn};

use evm_transactor::{PrivateKeySigner, SendArgs, Settings, Transactor};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting EVM Transactor v{}", env!("CARGO_PKG_VERSION"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, rest) = match args.split_first() {
        Some((command, rest)) => (command.as_str(), rest),
        None => bail!("usage: evm-transactor <send|raw|nonce> ..."),
    };

    // Load configuration
    let settings = Settings::load()?;
    let transactor = Transactor::from_settings(&settings)
        .await
        .context("Failed to initialize transactor")?;

    match (command, rest) {
        ("send", [path, more @ ..]) => {
            let last_used_nonce = match more.first() {
                Some(n) => n.parse::<i64>().context("last_used_nonce must be an integer")?,
                None => -1,
            };
            send(&settings, &transactor, path, last_used_nonce).await
        }
        ("raw", [raw_tx]) => {
            transactor
                .send_raw_transaction(raw_tx)
                .await
                .context("Failed to send raw transaction")?;
            info!("Raw transaction submitted");
            Ok(())
        }
        ("nonce", [address]) => {
            let address: Address = address.parse().context("Invalid address")?;
            let nonce = transactor
                .next_nonce(transactor.chain_id(), address)
                .await
                .context("Failed to fetch nonce")?;
            println!("{}", nonce);
            Ok(())
        }
        _ => bail!("usage: evm-transactor <send|raw|nonce> ..."),
    }
}

async fn send(
    settings: &Settings,
    transactor: &Transactor,
    path: &str,
    last_used_nonce: i64,
) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read send arguments from {}", path))?;
    let args: SendArgs =
        serde_json::from_str(&content).context("Failed to parse send arguments")?;

    let signer = PrivateKeySigner::from_env(&settings.wallet.private_key_env)?;
    if signer.address() != args.from {
        bail!(
            "Wallet {:?} cannot sign for {:?}",
            signer.address(),
            args.from
        );
    }

    let outcome = transactor
        .send_transaction(&args, &signer, last_used_nonce)
        .await
        .context("Failed to send transaction")?;

    if let Some(e) = &outcome.tracking_error {
        warn!("Transaction sent but not tracked: {}", e);
    }

    println!("{:?} {}", outcome.tx_hash, outcome.nonce);
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,evm_transactor=debug,sqlx=warn,hyper=warn")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}
