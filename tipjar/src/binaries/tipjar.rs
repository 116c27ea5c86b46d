use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use tipjar::config::TipJarConfig;
use tipjar::ledger::{self, ContentStore, TipLedger};
use tipjar::logging::init_logging;
use tipjar::types::{
    ETHER_DECIMALS, Timestamp, WindowStatus, format_amount, parse_amount, short_address,
};
use tipjar::wallet::networks::{self, NetworkKey};
use tipjar::wallet::{ConnectionManager, RpcAgent, SigningAgent, build_signer};
use tipjar::{AdminOrchestrator, AdminOutcome, TipRequest, TippingOrchestrator};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[clap(long, short, default_value = "tipjar.toml")]
    config: PathBuf,

    /// Mnemonic of the wallet to sign with.
    #[clap(long, short, env = "TIPJAR_MNEMONIC", hide_env_values = true)]
    mnemonic: Option<String>,

    /// Account index to derive from the mnemonic.
    #[clap(long, short, default_value_t = 0)]
    index: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show balances, the leaderboard and the donation window.
    Status,
    /// Tip a post.
    Tip {
        #[clap(long)]
        post_id: String,
        #[clap(long)]
        title: String,
        /// Amount in the native currency, e.g. 0.001.
        #[clap(long, short)]
        amount: String,
        #[clap(long)]
        message: Option<String>,
    },
    /// Withdraw the contract balance (owner only).
    Withdraw {
        /// Skip the confirmation prompt.
        #[clap(long, short)]
        yes: bool,
    },
    /// Only accept donations between two RFC 3339 timestamps (owner only).
    SetWindow {
        #[clap(long)]
        start: jiff::Timestamp,
        #[clap(long)]
        end: jiff::Timestamp,
    },
    /// Accept donations at any time (owner only).
    DisableWindow,
    /// List supported networks.
    Networks,
    /// Ask the wallet to switch networks.
    Switch { network: NetworkKey },
    /// List recorded tips.
    Tips {
        #[clap(long)]
        post_id: Option<String>,
    },
    /// List published posts.
    Posts,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let cfg = TipJarConfig::read(&cli.config).await?;

    match &cli.command {
        Command::Networks => {
            for n in networks::catalog() {
                println!("{:<18} {:>9}  {}", n.key, n.chain_id, n.name);
            }
            return Ok(());
        }
        Command::Tips { post_id } => {
            let client = ledger_client(&cfg)?;
            let tips = match post_id {
                Some(p) => client.list_by_post(p).await?,
                None => client.list_all().await?,
            };
            for t in tips {
                println!("{}", serde_json::to_string(&t)?);
            }
            return Ok(());
        }
        Command::Posts => {
            let client = ledger_client(&cfg)?;
            for p in client.list_published().await? {
                println!("{:<32} {}", p.slug, p.title);
            }
            return Ok(());
        }
        _ => {}
    }

    let reloaded = Arc::new(AtomicBool::new(false));
    let conn = connect(&cli, &cfg, reloaded.clone()).await?;

    match cli.command {
        Command::Status => {
            let mut tipping = tipping(&conn, &cfg)?;
            let view = tipping.refresh().await.map_err(user)?.view(ETHER_DECIMALS);
            print!("{view}");
            let status = match view.window_status(Timestamp::now()) {
                WindowStatus::Unrestricted | WindowStatus::Open => "open",
                WindowStatus::NotYetOpen => "not yet open",
                WindowStatus::Closed => "closed",
            };
            println!("donations:        {status}");
            let mut admin = AdminOrchestrator::new(conn.clone(), cfg.contract.address, cfg.chain.id);
            if admin.is_owner().await.map_err(user)? {
                println!("you own this tip jar");
            }
        }
        Command::Tip {
            post_id,
            title,
            amount,
            message,
        } => {
            let mut tipping = tipping(&conn, &cfg)?;
            let req = TipRequest::builder()
                .post_id(post_id)
                .post_title(title)
                .amount(amount)
                .maybe_message(message)
                .build();
            let outcome = tipping.tip(req).await.map_err(user)?;
            println!("tx hash: {}", outcome.transfer.receipt.transaction_hash);
            if outcome.record.is_none() {
                println!("the tip went through but could not be recorded");
            }
        }
        Command::Withdraw { yes } => {
            let mut admin = AdminOrchestrator::new(conn.clone(), cfg.contract.address, cfg.chain.id);
            if !admin.is_owner().await.map_err(user)? {
                bail!("only the contract owner can withdraw")
            }
            if !yes {
                let balance = admin.refresh().await.map_err(user)?.contract_balance;
                let prompt = format!(
                    "Withdraw {} {} from the tip jar?",
                    format_amount(balance, ETHER_DECIMALS),
                    cfg.tipping.currency
                );
                if !Confirm::new().with_prompt(prompt).interact()? {
                    println!("withdrawal cancelled");
                    return Ok(());
                }
            }
            let outcome = admin.withdraw().await.map_err(user)?;
            println!("tx hash: {}", outcome.value.receipt.transaction_hash);
            report_refresh(&outcome);
        }
        Command::SetWindow { start, end } => {
            let mut admin = AdminOrchestrator::new(conn.clone(), cfg.contract.address, cfg.chain.id);
            let outcome = admin
                .set_donation_window(timestamp(start)?, timestamp(end)?)
                .await
                .map_err(user)?;
            println!("tx hash: {}", outcome.value.transaction_hash);
            report_refresh(&outcome);
        }
        Command::DisableWindow => {
            let mut admin = AdminOrchestrator::new(conn.clone(), cfg.contract.address, cfg.chain.id);
            let outcome = admin.disable_time_restriction().await.map_err(user)?;
            println!("tx hash: {}", outcome.value.transaction_hash);
            report_refresh(&outcome);
        }
        Command::Switch { network } => {
            networks::request_switch(&conn, network)
                .await
                .map_err(|e| user(e.into()))?;
            let name = networks::get(network).name;
            if reloaded.load(Ordering::SeqCst) {
                println!("switched to {name}");
            } else {
                println!("already on {name}");
            }
        }
        Command::Networks | Command::Tips { .. } | Command::Posts => {}
    }

    Ok(())
}

async fn connect(cli: &Cli, cfg: &TipJarConfig, reloaded: Arc<AtomicBool>) -> Result<ConnectionManager> {
    let Some(mnemonic) = cli.mnemonic.clone() else {
        bail!("this command needs a wallet, pass --mnemonic or set TIPJAR_MNEMONIC")
    };
    let signer = build_signer(mnemonic, cli.index).context("failed to build signer")?;
    let agent = RpcAgent::new(signer, cfg.chain.rpc_url.clone())
        .with_endpoint(cfg.chain.id, cfg.chain.rpc_url.clone());
    let agents: Vec<Arc<dyn SigningAgent>> = vec![Arc::new(agent)];
    let conn = ConnectionManager::new(agents, move || {
        info!("chain changed, discarding chain bound state");
        reloaded.store(true, Ordering::SeqCst)
    });
    let session = match conn.restore().await {
        Some(s) => s,
        None => conn.connect().await.map_err(|e| user(e.into()))?,
    };
    info!(
        address = %short_address(&session.address()),
        network = %networks::network_name(session.chain_id()),
        "connected"
    );
    Ok(conn)
}

fn tipping(conn: &ConnectionManager, cfg: &TipJarConfig) -> Result<TippingOrchestrator> {
    let min = parse_amount(&cfg.tipping.min_amount, ETHER_DECIMALS).context("invalid min-amount")?;
    Ok(TippingOrchestrator::builder()
        .connection(conn.clone())
        .contract(cfg.contract.address)
        .chain_id(cfg.chain.id)
        .ledger(Arc::new(ledger_client(cfg)?))
        .author(cfg.tipping.author_address)
        .min_amount(min)
        .currency(cfg.tipping.currency.clone())
        .build())
}

fn ledger_client(cfg: &TipJarConfig) -> Result<ledger::Client> {
    let c = ledger::Config::builder()
        .base_url(cfg.ledger.base_url.as_str())?
        .timeout(cfg.ledger.timeout())
        .build();
    Ok(ledger::Client::new(c)?)
}

fn report_refresh<T>(outcome: &AdminOutcome<T>) {
    if !outcome.refreshed {
        println!("the transaction went through but the contract state could not be reloaded");
    }
}

fn timestamp(ts: jiff::Timestamp) -> Result<Timestamp> {
    let s: u64 = ts.as_second().try_into().context("negative timestamp")?;
    Ok(Timestamp::from(s))
}

/// Lead with the short message, keep the details in the chain.
fn user(err: tipjar::Error) -> anyhow::Error {
    warn!(%err, kind = ?err.kind(), "command failed");
    let msg = err.user_message();
    anyhow::Error::new(err).context(msg)
}
