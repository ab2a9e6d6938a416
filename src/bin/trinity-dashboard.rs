#![forbid(unsafe_code)]
//! Terminal dashboard for a TrinityChain node

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use trinity_dashboard::config::load_config;
use trinity_dashboard::dashboard::{BlockDetailPanel, BlockList, DashboardView, SearchResult};
use trinity_dashboard::mining::MiningPanel;
use trinity_dashboard::price::PriceHistory;
use trinity_dashboard::wallet::WalletPanel;
use trinity_dashboard::{Presenter, Session};

/// Launch parameter handed over by whatever started the dashboard.
const LAUNCH_PARAM_ENV: &str = "TRINITY_START_PARAM";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to dashboard.toml
    #[arg(long)]
    config: Option<PathBuf>,
    /// API base, overrides everything else
    #[arg(long)]
    api: Option<String>,
    /// Page URL whose `api` query parameter names the API base
    #[arg(long)]
    page_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shows chain stats and the most recent blocks
    Stats,
    /// Shows one block by height
    Block { height: u64 },
    /// Finds a block by height or hash
    Search { query: String },
    /// Wallet commands
    Wallet {
        #[command(subcommand)]
        command: WalletCommands,
    },
    /// Signs and submits a transfer
    Send {
        /// Wallet JSON file to sign with
        #[arg(long)]
        wallet: PathBuf,
        to: String,
        amount: String,
    },
    /// Mining commands
    Mining {
        #[command(subcommand)]
        command: MiningCommands,
    },
    /// Keeps all panels refreshing until Ctrl-C
    Watch {
        /// Wallet JSON file whose balance to follow
        #[arg(long)]
        wallet: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Asks the node for a new wallet
    Create {
        /// Where to save the wallet JSON
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Loads a wallet JSON file and shows its balance
    Load { path: PathBuf },
}

#[derive(Subcommand)]
enum MiningCommands {
    Status,
    Start {
        /// Miner address; defaults to cli_miner_address from the config
        address: Option<String>,
    },
    Stop,
}

struct TerminalPresenter;

impl Presenter for TerminalPresenter {
    fn dashboard(&self, view: &DashboardView) {
        print_dashboard(view);
    }

    fn mining(&self, panel: &MiningPanel) {
        print_mining(panel);
    }

    fn wallet(&self, panel: &WalletPanel) {
        print_wallet(panel);
    }

    fn price(&self, history: &PriceHistory) {
        if let Some(latest) = history.latest() {
            println!(
                "{} {} {}",
                "💲 BTC/USD".bright_cyan(),
                format!("{:.2}", latest.usd).bright_white().bold(),
                format!("({} samples)", history.len()).dimmed()
            );
        }
    }
}

fn print_dashboard(view: &DashboardView) {
    println!("{}", "📊 Chain".bright_cyan().bold());
    let status = if view.online {
        "online".bright_green()
    } else {
        "offline".red()
    };
    println!("  Status:      {}", status);
    println!("  Height:      {}", view.block_height.bright_white());
    println!("  UTXOs:       {}", view.utxo_count.bright_white());
    println!("  Difficulty:  {}", view.difficulty.bright_white());
    println!("  Total area:  {}", view.total_area.bright_white());
    match &view.blocks {
        BlockList::Items(items) => {
            for item in items {
                println!(
                    "  {} {} {} {}",
                    item.title.bright_yellow(),
                    item.time.dimmed(),
                    item.hash,
                    format!("{} txs", item.tx_count).dimmed()
                );
            }
        }
        BlockList::Message(message) => println!("  {}", message.yellow()),
    }
}

fn print_mining(panel: &MiningPanel) {
    let status = match panel.status.as_str() {
        "Active" => panel.status.bright_green(),
        "Error" => panel.status.red(),
        _ => panel.status.yellow(),
    };
    println!(
        "{} {}  blocks: {}  hashrate: {}  miner: {}",
        "⛏️  Mining".bright_cyan().bold(),
        status,
        panel.blocks_mined,
        panel.hashrate,
        panel.miner_address
    );
}

fn print_wallet(panel: &WalletPanel) {
    println!(
        "{} {}  balance: {}",
        "👛 Wallet".bright_cyan().bold(),
        panel.address.bright_white(),
        panel.balance.bright_green()
    );
}

fn print_block(panel: &BlockDetailPanel) {
    match panel {
        BlockDetailPanel::Loaded {
            title,
            hash,
            previous_hash,
            time,
            difficulty,
            nonce,
            transactions,
            empty_message,
        } => {
            println!("{}", title.bright_yellow().bold());
            println!("  Hash:        {}", hash);
            println!("  Previous:    {}", previous_hash);
            println!("  Time:        {}", time);
            println!("  Difficulty:  {}", difficulty);
            println!("  Nonce:       {}", nonce);
            for tx in transactions {
                println!("  {} {} {}", "•".bright_yellow(), tx.hash, tx.time.dimmed());
            }
            if let Some(message) = empty_message {
                println!("  {}", message.yellow());
            }
        }
        BlockDetailPanel::Unavailable(message) => println!("{}", message.red()),
    }
}

fn read_wallet(path: &PathBuf) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read wallet {}: {}", path.display(), e).into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let launch_param = cli.api.clone().or_else(|| std::env::var(LAUNCH_PARAM_ENV).ok());
    let session = Arc::new(Session::connect(
        config,
        launch_param.as_deref(),
        cli.page_url.as_deref(),
        Arc::new(TerminalPresenter),
    )?);

    match cli.command {
        Commands::Stats => {
            session.refresh_dashboard().await;
        }
        Commands::Block { height } => {
            print_block(&session.block_details(height).await);
        }
        Commands::Search { query } => match session.search(&query).await {
            Some(SearchResult::Found(item)) => {
                print_block(&session.block_details(item.height).await);
            }
            Some(SearchResult::NotFound(message)) => println!("{}", message.red()),
            None => println!("{}", "Enter a block height or hash".yellow()),
        },
        Commands::Wallet { command } => match command {
            WalletCommands::Create { out } => {
                session.create_wallet().await?;
                if let Some(out) = out {
                    std::fs::write(&out, session.export_wallet()?)?;
                    println!("{} {}", "💾 Saved to".bright_green(), out.display());
                }
            }
            WalletCommands::Load { path } => {
                session.load_wallet(&read_wallet(&path)?).await?;
            }
        },
        Commands::Send { wallet, to, amount } => {
            session.load_wallet(&read_wallet(&wallet)?).await?;
            let tx_hash = session.send(&to, &amount).await?;
            println!("{} {}", "✅ Sent! Transaction hash:".bright_green(), tx_hash);
        }
        Commands::Mining { command } => {
            session.poll_mining().await;
            match command {
                MiningCommands::Status => {}
                MiningCommands::Start { address: Some(address) } => {
                    session.start_mining(&address).await?;
                }
                MiningCommands::Start { address: None } => {
                    session.load_cli_wallet_address()?;
                    let address = session
                        .config()
                        .cli_miner_address
                        .clone()
                        .unwrap_or_default();
                    session.start_mining(&address).await?;
                }
                MiningCommands::Stop => {
                    session.stop_mining().await?;
                }
            }
        }
        Commands::Watch { wallet } => {
            if let Some(path) = wallet {
                session.load_wallet(&read_wallet(&path)?).await?;
            }
            let tasks = session.start();
            println!(
                "{}",
                "Refreshing; press Ctrl-C to exit.".bright_black()
            );
            tokio::signal::ctrl_c().await?;
            tasks.shutdown().await;
        }
    }

    Ok(())
}
