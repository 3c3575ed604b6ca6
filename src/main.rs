//! Spread Trading Bot
//!
//! Paper-trades a single symbol: derives a buy target two spreads below the
//! mid price, sells at a fixed profit target, and persists the running
//! balance between runs.

mod api;
mod bot;
mod models;
mod store;
mod trading;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::api::{BybitClient, ReplayFeed};
use crate::bot::{Bot, BotConfig};
use crate::store::{BalanceStore, JsonFileStore, MemoryStore, SqliteStore};
use crate::trading::{TickResult, TradeEngine, TradingConfig};

/// Spread trading bot CLI.
#[derive(Parser)]
#[command(name = "spreadbot")]
#[command(about = "Paper-trade a fixed spread/profit heuristic against an exchange ticker", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "SPREADBOT_LOG_LEVEL")]
    log_level: String,

    /// Where the balance is persisted
    #[arg(long, value_enum, default_value = "json", env = "SPREADBOT_STORE")]
    store: StoreKind,

    /// Balance file for the json store
    #[arg(long, default_value = "balance.json", env = "SPREADBOT_BALANCE_FILE")]
    balance_file: PathBuf,

    /// Database URL for the sqlite store
    #[arg(long, default_value = "sqlite:./spreadbot.db?mode=rwc", env = "SPREADBOT_DATABASE")]
    database: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreKind {
    Json,
    Sqlite,
}

/// Overrides for the trading heuristic.
#[derive(Args, Clone)]
struct TradingArgs {
    /// Fixed profit target in quote currency
    #[arg(long, default_value = "30", env = "SPREADBOT_PROFIT_TARGET")]
    profit_target: Decimal,

    /// Fraction of the balance committed per trade (0-1)
    #[arg(long, default_value = "0.2", env = "SPREADBOT_ENTRY_FRACTION")]
    entry_fraction: Decimal,

    /// Fee percentage charged per leg (0-100)
    #[arg(long, default_value = "0.05", env = "SPREADBOT_FEE")]
    fee: Decimal,

    /// Balance used when nothing has been saved yet
    #[arg(long, default_value = "1000", env = "SPREADBOT_STARTING_BALANCE")]
    starting_balance: Decimal,
}

impl TradingArgs {
    fn to_config(&self) -> Result<TradingConfig> {
        let config = TradingConfig {
            profit_target: self.profit_target,
            entry_fraction: self.entry_fraction,
            fee_rate: self.fee / Decimal::ONE_HUNDRED,
            starting_balance: self.starting_balance,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the trading loop against the live exchange ticker
    Run {
        /// Exchange symbol
        #[arg(short, long, default_value = "BTCUSDT", env = "SPREADBOT_SYMBOL")]
        symbol: String,

        /// Polling interval in milliseconds
        #[arg(short, long, default_value = "3000", env = "SPREADBOT_INTERVAL_MS")]
        interval: u64,

        /// Override the exchange REST base URL (e.g. testnet)
        #[arg(long, env = "SPREADBOT_API_URL")]
        api_url: Option<String>,

        #[command(flatten)]
        trading: TradingArgs,
    },

    /// Replay recorded quotes through the trading loop
    Replay {
        /// JSON array of {"bid": .., "ask": ..} quotes
        #[arg(short, long)]
        file: PathBuf,

        /// Starting balance for the simulation
        #[arg(short, long, default_value = "1000")]
        capital: Decimal,

        #[command(flatten)]
        trading: TradingArgs,
    },

    /// Show the persisted balance and recent cycles
    Status {
        /// Number of recent cycles to show (sqlite store only)
        #[arg(short, long, default_value = "10")]
        limit: u32,

        /// Balance the next run starts from when nothing is saved
        #[arg(long, default_value = "1000", env = "SPREADBOT_STARTING_BALANCE")]
        starting_balance: Decimal,
    },

    /// Show the effective trading configuration
    Config {
        #[command(flatten)]
        trading: TradingArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // RUST_LOG, when set, overrides --log-level
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(log_level).into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            ref symbol,
            interval,
            ref api_url,
            ref trading,
        } => {
            let trading_config = trading.to_config()?;
            info!(
                symbol = %symbol,
                interval_ms = interval,
                "Starting spread trading bot"
            );

            let store = open_store(&cli).await?;
            let store_name = store.name();
            let engine = TradeEngine::open(trading_config.clone(), store).await?;

            let client = match api_url {
                Some(url) => BybitClient::with_base_url(url.clone())?,
                None => BybitClient::new()?,
            };

            let bot_config = BotConfig {
                symbol: symbol.clone(),
                poll_interval_ms: interval,
                trading_config,
            };
            let mut bot = Bot::new(bot_config, engine, Box::new(client));

            println!("\n=== Spread Trading Bot ===");
            println!("Symbol:           {}", symbol);
            println!("Polling interval: {}ms", interval);
            println!("Balance store:    {}", store_name);
            println!("Starting balance: {:.2}", bot.engine().balance());
            println!("Mode:             PAPER (no orders are placed)");
            println!("\nPress Ctrl+C to stop.\n");

            if let Err(e) = bot.run().await {
                tracing::error!(error = %e, "Bot error");
            }

            println!("\n{}", bot.stats());
        }

        Commands::Replay {
            ref file,
            capital,
            ref trading,
        } => {
            let trading_config = trading.to_config()?;
            let feed = ReplayFeed::from_file(file).await?;
            let total = feed.remaining();

            info!(file = %file.display(), quotes = total, "Starting replay");

            let store = Arc::new(MemoryStore::with_balance(capital));
            let engine = TradeEngine::open(trading_config.clone(), store.clone()).await?;
            let bot_config = BotConfig {
                trading_config,
                ..Default::default()
            };
            let mut bot = Bot::new(bot_config, engine, Box::new(feed));

            for _ in 0..total {
                if let TickResult::Failed(reason) = bot.tick().await {
                    tracing::warn!(reason = %reason, "Replay tick failed");
                }
            }

            println!("\n=== Replay: {} ===", file.display());
            println!("Quotes:           {}", total);
            println!("Balance saves:    {}", store.saved_balances().len());
            println!("Final position:   {:?}", bot.engine().state().position);
            println!("{}", bot.engine().state().last_trade);
            println!("\n{}", bot.stats());
        }

        Commands::Status {
            limit,
            starting_balance,
        } => {
            let store = open_store(&cli).await?;

            println!("\n=== Balance ({}) ===", store.name());
            match store.load().await? {
                Some(record) => {
                    println!("Balance:      {:.2}", record.balance);
                    println!("Last updated: {}", record.last_updated.to_rfc3339());
                }
                None => {
                    println!(
                        "No saved balance. The next run starts at {:.2}.",
                        starting_balance
                    );
                }
            }

            let cycles = store.recent_cycles(limit).await?;
            if !cycles.is_empty() {
                println!("\n=== Recent Cycles ===");
                println!(
                    "{:<20} {:>12} {:>12} {:>10} {:>12}",
                    "COMPLETED", "BUY", "SELL", "PROFIT", "BALANCE"
                );
                println!("{}", "-".repeat(70));
                for cycle in cycles {
                    println!(
                        "{:<20} {:>12.2} {:>12.2} {:>10.2} {:>12.2}",
                        cycle.completed_at.format("%Y-%m-%d %H:%M:%S"),
                        cycle.buy_target,
                        cycle.sell_target,
                        cycle.profit,
                        cycle.balance_after
                    );
                }
            }
        }

        Commands::Config { ref trading } => {
            let config = trading.to_config()?;
            let defaults = BotConfig::default();

            println!("\n=== Trading Configuration ===\n");
            println!("Entry:");
            println!("  Buy Target:           mid - 2 x spread");
            println!("  Entry Fraction:       {}%", config.entry_fraction * Decimal::ONE_HUNDRED);
            println!("  Fallback Trade Size:  {}", config.fallback_trade_size);
            println!("\nExit:");
            println!("  Profit Target:        {}", config.profit_target);
            println!("  Fee Rate:             {}%", config.fee_rate * Decimal::ONE_HUNDRED);
            println!("\nBalance:");
            println!("  Starting Balance:     {}", config.starting_balance);
            println!("\nLoop:");
            println!("  Default Symbol:       {}", defaults.symbol);
            println!("  Default Interval:     {}ms", defaults.poll_interval_ms);
        }
    }

    Ok(())
}

/// Open the balance store selected on the command line.
async fn open_store(cli: &Cli) -> Result<Arc<dyn BalanceStore>> {
    let store: Arc<dyn BalanceStore> = match cli.store {
        StoreKind::Json => Arc::new(JsonFileStore::new(cli.balance_file.clone())),
        StoreKind::Sqlite => Arc::new(SqliteStore::new(&cli.database).await?),
    };
    Ok(store)
}
