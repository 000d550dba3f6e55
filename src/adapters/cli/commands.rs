//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the pairs backtester.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};

use crate::adapters::coingecko::{CoinGeckoClient, CoinGeckoConfig};
use crate::adapters::market_data::{
    JsonFileHistory, SyntheticPair, SyntheticPairConfig, SYNTHETIC_A, SYNTHETIC_B,
};
use crate::adapters::report::{export_json, format_correlation, print_summary};
use crate::application::{BacktestEngine, BacktestRun};
use crate::config::{load_config, Config, DataSection, DataSource, PairSection};
use crate::ports::market_data::PriceHistoryPort;
use crate::strategy::params::{BacktestConfig, PositionPolicy};

/// Pairs Backtest - statistical arbitrage on two co-moving assets
#[derive(Parser, Debug)]
#[command(
    name = "pairs-backtest",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Pairs trading backtester with OLS hedge ratio and z-score signals",
    long_about = "Fits a hedge ratio of asset A on asset B, trades the rolling z-score of the \
                  spread with entry/exit thresholds and a stop-loss, charges commission and \
                  slippage, and reports return, Sharpe ratio and drawdown."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch two price histories and backtest the pair
    Backtest(BacktestCmd),

    /// Print overall and rolling daily return correlation of the pair
    Correlation(CorrelationCmd),

    /// Backtest a seeded synthetic pair (no network)
    Simulate(SimulateCmd),
}

impl Command {
    fn config_path(&self) -> Option<&Path> {
        match self {
            Command::Backtest(cmd) => cmd.pair.config.as_deref(),
            Command::Correlation(cmd) => cmd.pair.config.as_deref(),
            Command::Simulate(_) => None,
        }
    }
}

/// Price source selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceArg {
    Coingecko,
    Json,
}

/// Position policy selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyArg {
    Recompute,
    Hold,
}

impl From<PolicyArg> for PositionPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Recompute => PositionPolicy::Recompute,
            PolicyArg::Hold => PositionPolicy::Hold,
        }
    }
}

/// Pair and data window, shared by backtest and correlation
#[derive(Parser, Debug)]
pub struct PairArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Leg A asset id (e.g. optimism); overrides the config
    #[arg(long, value_name = "ID")]
    pub asset_a: Option<String>,

    /// Leg B asset id (e.g. arbitrum); overrides the config
    #[arg(long, value_name = "ID")]
    pub asset_b: Option<String>,

    /// Trailing number of days to fetch
    #[arg(short, long, value_name = "DAYS")]
    pub days: Option<u32>,

    /// Price source
    #[arg(long, value_enum)]
    pub source: Option<SourceArg>,

    /// Directory of <asset>.json files for the json source
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<String>,
}

/// Signal overrides, shared by backtest and simulate
#[derive(Parser, Debug)]
pub struct SignalArgs {
    /// Rolling window for the spread's mean/std
    #[arg(short, long, value_name = "PERIODS")]
    pub window: Option<usize>,

    /// |z| above this opens a position
    #[arg(long, value_name = "Z")]
    pub z_open: Option<f64>,

    /// |z| below this closes a position
    #[arg(long, value_name = "Z")]
    pub z_close: Option<f64>,

    /// Stop-loss as a fraction of leg A's price
    #[arg(long, value_name = "FRACTION")]
    pub stop_loss: Option<f64>,

    /// What happens on bars with no open/close condition
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Export the full run to JSON
    #[arg(long, value_name = "FILE")]
    pub export_json: Option<PathBuf>,
}

impl SignalArgs {
    fn apply(&self, mut config: BacktestConfig) -> BacktestConfig {
        if let Some(window) = self.window {
            config = config.with_window(window);
        }
        if self.z_open.is_some() || self.z_close.is_some() {
            let z_open = self.z_open.unwrap_or(config.z_open);
            let z_close = self.z_close.unwrap_or(config.z_close);
            config = config.with_thresholds(z_open, z_close);
        }
        if let Some(fraction) = self.stop_loss {
            config = config.with_stop_loss(fraction);
        }
        if let Some(policy) = self.policy {
            config = config.with_policy(policy.into());
        }
        config
    }
}

/// Run a backtest
#[derive(Parser, Debug)]
pub struct BacktestCmd {
    #[command(flatten)]
    pub pair: PairArgs,

    #[command(flatten)]
    pub signal: SignalArgs,
}

/// Print return correlation
#[derive(Parser, Debug)]
pub struct CorrelationCmd {
    #[command(flatten)]
    pub pair: PairArgs,

    /// Rolling correlation window
    #[arg(long, value_name = "PERIODS")]
    pub window: Option<usize>,
}

/// Backtest a synthetic pair
#[derive(Parser, Debug)]
pub struct SimulateCmd {
    /// Number of daily observations
    #[arg(long, value_name = "DAYS", default_value = "365")]
    pub days: usize,

    /// RNG seed
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// True hedge ratio of A on B
    #[arg(long, default_value = "1.2")]
    pub beta: f64,

    /// Also write both legs as <dir>/synthetic-a.json and synthetic-b.json
    #[arg(long, value_name = "DIR")]
    pub save_dir: Option<String>,

    #[command(flatten)]
    pub signal: SignalArgs,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    let config = match app.command.config_path() {
        Some(path) => {
            let path = expand(path);
            Some(load_config(&path).with_context(|| format!("Failed to load configuration from {}", path.display()))?)
        }
        None => None,
    };

    init_logging(app.verbose, app.debug, config.as_ref().map(|c| c.logging.level.as_str()))?;

    match app.command {
        Command::Backtest(cmd) => backtest_command(cmd, config).await,
        Command::Correlation(cmd) => correlation_command(cmd, config).await,
        Command::Simulate(cmd) => simulate_command(cmd).await,
    }
}

/// Initialize logging system
///
/// `RUST_LOG` wins, then `--debug`, `--verbose`, the config's level, and finally "warn".
fn init_logging(verbose: bool, debug: bool, config_level: Option<&str>) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let fallback = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        config_level.unwrap_or("warn")
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).to_string())
}

/// Merge the config file (if any) with command-line overrides
fn resolve_config(args: &PairArgs, config: Option<Config>) -> Result<Config> {
    let mut config = match config {
        Some(config) => config,
        None => {
            let (Some(asset_a), Some(asset_b)) = (args.asset_a.clone(), args.asset_b.clone()) else {
                bail!("No pair given: pass --config FILE or both --asset-a and --asset-b");
            };
            Config {
                pair: PairSection {
                    asset_a,
                    asset_b,
                    vs_currency: "usd".to_string(),
                    label: None,
                },
                data: DataSection::default(),
                signal: Default::default(),
                costs: Default::default(),
                performance: Default::default(),
                logging: Default::default(),
            }
        }
    };

    if let Some(ref asset_a) = args.asset_a {
        config.pair.asset_a = asset_a.clone();
    }
    if let Some(ref asset_b) = args.asset_b {
        config.pair.asset_b = asset_b.clone();
    }
    if let Some(days) = args.days {
        config.data.days = Some(days);
        config.data.start_days_ago = None;
        config.data.from = None;
        config.data.to = None;
    }
    if let Some(source) = args.source {
        config.data.source = match source {
            SourceArg::Coingecko => DataSource::Coingecko,
            SourceArg::Json => DataSource::Json,
        };
    }
    if let Some(ref dir) = args.data_dir {
        config.data.data_dir = dir.clone();
    }

    config.validate().context("Invalid configuration after command-line overrides")?;
    Ok(config)
}

fn price_source(data: &DataSection) -> Result<Box<dyn PriceHistoryPort>> {
    match data.source {
        DataSource::Coingecko => {
            let client = CoinGeckoClient::with_config(CoinGeckoConfig {
                api_key: data.get_api_key(),
                timeout: std::time::Duration::from_secs(data.timeout_secs),
                ..CoinGeckoConfig::default()
            })
            .context("Failed to create CoinGecko client")?;
            Ok(Box::new(client))
        }
        DataSource::Json => Ok(Box::new(JsonFileHistory::new(data.data_dir()))),
        DataSource::Synthetic => {
            let pair = SyntheticPair::with_default_start(SyntheticPairConfig::default())
                .context("Failed to generate synthetic pair")?;
            Ok(Box::new(pair))
        }
    }
}

async fn fetch_and_run(config: &Config, backtest: BacktestConfig) -> Result<BacktestRun> {
    let engine = BacktestEngine::new(backtest).context("Invalid backtest parameters")?;
    let port = price_source(&config.data)?;
    let (asset_a, asset_b) = match config.data.source {
        DataSource::Synthetic => (SYNTHETIC_A, SYNTHETIC_B),
        _ => (config.pair.asset_a.as_str(), config.pair.asset_b.as_str()),
    };

    let run = engine
        .fetch_and_run(
            port.as_ref(),
            asset_a,
            asset_b,
            &config.pair.vs_currency,
            config.data.history_range(Utc::now()),
        )
        .await
        .with_context(|| format!("Backtest of {} failed", config.pair.label()))?;
    Ok(run)
}

fn export(run: &BacktestRun, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        let path = expand(path);
        export_json(run, &path).with_context(|| format!("Failed to export to {}", path.display()))?;
        println!("Exported run to {}", path.display());
    }
    Ok(())
}

/// Handle backtest command
async fn backtest_command(cmd: BacktestCmd, config: Option<Config>) -> Result<()> {
    let config = resolve_config(&cmd.pair, config)?;
    let backtest = cmd.signal.apply(BacktestConfig::from(&config));
    tracing::info!("Starting backtest for {}", config.pair.label());

    let run = fetch_and_run(&config, backtest).await?;

    print_summary(&run, &config.pair.label());
    export(&run, cmd.signal.export_json.as_deref())
}

/// Handle correlation command
async fn correlation_command(cmd: CorrelationCmd, config: Option<Config>) -> Result<()> {
    let config = resolve_config(&cmd.pair, config)?;
    let mut backtest = BacktestConfig::from(&config);
    if let Some(window) = cmd.window {
        backtest.correlation_window = window;
    }

    let run = fetch_and_run(&config, backtest).await?;
    print!("{}", format_correlation(&run, &config.pair.label()));
    Ok(())
}

/// Handle simulate command
async fn simulate_command(cmd: SimulateCmd) -> Result<()> {
    let synthetic = SyntheticPairConfig {
        days: cmd.days,
        seed: cmd.seed,
        beta: cmd.beta,
        ..SyntheticPairConfig::default()
    };
    let pair = SyntheticPair::with_default_start(synthetic).context("Failed to generate synthetic pair")?;

    if let Some(ref dir) = cmd.save_dir {
        let store = JsonFileHistory::new(expand(Path::new(dir)));
        store.save(SYNTHETIC_A, pair.leg_a()).await.context("Failed to save leg A")?;
        store.save(SYNTHETIC_B, pair.leg_b()).await.context("Failed to save leg B")?;
        println!("Saved synthetic legs to {}", dir);
    }

    let engine = BacktestEngine::new(cmd.signal.apply(BacktestConfig::default()))
        .context("Invalid backtest parameters")?;
    let run = engine
        .run(pair.leg_a(), pair.leg_b())
        .context("Synthetic backtest failed")?;

    print_summary(&run, &format!("Synthetic (seed {}, beta {})", cmd.seed, cmd.beta));
    export(&run, cmd.signal.export_json.as_deref())
}
