use baromon::app;
use baromon::config::BaromonConfig;
use baromon::cycle::RunOptions;
use baromon::error::CycleError;
use baromon_alert::cooldown::CooldownState;
use baromon_common::clock::{Clock, SystemClock};
use baromon_storage::PRESSURE_DROP_KEY;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "baromon", version, about = "Barometric pressure-drop alerter")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config/baromon.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one decision cycle (default)
    Run {
        /// Evaluate and log the decision without sending or recording it
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the stored notification memory and cooldown state
    Status,
    /// Import a last-notify timestamp file from an earlier deployment
    ImportLegacy {
        /// File containing a single RFC 3339 timestamp
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    if let Err(e) = init_tracing() {
        eprintln!("error: failed to initialise logging: {e}");
        return ExitCode::from(1);
    }

    let cli = Cli::parse();
    let result = match cli.command.unwrap_or(Commands::Run { dry_run: false }) {
        Commands::Run { dry_run } => run(&cli.config, dry_run).await,
        Commands::Status => status(&cli.config),
        Commands::ImportLegacy { file } => import_legacy(&cli.config, &file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "baromon failed");
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("baromon=info".parse()?))
        .init();
    Ok(())
}

async fn run(config_path: &Path, dry_run: bool) -> Result<(), CycleError> {
    let config = BaromonConfig::load(config_path)?;
    let watcher = app::build_watcher(&config)?;
    let report = watcher.run_cycle(RunOptions { dry_run }).await?;
    tracing::info!(
        decision = %report.decision,
        delta_hpa = report.delta.value,
        delivered = report.delivered,
        "Cycle complete"
    );
    Ok(())
}

#[allow(clippy::print_stdout)]
fn status(config_path: &Path) -> Result<(), CycleError> {
    let config = BaromonConfig::load(config_path)?;
    let policy = config.alert_policy()?;
    let store = app::open_store(&config)?;
    let memory = store.load(PRESSURE_DROP_KEY)?;
    let now = SystemClock.now();
    let offset = policy.quiet_hours.utc_offset;

    println!("database:      {}", store.db_path().display());
    match memory.last_sent_at {
        Some(at) => println!("last sent at:  {}", at.with_timezone(&offset).to_rfc3339()),
        None => println!("last sent at:  never"),
    }
    match policy.cooldown.state(now, &memory) {
        CooldownState::Idle => println!("cooldown:      idle"),
        CooldownState::Cooling { until } => println!(
            "cooldown:      cooling until {}",
            until.with_timezone(&offset).to_rfc3339()
        ),
    }
    println!(
        "quiet hours:   {}",
        if policy.quiet_hours.is_quiet(now) { "active" } else { "inactive" }
    );
    Ok(())
}

fn import_legacy(config_path: &Path, file: &Path) -> Result<(), CycleError> {
    let config = BaromonConfig::load(config_path)?;
    let store = app::open_store(&config)?;
    match store.import_legacy_file(PRESSURE_DROP_KEY, file)? {
        Some(at) => tracing::info!(last_sent_at = %at, "Legacy memory imported"),
        None => tracing::info!("Legacy memory file held no timestamp"),
    }
    Ok(())
}
