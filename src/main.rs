//! TypeState CLI
//!
//! Builds training tables from keystroke logs and serves live stress analysis.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use typestate::{
    builder::{mode_statistics, TimingSummary},
    collector::load_sessions,
    config::Config,
    transparency::create_shared_log,
    ModelArtifacts, StressAnalyzer, TrainingTable, VERSION,
};

#[derive(Parser)]
#[command(name = "typestate")]
#[command(version = VERSION)]
#[command(about = "Keystroke dynamics stress detection", long_about = None)]
struct Cli {
    /// Log filter directive (overrides the configured level)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the labeled training table from logged sessions
    Build {
        /// JSON array of logged sessions
        #[arg(long, short)]
        input: PathBuf,

        /// Output CSV (defaults to the configured training output)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Score one keystroke history with the configured artifacts
    Analyze {
        /// JSON array of keystroke events, or an object with a `keystrokes` array
        #[arg(long, short)]
        input: PathBuf,

        /// Classifier artifact (overrides config)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Scaler artifact (overrides config)
        #[arg(long)]
        scaler: Option<PathBuf>,
    },

    /// Show per-mode flight and dwell statistics of logged sessions
    Stats {
        /// JSON array of logged sessions
        #[arg(long, short)]
        input: PathBuf,
    },

    /// Start the analysis server
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {e}");
        Config::default()
    });

    init_tracing(cli.log_level.as_deref().unwrap_or(&config.log_level));

    match cli.command {
        Commands::Build { input, output } => cmd_build(&config, &input, output),
        Commands::Analyze {
            input,
            model,
            scaler,
        } => cmd_analyze(&config, &input, model, scaler),
        Commands::Stats { input } => cmd_stats(&input),
        #[cfg(feature = "server")]
        Commands::Serve { port } => cmd_serve(&config, port),
        Commands::Config => cmd_config(&config),
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_build(config: &Config, input: &Path, output: Option<PathBuf>) -> Result<()> {
    let output = output.unwrap_or_else(|| config.training_output.clone());
    let sessions = load_sessions(input)
        .with_context(|| format!("Failed to load sessions from {}", input.display()))?;

    let log = create_shared_log();
    let table = TrainingTable::build_logged(&sessions, &log);
    if table.is_empty() {
        bail!("No key presses derived from {}", input.display());
    }

    table
        .save(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let summary = table.summary();
    println!("Training table written to {}", output.display());
    println!();
    println!("  Sessions:  {}", summary.sessions);
    println!("  Samples:   {}", summary.records);
    println!("  Relaxed:   {}", summary.relaxed);
    println!("  Stressed:  {}", summary.stressed);
    println!();
    println!("{}", log.summary());
    Ok(())
}

fn cmd_analyze(
    config: &Config,
    input: &Path,
    model: Option<PathBuf>,
    scaler: Option<PathBuf>,
) -> Result<()> {
    let model = model.unwrap_or_else(|| config.resolved_model_path());
    let scaler = scaler.unwrap_or_else(|| config.resolved_scaler_path());
    let artifacts = ModelArtifacts::load(&model, &scaler).context("Failed to load model artifacts")?;
    let analyzer = StressAnalyzer::new(artifacts).context("Model artifacts rejected")?;

    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let records = match &value {
        serde_json::Value::Array(items) => items.as_slice(),
        serde_json::Value::Object(map) => match map.get("keystrokes") {
            Some(serde_json::Value::Array(items)) => items.as_slice(),
            _ => bail!("Expected a `keystrokes` array in {}", input.display()),
        },
        _ => bail!("Expected a JSON array of keystroke events in {}", input.display()),
    };

    let result = analyzer.analyze_raw(records)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_stats(input: &Path) -> Result<()> {
    let sessions: Vec<_> = load_sessions(input)
        .with_context(|| format!("Failed to load sessions from {}", input.display()))?
        .into_iter()
        .map(|loaded| loaded.session)
        .collect();

    println!("Typing Statistics");
    println!("=================");
    for stats in mode_statistics(&sessions) {
        println!();
        println!("Mode: {} ({} sessions)", stats.mode, stats.sessions);
        print_timing("Flight time", &stats.flight_time);
        print_timing("Dwell time", &stats.dwell_time);
    }
    Ok(())
}

fn print_timing(label: &str, summary: &TimingSummary) {
    println!(
        "  {label:<12} n={:<6} mean={:>8.1}ms  sd={:>8.1}ms  median={:>8.1}ms",
        summary.count, summary.mean, summary.std_dev, summary.median
    );
}

#[cfg(feature = "server")]
fn cmd_serve(config: &Config, port: Option<u16>) -> Result<()> {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use typestate::server::{run, ServerConfig};

    let analyzer = StressAnalyzer::from_load_result(ModelArtifacts::load(
        &config.resolved_model_path(),
        &config.resolved_scaler_path(),
    ));
    if let Some(reason) = analyzer.unavailable_reason() {
        tracing::warn!("Serving without a model, /analyze will return 503: {}", reason);
    }

    let server_config = ServerConfig::new(port.unwrap_or(config.port), config.max_concurrent_inferences);
    let log = create_shared_log();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let (addr, shutdown_tx) = run(server_config, analyzer, log.clone()).await?;
        println!("TypeState server running on http://{addr}");
        println!("Press Ctrl+C to stop.");

        while running.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }

        let _ = shutdown_tx.send(());
        println!();
        println!("{}", log.summary());
        anyhow::Ok(())
    })
}

fn cmd_config(config: &Config) -> Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!("Model:       {:?}", config.resolved_model_path());
    println!("Scaler:      {:?}", config.resolved_scaler_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
