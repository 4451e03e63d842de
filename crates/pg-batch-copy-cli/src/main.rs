//! pg-batch-copy CLI - batched PostgreSQL table-to-table copy.

use clap::{Parser, Subcommand};
use pg_batch_copy::{Config, Copier, CopyError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "pg-batch-copy")]
#[command(about = "Batched PostgreSQL table-to-table copy")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy the configured table from source to target
    Run {
        /// Override the table to copy
        #[arg(long)]
        table: Option<String>,

        /// Override the batch size
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Compare row counts between source and target
    Validate,

    /// Test database connections
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), CopyError> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli.verbosity, &cli.log_format).map_err(CopyError::Config)?;

    // Load configuration
    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Run { table, batch_size } => {
            // Apply overrides and re-validate
            if let Some(t) = table {
                config.copy.table = t;
            }
            if let Some(b) = batch_size {
                config.copy.batch_size = b;
            }
            config.validate()?;

            let copier = Copier::new(config)?;
            let result = copier.run().await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\nCopy completed!");
                println!("  Run ID: {}", result.run_id);
                println!("  Table: {}", result.table);
                println!("  Status: {}", result.status);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!("  Rows: {}", result.rows_copied);
                println!("  Throughput: {} rows/sec", result.rows_per_second);
                if result.batches_failed > 0 {
                    println!(
                        "  Dropped batches: {} (offsets {:?})",
                        result.batches_failed, result.failed_offsets
                    );
                }
            }
        }

        Commands::Validate => {
            let copier = Copier::new(config)?;
            copier.validate().await?;
            println!("Validation completed successfully");
        }

        Commands::HealthCheck => {
            let copier = Copier::new(config)?;
            let report = copier.health_check().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Source: {} ({}ms)",
                    if report.source_connected { "OK" } else { "FAILED" },
                    report.source_latency_ms
                );
                if let Some(ref err) = report.source_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "  Target: {} ({}ms)",
                    if report.target_connected { "OK" } else { "FAILED" },
                    report.target_latency_ms
                );
                if let Some(ref err) = report.target_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if report.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !report.healthy {
                return Err(CopyError::Config("Health check failed".to_string()));
            }
        }
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
