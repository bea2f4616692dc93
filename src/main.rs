//! dubar - English to Arabic video dubbing
//!
//! Entry point: parses the command line, sets up logging and dispatches to
//! the workflow.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dubar::cli::{Args, Commands};
use dubar::config::Config;
use dubar::pipeline::{RunReport, RunStatus};
use dubar::workflow::{self, Workflow};

const DEFAULT_CONFIG_FILE: &str = "dubar.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    setup_logging(args.verbose, &config.pipeline.work_dir)?;
    info!("Starting dubar");

    match args.command {
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
        Commands::Doctor => {
            let mut healthy = true;
            match config.service.resolve_api_key() {
                Ok(_) => println!("{:<10} ok", "api key"),
                Err(e) => {
                    healthy = false;
                    println!("{:<10} {}", "api key", e);
                }
            }

            for (tool, status) in workflow::check_tools(&config).await {
                match status {
                    Ok(version) => println!("{:<10} {}", tool, version),
                    Err(e) => {
                        healthy = false;
                        println!("{:<10} {}", tool, e);
                    }
                }
            }

            if !healthy {
                anyhow::bail!("some checks failed");
            }
        }
        Commands::Dub { input, output_dir, stt_model } => {
            info!("Dubbing video file: {}", input.display());
            let workflow = Workflow::new(config)?;
            let report = workflow
                .process_single_file(&input, output_dir.as_deref(), stt_model)
                .await?;
            print_report(&report)?;
            if let RunStatus::Failed { stage, cause } = &report.status {
                anyhow::bail!("{}: {}", stage, cause);
            }
        }
        Commands::Batch { input_dir, output_dir, jobs } => {
            info!("Dubbing directory: {}", input_dir.display());
            let workflow = Workflow::new(config)?;
            let summary = workflow
                .process_directory(&input_dir, output_dir.as_deref(), jobs)
                .await?;

            for report in &summary.reports {
                let name = report
                    .input_video
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                println!("{}: {}", name, report.status);
            }
            for (video, reason) in &summary.rejected {
                println!("{}: rejected: {}", video.display(), reason);
            }
        }
        Commands::Extract { input, output } => {
            info!("Extracting audio from: {}", input.display());
            Workflow::new(config)?.extract_audio(&input, &output).await?;
        }
        Commands::Transcribe { input, output, model } => {
            info!("Transcribing audio: {}", input.display());
            Workflow::new(config)?
                .transcribe_audio(&input, &output, model)
                .await?;
        }
        Commands::Translate { input, output } => {
            info!("Translating text: {}", input.display());
            Workflow::new(config)?.translate_text(&input, &output).await?;
        }
        Commands::Speak { input, output, quoted_only } => {
            info!("Synthesizing speech for: {}", input.display());
            Workflow::new(config)?.speak(&input, &output, quoted_only).await?;
        }
        Commands::Chat => {
            Workflow::new(config)?.chat().await?;
        }
    }

    Ok(())
}

/// `--config` if given, else `./dubar.toml` when present, else defaults.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Config::from_file(DEFAULT_CONFIG_FILE)?,
        None => Config::default(),
    };
    config.validate()?;
    Ok(config)
}

fn print_report(report: &RunReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Setup logging to both console and a daily-rolling file under the work directory
fn setup_logging(verbose: bool, work_dir: &Path) -> Result<()> {
    let log_dir: PathBuf = work_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "dubar.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("dubar.log").display()
    );

    Ok(())
}
