use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sd_gallery::config::Configuration;
use sd_gallery::models::Synchronizer;
use sd_gallery::output::{summarize, ProgressReporter};
use tracing::metadata::LevelFilter;

#[derive(Parser)]
#[command(name = "sd-gallery", version, about = "Stable Diffusion asset sync and image gallery")]
struct Cli {
    /// Configuration file; skips discovery in the working directory
    #[arg(long, global = true, value_name = "PATH", env = "SD_GALLERY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the txt2img output gallery
    Server,
    /// Download every configured checkpoint, LoRA and upscaler
    Download,
}

fn setup_logging() {
    let filter = std::env::var("SD_GALLERY_LOG")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(LevelFilter::INFO);

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn load_configuration(path: Option<&PathBuf>) -> Result<Configuration> {
    let configuration = match path {
        Some(path) => Configuration::from_yaml_file(path)?,
        None => Configuration::discover_and_load()?,
    };
    if !configuration.rejected().is_empty() {
        tracing::warn!(
            "{} asset entries were ignored",
            configuration.rejected().len()
        );
    }
    Ok(configuration)
}

fn download(configuration: &Configuration) -> Result<()> {
    let synchronizer = Synchronizer::over_http(configuration.storage())?;
    let mut reporter = ProgressReporter::new();
    let report = synchronizer.sync_all(configuration, |event| reporter.handle(event));
    println!("{}", summarize(&report));
    Ok(())
}

#[cfg(feature = "gallery")]
fn server(configuration: &Configuration) -> Result<()> {
    use anyhow::Context;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    runtime.block_on(sd_gallery::gallery::serve(
        &configuration.gallery,
        configuration.storage(),
    ))
}

#[cfg(not(feature = "gallery"))]
fn server(_configuration: &Configuration) -> Result<()> {
    anyhow::bail!("built without the `gallery` feature")
}

fn main() -> ExitCode {
    setup_logging();
    let cli = Cli::parse();

    let configuration = match load_configuration(cli.config.as_ref()) {
        Ok(configuration) => configuration,
        Err(error) => {
            tracing::error!("{error:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Server => server(&configuration),
        Command::Download => download(&configuration),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{error:#}");
            ExitCode::FAILURE
        }
    }
}
