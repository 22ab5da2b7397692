use clap::{Parser, Subcommand};
use movie_bindings::config::{BindingConfig, ConfigError};
use movie_bindings::core::{init_logging, BindingError};
use movie_bindings::scripting::{build_host, build_js_adapter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "movie-bindings", version, about = "Run scripts against the native movie player")]
struct Cli {
    /// Configuration file (TOML or JSON); defaults to the usual search paths
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JavaScript file with the built-in classes installed
    Run {
        /// Script to execute
        script: PathBuf,
    },
    /// Print the registered class table as JSON
    Classes,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to encode class table: {0}")]
    Encode(#[from] serde_json::Error),
}

fn load_config(path: Option<&Path>) -> Result<BindingConfig, CliError> {
    let mut config = match path {
        Some(path) => BindingConfig::from_file(path)?,
        None => BindingConfig::load_or_default(),
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_deref())?;
    let _guard = init_logging(&config.logging);

    match cli.command {
        Commands::Run { script } => {
            let code = std::fs::read_to_string(&script).map_err(|source| CliError::Read {
                path: script.display().to_string(),
                source,
            })?;
            let js = build_js_adapter(&config)?;
            tracing::info!(target: "script", script = %script.display(), "running script");
            js.execute_script(&code)?;
        }
        Commands::Classes => {
            let host = build_host(&config)?;
            println!("{}", serde_json::to_string_pretty(&host.describe())?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("movie-bindings: {e}");
            ExitCode::FAILURE
        }
    }
}
