//! ilicense command-line tool
//!
//! Validates activation codes against a public key and drives the local
//! license file the same way an embedding application would.
//!
//! Usage:
//!   ilicense --public-key issuer.pem inspect <CODE>
//!   ilicense --config license.toml activate <CODE>
//!   ilicense status
//!   ilicense check-module reports

use std::{fs, path::PathBuf, process::ExitCode, sync::Arc};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ilicense_client::{
    LicenseConfig, LicenseManager, LicenseValidator, LoggingListener, StartupPolicy, Validate,
};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "ilicense")]
#[command(about = "Offline license activation tool")]
struct Args {
    /// Path to the license configuration file
    #[arg(short, long, default_value = "license.toml")]
    config: PathBuf,

    /// PEM public key file; overrides `public_key` from the config
    #[arg(short = 'k', long)]
    public_key: Option<PathBuf>,

    /// License storage file; overrides `storage_path` from the config
    #[arg(short, long)]
    storage: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate an activation code and print its contents without storing it
    Inspect {
        /// Activation code text
        code: Option<String>,
        /// Read the activation code from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Validate, store and adopt an activation code
    Activate {
        /// Activation code text
        code: Option<String>,
        /// Read the activation code from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Load the stored license and report its state
    Status,
    /// Exit non-zero unless the stored license grants the module
    CheckModule { module: String },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;

    match args.command {
        Command::Inspect { code, file } => {
            let code = read_code(code, file)?;
            let pem = config
                .public_key
                .as_deref()
                .context("no public key configured (use --public-key)")?;
            let validator = LicenseValidator::from_pem(pem).context("Failed to load public key")?;
            let license = validator.validate(&code)?;
            println!("{}", serde_json::to_string_pretty(&license)?);
        }
        Command::Activate { code, file } => {
            let code = read_code(code, file)?;
            let manager = manager(config)?;
            let license = manager.activate(&code)?;
            info!("license stored at {:?}", manager.config().storage_path);
            println!("{}", serde_json::to_string_pretty(license.as_ref())?);
        }
        Command::Status => {
            let manager = startup(config)?;
            println!("{}", serde_json::to_string_pretty(&manager.status())?);
        }
        Command::CheckModule { module } => {
            let manager = startup(config)?;
            manager.check_module(&module)?;
            println!("module '{module}' is authorized");
        }
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<LicenseConfig> {
    let mut config = LicenseConfig::load_from(&args.config)?;
    if let Some(path) = &args.public_key {
        let pem = fs::read_to_string(path)
            .with_context(|| format!("Failed to read public key file {:?}", path))?;
        config.public_key = Some(pem);
    }
    if let Some(path) = &args.storage {
        config = config.with_storage_path(path);
    }
    Ok(config)
}

fn manager(config: LicenseConfig) -> Result<LicenseManager> {
    let manager = LicenseManager::from_config(config)?.with_listener(Arc::new(LoggingListener));
    Ok(manager)
}

/// Builds a manager and loads the stored license, whatever the configured
/// startup settings. A missing or expired license is reported by the caller.
fn startup(config: LicenseConfig) -> Result<LicenseManager> {
    let config = LicenseConfig {
        enabled: true,
        validate_on_startup: true,
        startup_policy: StartupPolicy::FailOpen,
        ..config
    };
    let manager = manager(config)?;
    manager.initialize()?;
    Ok(manager)
}

fn read_code(code: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (code, file) {
        (Some(_), Some(_)) => bail!("pass the activation code either inline or with --file, not both"),
        (Some(code), None) => Ok(code),
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("Failed to read activation code from {:?}", path)),
        (None, None) => bail!("no activation code given"),
    }
}
