use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use session_token::config::{config_dir, default_config_path, Config, ResolvedConfig};
use session_token::credentials::{
    AssumeRoleRequest, AwsCliConfig, AwsCliSupplier, CredentialRecord, CredentialSupplier,
    JsonInputSupplier,
};
use session_token::duration::{format_remaining, parse_session_duration};
use session_token::store::{ProfileStore, UpsertOutcome};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "session-token")]
#[command(about = "Generates a session token using a role and MFA device")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Credentials file to update (overrides config)
    #[arg(long, global = true)]
    credentials_file: Option<PathBuf>,

    /// Profile name for the session token (overrides config)
    #[arg(short, long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assume a role with an MFA code and store the session credentials
    Assume {
        /// MFA one-time code
        #[arg(long)]
        code: String,

        /// IAM user whose MFA device is used
        #[arg(short, long)]
        user: Option<String>,

        /// MFA device serial (skips the device lookup)
        #[arg(long)]
        serial: Option<String>,

        /// Role name or ARN to assume
        #[arg(short, long)]
        role: Option<String>,

        /// Duration the token is valid, e.g. 3600 or 1h
        #[arg(short, long, value_parser = parse_session_duration)]
        duration: Option<Duration>,

        /// Disable SSL verification
        #[arg(long)]
        no_verify_ssl: bool,
    },
    /// Store credentials from an assume-role JSON response
    Write {
        /// Read the response from a file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// List the profiles in the credentials file
    List,
    /// Show the stored profile (secrets redacted)
    Show,
    /// Show current configuration
    Config,
}

impl Cli {
    /// Fold command-line overrides into the loaded config.
    fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(path) = &self.credentials_file {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                std::env::current_dir()
                    .context("Failed to get current directory")?
                    .join(path)
            };
            config.credentials_file = Some(path);
        }
        if let Some(profile) = &self.profile {
            config.profile = profile.clone();
        }

        if let Command::Assume {
            user,
            serial,
            role,
            duration,
            no_verify_ssl,
            ..
        } = &self.command
        {
            if let Some(user) = user {
                config.user_name = Some(user.clone());
            }
            if let Some(serial) = serial {
                config.mfa_serial = Some(serial.clone());
            }
            if let Some(role) = role {
                config.role = role.clone();
            }
            if let Some(duration) = duration {
                config.duration = *duration;
            }
            if *no_verify_ssl {
                config.verify_ssl = false;
            }
        }
        Ok(())
    }
}

fn store_record(config: &ResolvedConfig, record: &CredentialRecord) -> Result<()> {
    let store = ProfileStore::new(&config.credentials_file);
    let outcome = store.upsert_profile(&config.profile, record)?;

    let verb = match outcome {
        UpsertOutcome::Created => "Added",
        UpsertOutcome::Updated => "Updated",
    };
    println!(
        "{verb} profile {} in {}",
        config.profile,
        store.path().display()
    );
    println!("Backup: {}", store.backup_path().display());

    if let Some(expiration) = record.expiration() {
        match record.remaining_at(Utc::now()) {
            Some(remaining) => {
                println!(
                    "Expires: {expiration} (in {})",
                    format_remaining(remaining)
                );
            }
            None => println!("Expires: {expiration} (already expired)"),
        }
    }
    Ok(())
}

async fn read_response(input: Option<&Path>) -> Result<CredentialRecord> {
    match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            JsonInputSupplier::new(file).read_record().await
        }
        None => JsonInputSupplier::new(tokio::io::stdin()).read_record().await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load_or_default(&config_path)?;
    cli.apply_overrides(&mut config)?;
    let config = ResolvedConfig::resolve(config, &config_dir(&config_path)?)
        .with_context(|| format!("Invalid configuration: {}", config_path.display()))?;

    match &cli.command {
        Command::Assume { code, .. } => {
            let supplier = AwsCliSupplier::new(AwsCliConfig {
                program: config.aws_program.clone(),
                verify_ssl: config.verify_ssl,
                source_profile: config.source_profile.clone(),
            });
            let request = AssumeRoleRequest {
                role: config.role.clone(),
                mfa_serial: config.mfa_serial.clone(),
                user_name: config.user_name.clone(),
                mfa_code: code.trim().to_string(),
                duration: config.duration,
            };
            let record = supplier.obtain(&request).await?;
            store_record(&config, &record)?;
        }
        Command::Write { input } => {
            let record = read_response(input.as_deref()).await?;
            store_record(&config, &record)?;
        }
        Command::List => {
            let store = ProfileStore::new(&config.credentials_file);
            for header in store.profiles()? {
                println!("{header}");
            }
        }
        Command::Show => {
            let store = ProfileStore::new(&config.credentials_file);
            let record = store.read_profile(&config.profile)?.with_context(|| {
                format!(
                    "Profile {} not found in {}",
                    config.profile,
                    store.path().display()
                )
            })?;
            println!("{}", config.profile);
            println!("aws_access_key_id = {}", record.access_key_id());
            println!("aws_secret_access_key = [redacted]");
            println!("aws_session_token = [redacted]");
        }
        Command::Config => {
            println!("Config file: {}", config_path.display());
            for (label, value) in config.summary() {
                println!("{label}: {value}");
            }
        }
    }

    Ok(())
}
