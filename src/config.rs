use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::duration::{
    deserialize_session_duration, format_duration, validate_session_duration, DEFAULT_SESSION,
};
use crate::store::ProfileHeader;

/// Name of the config file looked up next to the working directory.
pub const CONFIG_FILE_NAME: &str = "session-token.toml";

fn default_profile() -> String {
    "terraform_session".to_string()
}

fn default_role() -> String {
    "AdminRole".to_string()
}

fn default_duration() -> Duration {
    DEFAULT_SESSION
}

fn default_aws_program() -> PathBuf {
    PathBuf::from("aws")
}

/// Application configuration.
///
/// Every field has a default, so an empty or missing file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Credentials file to merge into. `~` expands to the home directory;
    /// relative paths resolve from the config file's directory. Defaults to
    /// `~/.aws/credentials`.
    pub credentials_file: Option<PathBuf>,

    /// Profile name the session credentials are written under.
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Role name or ARN to assume.
    #[serde(default = "default_role")]
    pub role: String,

    /// IAM user owning the MFA device. Used to look up the device serial
    /// when `mfa_serial` is unset.
    pub user_name: Option<String>,

    /// MFA device serial (ARN).
    pub mfa_serial: Option<String>,

    /// Requested session lifetime, as seconds or a string like `"1h"`.
    #[serde(
        default = "default_duration",
        deserialize_with = "deserialize_session_duration"
    )]
    pub duration: Duration,

    /// Verify TLS certificates when talking to the identity provider.
    pub verify_ssl: bool,

    /// Program used to reach the identity provider.
    #[serde(default = "default_aws_program")]
    pub aws_program: PathBuf,

    /// Profile with long-term credentials the `aws` tool should call with.
    pub source_profile: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials_file: None,
            profile: default_profile(),
            role: default_role(),
            user_name: None,
            mfa_serial: None,
            duration: default_duration(),
            verify_ssl: true,
            aws_program: default_aws_program(),
            source_profile: None,
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the credentials file path.
    ///
    /// `~/` is expanded against `home`. Other relative paths are resolved
    /// from `config_dir`. Without a configured path the default is
    /// `<home>/.aws/credentials`.
    pub fn resolve_credentials_file(&self, config_dir: &Path, home: Option<&Path>) -> Result<PathBuf> {
        let home_join = |rest: &Path| -> Result<PathBuf> {
            let home = home.context("Could not find home directory")?;
            Ok(home.join(rest))
        };

        match &self.credentials_file {
            Some(path) if path.is_absolute() => Ok(path.clone()),
            Some(path) => match path.strip_prefix("~") {
                Ok(rest) => home_join(rest),
                Err(_) => Ok(config_dir.join(path)),
            },
            None => home_join(Path::new(".aws/credentials")),
        }
    }
}

/// Loaded configuration with resolved paths and parsed values.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub credentials_file: PathBuf,
    pub profile: ProfileHeader,
    pub role: String,
    pub user_name: Option<String>,
    pub mfa_serial: Option<String>,
    pub duration: Duration,
    pub verify_ssl: bool,
    pub aws_program: PathBuf,
    pub source_profile: Option<String>,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./session-token.toml` if it exists in current directory
/// 2. `~/.config/session-token/session-token.toml` (XDG config directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(CONFIG_FILE_NAME);
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("session-token").join(CONFIG_FILE_NAME);
    }

    local_config
}

/// Directory relative paths in a config file are resolved from.
///
/// The canonical parent of the config file when it exists, otherwise the
/// current directory.
pub fn config_dir(config_path: &Path) -> Result<PathBuf> {
    if config_path.exists() {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;
        let dir = config_path
            .parent()
            .context("Config file has no parent directory")?;
        Ok(dir.to_path_buf())
    } else {
        std::env::current_dir().context("Failed to get current directory")
    }
}

impl ResolvedConfig {
    /// Resolve a parsed config relative to the directory it was loaded from.
    pub fn resolve(config: Config, config_dir: &Path) -> Result<Self> {
        let home = dirs::home_dir();
        let credentials_file = config.resolve_credentials_file(config_dir, home.as_deref())?;
        let profile = ProfileHeader::from_name(&config.profile)
            .with_context(|| format!("Invalid profile name {:?}", config.profile))?;
        let duration = validate_session_duration(config.duration)?;

        Ok(Self {
            credentials_file,
            profile,
            role: config.role,
            user_name: config.user_name,
            mfa_serial: config.mfa_serial,
            duration,
            verify_ssl: config.verify_ssl,
            aws_program: config.aws_program,
            source_profile: config.source_profile,
        })
    }

    /// Label/value pairs describing every resolved setting, in display
    /// order. Unset optional settings are left out.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let mut lines = vec![
            ("Credentials file", self.credentials_file.display().to_string()),
            ("Profile", self.profile.to_string()),
            ("Role", self.role.clone()),
        ];
        if let Some(user) = &self.user_name {
            lines.push(("User", user.clone()));
        }
        if let Some(serial) = &self.mfa_serial {
            lines.push(("MFA serial", serial.clone()));
        }
        lines.push(("Duration", format_duration(self.duration)));
        lines.push(("Verify SSL", self.verify_ssl.to_string()));
        lines.push(("AWS program", self.aws_program.display().to_string()));
        if let Some(source_profile) = &self.source_profile {
            lines.push(("Source profile", source_profile.clone()));
        }
        lines
    }

    /// Load and resolve config from a file path.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config = Config::load(config_path)?;
        Self::resolve(config, &config_dir(config_path)?)
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;
        Self::resolve(config, &config_dir(config_path)?)
    }
}
