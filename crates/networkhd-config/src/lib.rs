//! Configuration for NetworkHD coordinators.
//!
//! TOML profiles merged with `NETWORKHD_` environment variables, password
//! resolution (env + keyring + plaintext + factory default), and
//! translation to `networkhd_core::CoordinatorConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use networkhd_core::config::{MAX_POLL_INTERVAL, MIN_POLL_INTERVAL};
use networkhd_core::{ConnectionConfig, CoordinatorConfig, CoreError, HostKeyPolicy};

/// Environment variable that overrides every profile's password.
pub const PASSWORD_ENV: &str = "NETWORKHD_PASSWORD";
const ENV_PREFIX: &str = "NETWORKHD_";
const KEYRING_SERVICE: &str = "networkhd";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<CoreError> for ConfigError {
    fn from(err: CoreError) -> Self {
        Self::Validation {
            field: "coordinator".into(),
            reason: err.to_string(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    /// Values for settings a profile leaves unset.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `name` is `None`.
    pub fn profile<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .ok_or_else(|| ConfigError::Validation {
                field: "default_profile".into(),
                reason: "no profile named and no default profile set".into(),
            })?;
        let profile = self.profiles.get(name).ok_or_else(|| ConfigError::Validation {
            field: "profile".into(),
            reason: format!("profile '{name}' not found"),
        })?;
        Ok((name, profile))
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Seconds between full refreshes.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Connect and command timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Seconds between query attempts.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            timeout: default_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_delay: default_retry_delay(),
        }
    }
}

fn default_poll_interval() -> u64 {
    60
}
fn default_timeout() -> u64 {
    10
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    2
}
fn default_true() -> bool {
    true
}

/// A named controller profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Controller hostname or IP address.
    pub host: String,

    /// SSH port. Defaults to 10022.
    pub port: Option<u16>,

    /// Defaults to `wyrestorm`.
    pub username: Option<String>,

    /// Password (plaintext; prefer keyring or env var).
    pub password: Option<String>,

    /// Consult the system keyring during password resolution.
    #[serde(default = "default_true")]
    pub use_keyring: bool,

    /// Fall back to the factory password when nothing else is configured.
    #[serde(default = "default_true")]
    pub allow_default_password: bool,

    pub host_key_policy: Option<HostKeyPolicy>,

    // Overrides of [defaults].
    pub poll_interval: Option<u64>,
    pub timeout: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay: Option<u64>,
}

impl Profile {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            username: None,
            password: None,
            use_keyring: true,
            allow_default_password: true,
            host_key_policy: None,
            poll_interval: None,
            timeout: None,
            retry_attempts: None,
            retry_delay: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "wyrestorm", "networkhd").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("networkhd");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Nested keys use a double underscore, e.g.
/// `NETWORKHD_PROFILES__HOME__HOST=10.0.0.5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it can't be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_else(|e| {
        warn!(error = %e, "using default config");
        Config::default()
    })
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the SSH password for `profile`.
///
/// Order: `NETWORKHD_PASSWORD`, system keyring (`networkhd`,
/// `{profile}/password`), plaintext profile value, factory default.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Env var
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 2. Keyring
    if profile.use_keyring {
        if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password")) {
            if let Ok(pw) = entry.get_password() {
                return Ok(SecretString::from(pw));
            }
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    // 4. Factory default
    if profile.allow_default_password {
        return Ok(ConnectionConfig::new(&profile.host).password);
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store `password` in the system keyring for `profile_name`.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .and_then(|entry| entry.set_password(password))
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `CoordinatorConfig` from a profile and the global defaults.
pub fn profile_to_coordinator_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<CoordinatorConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: format!("profile '{profile_name}' has no host"),
        });
    }

    let poll_interval = Duration::from_secs(profile.poll_interval.unwrap_or(defaults.poll_interval));
    if !(MIN_POLL_INTERVAL..=MAX_POLL_INTERVAL).contains(&poll_interval) {
        return Err(ConfigError::Validation {
            field: "poll_interval".into(),
            reason: format!(
                "must be between {} and {} seconds, got {}",
                MIN_POLL_INTERVAL.as_secs(),
                MAX_POLL_INTERVAL.as_secs(),
                poll_interval.as_secs()
            ),
        });
    }

    let mut connection = ConnectionConfig::new(profile.host.trim());
    if let Some(port) = profile.port {
        connection.port = port;
    }
    if let Some(ref username) = profile.username {
        connection.username.clone_from(username);
    }
    connection.password = resolve_password(profile, profile_name)?;
    connection.host_key_policy = profile.host_key_policy.unwrap_or_default();
    connection.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    let mut config = CoordinatorConfig::new(connection);
    config.poll_interval = poll_interval;
    config.retry_attempts = profile.retry_attempts.unwrap_or(defaults.retry_attempts);
    config.retry_delay = Duration::from_secs(profile.retry_delay.unwrap_or(defaults.retry_delay));
    config.validate()?;
    Ok(config)
}

/// Load config and build the `CoordinatorConfig` for `profile_name`, or
/// for the default profile.
pub fn coordinator_config(profile_name: Option<&str>) -> Result<CoordinatorConfig, ConfigError> {
    let config = load_config()?;
    let (name, profile) = config.profile(profile_name)?;
    profile_to_coordinator_config(profile, name, &config.defaults)
}
