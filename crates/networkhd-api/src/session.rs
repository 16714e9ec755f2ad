// ── Session layer ──
//
// The byte-level channel to the controller (an SSH shell on port 10022
// in production) sits behind `Session`, so the client can be driven by
// any line-oriented transport.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::Error;

pub const DEFAULT_PORT: u16 = 10022;
pub const DEFAULT_USERNAME: &str = "wyrestorm";
pub const DEFAULT_PASSWORD: &str = "networkhd";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// What to do when the controller presents an unknown host key.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HostKeyPolicy {
    /// Trust and remember unknown keys.
    #[default]
    AutoAdd,
    /// Refuse unknown keys.
    Reject,
    /// Accept unknown keys but log a warning.
    Warn,
}

/// Everything needed to open a session to one controller.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub host_key_policy: HostKeyPolicy,
    /// Upper bound for connecting and for each command round trip.
    pub timeout: Duration,
}

impl ConnectionConfig {
    /// Config for `host` with factory credentials and defaults.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: DEFAULT_USERNAME.to_owned(),
            password: SecretString::from(DEFAULT_PASSWORD),
            host_key_policy: HostKeyPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// `true` when the factory password is still in use.
    pub fn uses_default_password(&self) -> bool {
        use secrecy::ExposeSecret;
        self.password.expose_secret() == DEFAULT_PASSWORD
    }
}

/// A line-oriented command channel to the controller.
///
/// `execute` sends one command and returns the full reply text.
/// Unsolicited `notify ...` lines are published on the broadcast channel
/// returned by `unsolicited`.
#[trait_variant::make(Session: Send)]
pub trait LocalSession {
    async fn open(&self, config: &ConnectionConfig) -> Result<(), Error>;

    async fn close(&self) -> Result<(), Error>;

    fn is_open(&self) -> bool;

    async fn execute(&self, command: &str) -> Result<String, Error>;

    fn unsolicited(&self) -> broadcast::Receiver<String>;
}
