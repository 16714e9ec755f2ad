use std::sync::Arc;

use crate::error::Error;
use crate::notification::{Notification, NotificationTopic};
use crate::records::{
    IdentityRecord, IpSettings, MatrixAssignment, PowerState, StaticInfoRecord, StatusRecord,
    VersionInfo,
};

/// Callback invoked for every notification on a subscribed topic.
///
/// Called from the client's listener task; must not block.
pub type NotificationCallback = Arc<dyn Fn(Notification) + Send + Sync>;

/// Everything the coordinator needs from a NetworkHD controller.
///
/// `NhdClient` is the production implementation. Tests drive the
/// coordinator with scripted fakes.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    async fn connect(&self) -> Result<(), Error>;

    async fn disconnect(&self) -> Result<(), Error>;

    fn is_connected(&self) -> bool;

    // ── Queries ──

    async fn query_device_json(&self) -> Result<Vec<IdentityRecord>, Error>;

    async fn query_device_status(&self) -> Result<Vec<StatusRecord>, Error>;

    async fn query_device_info(&self) -> Result<Vec<StaticInfoRecord>, Error>;

    async fn query_matrix(&self) -> Result<Vec<MatrixAssignment>, Error>;

    async fn query_version(&self) -> Result<VersionInfo, Error>;

    async fn query_ip_settings(&self) -> Result<IpSettings, Error>;

    // ── Commands ──

    /// Route `source` to every receiver in `targets`.
    async fn matrix_set(&self, source: &str, targets: &[String]) -> Result<(), Error>;

    /// Disconnect every receiver in `targets`.
    async fn matrix_set_null(&self, targets: &[String]) -> Result<(), Error>;

    /// Switch the display attached to receiver `target` on or off.
    async fn set_sink_power(&self, power: PowerState, target: &str) -> Result<(), Error>;

    async fn reboot(&self) -> Result<(), Error>;

    // ── Notifications ──

    fn register_notification_callback(
        &self,
        topic: NotificationTopic,
        callback: NotificationCallback,
    );
}
