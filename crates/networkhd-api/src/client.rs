// NetworkHD controller client
//
// Wraps a `Session` with command serialization, per-command timeouts,
// reply checking and parsing, and a listener task that turns unsolicited
// `notify` lines into callbacks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec;
use crate::error::Error;
use crate::notification::NotificationTopic;
use crate::records::{
    IdentityRecord, IpSettings, MatrixAssignment, PowerState, StaticInfoRecord, StatusRecord,
    VersionInfo,
};
use crate::session::{ConnectionConfig, Session};
use crate::transport::{NotificationCallback, Transport};

type CallbackTable = RwLock<HashMap<NotificationTopic, Vec<NotificationCallback>>>;

/// Client for one NetworkHD controller.
///
/// Commands are serialized: the controller answers one command at a time
/// on a shell session, so concurrent callers queue on an internal lock.
pub struct NhdClient<S> {
    session: S,
    config: ConnectionConfig,
    command_lock: tokio::sync::Mutex<()>,
    callbacks: Arc<CallbackTable>,
    listener: Mutex<Option<Listener>>,
}

struct Listener {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl<S: Session + Sync> NhdClient<S> {
    pub fn new(session: S, config: ConnectionConfig) -> Self {
        Self {
            session,
            config,
            command_lock: tokio::sync::Mutex::new(()),
            callbacks: Arc::new(RwLock::new(HashMap::new())),
            listener: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Send a raw command and return the checked reply text.
    pub async fn send(&self, command: &str) -> Result<String, Error> {
        if !self.session.is_open() {
            return Err(Error::NotConnected);
        }
        let _guard = self.command_lock.lock().await;

        debug!(command, "sending command");
        let reply = tokio::time::timeout(self.config.timeout, self.session.execute(command))
            .await
            .map_err(|_| Error::Timeout {
                timeout_secs: self.config.timeout.as_secs(),
            })??;

        codec::check_reply(command, &reply)?;
        Ok(reply)
    }

    fn start_listener(&self) {
        let mut lines = self.session.unsolicited();
        let callbacks = Arc::clone(&self.callbacks);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    line = lines.recv() => match line {
                        Ok(line) => dispatch(&callbacks, &line),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "notification listener lagged, lines dropped");
                        }
                        Err(RecvError::Closed) => {
                            debug!("session closed its notification channel");
                            break;
                        }
                    },
                }
            }
        });

        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Listener { cancel, handle });
    }

    async fn stop_listener(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(Listener { cancel, handle }) = listener {
            cancel.cancel();
            let _ = handle.await;
        }
    }
}

fn dispatch(callbacks: &CallbackTable, line: &str) {
    let Some(notification) = codec::parse_notification(line) else {
        return;
    };
    let handlers = callbacks
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&notification.topic())
        .cloned()
        .unwrap_or_default();

    debug!(topic = %notification.topic(), handlers = handlers.len(), "dispatching notification");
    for handler in handlers {
        handler(notification.clone());
    }
}

impl<S: Session + Sync> Transport for NhdClient<S> {
    async fn connect(&self) -> Result<(), Error> {
        info!(
            host = %self.config.host,
            port = self.config.port,
            policy = %self.config.host_key_policy,
            "connecting to NetworkHD controller"
        );
        tokio::time::timeout(self.config.timeout, self.session.open(&self.config))
            .await
            .map_err(|_| Error::Timeout {
                timeout_secs: self.config.timeout.as_secs(),
            })??;
        self.stop_listener().await;
        self.start_listener();
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Error> {
        self.stop_listener().await;
        if self.session.is_open() {
            info!(host = %self.config.host, "disconnecting from NetworkHD controller");
            self.session.close().await?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session.is_open()
    }

    async fn query_device_json(&self) -> Result<Vec<IdentityRecord>, Error> {
        let reply = self.send(codec::QUERY_DEVICE_JSON).await?;
        codec::parse_device_json(&reply)
    }

    async fn query_device_status(&self) -> Result<Vec<StatusRecord>, Error> {
        let reply = self.send(codec::QUERY_DEVICE_STATUS).await?;
        codec::parse_device_status(&reply)
    }

    async fn query_device_info(&self) -> Result<Vec<StaticInfoRecord>, Error> {
        let reply = self.send(codec::QUERY_DEVICE_INFO).await?;
        codec::parse_device_info(&reply)
    }

    async fn query_matrix(&self) -> Result<Vec<MatrixAssignment>, Error> {
        let reply = self.send(codec::QUERY_MATRIX).await?;
        Ok(codec::parse_matrix(&reply))
    }

    async fn query_version(&self) -> Result<VersionInfo, Error> {
        let reply = self.send(codec::QUERY_VERSION).await?;
        codec::parse_version(&reply)
    }

    async fn query_ip_settings(&self) -> Result<IpSettings, Error> {
        let reply = self.send(codec::QUERY_IP_SETTINGS).await?;
        codec::parse_ip_settings(&reply)
    }

    async fn matrix_set(&self, source: &str, targets: &[String]) -> Result<(), Error> {
        self.send(&codec::matrix_set_command(source, targets)).await?;
        Ok(())
    }

    async fn matrix_set_null(&self, targets: &[String]) -> Result<(), Error> {
        self.send(&codec::matrix_set_null_command(targets)).await?;
        Ok(())
    }

    async fn set_sink_power(&self, power: PowerState, target: &str) -> Result<(), Error> {
        self.send(&codec::sink_power_command(power, target)).await?;
        Ok(())
    }

    async fn reboot(&self) -> Result<(), Error> {
        self.send(codec::REBOOT).await?;
        Ok(())
    }

    fn register_notification_callback(
        &self,
        topic: NotificationTopic,
        callback: NotificationCallback,
    ) {
        debug!(%topic, "registering notification callback");
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic)
            .or_default()
            .push(callback);
    }
}
