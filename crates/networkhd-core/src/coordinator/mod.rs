// ── Coordinator abstraction ──
//
// Owns the transport to one NetworkHD controller, keeps a merged device
// snapshot current through periodic polling and push notifications, and
// exposes reads and writes to embedders. Cheaply cloneable via
// `Arc<CoordinatorInner>`.

mod commands;
mod notify;
mod refresh;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use networkhd_api::{Notification, NotificationTopic, StaticInfoRecord, Transport};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::CoordinatorConfig;
use crate::error::CoreError;
use crate::model::{ControllerInfo, MergedDevice};
use crate::store::cache::TtlCache;
use crate::store::{CoordinatorSnapshot, DeviceCollection};

pub(crate) use commands::command_name;
pub use notify::extract;
pub use refresh::DataKind;

/// Pause between readiness checks in [`Coordinator::wait_for_data`].
const DATA_POLL_STEP: Duration = Duration::from_secs(1);

/// Lifecycle of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CoordinatorState {
    Uninitialized,
    Connecting,
    Connected,
    Refreshing,
    /// The latest full refresh published fresh data.
    Ready,
    /// The latest full refresh failed outright; older data may remain.
    Degraded,
    /// Setup gave up. `setup` may be called again.
    Failed,
    ShuttingDown,
    Closed,
}

impl CoordinatorState {
    fn is_closing(self) -> bool {
        matches!(self, Self::ShuttingDown | Self::Closed)
    }
}

// ── Coordinator handle ───────────────────────────────────────────────

/// The main entry point for embedders.
///
/// Cheaply cloneable; every clone drives the same coordinator.
pub struct Coordinator<T> {
    inner: Arc<CoordinatorInner<T>>,
}

impl<T> Clone for Coordinator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<T> {
    config: CoordinatorConfig,
    transport: T,
    state: watch::Sender<CoordinatorState>,
    snapshot: watch::Sender<Option<Arc<CoordinatorSnapshot>>>,
    /// Error from the latest failed refresh when no snapshot exists yet.
    last_error: Mutex<Option<String>>,
    static_info: TtlCache<Vec<StaticInfoRecord>>,
    controller_info: TtlCache<ControllerInfo>,
    /// Serializes refreshes so slices are never applied out of order.
    refresh_lock: tokio::sync::Mutex<()>,
    notify_tx: mpsc::UnboundedSender<Notification>,
    notify_rx: Mutex<Option<mpsc::UnboundedReceiver<Notification>>>,
    callbacks_registered: AtomicBool,
    cancel: CancellationToken,
    task_handles: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<T: Transport + Sync + 'static> Coordinator<T> {
    /// Create a coordinator. Does not connect; call [`setup`](Self::setup).
    pub fn new(config: CoordinatorConfig, transport: T) -> Self {
        let (state, _) = watch::channel(CoordinatorState::Uninitialized);
        let (snapshot, _) = watch::channel(None);
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let ttl = config.static_info_ttl;

        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                transport,
                state,
                snapshot,
                last_error: Mutex::new(None),
                static_info: TtlCache::new(ttl),
                controller_info: TtlCache::new(ttl),
                refresh_lock: tokio::sync::Mutex::new(()),
                notify_tx,
                notify_rx: Mutex::new(Some(notify_rx)),
                callbacks_registered: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                task_handles: tokio::sync::Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Connect, subscribe to notifications, and wait for the first data.
    ///
    /// On failure the transport is disconnected and the coordinator is
    /// left in [`CoordinatorState::Failed`]; calling `setup` again retries.
    pub async fn setup(&self) -> Result<(), CoreError> {
        let inner = &self.inner;
        match inner.state() {
            CoordinatorState::Uninitialized | CoordinatorState::Failed => {}
            state if state.is_closing() => return Err(CoreError::ShuttingDown),
            state => {
                debug!(%state, "setup called on a running coordinator");
                return Ok(());
            }
        }
        inner.config.validate()?;

        let conn = &inner.config.connection;
        if conn.uses_default_password() {
            warn!(host = %conn.host, "connecting with the factory default password");
        }

        inner.transition(CoordinatorState::Connecting);
        if let Err(e) = inner.connect_with_retry().await {
            inner.transition(CoordinatorState::Failed);
            return Err(e);
        }
        inner.transition(CoordinatorState::Connected);

        self.register_callbacks();
        self.spawn_notification_task().await;

        if let Err(e) = inner.full_refresh().await {
            warn!(error = %e, "initial refresh failed, waiting for data");
        }
        if !self.wait_for_data(inner.config.setup_wait_timeout).await {
            let reason = self
                .get_error_message()
                .unwrap_or_else(|| "no device data received".to_owned());
            if let Err(e) = inner.transport.disconnect().await {
                debug!(error = %e, "disconnect after failed setup");
            }
            inner.transition(CoordinatorState::Failed);
            return Err(CoreError::SetupFailed { reason });
        }

        self.spawn_poll_task().await;
        info!(
            host = %conn.host,
            devices = self.get_device_count(),
            "coordinator ready"
        );
        Ok(())
    }

    /// Stop background work and disconnect. Idempotent.
    ///
    /// Background tasks are cancelled and awaited before the transport is
    /// closed, so no notification is processed against a dead session.
    pub async fn shutdown(&self) {
        let inner = &self.inner;
        if !inner.transition(CoordinatorState::ShuttingDown) {
            debug!("shutdown already in progress or complete");
            return;
        }
        inner.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }

        if inner.transport.is_connected() {
            if let Err(e) = inner.transport.disconnect().await {
                warn!(error = %e, "error while disconnecting");
            }
        }
        inner.transition(CoordinatorState::Closed);
        info!("coordinator shut down");
    }

    pub fn state(&self) -> CoordinatorState {
        self.inner.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Query everything and publish a new snapshot.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        self.inner.full_refresh().await
    }

    /// Alias for [`refresh`](Self::refresh), for callers that want an
    /// immediate poll outside the schedule.
    pub async fn force_refresh(&self) -> Result<(), CoreError> {
        self.inner.full_refresh().await
    }

    /// Re-query only `kinds` and patch them into the current snapshot.
    ///
    /// Falls back to a full refresh when there is no snapshot yet, when
    /// the selective path fails, or when the identity reply shows the
    /// device set changed.
    pub async fn selective_refresh(&self, kinds: &[DataKind]) -> Result<(), CoreError> {
        self.inner.selective_refresh(kinds).await
    }

    /// Wait up to `timeout` for a first snapshot, refreshing every second
    /// while none exists. Returns whether data is available.
    pub async fn wait_for_data(&self, timeout: Duration) -> bool {
        let waited = tokio::time::timeout(timeout, async {
            while !self.is_ready() {
                tokio::time::sleep(DATA_POLL_STEP).await;
                if self.is_ready() {
                    break;
                }
                if let Err(e) = self.inner.full_refresh().await {
                    debug!(error = %e, "refresh while waiting for data failed");
                }
            }
        })
        .await;
        waited.is_ok() || self.is_ready()
    }

    /// Drop cached static device info and controller metadata so the next
    /// full refresh queries them again.
    pub fn invalidate_static_info(&self) {
        self.inner.static_info.invalidate();
        self.inner.controller_info.invalidate();
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The current snapshot, if any refresh has succeeded.
    pub fn snapshot(&self) -> Option<Arc<CoordinatorSnapshot>> {
        self.inner.snapshot.borrow().clone()
    }

    /// `true` once at least one snapshot has been published.
    pub fn is_ready(&self) -> bool {
        self.inner.snapshot.borrow().is_some()
    }

    /// `true` if there is no snapshot or the latest refresh failed.
    pub fn has_errors(&self) -> bool {
        self.inner
            .snapshot
            .borrow()
            .as_ref()
            .is_none_or(|snap| snap.has_error())
    }

    pub fn get_error_message(&self) -> Option<String> {
        if let Some(snap) = self.inner.snapshot.borrow().as_ref() {
            return snap.error.clone();
        }
        self.inner
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_device_count(&self) -> usize {
        self.inner
            .snapshot
            .borrow()
            .as_ref()
            .map_or(0, |snap| snap.devices.len())
    }

    /// Look up a device by true name, falling back to alias.
    pub fn get_device_info(&self, name: &str) -> Option<MergedDevice> {
        self.inner
            .snapshot
            .borrow()
            .as_ref()
            .and_then(|snap| snap.devices.find(name).cloned())
    }

    /// Every device of the current snapshot; empty before the first one.
    pub fn get_all_devices(&self) -> DeviceCollection {
        self.inner
            .snapshot
            .borrow()
            .as_ref()
            .map(|snap| snap.devices.clone())
            .unwrap_or_default()
    }

    pub fn controller_info(&self) -> Option<ControllerInfo> {
        self.inner
            .snapshot
            .borrow()
            .as_ref()
            .and_then(|snap| snap.controller.clone())
    }

    /// Observe every snapshot publication and notification patch.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<CoordinatorSnapshot>>> {
        self.inner.snapshot.subscribe()
    }

    /// [`subscribe`](Self::subscribe) as a `Stream`, starting with the
    /// current value.
    pub fn snapshot_stream(&self) -> WatchStream<Option<Arc<CoordinatorSnapshot>>> {
        WatchStream::new(self.inner.snapshot.subscribe())
    }

    // ── Background tasks ─────────────────────────────────────────────

    fn register_callbacks(&self) {
        if self.inner.callbacks_registered.swap(true, Ordering::SeqCst) {
            return;
        }
        for topic in [NotificationTopic::Endpoint, NotificationTopic::Video] {
            let tx = self.inner.notify_tx.clone();
            self.inner.transport.register_notification_callback(
                topic,
                Arc::new(move |notification: Notification| {
                    // Receiver gone means the coordinator is shutting down.
                    let _ = tx.send(notification);
                }),
            );
        }
    }

    async fn spawn_notification_task(&self) {
        let receiver = self
            .inner
            .notify_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(receiver) = receiver else {
            return;
        };
        let inner = Arc::clone(&self.inner);
        let cancel = self.inner.cancel.child_token();
        let handle = tokio::spawn(notification_task(inner, receiver, cancel));
        self.inner.task_handles.lock().await.push(handle);
    }

    async fn spawn_poll_task(&self) {
        let inner = Arc::clone(&self.inner);
        let cancel = self.inner.cancel.child_token();
        let handle = tokio::spawn(poll_task(inner, cancel));
        self.inner.task_handles.lock().await.push(handle);
    }
}

impl<T: Transport + Sync + 'static> CoordinatorInner<T> {
    fn state(&self) -> CoordinatorState {
        *self.state.borrow()
    }

    /// Move to `next`. Once shutdown has begun only `Closed` is accepted.
    /// Returns whether the state changed.
    fn transition(&self, next: CoordinatorState) -> bool {
        self.state.send_if_modified(|current| {
            if *current == next || (current.is_closing() && next != CoordinatorState::Closed) {
                return false;
            }
            debug!(from = %current, to = %next, "coordinator state change");
            *current = next;
            true
        })
    }

    async fn connect_with_retry(&self) -> Result<(), CoreError> {
        let attempts = self.config.connect_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.transport.connect().await {
                Ok(()) => {
                    info!(attempt, "connected to controller");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "connection attempt failed");
                    last_error = e.to_string();
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.connect_delay).await;
            }
        }
        Err(CoreError::ConnectionFailed {
            host: self.config.connection.host.clone(),
            reason: last_error,
        })
    }

    /// Retry hook: reopen the session after a connection-class failure.
    async fn after_failure(&self, connection_lost: bool) {
        if !connection_lost || self.cancel.is_cancelled() {
            return;
        }
        info!("connection lost, reconnecting");
        if let Err(e) = self.transport.disconnect().await {
            debug!(error = %e, "disconnect before reconnect failed");
        }
        match self.transport.connect().await {
            Ok(()) => info!("reconnected to controller"),
            Err(e) => warn!(error = %e, "reconnect failed"),
        }
    }
}

/// Periodic full refresh.
async fn poll_task<T: Transport + Sync + 'static>(
    inner: Arc<CoordinatorInner<T>>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(inner.config.poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await; // consume immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = inner.full_refresh() => {
                        if let Err(e) = result {
                            warn!(error = %e, "periodic refresh failed");
                        }
                    }
                }
            }
        }
    }
    debug!("poll task stopped");
}

/// Single consumer for pushed notifications, so patches apply in arrival
/// order and never interleave with each other.
async fn notification_task<T: Transport + Sync + 'static>(
    inner: Arc<CoordinatorInner<T>>,
    mut receiver: mpsc::UnboundedReceiver<Notification>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = receiver.recv() => {
                let Some(notification) = next else { break };
                inner.apply_notification(&notification);
            }
        }
    }
    debug!("notification task stopped");
}
