#![allow(clippy::unwrap_used)]
// Integration tests for `NhdClient` driven by a scripted in-memory session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::{broadcast, mpsc};
use tokio_test::{assert_err, assert_ok};

use networkhd_api::{
    ConnectionConfig, EndpointNotification, Error, MatrixAssignment, NhdClient, Notification,
    NotificationTopic, PowerState, Session, Transport,
};

// ── Helpers ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct FakeSession {
    state: Arc<FakeState>,
}

struct FakeState {
    open: AtomicBool,
    stall: AtomicBool,
    replies: Mutex<HashMap<String, String>>,
    sent: Mutex<Vec<String>>,
    lines: broadcast::Sender<String>,
}

impl FakeSession {
    fn new() -> Self {
        let (lines, _) = broadcast::channel(16);
        Self {
            state: Arc::new(FakeState {
                open: AtomicBool::new(false),
                stall: AtomicBool::new(false),
                replies: Mutex::new(HashMap::new()),
                sent: Mutex::new(Vec::new()),
                lines,
            }),
        }
    }

    fn reply(&self, command: &str, body: &str) {
        self.state
            .replies
            .lock()
            .unwrap()
            .insert(command.to_owned(), body.to_owned());
    }

    fn sent(&self) -> Vec<String> {
        self.state.sent.lock().unwrap().clone()
    }

    fn push_line(&self, line: &str) {
        self.state.lines.send(line.to_owned()).unwrap();
    }
}

impl Session for FakeSession {
    async fn open(&self, _config: &ConnectionConfig) -> Result<(), Error> {
        self.state.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        self.state.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }

    async fn execute(&self, command: &str) -> Result<String, Error> {
        self.state.sent.lock().unwrap().push(command.to_owned());
        if self.state.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let reply = self.state.replies.lock().unwrap().get(command).cloned();
        Ok(reply.unwrap_or_else(|| "command success".to_owned()))
    }

    fn unsolicited(&self) -> broadcast::Receiver<String> {
        self.state.lines.subscribe()
    }
}

fn setup() -> (FakeSession, NhdClient<FakeSession>) {
    let session = FakeSession::new();
    let client = NhdClient::new(session.clone(), ConnectionConfig::new("192.168.1.10"));
    (session, client)
}

// ── Session lifecycle ───────────────────────────────────────────────

#[tokio::test]
async fn test_query_before_connect_is_not_connected() {
    let (session, client) = setup();

    let result = client.query_matrix().await;

    assert!(matches!(result, Err(Error::NotConnected)), "got {result:?}");
    assert!(session.sent().is_empty());
}

#[tokio::test]
async fn test_connect_and_disconnect_toggle_session() {
    let (_session, client) = setup();

    assert_ok!(client.connect().await);
    assert!(client.is_connected());

    assert_ok!(client.disconnect().await);
    assert!(!client.is_connected());

    // Disconnecting twice is harmless.
    assert_ok!(client.disconnect().await);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_command_times_out() {
    let (session, client) = setup();
    client.connect().await.unwrap();
    session.state.stall.store(true, Ordering::SeqCst);

    let err = assert_err!(client.query_device_status().await);

    assert!(matches!(err, Error::Timeout { timeout_secs: 10 }), "got {err:?}");
    assert!(err.is_connection_error());
}

// ── Queries ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_query_device_json_parses_reply() {
    let (session, client) = setup();
    session.reply(
        "config get devicejsonstring",
        r#"device json string:
[{"trueName":"IPE350-1","aliasName":"Lobby","deviceType":"transmitter","ip":"169.254.1.20","online":true,"sequence":1}]"#,
    );
    client.connect().await.unwrap();

    let records = client.query_device_json().await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].alias_name, "Lobby");
    assert_eq!(session.sent(), vec!["config get devicejsonstring"]);
}

#[tokio::test]
async fn test_query_matrix_parses_table() {
    let (session, client) = setup();
    session.reply("matrix get", "matrix information:\nLobby Board\nNULL Bar\n");
    client.connect().await.unwrap();

    let rows = client.query_matrix().await.unwrap();

    assert_eq!(
        rows,
        vec![
            MatrixAssignment::new(Some("Lobby"), "Board"),
            MatrixAssignment::new(None, "Bar"),
        ]
    );
}

#[tokio::test]
async fn test_query_controller_metadata() {
    let (session, client) = setup();
    session.reply("config get version", "API version: v1.21\nSystem version: v8.3.1(v8.3.8)");
    session.reply(
        "config get ipsetting",
        "ipsetting is: ip4addr 10.0.0.2 netmask 255.255.255.0 gateway 10.0.0.1",
    );
    client.connect().await.unwrap();

    let version = client.query_version().await.unwrap();
    let ip = client.query_ip_settings().await.unwrap();

    assert_eq!(version.core_version, "v8.3.8");
    assert_eq!(ip.netmask, "255.255.255.0");
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_commands_are_sent_verbatim() {
    let (session, client) = setup();
    client.connect().await.unwrap();
    let targets = vec!["Board".to_owned(), "Bar".to_owned()];

    client.matrix_set("Lobby", &targets).await.unwrap();
    client.matrix_set_null(&targets[..1]).await.unwrap();
    client.set_sink_power(PowerState::Off, "Bar").await.unwrap();
    client.reboot().await.unwrap();

    assert_eq!(
        session.sent(),
        vec![
            "matrix set Lobby Board Bar",
            "matrix set null Board",
            "config set device sinkpower off Bar",
            "config set reboot",
        ]
    );
}

#[tokio::test]
async fn test_rejected_command_surfaces_error() {
    let (session, client) = setup();
    session.reply("matrix set Ghost Board", "Error: device Ghost not found");
    client.connect().await.unwrap();

    let err = client
        .matrix_set("Ghost", &["Board".to_owned()])
        .await
        .unwrap_err();

    assert!(err.is_rejected(), "got {err:?}");
}

// ── Notifications ───────────────────────────────────────────────────

#[tokio::test]
async fn test_notifications_reach_topic_callbacks() {
    let (session, client) = setup();
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.register_notification_callback(
        NotificationTopic::Endpoint,
        Arc::new(move |n: Notification| {
            let _ = tx.send(n);
        }),
    );
    client.connect().await.unwrap();

    session.push_line("notify video lost IPE350-1");
    session.push_line("notify endpoint - IPD5100-1");

    let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        received,
        Notification::Endpoint(EndpointNotification {
            device: "IPD5100-1".into(),
            online: false,
        })
    );
    assert!(rx.try_recv().is_err(), "video line must not reach endpoint callback");
}

#[tokio::test]
async fn test_reconnect_replaces_listener() {
    let (session, client) = setup();
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.register_notification_callback(
        NotificationTopic::Endpoint,
        Arc::new(move |n: Notification| {
            let _ = tx.send(n);
        }),
    );
    client.connect().await.unwrap();
    client.connect().await.unwrap();

    assert_eq!(session.state.lines.receiver_count(), 1);

    session.push_line("notify endpoint + IPD5100-1");
    let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        received,
        Notification::Endpoint(EndpointNotification {
            device: "IPD5100-1".into(),
            online: true,
        })
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err(), "notification delivered twice");
}
