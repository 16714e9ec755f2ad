// ── NetworkHD text protocol codec ──
//
// Command formatting and reply parsing. Replies are a human-readable
// header line followed by either embedded JSON or whitespace-separated
// tables; the parsers locate the payload and ignore the decoration.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Error;
use crate::notification::{EndpointNotification, Notification, VideoNotification};
use crate::records::{
    IdentityRecord, IpSettings, MatrixAssignment, PowerState, StaticInfoRecord, StatusRecord,
    VersionInfo,
};

// ── Commands ────────────────────────────────────────────────────────

pub const QUERY_DEVICE_JSON: &str = "config get devicejsonstring";
pub const QUERY_DEVICE_STATUS: &str = "config get device status";
pub const QUERY_DEVICE_INFO: &str = "config get device info";
pub const QUERY_MATRIX: &str = "matrix get";
pub const QUERY_VERSION: &str = "config get version";
pub const QUERY_IP_SETTINGS: &str = "config get ipsetting";
pub const REBOOT: &str = "config set reboot";

/// Placeholder the controller uses for "no transmitter".
const NULL_SOURCE: &str = "NULL";

/// `matrix set TX RX1 RX2 ...`
pub fn matrix_set_command(source: &str, targets: &[String]) -> String {
    format!("matrix set {source} {}", targets.join(" "))
}

/// `matrix set null RX1 RX2 ...`
pub fn matrix_set_null_command(targets: &[String]) -> String {
    format!("matrix set null {}", targets.join(" "))
}

/// `config set device sinkpower on|off RX`
pub fn sink_power_command(power: PowerState, target: &str) -> String {
    format!("config set device sinkpower {power} {target}")
}

// ── Replies ─────────────────────────────────────────────────────────

/// Reject replies the controller uses to signal a refused command.
pub fn check_reply(command: &str, reply: &str) -> Result<(), Error> {
    let trimmed = reply.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("unknown command") || lower.starts_with("error") {
        return Err(Error::Command {
            command: command.to_owned(),
            message: trimmed.to_owned(),
        });
    }
    Ok(())
}

/// Parse `device json string: [ ... ]`.
pub fn parse_device_json(body: &str) -> Result<Vec<IdentityRecord>, Error> {
    let payload = embedded_json(body, '[', ']', "device json")?;
    match payload {
        Value::Array(items) => Ok(decode_items(items, "device json")),
        other => Err(Error::Parse {
            what: "device json",
            message: format!("expected an array, found {}", kind_of(&other)),
        }),
    }
}

/// Parse `devices status info: {"devices status": [ ... ]}`.
pub fn parse_device_status(body: &str) -> Result<Vec<StatusRecord>, Error> {
    let payload = embedded_json(body, '{', '}', "device status")?;
    list_under(payload, "devices status", "device status")
}

/// Parse `devices json info: {"devices": [ ... ]}`.
pub fn parse_device_info(body: &str) -> Result<Vec<StaticInfoRecord>, Error> {
    let payload = embedded_json(body, '{', '}', "device info")?;
    list_under(payload, "devices", "device info")
}

/// Parse the `matrix get` table.
///
/// ```text
/// matrix information:
/// Lobby-TX Lobby-RX
/// NULL Board-RX
/// ```
pub fn parse_matrix(body: &str) -> Vec<MatrixAssignment> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.ends_with(':'))
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let (Some(tx), Some(rx), None) = (cols.next(), cols.next(), cols.next()) else {
                debug!(line, "skipping malformed matrix line");
                return None;
            };
            let tx = (!tx.eq_ignore_ascii_case(NULL_SOURCE)).then_some(tx);
            Some(MatrixAssignment::new(tx, rx))
        })
        .collect()
}

/// Parse `config get version`.
///
/// ```text
/// API version: v1.21
/// System version: v8.3.1(v8.3.8)
/// ```
pub fn parse_version(body: &str) -> Result<VersionInfo, Error> {
    let mut info = VersionInfo::default();
    for line in body.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "api version" => value.clone_into(&mut info.api_version),
            "system version" => match value.split_once('(') {
                Some((web, core)) => {
                    web.trim().clone_into(&mut info.web_version);
                    core.trim_end_matches(')').trim().clone_into(&mut info.core_version);
                }
                None => value.clone_into(&mut info.web_version),
            },
            _ => {}
        }
    }
    if info.api_version.is_empty() && info.web_version.is_empty() {
        return Err(Error::Parse {
            what: "version",
            message: format!("no version lines in {body:?}"),
        });
    }
    Ok(info)
}

/// Parse `ipsetting is: ip4addr X netmask Y gateway Z`.
pub fn parse_ip_settings(body: &str) -> Result<IpSettings, Error> {
    let fields = body.split_once(':').map_or(body, |(_, rest)| rest);
    let tokens: Vec<&str> = fields.split_whitespace().collect();
    let mut settings = IpSettings::default();
    for pair in tokens.chunks(2) {
        let [key, value] = pair else { break };
        match *key {
            "ip4addr" => (*value).clone_into(&mut settings.ip4addr),
            "netmask" => (*value).clone_into(&mut settings.netmask),
            "gateway" => (*value).clone_into(&mut settings.gateway),
            _ => {}
        }
    }
    if settings.ip4addr.is_empty() {
        return Err(Error::Parse {
            what: "ipsetting",
            message: format!("no ip4addr in {body:?}"),
        });
    }
    Ok(settings)
}

/// Decode one unsolicited line. Returns `None` for lines that are not
/// notifications this crate understands.
///
/// ```text
/// notify endpoint + IPD5100-AABBCC
/// notify endpoint - IPD5100-AABBCC
/// notify video found IPE350-1A2B3C
/// notify video lost IPE350-1A2B3C
/// ```
pub fn parse_notification(line: &str) -> Option<Notification> {
    let mut words = line.split_whitespace();
    if words.next()? != "notify" {
        return None;
    }
    let topic = words.next()?;
    let flag = words.next()?;
    let device = words.next()?.to_owned();

    match (topic, flag) {
        ("endpoint", "+") => Some(Notification::Endpoint(EndpointNotification {
            device,
            online: true,
        })),
        ("endpoint", "-") => Some(Notification::Endpoint(EndpointNotification {
            device,
            online: false,
        })),
        ("video", "found") => Some(Notification::Video(VideoNotification {
            device,
            found: true,
        })),
        ("video", "lost") => Some(Notification::Video(VideoNotification {
            device,
            found: false,
        })),
        _ => {
            debug!(line, "ignoring unrecognised notification");
            None
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Cut the JSON payload out of a reply by its outermost delimiters.
fn embedded_json(body: &str, open: char, close: char, what: &'static str) -> Result<Value, Error> {
    let (Some(start), Some(end)) = (body.find(open), body.rfind(close)) else {
        return Err(Error::Parse {
            what,
            message: format!("no `{open}...{close}` block in reply"),
        });
    };
    if end < start {
        return Err(Error::Parse {
            what,
            message: "unbalanced JSON delimiters".into(),
        });
    }
    let slice = body.get(start..=end).unwrap_or_default();
    serde_json::from_str(slice).map_err(|e| Error::Deserialization {
        message: format!("{what}: {e}"),
        body: body.to_owned(),
    })
}

fn list_under<T: DeserializeOwned>(
    payload: Value,
    key: &str,
    what: &'static str,
) -> Result<Vec<T>, Error> {
    let Value::Object(mut map) = payload else {
        return Err(Error::Parse {
            what,
            message: format!("expected an object, found {}", kind_of(&payload)),
        });
    };
    match map.remove(key) {
        Some(Value::Array(items)) => Ok(decode_items(items, what)),
        Some(other) => Err(Error::Parse {
            what,
            message: format!("`{key}` is {}, not an array", kind_of(&other)),
        }),
        None => Err(Error::Parse {
            what,
            message: format!("missing `{key}`"),
        }),
    }
}

/// Decode each element independently so one bad entry does not sink the
/// whole reply.
fn decode_items<T: DeserializeOwned>(items: Vec<Value>, what: &'static str) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(what, index, error = %e, "skipping malformed record");
                None
            }
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn device_json_skips_bad_elements() {
        let body = r#"device json string:
[{"trueName":"IPE350-1","aliasName":"TX1","deviceType":"transmitter","online":true},
 {"trueName":["not","a","string"]},
 {"trueName":"IPD5100-1","aliasName":"RX1","deviceType":"receiver","online":false,"txName":"TX1"}]"#;

        let recs = parse_device_json(body).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[1].tx_name.as_deref(), Some("TX1"));
    }

    #[test]
    fn device_json_without_payload_is_a_parse_error() {
        let err = parse_device_json("device json string:").unwrap_err();
        assert!(matches!(err, Error::Parse { what: "device json", .. }));
    }

    #[test]
    fn device_status_reads_nested_list() {
        let body = r#"devices status info:
{"devices status":[{"name":"IPE350-1","hdmi in active":"true","resolution":"1920x1080"}]}"#;
        let recs = parse_device_status(body).unwrap();
        assert_eq!(recs[0].name, "IPE350-1");
        assert_eq!(recs[0].hdmi_in_active, Some(true));
    }

    #[test]
    fn device_info_rejects_wrong_shape() {
        let err = parse_device_info(r#"devices json info: {"devices": 3}"#).unwrap_err();
        assert!(matches!(err, Error::Parse { what: "device info", .. }));
    }

    #[test]
    fn matrix_table_maps_null_to_none() {
        let body = "matrix information:\nTX1 RX1\nNULL RX2\n\ngarbage\n";
        assert_eq!(
            parse_matrix(body),
            vec![
                MatrixAssignment::new(Some("TX1"), "RX1"),
                MatrixAssignment::new(None, "RX2"),
            ]
        );
    }

    #[test]
    fn version_splits_web_and_core() {
        let info = parse_version("API version: v1.21\nSystem version: v8.3.1(v8.3.8)\n").unwrap();
        assert_eq!(info.api_version, "v1.21");
        assert_eq!(info.web_version, "v8.3.1");
        assert_eq!(info.core_version, "v8.3.8");
    }

    #[test]
    fn ip_settings_reads_key_value_pairs() {
        let ip = parse_ip_settings(
            "ipsetting is: ip4addr 169.254.1.1 netmask 255.255.0.0 gateway 169.254.1.254",
        )
        .unwrap();
        assert_eq!(ip.ip4addr, "169.254.1.1");
        assert_eq!(ip.gateway, "169.254.1.254");
        assert!(parse_ip_settings("ipsetting is:").is_err());
    }

    #[test]
    fn notifications_decode_known_forms() {
        assert_eq!(
            parse_notification("notify endpoint - RX1"),
            Some(Notification::Endpoint(EndpointNotification {
                device: "RX1".into(),
                online: false
            }))
        );
        assert_eq!(
            parse_notification("notify video found TX1"),
            Some(Notification::Video(VideoNotification {
                device: "TX1".into(),
                found: true
            }))
        );
        assert_eq!(parse_notification("notify cecinfo RX1 ff"), None);
        assert_eq!(parse_notification("matrix information:"), None);
    }

    #[test]
    fn commands_are_formatted_for_the_controller() {
        let rx = vec!["RX1".to_owned(), "RX2".to_owned()];
        assert_eq!(matrix_set_command("TX1", &rx), "matrix set TX1 RX1 RX2");
        assert_eq!(matrix_set_null_command(&rx), "matrix set null RX1 RX2");
        assert_eq!(
            sink_power_command(PowerState::On, "RX1"),
            "config set device sinkpower on RX1"
        );
    }

    #[test]
    fn error_replies_are_rejected() {
        assert!(check_reply("matrix get", "unknown command").is_err());
        assert!(check_reply(REBOOT, "system will reboot now").is_ok());
    }
}
