// ── Unsolicited controller notifications ──
//
// The controller pushes `notify ...` lines on the open session. The
// client decodes the ones it understands into typed payloads; anything
// delivered by a session layer that already produces JSON arrives as a
// plain mapping. Consumers read fields through `attribute` (typed
// payloads) or `mapping_value` (mapping payloads).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Notification channel a callback subscribes to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationTopic {
    /// Device connectivity changes (`notify endpoint + NAME`).
    Endpoint,
    /// Video signal changes (`notify video found NAME`).
    Video,
}

/// A device went online or offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointNotification {
    pub device: String,
    pub online: bool,
}

/// A device gained or lost its video signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoNotification {
    pub device: String,
    pub found: bool,
}

/// A decoded notification as handed to registered callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Endpoint(EndpointNotification),
    Video(VideoNotification),
    /// Payload delivered as a loose key/value mapping.
    Mapping {
        topic: NotificationTopic,
        payload: Map<String, Value>,
    },
}

impl Notification {
    pub fn topic(&self) -> NotificationTopic {
        match self {
            Self::Endpoint(_) => NotificationTopic::Endpoint,
            Self::Video(_) => NotificationTopic::Video,
            Self::Mapping { topic, .. } => *topic,
        }
    }

    /// Named field of a typed payload. Always `None` for mappings.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        match (self, name) {
            (Self::Endpoint(n), "device") => Some(Value::from(n.device.as_str())),
            (Self::Endpoint(n), "online") => Some(Value::Bool(n.online)),
            (Self::Video(n), "device") => Some(Value::from(n.device.as_str())),
            (Self::Video(n), "found" | "status") => Some(Value::Bool(n.found)),
            _ => None,
        }
    }

    /// Key lookup on a mapping payload. Always `None` for typed payloads.
    pub fn mapping_value(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Mapping { payload, .. } => payload.get(key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_payloads_expose_attributes_only() {
        let n = Notification::Endpoint(EndpointNotification {
            device: "rx1".into(),
            online: false,
        });
        assert_eq!(n.attribute("device"), Some(json!("rx1")));
        assert_eq!(n.attribute("online"), Some(json!(false)));
        assert_eq!(n.mapping_value("device"), None);
        assert_eq!(n.topic(), NotificationTopic::Endpoint);
    }

    #[test]
    fn mapping_payloads_expose_keys_only() {
        let Value::Object(payload) = json!({"device_name": "tx1", "status": "lost"}) else {
            unreachable!()
        };
        let n = Notification::Mapping {
            topic: NotificationTopic::Video,
            payload,
        };
        assert_eq!(n.attribute("device_name"), None);
        assert_eq!(n.mapping_value("status"), Some(&json!("lost")));
    }

    #[test]
    fn topic_names_round_trip_through_strings() {
        assert_eq!(NotificationTopic::Video.as_ref(), "video");
        assert_eq!(
            "endpoint".parse::<NotificationTopic>().ok(),
            Some(NotificationTopic::Endpoint)
        );
    }
}
