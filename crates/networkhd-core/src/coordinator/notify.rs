// ── Notification reconciliation ──
//
// Applies pushed endpoint and video events to the current snapshot in
// place. Never touches the transport; the next poll remains the source
// of truth for everything else.

use std::sync::Arc;

use networkhd_api::records::value_as_bool;
use networkhd_api::{Notification, NotificationTopic, Transport};
use serde_json::Value;
use tracing::{debug, warn};

use super::CoordinatorInner;
use crate::store::CoordinatorSnapshot;

const DEVICE_KEYS: &[&str] = &["device", "device_name", "name", "true_name"];
const ONLINE_KEYS: &[&str] = &["online", "is_online", "state"];
const VIDEO_KEYS: &[&str] = &["found", "status", "signal"];

/// First non-null value found under `candidates`, trying each key as a
/// typed attribute and then as a mapping key.
pub fn extract(notification: &Notification, candidates: &[&str]) -> Option<Value> {
    candidates.iter().find_map(|key| {
        notification
            .attribute(key)
            .filter(|v| !v.is_null())
            .or_else(|| {
                notification
                    .mapping_value(key)
                    .filter(|v| !v.is_null())
                    .cloned()
            })
    })
}

fn extract_name(notification: &Notification) -> Option<String> {
    match extract(notification, DEVICE_KEYS)? {
        Value::String(name) if !name.is_empty() => Some(name),
        _ => None,
    }
}

impl<T: Transport + Sync + 'static> CoordinatorInner<T> {
    pub(super) fn apply_notification(&self, notification: &Notification) {
        self.snapshot
            .send_if_modified(|slot| reconcile(slot, notification));
    }
}

/// Patch `slot` for one notification. Returns whether anything changed.
fn reconcile(slot: &mut Option<Arc<CoordinatorSnapshot>>, notification: &Notification) -> bool {
    let topic = notification.topic();
    let Some(snapshot) = slot else {
        debug!(%topic, "notification before first refresh, ignored");
        return false;
    };
    let Some(name) = extract_name(notification) else {
        warn!(%topic, "notification without a device name");
        return false;
    };

    let keys = match topic {
        NotificationTopic::Endpoint => ONLINE_KEYS,
        NotificationTopic::Video => VIDEO_KEYS,
    };
    let Some(flag) = extract(notification, keys).as_ref().and_then(value_as_bool) else {
        warn!(%topic, device = %name, "notification without a usable state");
        return false;
    };

    let current = match snapshot.devices.find(&name) {
        Some(device) => match topic {
            NotificationTopic::Endpoint => Some(device.is_online()),
            NotificationTopic::Video => device.hdmi_active(),
        },
        None => {
            debug!(%topic, device = %name, "notification for unknown device");
            return false;
        }
    };
    if current == Some(flag) {
        return false;
    }

    let snap = Arc::make_mut(snapshot);
    let changed = snap
        .devices
        .find_mut(&name)
        .is_some_and(|device| match topic {
            NotificationTopic::Endpoint => device.set_online(flag),
            NotificationTopic::Video => device.set_hdmi_active(flag),
        });
    if changed {
        debug!(%topic, device = %name, value = flag, "applied notification");
    }
    changed
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use networkhd_api::{EndpointNotification, IdentityRecord, VideoNotification};
    use serde_json::json;

    use crate::model::{DeviceRole, MergedDevice};
    use crate::store::DeviceCollection;

    fn snapshot() -> Option<Arc<CoordinatorSnapshot>> {
        let rx = IdentityRecord {
            true_name: "IPD5100-1".into(),
            alias_name: "Board".into(),
            device_type: "receiver".into(),
            online: true,
            ..IdentityRecord::default()
        };
        let devices: DeviceCollection =
            std::iter::once(MergedDevice::from_records(DeviceRole::Receiver, &rx, None, None))
                .collect();
        Some(Arc::new(CoordinatorSnapshot {
            devices,
            ..CoordinatorSnapshot::default()
        }))
    }

    fn mapping(topic: NotificationTopic, payload: Value) -> Notification {
        let Value::Object(payload) = payload else {
            unreachable!()
        };
        Notification::Mapping { topic, payload }
    }

    #[test]
    fn extract_reads_attributes_and_mappings() {
        let typed = Notification::Endpoint(EndpointNotification {
            device: "rx".into(),
            online: true,
        });
        assert_eq!(extract(&typed, DEVICE_KEYS), Some(json!("rx")));

        let loose = mapping(NotificationTopic::Endpoint, json!({"true_name": "rx"}));
        assert_eq!(extract(&loose, DEVICE_KEYS), Some(json!("rx")));
        assert_eq!(extract(&loose, ONLINE_KEYS), None);
    }

    #[test]
    fn extract_skips_null_values() {
        let n = mapping(
            NotificationTopic::Endpoint,
            json!({"device": null, "name": "IPD5100-1", "online": null, "state": false}),
        );
        assert_eq!(extract(&n, DEVICE_KEYS), Some(json!("IPD5100-1")));
        assert_eq!(extract(&n, ONLINE_KEYS), Some(json!(false)));

        let mut slot = snapshot();
        assert!(reconcile(&mut slot, &n));
        assert!(!slot.as_ref().unwrap().devices.get("IPD5100-1").unwrap().is_online());
    }

    #[test]
    fn endpoint_notification_flips_online_by_alias() {
        let mut slot = snapshot();
        let n = Notification::Endpoint(EndpointNotification {
            device: "Board".into(),
            online: false,
        });

        assert!(reconcile(&mut slot, &n));
        assert!(!slot.as_ref().unwrap().devices.get("IPD5100-1").unwrap().is_online());
        assert!(!reconcile(&mut slot, &n), "second identical patch is a no-op");
    }

    #[test]
    fn video_mapping_sets_hdmi_output() {
        let mut slot = snapshot();
        let n = mapping(
            NotificationTopic::Video,
            json!({"device_name": "IPD5100-1", "status": "found"}),
        );

        assert!(reconcile(&mut slot, &n));
        let device = slot.as_ref().unwrap().devices.get("IPD5100-1").unwrap().clone();
        assert_eq!(device.hdmi_active(), Some(true));
    }

    #[test]
    fn unusable_notifications_change_nothing() {
        let mut slot = snapshot();
        let unknown = Notification::Video(VideoNotification {
            device: "ghost".into(),
            found: true,
        });
        let nameless = mapping(NotificationTopic::Endpoint, json!({"online": false}));
        let stateless = mapping(NotificationTopic::Endpoint, json!({"device": "Board"}));

        assert!(!reconcile(&mut slot, &unknown));
        assert!(!reconcile(&mut slot, &nameless));
        assert!(!reconcile(&mut slot, &stateless));

        let mut empty = None;
        assert!(!reconcile(&mut empty, &unknown));
    }
}
