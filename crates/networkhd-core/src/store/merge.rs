// ── Device merge engine ──
//
// Joins the three per-device replies into `MergedDevice`s and overlays
// the routing matrix. Pure functions: no I/O, no shared state.
//
// Join policy:
// - identity is the driving source; a device exists only if it has an
//   identity record with a recognised role
// - static info is required per device whenever the info reply is
//   non-empty; an empty info reply means the source is unavailable and
//   every device is built with default static fields
// - status is optional; a device without a status record keeps default
//   status fields

use std::collections::HashMap;

use networkhd_api::{IdentityRecord, MatrixAssignment, StaticInfoRecord, StatusRecord};
use tracing::{debug, warn};

use super::collection::DeviceCollection;
use crate::model::{DeviceRole, MergedDevice};

/// Build a fresh collection from the three device replies.
///
/// Never fails: malformed records are logged and skipped. The result's
/// `available_sources`/`available_sinks` lists are filled in by
/// [`project_matrix`].
pub fn merge(
    identities: &[IdentityRecord],
    statuses: &[StatusRecord],
    infos: &[StaticInfoRecord],
) -> DeviceCollection {
    let status_by_name = index_by_name(statuses, |s| &s.name, "status");
    let info_by_name = index_by_name(infos, |i| &i.name, "static info");
    let info_available = !infos.is_empty();

    let mut devices = DeviceCollection::new();
    for identity in identities {
        let name = identity.true_name.as_str();
        if name.is_empty() {
            warn!("skipping identity record without a true name");
            continue;
        }
        let Some(role) = DeviceRole::from_wire(&identity.device_type) else {
            warn!(device = name, device_type = %identity.device_type, "skipping device with unrecognised type");
            continue;
        };

        let info = info_by_name.get(name).copied();
        if info_available && info.is_none() {
            debug!(device = name, "excluding device without static info");
            continue;
        }

        let status = status_by_name.get(name).copied();
        let device = MergedDevice::from_records(role, identity, status, info);
        if devices.insert(device).is_some() {
            warn!(device = name, "duplicate identity record, keeping the last one");
        }
    }

    debug!(
        identities = identities.len(),
        statuses = statuses.len(),
        infos = infos.len(),
        merged = devices.len(),
        "merged device replies"
    );
    devices
}

/// Overlay routing onto `devices`.
///
/// Resets every receiver's `current_source`, then sets it from each
/// assignment whose `rx` names a known receiver (by true name, then
/// alias). A `tx` naming a known transmitter is normalised to its true
/// name. Later assignments for the same receiver win. Also refreshes
/// every `available_sources`/`available_sinks` list. Idempotent.
pub fn project_matrix(devices: &mut DeviceCollection, assignments: &[MatrixAssignment]) {
    let transmitters = devices.names_with_role(DeviceRole::Transmitter);
    let receivers = devices.names_with_role(DeviceRole::Receiver);

    for device in devices.iter_mut() {
        match device {
            MergedDevice::Transmitter(tx) => tx.available_sinks.clone_from(&receivers),
            MergedDevice::Receiver(rx) => {
                rx.available_sources.clone_from(&transmitters);
                rx.current_source = None;
            }
        }
    }

    for assignment in assignments {
        let source = assignment
            .tx
            .as_deref()
            .filter(|tx| !tx.is_empty())
            .map(|tx| match devices.find(tx) {
                Some(found) if found.is_transmitter() => found.true_name().to_owned(),
                _ => {
                    debug!(tx, "matrix source is not a known transmitter");
                    tx.to_owned()
                }
            });

        match devices.find_mut(&assignment.rx) {
            Some(MergedDevice::Receiver(rx)) => rx.current_source = source,
            Some(MergedDevice::Transmitter(_)) => {
                warn!(rx = %assignment.rx, "matrix assignment targets a transmitter");
            }
            None => debug!(rx = %assignment.rx, "matrix assignment for unknown receiver"),
        }
    }
}

// ── Slice updates ───────────────────────────────────────────────────
//
// Used by selective refresh and by full refreshes that lost the identity
// reply: patch one source's fields on an existing collection.

/// Replace every device's status. Devices without a record reset to
/// defaults.
pub(crate) fn apply_statuses(devices: &mut DeviceCollection, statuses: &[StatusRecord]) {
    let index = index_by_name(statuses, |s| &s.name, "status");
    for device in devices.iter_mut() {
        let record = index.get(device.true_name()).copied();
        device.apply_status(record);
    }
}

/// Replace static fields of every device that has a record.
pub(crate) fn apply_static_infos(devices: &mut DeviceCollection, infos: &[StaticInfoRecord]) {
    for info in infos {
        if let Some(device) = devices.get_mut(&info.name) {
            device.apply_static_info(info);
        }
    }
}

/// Replace identity fields of known devices.
///
/// Returns `false` without touching anything if the records describe a
/// different device set (added, removed, or re-typed devices), which
/// needs a full merge instead.
pub(crate) fn apply_identities(devices: &mut DeviceCollection, identities: &[IdentityRecord]) -> bool {
    let recognised: Vec<(&IdentityRecord, DeviceRole)> = identities
        .iter()
        .filter(|rec| !rec.true_name.is_empty())
        .filter_map(|rec| DeviceRole::from_wire(&rec.device_type).map(|role| (rec, role)))
        .collect();

    let same_set = recognised.len() == devices.len()
        && recognised.iter().all(|(rec, role)| {
            devices
                .get(&rec.true_name)
                .is_some_and(|d| d.role() == *role)
        });
    if !same_set {
        return false;
    }

    for (rec, _) in recognised {
        if let Some(device) = devices.get_mut(&rec.true_name) {
            device.apply_identity(rec);
        }
    }
    true
}

pub(crate) fn index_by_name<'a, T>(
    records: &'a [T],
    name: impl Fn(&T) -> &String,
    what: &'static str,
) -> HashMap<&'a str, &'a T> {
    let mut index = HashMap::with_capacity(records.len());
    for record in records {
        let key = name(record).as_str();
        if key.is_empty() {
            warn!(what, "skipping record without a name");
            continue;
        }
        index.insert(key, record);
    }
    index
}
