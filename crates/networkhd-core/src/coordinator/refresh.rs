// ── Full and selective refresh ──
//
// A full refresh queries every source through the retry helper, merges,
// projects the matrix, and replaces the snapshot. A selective refresh
// re-queries named sources and patches only their slice of the current
// snapshot.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError};

use chrono::Utc;
use networkhd_api::{
    IdentityRecord, MatrixAssignment, StaticInfoRecord, StatusRecord, Transport,
};
use tracing::{debug, info, warn};

use super::{CoordinatorInner, CoordinatorState};
use crate::error::CoreError;
use crate::model::{ControllerInfo, DeviceRole};
use crate::retry::{Fetched, RetryPolicy, retry, retry_or_default};
use crate::store::merge::{apply_identities, apply_static_infos, apply_statuses};
use crate::store::{CoordinatorSnapshot, DeviceCollection, merge, project_matrix};

/// One controller data source, for selective refresh.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
pub enum DataKind {
    #[strum(serialize = "device_jsonstring")]
    DeviceJson,
    #[strum(serialize = "device_status")]
    DeviceStatus,
    #[strum(serialize = "device_info")]
    DeviceInfo,
    #[strum(serialize = "matrix_assignments")]
    MatrixAssignments,
}

/// Everything one full refresh fetched.
struct RefreshData {
    identities: Fetched<Vec<IdentityRecord>>,
    statuses: Fetched<Vec<StatusRecord>>,
    infos: Fetched<Vec<StaticInfoRecord>>,
    matrix: Fetched<Vec<MatrixAssignment>>,
    controller: Option<ControllerInfo>,
}

impl RefreshData {
    fn any_succeeded(&self) -> bool {
        self.identities.succeeded
            || self.statuses.succeeded
            || self.infos.succeeded
            || self.matrix.succeeded
    }
}

enum SelectiveOutcome {
    Applied,
    DeviceSetChanged,
}

impl<T: Transport + Sync + 'static> CoordinatorInner<T> {
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.retry_attempts, self.config.retry_delay)
    }

    // ── Full refresh ─────────────────────────────────────────────────

    pub(super) async fn full_refresh(&self) -> Result<(), CoreError> {
        let _guard = self.refresh_lock.lock().await;
        if self.cancel.is_cancelled() {
            return Err(CoreError::ShuttingDown);
        }
        self.transition(CoordinatorState::Refreshing);

        let policy = self.retry_policy();
        let on_retry = |e: &networkhd_api::Error| self.after_failure(e.is_connection_error());

        let identities = retry_or_default(
            "device json",
            policy,
            || self.transport.query_device_json(),
            on_retry,
        )
        .await;
        let statuses = retry_or_default(
            "device status",
            policy,
            || self.transport.query_device_status(),
            on_retry,
        )
        .await;
        let infos = self.fetch_static_info(&identities.value).await;
        let matrix =
            retry_or_default("matrix", policy, || self.transport.query_matrix(), on_retry).await;

        let data = RefreshData {
            identities,
            statuses,
            infos,
            matrix,
            controller: None,
        };
        if !data.any_succeeded() {
            let message = "all device queries failed".to_owned();
            self.record_failure(&message);
            return Err(CoreError::Transport {
                message,
                connection_lost: !self.transport.is_connected(),
            });
        }

        let previous = self.snapshot.borrow().clone();
        if !data.identities.succeeded && previous.is_none() {
            let message = "device list unavailable".to_owned();
            self.record_failure(&message);
            return Err(CoreError::Transport {
                message,
                connection_lost: !self.transport.is_connected(),
            });
        }

        let data = RefreshData {
            controller: self.fetch_controller_info().await,
            ..data
        };
        let next = build_snapshot(previous.as_deref(), data);

        info!(
            devices = next.devices.len(),
            routes = next.matrix.len(),
            "refresh complete"
        );
        self.snapshot.send_replace(Some(Arc::new(next)));
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.transition(CoordinatorState::Ready);
        Ok(())
    }

    /// Static info from cache when it still covers every identity,
    /// otherwise from the controller.
    async fn fetch_static_info(
        &self,
        identities: &[IdentityRecord],
    ) -> Fetched<Vec<StaticInfoRecord>> {
        if let Some(cached) = self.static_info.get() {
            let covered = identities
                .iter()
                .filter(|id| DeviceRole::from_wire(&id.device_type).is_some())
                .all(|id| cached.iter().any(|info| info.name == id.true_name));
            if covered {
                debug!(records = cached.len(), "using cached static device info");
                return Fetched {
                    value: cached,
                    succeeded: true,
                };
            }
            debug!("static info cache is missing devices, refetching");
        }

        let fetched = retry_or_default(
            "device info",
            self.retry_policy(),
            || self.transport.query_device_info(),
            |e: &networkhd_api::Error| self.after_failure(e.is_connection_error()),
        )
        .await;
        if fetched.succeeded {
            self.static_info.put(fetched.value.clone());
        }
        fetched
    }

    /// Controller versions and address. Best-effort: not retried, and a
    /// failure here never fails the refresh.
    async fn fetch_controller_info(&self) -> Option<ControllerInfo> {
        if let Some(info) = self.controller_info.get() {
            return Some(info);
        }
        let version = self.transport.query_version().await;
        let ip = self.transport.query_ip_settings().await;
        if let (Err(version_err), Err(ip_err)) = (&version, &ip) {
            debug!(%version_err, %ip_err, "controller metadata unavailable");
            return None;
        }
        let info = ControllerInfo::new(&self.config.connection.host, version.ok(), ip.ok());
        self.controller_info.put(info.clone());
        Some(info)
    }

    /// Mark the latest refresh as failed, keeping any existing devices.
    fn record_failure(&self, message: &str) {
        warn!(error = message, "refresh failed");
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.to_owned());
        self.snapshot.send_if_modified(|slot| match slot {
            Some(snapshot) => {
                Arc::make_mut(snapshot).error = Some(message.to_owned());
                true
            }
            None => false,
        });
        self.transition(CoordinatorState::Degraded);
    }

    // ── Selective refresh ────────────────────────────────────────────

    pub(super) async fn selective_refresh(&self, kinds: &[DataKind]) -> Result<(), CoreError> {
        if self.snapshot.borrow().is_none() {
            debug!("no snapshot yet, selective refresh becomes full refresh");
            return self.full_refresh().await;
        }
        let kinds: BTreeSet<DataKind> = kinds.iter().copied().collect();
        if kinds.is_empty() {
            return Ok(());
        }

        match self.try_selective(&kinds).await {
            Ok(SelectiveOutcome::Applied) => Ok(()),
            Ok(SelectiveOutcome::DeviceSetChanged) => {
                info!("device set changed, running full refresh");
                self.full_refresh().await
            }
            Err(e) => {
                warn!(error = %e, "selective refresh failed, running full refresh");
                self.full_refresh().await
            }
        }
    }

    async fn try_selective(&self, kinds: &BTreeSet<DataKind>) -> Result<SelectiveOutcome, CoreError> {
        let _guard = self.refresh_lock.lock().await;
        if self.cancel.is_cancelled() {
            return Err(CoreError::ShuttingDown);
        }
        let policy = self.retry_policy();
        let on_retry = |e: &networkhd_api::Error| self.after_failure(e.is_connection_error());

        let mut identities = None;
        let mut statuses = None;
        let mut infos = None;
        let mut matrix = None;
        for kind in kinds {
            let label: &str = kind.as_ref();
            match kind {
                DataKind::DeviceJson => {
                    identities = Some(
                        retry(label, policy, || self.transport.query_device_json(), on_retry)
                            .await?,
                    );
                }
                DataKind::DeviceStatus => {
                    statuses = Some(
                        retry(label, policy, || self.transport.query_device_status(), on_retry)
                            .await?,
                    );
                }
                DataKind::DeviceInfo => {
                    let fresh =
                        retry(label, policy, || self.transport.query_device_info(), on_retry)
                            .await?;
                    self.static_info.put(fresh.clone());
                    infos = Some(fresh);
                }
                DataKind::MatrixAssignments => {
                    matrix = Some(
                        retry(label, policy, || self.transport.query_matrix(), on_retry).await?,
                    );
                }
            }
        }

        let mut outcome = SelectiveOutcome::Applied;
        self.snapshot.send_if_modified(|slot| {
            let Some(snapshot) = slot else {
                return false;
            };
            let snap = Arc::make_mut(snapshot);
            if let Some(identities) = &identities {
                if !apply_identities(&mut snap.devices, identities) {
                    outcome = SelectiveOutcome::DeviceSetChanged;
                }
            }
            if let Some(statuses) = &statuses {
                apply_statuses(&mut snap.devices, statuses);
            }
            if let Some(infos) = &infos {
                apply_static_infos(&mut snap.devices, infos);
            }
            if let Some(matrix) = matrix.take() {
                snap.matrix = matrix;
            }
            project_matrix(&mut snap.devices, &snap.matrix);
            snap.last_update = Some(Utc::now());
            true
        });

        debug!(kinds = ?kinds, "selective refresh applied");
        Ok(outcome)
    }
}

/// Combine fetched data with the previous snapshot.
///
/// A source that failed falls back to what the previous snapshot knew,
/// except status, which falls back to defaults.
fn build_snapshot(previous: Option<&CoordinatorSnapshot>, data: RefreshData) -> CoordinatorSnapshot {
    let RefreshData {
        identities,
        statuses,
        infos,
        matrix,
        controller,
    } = data;

    let mut devices = if identities.succeeded {
        let info_slice: &[StaticInfoRecord] = if infos.succeeded {
            infos.value.as_slice()
        } else {
            &[]
        };
        let mut merged = merge(&identities.value, &statuses.value, info_slice);
        if !infos.succeeded {
            if let Some(prev) = previous {
                for device in merged.iter_mut() {
                    if let Some(old) = prev.devices.get(device.true_name()) {
                        device.inherit_static_info(old);
                    }
                }
            }
        }
        merged
    } else if let Some(prev) = previous {
        debug!("identity query failed, keeping previous device set");
        let mut kept = prev.devices.clone();
        apply_statuses(&mut kept, &statuses.value);
        if infos.succeeded {
            apply_static_infos(&mut kept, &infos.value);
        }
        kept
    } else {
        DeviceCollection::new()
    };

    let matrix = if matrix.succeeded {
        matrix.value
    } else {
        previous.map(|prev| prev.matrix.clone()).unwrap_or_default()
    };
    project_matrix(&mut devices, &matrix);

    CoordinatorSnapshot {
        devices,
        matrix,
        controller: controller.or_else(|| previous.and_then(|prev| prev.controller.clone())),
        last_update: Some(Utc::now()),
        error: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ok<T>(value: T) -> Fetched<T> {
        Fetched {
            value,
            succeeded: true,
        }
    }

    fn failed<T: Default>() -> Fetched<T> {
        Fetched {
            value: T::default(),
            succeeded: false,
        }
    }

    fn identity(name: &str, kind: &str) -> IdentityRecord {
        IdentityRecord {
            true_name: name.into(),
            device_type: kind.into(),
            online: true,
            ..IdentityRecord::default()
        }
    }

    fn info(name: &str, mac: &str) -> StaticInfoRecord {
        StaticInfoRecord {
            name: name.into(),
            mac: Some(mac.into()),
            ..StaticInfoRecord::default()
        }
    }

    fn first_snapshot() -> CoordinatorSnapshot {
        build_snapshot(
            None,
            RefreshData {
                identities: ok(vec![identity("tx1", "transmitter"), identity("rx1", "receiver")]),
                statuses: ok(vec![]),
                infos: ok(vec![info("tx1", "aa"), info("rx1", "bb")]),
                matrix: ok(vec![MatrixAssignment::new(Some("tx1"), "rx1")]),
                controller: None,
            },
        )
    }

    #[test]
    fn data_kind_names_match_service_strings() {
        assert_eq!(DataKind::DeviceJson.to_string(), "device_jsonstring");
        assert_eq!(
            "matrix_assignments".parse::<DataKind>().unwrap(),
            DataKind::MatrixAssignments
        );
    }

    #[test]
    fn failed_info_inherits_previous_static_fields() {
        let prev = first_snapshot();
        let next = build_snapshot(
            Some(&prev),
            RefreshData {
                identities: ok(vec![identity("tx1", "transmitter"), identity("rx1", "receiver")]),
                statuses: ok(vec![]),
                infos: failed(),
                matrix: ok(vec![]),
                controller: None,
            },
        );
        assert_eq!(next.devices.get("rx1").unwrap().network().mac.as_deref(), Some("bb"));
    }

    #[test]
    fn failed_identity_keeps_previous_devices_and_matrix() {
        let prev = first_snapshot();
        let next = build_snapshot(
            Some(&prev),
            RefreshData {
                identities: failed(),
                statuses: ok(vec![]),
                infos: failed(),
                matrix: failed(),
                controller: None,
            },
        );
        assert_eq!(next.devices.len(), 2);
        assert_eq!(next.devices.get("rx1").unwrap().current_source(), Some("tx1"));
    }

    #[test]
    fn failed_identity_without_history_is_empty() {
        let next = build_snapshot(
            None,
            RefreshData {
                identities: failed(),
                statuses: ok(vec![]),
                infos: failed(),
                matrix: ok(vec![]),
                controller: None,
            },
        );
        assert!(next.devices.is_empty());
        assert_eq!(next.error, None);
    }
}
