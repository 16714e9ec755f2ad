// ── Write operations ──

use std::slice;

use networkhd_api::{PowerState, Transport};
use tracing::{info, warn};

use super::{Coordinator, DataKind};
use crate::command::Command;
use crate::error::CoreError;
use crate::model::DeviceRole;
use crate::store::CoordinatorSnapshot;

/// Sources re-queried after a routing change.
const AFTER_MATRIX_CHANGE: &[DataKind] = &[DataKind::MatrixAssignments, DataKind::DeviceStatus];

impl<T: Transport + Sync + 'static> Coordinator<T> {
    /// Run a [`Command`].
    pub async fn execute(&self, command: Command) -> Result<(), CoreError> {
        match command {
            Command::SetMatrix { source, targets } => {
                self.set_matrix(source.as_deref(), &targets).await
            }
            Command::SetPower { devices, state } => self.set_power(&devices, &state).await,
            Command::RebootController => self.reboot_controller().await,
        }
    }

    /// Route `source` to each receiver in `targets`, or disconnect them
    /// when `source` is `None`.
    ///
    /// Every name is validated against the current snapshot before any
    /// command is sent. Commands go out one per target; the first failure
    /// stops the batch. Matrix and status are re-queried afterwards
    /// whether or not a command failed.
    pub async fn set_matrix(&self, source: Option<&str>, targets: &[String]) -> Result<(), CoreError> {
        if targets.is_empty() {
            return Err(CoreError::validation("at least one target device is required"));
        }
        let snapshot = self.snapshot().ok_or(CoreError::NotReady)?;
        let target_names = targets
            .iter()
            .map(|name| command_name(&snapshot, name, DeviceRole::Receiver))
            .collect::<Result<Vec<_>, _>>()?;
        let source_name = source
            .map(|name| command_name(&snapshot, name, DeviceRole::Transmitter))
            .transpose()?;

        let transport = self.transport();
        let mut outcome = Ok(());
        for target in &target_names {
            let result = match &source_name {
                Some(src) => transport.matrix_set(src, slice::from_ref(target)).await,
                None => transport.matrix_set_null(slice::from_ref(target)).await,
            };
            if let Err(e) = result {
                warn!(target = %target, source = ?source_name, error = %e, "matrix command failed");
                outcome = Err(CoreError::from(e));
                break;
            }
        }
        if outcome.is_ok() {
            info!(source = ?source_name, targets = ?target_names, "matrix updated");
        }

        if let Err(e) = self.selective_refresh(AFTER_MATRIX_CHANGE).await {
            warn!(error = %e, "refresh after matrix change failed");
        }
        outcome
    }

    /// Switch displays on or off.
    ///
    /// `state` must be `"on"` or `"off"`. A failure on the first device
    /// aborts with that error; later failures are logged and skipped.
    pub async fn set_power(&self, devices: &[String], state: &str) -> Result<(), CoreError> {
        let power: PowerState = state.parse().map_err(|_| {
            CoreError::validation(format!("power state must be \"on\" or \"off\", got {state:?}"))
        })?;
        if devices.is_empty() {
            return Err(CoreError::validation("at least one device is required"));
        }
        let snapshot = self.snapshot().ok_or(CoreError::NotReady)?;
        let names = devices
            .iter()
            .map(|name| command_name(&snapshot, name, DeviceRole::Receiver))
            .collect::<Result<Vec<_>, _>>()?;

        let mut succeeded = 0_usize;
        let mut failed = Vec::new();
        for name in &names {
            match self.transport().set_sink_power(power, name).await {
                Ok(()) => succeeded += 1,
                Err(e) if succeeded == 0 => {
                    warn!(device = %name, error = %e, "power command failed");
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(device = %name, error = %e, "power command failed, continuing");
                    failed.push(name.as_str());
                }
            }
        }

        if failed.is_empty() {
            info!(%power, devices = succeeded, "display power set");
        } else {
            warn!(%power, succeeded, ?failed, "display power set on some devices only");
        }
        Ok(())
    }

    /// Reboot the controller. The session drops shortly after; the poll
    /// loop reconnects once the controller is back.
    pub async fn reboot_controller(&self) -> Result<(), CoreError> {
        self.transport().reboot().await?;
        info!(host = %self.config().connection.host, "controller reboot requested");
        Ok(())
    }
}

/// Resolve `name` to a device of `role` and return the name to send.
pub(crate) fn command_name(
    snapshot: &CoordinatorSnapshot,
    name: &str,
    role: DeviceRole,
) -> Result<String, CoreError> {
    let device = snapshot
        .devices
        .find(name)
        .ok_or_else(|| CoreError::DeviceNotFound {
            identifier: name.to_owned(),
        })?;
    if device.role() != role {
        return Err(CoreError::WrongRole {
            identifier: name.to_owned(),
            expected: role.to_string(),
        });
    }
    Ok(device.command_name().to_owned())
}
