// ── Service calls ──
//
// The two user-facing services, taking loosely-typed JSON service data.
// Inputs are normalized (scalar or list) and validated here; the actual
// work is delegated to the coordinator's write API.

use networkhd_api::Transport;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::coordinator::{Coordinator, command_name};
use crate::error::CoreError;
use crate::model::DeviceRole;

/// Registered service names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ServiceName {
    MatrixSet,
    PowerControl,
}

/// A device name or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(name) => vec![name],
            Self::Many(names) => names,
        }
    }
}

/// Data for `matrix_set`. A null `source_device` disconnects the targets.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixSetCall {
    pub source_device: Option<OneOrMany>,
    pub target_device: OneOrMany,
}

/// Data for `power_control`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PowerControlCall {
    pub devices: OneOrMany,
    pub power_state: String,
}

/// Parse `data` for `service` and run it.
pub async fn dispatch<T: Transport + Sync + 'static>(
    coordinator: &Coordinator<T>,
    service: &str,
    data: Value,
) -> Result<(), CoreError> {
    let name: ServiceName = service
        .parse()
        .map_err(|_| CoreError::validation(format!("unknown service: {service}")))?;
    match name {
        ServiceName::MatrixSet => handle_matrix_set(coordinator, parse(name, data)?).await,
        ServiceName::PowerControl => handle_power_control(coordinator, parse(name, data)?).await,
    }
}

fn parse<D: serde::de::DeserializeOwned>(service: ServiceName, data: Value) -> Result<D, CoreError> {
    serde_json::from_value(data)
        .map_err(|e| CoreError::validation(format!("invalid data for {service}: {e}")))
}

/// Route every source to every target, one source at a time.
///
/// All names are checked before the first command goes out.
pub async fn handle_matrix_set<T: Transport + Sync + 'static>(
    coordinator: &Coordinator<T>,
    call: MatrixSetCall,
) -> Result<(), CoreError> {
    let targets = call.target_device.into_vec();
    if targets.is_empty() {
        return Err(CoreError::validation("target_device cannot be empty"));
    }
    let Some(sources) = call.source_device.map(OneOrMany::into_vec) else {
        debug!(?targets, "matrix_set: disconnecting");
        return coordinator.set_matrix(None, &targets).await;
    };
    if sources.is_empty() {
        return Err(CoreError::validation("source_device cannot be empty"));
    }

    let snapshot = coordinator.snapshot().ok_or(CoreError::NotReady)?;
    for source in &sources {
        command_name(&snapshot, source, DeviceRole::Transmitter)?;
    }
    for target in &targets {
        command_name(&snapshot, target, DeviceRole::Receiver)?;
    }

    debug!(?sources, ?targets, "matrix_set requested");
    for source in &sources {
        coordinator.set_matrix(Some(source), &targets).await?;
    }
    Ok(())
}

pub async fn handle_power_control<T: Transport + Sync + 'static>(
    coordinator: &Coordinator<T>,
    call: PowerControlCall,
) -> Result<(), CoreError> {
    let devices = call.devices.into_vec();
    if devices.is_empty() {
        return Err(CoreError::validation("devices cannot be empty"));
    }
    debug!(?devices, state = %call.power_state, "power_control requested");
    coordinator.set_power(&devices, &call.power_state).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn scalar_and_list_inputs_normalize() {
        let call: MatrixSetCall =
            serde_json::from_value(json!({"source_device": "TX1", "target_device": ["RX1", "RX2"]}))
                .unwrap();
        assert_eq!(call.source_device.unwrap().into_vec(), vec!["TX1"]);
        assert_eq!(call.target_device.into_vec(), vec!["RX1", "RX2"]);
    }

    #[test]
    fn null_source_means_disconnect() {
        let call: MatrixSetCall =
            serde_json::from_value(json!({"source_device": null, "target_device": "RX1"})).unwrap();
        assert!(call.source_device.is_none());
    }

    #[test]
    fn power_call_requires_state() {
        let missing = serde_json::from_value::<PowerControlCall>(json!({"devices": "RX1"}));
        assert!(missing.is_err());
    }

    #[test]
    fn service_names_round_trip() {
        assert_eq!("matrix_set".parse::<ServiceName>().unwrap(), ServiceName::MatrixSet);
        assert_eq!(ServiceName::PowerControl.as_ref(), "power_control");
        assert!("reboot".parse::<ServiceName>().is_err());
    }
}
