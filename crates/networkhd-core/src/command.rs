// ── Command API ──
//
// Every write operation the coordinator supports, as data. Entity
// projections and service handlers build these; `Coordinator::execute`
// routes each variant to the matching write method.

use serde::{Deserialize, Serialize};

/// All possible write operations against a NetworkHD controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Route `source` to every target, or disconnect the targets when
    /// `source` is `None`.
    SetMatrix {
        source: Option<String>,
        targets: Vec<String>,
    },
    /// Switch the displays attached to `devices` on or off.
    SetPower { devices: Vec<String>, state: String },
    RebootController,
}

impl Command {
    pub fn connect(source: &str, target: &str) -> Self {
        Self::SetMatrix {
            source: Some(source.to_owned()),
            targets: vec![target.to_owned()],
        }
    }

    pub fn disconnect(target: &str) -> Self {
        Self::SetMatrix {
            source: None,
            targets: vec![target.to_owned()],
        }
    }

    pub fn power(device: &str, state: &str) -> Self {
        Self::SetPower {
            devices: vec![device.to_owned()],
            state: state.to_owned(),
        }
    }
}
