// ── Published coordinator state ──

use chrono::{DateTime, Utc};
use networkhd_api::MatrixAssignment;
use serde::{Deserialize, Serialize};

use super::collection::DeviceCollection;
use crate::model::{ControllerInfo, MergedDevice};

/// Everything one refresh produced, published as a unit.
///
/// Readers hold an `Arc` to a snapshot and never observe a partial
/// update. Writers clone, modify, and republish.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorSnapshot {
    pub devices: DeviceCollection,
    pub matrix: Vec<MatrixAssignment>,
    pub controller: Option<ControllerInfo>,
    pub last_update: Option<DateTime<Utc>>,
    /// Set when the latest full refresh failed outright. Devices from the
    /// last good refresh are kept alongside it.
    pub error: Option<String>,
}

impl CoordinatorSnapshot {
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn device(&self, name: &str) -> Option<&MergedDevice> {
        self.devices.find(name)
    }
}
