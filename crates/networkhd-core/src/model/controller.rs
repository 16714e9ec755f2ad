// ── Controller metadata ──

use networkhd_api::{IpSettings, VersionInfo};
use serde::{Deserialize, Serialize};

/// Firmware versions and management address of the controller itself.
///
/// Both halves are optional: the version and IP queries are best-effort
/// and either may be missing on older firmware.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerInfo {
    /// Host the coordinator connects to.
    pub host: String,
    pub version: Option<VersionInfo>,
    pub ip: Option<IpSettings>,
}

impl ControllerInfo {
    pub fn new(host: &str, version: Option<VersionInfo>, ip: Option<IpSettings>) -> Self {
        Self {
            host: host.to_owned(),
            version,
            ip,
        }
    }

    pub fn display_name(&self) -> String {
        format!("NetworkHD Controller ({})", self.host)
    }

    /// Core firmware version, preferring the core build over the web UI build.
    pub fn firmware_version(&self) -> Option<&str> {
        let version = self.version.as_ref()?;
        [&version.core_version, &version.web_version, &version.api_version]
            .into_iter()
            .find(|v| !v.is_empty())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn firmware_version_prefers_core() {
        let info = ControllerInfo::new(
            "10.0.0.2",
            Some(VersionInfo {
                api_version: "v1.21".into(),
                web_version: "v8.3.1".into(),
                core_version: "v8.3.8".into(),
            }),
            None,
        );
        assert_eq!(info.firmware_version(), Some("v8.3.8"));
        assert_eq!(info.display_name(), "NetworkHD Controller (10.0.0.2)");
    }

    #[test]
    fn firmware_version_absent_without_version_reply() {
        assert_eq!(ControllerInfo::new("h", None, None).firmware_version(), None);
    }
}
