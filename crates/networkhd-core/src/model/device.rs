// ── Merged device domain types ──
//
// One `MergedDevice` per hardware unit, joining the identity, live status,
// and static info replies. Role-specific fields live on `Transmitter` and
// `Receiver`; the enum wrapper gives uniform access to the shared parts.

use std::hash::{Hash, Hasher};

use networkhd_api::{IdentityRecord, StaticInfoRecord, StatusRecord};
use serde::{Deserialize, Serialize};

/// Which side of the AV link a device sits on.
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
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeviceRole {
    Transmitter,
    Receiver,
}

impl DeviceRole {
    /// Parse the controller's `deviceType` value.
    pub fn from_wire(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Transmitter => "Transmitter",
            Self::Receiver => "Receiver",
        }
    }
}

// ── Shared field groups ─────────────────────────────────────────────

/// Who the device is. Comes from the identity reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub true_name: String,
    pub alias_name: String,
    pub ip: String,
    pub online: bool,
    pub sequence: i64,
}

impl From<&IdentityRecord> for Identity {
    fn from(rec: &IdentityRecord) -> Self {
        Self {
            true_name: rec.true_name.clone(),
            alias_name: rec.alias_name.clone(),
            ip: rec.ip.clone(),
            online: rec.online,
            sequence: rec.sequence,
        }
    }
}

/// Network and firmware facts. Comes from the static info reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub mac: Option<String>,
    pub gateway: Option<String>,
    pub netmask: Option<String>,
    pub firmware_version: Option<String>,
    pub edid: Option<String>,
    pub ip_mode: Option<String>,
}

impl From<&StaticInfoRecord> for NetworkInfo {
    fn from(rec: &StaticInfoRecord) -> Self {
        Self {
            mac: rec.mac.clone(),
            gateway: rec.gateway.clone(),
            netmask: rec.netmask.clone(),
            firmware_version: rec.version.clone(),
            edid: rec.edid.clone(),
            ip_mode: rec.ip_mode.clone(),
        }
    }
}

/// Stream state shared by both roles. Comes from the status reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamStatus {
    pub line_out_audio_enable: Option<bool>,
    pub stream_frame_rate: Option<u32>,
    pub stream_resolution: Option<String>,
}

impl From<&StatusRecord> for StreamStatus {
    fn from(rec: &StatusRecord) -> Self {
        Self {
            line_out_audio_enable: rec.line_out_audio_enable,
            stream_frame_rate: rec.stream_frame_rate,
            stream_resolution: rec.stream_resolution.clone(),
        }
    }
}

// ── Transmitter ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransmitterStatus {
    pub audio_stream_ip_address: Option<String>,
    pub encoding_enable: Option<bool>,
    pub hdmi_in_active: Option<bool>,
    pub hdmi_in_frame_rate: Option<u32>,
    pub resolution: Option<String>,
    pub video_stream_ip_address: Option<String>,
}

impl From<&StatusRecord> for TransmitterStatus {
    fn from(rec: &StatusRecord) -> Self {
        Self {
            audio_stream_ip_address: rec.audio_stream_ip_address.clone(),
            encoding_enable: rec.encoding_enable,
            hdmi_in_active: rec.hdmi_in_active,
            hdmi_in_frame_rate: rec.hdmi_in_frame_rate,
            resolution: rec.resolution.clone(),
            video_stream_ip_address: rec.video_stream_ip_address.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncoderSettings {
    pub audio_input_type: Option<String>,
    pub analog_audio_direction: Option<String>,
    pub bandwidth_adjust_mode: Option<u32>,
    pub bit_per_pixel: Option<u32>,
    pub color_space: Option<String>,
    pub stream0_enable: Option<bool>,
    pub stream0_fps_by2_enable: Option<bool>,
    pub stream1_enable: Option<bool>,
    pub stream1_scale: Option<String>,
    pub stream1_fps_by2_enable: Option<bool>,
    pub video_input: Option<bool>,
    pub video_source: Option<String>,
}

impl From<&StaticInfoRecord> for EncoderSettings {
    fn from(rec: &StaticInfoRecord) -> Self {
        Self {
            audio_input_type: rec.audio_input_type.clone(),
            analog_audio_direction: rec.analog_audio_direction.clone(),
            bandwidth_adjust_mode: rec.bandwidth_adjust_mode,
            bit_per_pixel: rec.bit_per_pixel,
            color_space: rec.color_space.clone(),
            stream0_enable: rec.stream0_enable,
            stream0_fps_by2_enable: rec.stream0_fps_by2_enable,
            stream1_enable: rec.stream1_enable,
            stream1_scale: rec.stream1_scale.clone(),
            stream1_fps_by2_enable: rec.stream1_fps_by2_enable,
            video_input: rec.video_input,
            video_source: rec.video_source.clone(),
        }
    }
}

/// An encoder feeding one video source onto the network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transmitter {
    pub identity: Identity,
    pub network: NetworkInfo,
    pub stream: StreamStatus,
    pub status: TransmitterStatus,
    pub settings: EncoderSettings,
    pub name_overlay: Option<bool>,
    /// True names of every known receiver.
    pub available_sinks: Vec<String>,
}

// ── Receiver ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiverStatus {
    pub audio_bitrate: Option<u32>,
    pub audio_input_format: Option<String>,
    pub hdcp_status: Option<String>,
    pub hdmi_out_active: Option<bool>,
    pub hdmi_out_audio_enable: Option<bool>,
    pub hdmi_out_frame_rate: Option<u32>,
    pub hdmi_out_resolution: Option<String>,
    pub stream_error_count: Option<u32>,
}

impl From<&StatusRecord> for ReceiverStatus {
    fn from(rec: &StatusRecord) -> Self {
        Self {
            audio_bitrate: rec.audio_bitrate,
            audio_input_format: rec.audio_input_format.clone(),
            hdcp_status: rec.hdcp_status.clone(),
            hdmi_out_active: rec.hdmi_out_active,
            hdmi_out_audio_enable: rec.hdmi_out_audio_enable,
            hdmi_out_frame_rate: rec.hdmi_out_frame_rate,
            hdmi_out_resolution: rec.hdmi_out_resolution.clone(),
            stream_error_count: rec.stream_error_count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecoderSettings {
    pub source_in: Option<String>,
    pub analog_audio_source: Option<String>,
    pub hdmi_audio_source: Option<String>,
    pub video_mode: Option<String>,
    pub video_stretch_type: Option<String>,
    pub video_timing: Option<String>,
}

impl From<&StaticInfoRecord> for DecoderSettings {
    fn from(rec: &StaticInfoRecord) -> Self {
        Self {
            source_in: rec.source_in.clone(),
            analog_audio_source: rec.analog_audio_source.clone(),
            hdmi_audio_source: rec.hdmi_audio_source.clone(),
            video_mode: rec.video_mode.clone(),
            video_stretch_type: rec.video_stretch_type.clone(),
            video_timing: rec.video_timing.clone(),
        }
    }
}

/// A decoder driving one display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Receiver {
    pub identity: Identity,
    pub network: NetworkInfo,
    pub stream: StreamStatus,
    pub status: ReceiverStatus,
    pub settings: DecoderSettings,
    /// Transmitter the controller last paired this receiver with.
    pub tx_name: Option<String>,
    /// Transmitter currently routed here, from the matrix.
    pub current_source: Option<String>,
    /// True names of every known transmitter.
    pub available_sources: Vec<String>,
}

// ── MergedDevice ────────────────────────────────────────────────────

/// A device with everything the controller reports about it.
///
/// Equality and hashing go by `true_name` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum MergedDevice {
    Transmitter(Transmitter),
    Receiver(Receiver),
}

impl MergedDevice {
    /// Build a device from its three source records. Missing status or
    /// info leaves the corresponding fields at their defaults.
    pub fn from_records(
        role: DeviceRole,
        identity: &IdentityRecord,
        status: Option<&StatusRecord>,
        info: Option<&StaticInfoRecord>,
    ) -> Self {
        let mut device = match role {
            DeviceRole::Transmitter => Self::Transmitter(Transmitter {
                name_overlay: identity.name_overlay,
                ..Transmitter::default()
            }),
            DeviceRole::Receiver => Self::Receiver(Receiver {
                tx_name: identity.tx_name.clone(),
                ..Receiver::default()
            }),
        };
        *device.identity_mut() = Identity::from(identity);
        device.apply_status(status);
        if let Some(info) = info {
            device.apply_static_info(info);
        }
        device
    }

    pub fn role(&self) -> DeviceRole {
        match self {
            Self::Transmitter(_) => DeviceRole::Transmitter,
            Self::Receiver(_) => DeviceRole::Receiver,
        }
    }

    pub fn identity(&self) -> &Identity {
        match self {
            Self::Transmitter(tx) => &tx.identity,
            Self::Receiver(rx) => &rx.identity,
        }
    }

    pub fn identity_mut(&mut self) -> &mut Identity {
        match self {
            Self::Transmitter(tx) => &mut tx.identity,
            Self::Receiver(rx) => &mut rx.identity,
        }
    }

    pub fn network(&self) -> &NetworkInfo {
        match self {
            Self::Transmitter(tx) => &tx.network,
            Self::Receiver(rx) => &rx.network,
        }
    }

    pub fn stream(&self) -> &StreamStatus {
        match self {
            Self::Transmitter(tx) => &tx.stream,
            Self::Receiver(rx) => &rx.stream,
        }
    }

    pub fn true_name(&self) -> &str {
        &self.identity().true_name
    }

    pub fn alias_name(&self) -> &str {
        &self.identity().alias_name
    }

    pub fn is_online(&self) -> bool {
        self.identity().online
    }

    pub fn is_transmitter(&self) -> bool {
        matches!(self, Self::Transmitter(_))
    }

    pub fn is_receiver(&self) -> bool {
        matches!(self, Self::Receiver(_))
    }

    pub fn as_transmitter(&self) -> Option<&Transmitter> {
        match self {
            Self::Transmitter(tx) => Some(tx),
            Self::Receiver(_) => None,
        }
    }

    pub fn as_receiver(&self) -> Option<&Receiver> {
        match self {
            Self::Receiver(rx) => Some(rx),
            Self::Transmitter(_) => None,
        }
    }

    /// Transmitter routed to this receiver. Always `None` for transmitters.
    pub fn current_source(&self) -> Option<&str> {
        self.as_receiver()?.current_source.as_deref()
    }

    /// `"{Role} - {alias}"`, falling back to the IP and then the true name.
    pub fn display_name(&self) -> String {
        let id = self.identity();
        let label = [&id.alias_name, &id.ip, &id.true_name]
            .into_iter()
            .find(|s| !s.is_empty())
            .map_or("", String::as_str);
        format!("{} - {label}", self.role().label())
    }

    /// Name to put on the wire when commanding this device.
    pub fn command_name(&self) -> &str {
        let alias = self.alias_name();
        if alias.is_empty() { self.true_name() } else { alias }
    }

    // ── Slice updates ──

    /// Replace identity fields from a fresh identity record.
    pub fn apply_identity(&mut self, rec: &IdentityRecord) {
        *self.identity_mut() = Identity::from(rec);
        match self {
            Self::Transmitter(tx) => tx.name_overlay = rec.name_overlay,
            Self::Receiver(rx) => rx.tx_name.clone_from(&rec.tx_name),
        }
    }

    /// Replace live status fields. `None` resets them to defaults.
    pub fn apply_status(&mut self, rec: Option<&StatusRecord>) {
        match (self, rec) {
            (Self::Transmitter(tx), Some(rec)) => {
                tx.stream = StreamStatus::from(rec);
                tx.status = TransmitterStatus::from(rec);
            }
            (Self::Transmitter(tx), None) => {
                tx.stream = StreamStatus::default();
                tx.status = TransmitterStatus::default();
            }
            (Self::Receiver(rx), Some(rec)) => {
                rx.stream = StreamStatus::from(rec);
                rx.status = ReceiverStatus::from(rec);
            }
            (Self::Receiver(rx), None) => {
                rx.stream = StreamStatus::default();
                rx.status = ReceiverStatus::default();
            }
        }
    }

    /// Replace static network and hardware fields.
    pub fn apply_static_info(&mut self, rec: &StaticInfoRecord) {
        match self {
            Self::Transmitter(tx) => {
                tx.network = NetworkInfo::from(rec);
                tx.settings = EncoderSettings::from(rec);
            }
            Self::Receiver(rx) => {
                rx.network = NetworkInfo::from(rec);
                rx.settings = DecoderSettings::from(rec);
            }
        }
    }

    /// Copy static fields from an earlier snapshot of the same device.
    pub fn inherit_static_info(&mut self, previous: &Self) {
        match (self, previous) {
            (Self::Transmitter(tx), Self::Transmitter(old)) => {
                tx.network = old.network.clone();
                tx.settings = old.settings.clone();
            }
            (Self::Receiver(rx), Self::Receiver(old)) => {
                rx.network = old.network.clone();
                rx.settings = old.settings.clone();
            }
            _ => {}
        }
    }

    // ── Notification patches ──

    /// Set the online flag. Returns `true` if it changed.
    pub fn set_online(&mut self, online: bool) -> bool {
        let id = self.identity_mut();
        let changed = id.online != online;
        id.online = online;
        changed
    }

    /// HDMI input (transmitter) or output (receiver) activity.
    pub fn hdmi_active(&self) -> Option<bool> {
        match self {
            Self::Transmitter(tx) => tx.status.hdmi_in_active,
            Self::Receiver(rx) => rx.status.hdmi_out_active,
        }
    }

    /// Set the HDMI activity flag. Returns `true` if it changed.
    pub fn set_hdmi_active(&mut self, active: bool) -> bool {
        let slot = match self {
            Self::Transmitter(tx) => &mut tx.status.hdmi_in_active,
            Self::Receiver(rx) => &mut rx.status.hdmi_out_active,
        };
        let changed = *slot != Some(active);
        *slot = Some(active);
        changed
    }
}

impl PartialEq for MergedDevice {
    fn eq(&self, other: &Self) -> bool {
        self.true_name() == other.true_name()
    }
}

impl Eq for MergedDevice {}

impl Hash for MergedDevice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.true_name().hash(state);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn identity(name: &str, alias: &str, kind: &str) -> IdentityRecord {
        IdentityRecord {
            true_name: name.into(),
            alias_name: alias.into(),
            device_type: kind.into(),
            ip: "169.254.10.2".into(),
            online: true,
            ..IdentityRecord::default()
        }
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!(DeviceRole::from_wire("Receiver"), Some(DeviceRole::Receiver));
        assert_eq!(DeviceRole::from_wire(" transmitter "), Some(DeviceRole::Transmitter));
        assert_eq!(DeviceRole::from_wire("controller"), None);
    }

    #[test]
    fn display_name_falls_back_to_ip_then_true_name() {
        let mut rec = identity("IPE350-1", "Lobby", "transmitter");
        let dev = MergedDevice::from_records(DeviceRole::Transmitter, &rec, None, None);
        assert_eq!(dev.display_name(), "Transmitter - Lobby");

        rec.alias_name.clear();
        let dev = MergedDevice::from_records(DeviceRole::Transmitter, &rec, None, None);
        assert_eq!(dev.display_name(), "Transmitter - 169.254.10.2");

        rec.ip.clear();
        let dev = MergedDevice::from_records(DeviceRole::Transmitter, &rec, None, None);
        assert_eq!(dev.display_name(), "Transmitter - IPE350-1");
    }

    #[test]
    fn missing_status_leaves_defaults() {
        let rec = identity("IPD5100-1", "Board", "receiver");
        let dev = MergedDevice::from_records(DeviceRole::Receiver, &rec, None, None);
        let rx = dev.as_receiver().unwrap();
        assert_eq!(rx.status, ReceiverStatus::default());
        assert_eq!(rx.current_source, None);
    }

    #[test]
    fn equality_is_by_true_name() {
        let a = MergedDevice::from_records(
            DeviceRole::Receiver,
            &identity("IPD5100-1", "Board", "receiver"),
            None,
            None,
        );
        let b = MergedDevice::from_records(
            DeviceRole::Receiver,
            &identity("IPD5100-1", "Renamed", "receiver"),
            None,
            None,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn hdmi_patch_reports_change() {
        let rec = identity("IPE350-1", "Lobby", "transmitter");
        let mut dev = MergedDevice::from_records(DeviceRole::Transmitter, &rec, None, None);
        assert!(dev.set_hdmi_active(true));
        assert!(!dev.set_hdmi_active(true));
        assert_eq!(dev.hdmi_active(), Some(true));
    }
}
