// ── Raw controller records ──
//
// Typed views of the JSON and text blocks the controller returns. Field
// names mirror the wire keys; the controller is loose about value types
// (booleans arrive as `true`, `"true"` or `"on"`, numbers sometimes as
// strings), so the scalar fields go through lenient deserializers.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One element of `config get devicejsonstring`: who a device is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IdentityRecord {
    /// Hardware-assigned name. Stable primary key for a device.
    pub true_name: String,
    /// User-assigned name; may be empty.
    pub alias_name: String,
    /// `"transmitter"` or `"receiver"`; anything else is ignored upstream.
    pub device_type: String,
    pub ip: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub online: bool,
    #[serde(deserialize_with = "lenient_i64")]
    pub sequence: i64,
    /// Receivers only: the transmitter the receiver was last paired with.
    #[serde(rename = "txName", deserialize_with = "lenient_string")]
    pub tx_name: Option<String>,
    /// Transmitters only.
    #[serde(rename = "nameoverlay", deserialize_with = "lenient_opt_bool")]
    pub name_overlay: Option<bool>,
}

/// One element of `config get device status`: live signal state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusRecord {
    /// Hardware name this record belongs to.
    pub name: String,
    #[serde(rename = "aliasname", deserialize_with = "lenient_string")]
    pub alias_name: Option<String>,

    #[serde(rename = "line out audio enable", deserialize_with = "lenient_opt_bool")]
    pub line_out_audio_enable: Option<bool>,
    #[serde(rename = "stream frame rate", deserialize_with = "lenient_opt_u32")]
    pub stream_frame_rate: Option<u32>,
    #[serde(rename = "stream resolution", deserialize_with = "lenient_string")]
    pub stream_resolution: Option<String>,

    // Receiver
    #[serde(rename = "audio bitrate", deserialize_with = "lenient_opt_u32")]
    pub audio_bitrate: Option<u32>,
    #[serde(rename = "audio input format", deserialize_with = "lenient_string")]
    pub audio_input_format: Option<String>,
    #[serde(rename = "hdcp status", deserialize_with = "lenient_string")]
    pub hdcp_status: Option<String>,
    #[serde(rename = "hdmi out active", deserialize_with = "lenient_opt_bool")]
    pub hdmi_out_active: Option<bool>,
    #[serde(rename = "hdmi out audio enable", deserialize_with = "lenient_opt_bool")]
    pub hdmi_out_audio_enable: Option<bool>,
    #[serde(rename = "hdmi out frame rate", deserialize_with = "lenient_opt_u32")]
    pub hdmi_out_frame_rate: Option<u32>,
    #[serde(rename = "hdmi out resolution", deserialize_with = "lenient_string")]
    pub hdmi_out_resolution: Option<String>,
    #[serde(rename = "stream error count", deserialize_with = "lenient_opt_u32")]
    pub stream_error_count: Option<u32>,

    // Transmitter
    #[serde(rename = "audio stream ip address", deserialize_with = "lenient_string")]
    pub audio_stream_ip_address: Option<String>,
    #[serde(rename = "encoding enable", deserialize_with = "lenient_opt_bool")]
    pub encoding_enable: Option<bool>,
    #[serde(rename = "hdmi in active", deserialize_with = "lenient_opt_bool")]
    pub hdmi_in_active: Option<bool>,
    #[serde(rename = "hdmi in frame rate", deserialize_with = "lenient_opt_u32")]
    pub hdmi_in_frame_rate: Option<u32>,
    #[serde(deserialize_with = "lenient_string")]
    pub resolution: Option<String>,
    #[serde(rename = "video stream ip address", deserialize_with = "lenient_string")]
    pub video_stream_ip_address: Option<String>,
}

/// One element of `config get device info`: hardware and firmware
/// facts that change rarely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticInfoRecord {
    pub name: String,
    #[serde(rename = "aliasname", deserialize_with = "lenient_string")]
    pub alias_name: Option<String>,

    #[serde(deserialize_with = "lenient_string")]
    pub mac: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub gateway: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub netmask: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub version: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub edid: Option<String>,
    #[serde(rename = "ip mode", deserialize_with = "lenient_string")]
    pub ip_mode: Option<String>,

    // Transmitter
    #[serde(rename = "audio input type", deserialize_with = "lenient_string")]
    pub audio_input_type: Option<String>,
    #[serde(rename = "analog audio direction", deserialize_with = "lenient_string")]
    pub analog_audio_direction: Option<String>,
    #[serde(rename = "bandwidth adjust mode", deserialize_with = "lenient_opt_u32")]
    pub bandwidth_adjust_mode: Option<u32>,
    #[serde(rename = "bit perpixel", deserialize_with = "lenient_opt_u32")]
    pub bit_per_pixel: Option<u32>,
    #[serde(rename = "color space", deserialize_with = "lenient_string")]
    pub color_space: Option<String>,
    #[serde(rename = "stream0 enable", deserialize_with = "lenient_opt_bool")]
    pub stream0_enable: Option<bool>,
    #[serde(rename = "stream0fps by2 enable", deserialize_with = "lenient_opt_bool")]
    pub stream0_fps_by2_enable: Option<bool>,
    #[serde(rename = "stream1 enable", deserialize_with = "lenient_opt_bool")]
    pub stream1_enable: Option<bool>,
    #[serde(rename = "stream1 scale", deserialize_with = "lenient_string")]
    pub stream1_scale: Option<String>,
    #[serde(rename = "stream1fps by2 enable", deserialize_with = "lenient_opt_bool")]
    pub stream1_fps_by2_enable: Option<bool>,
    #[serde(rename = "video input", deserialize_with = "lenient_opt_bool")]
    pub video_input: Option<bool>,
    #[serde(rename = "video source", deserialize_with = "lenient_string")]
    pub video_source: Option<String>,

    // Receiver
    #[serde(rename = "sourcein", deserialize_with = "lenient_string")]
    pub source_in: Option<String>,
    #[serde(rename = "analog audio source", deserialize_with = "lenient_string")]
    pub analog_audio_source: Option<String>,
    #[serde(rename = "hdmi audio source", deserialize_with = "lenient_string")]
    pub hdmi_audio_source: Option<String>,
    #[serde(rename = "video mode", deserialize_with = "lenient_string")]
    pub video_mode: Option<String>,
    #[serde(rename = "video stretch type", deserialize_with = "lenient_string")]
    pub video_stretch_type: Option<String>,
    #[serde(rename = "video timing", deserialize_with = "lenient_string")]
    pub video_timing: Option<String>,
}

/// One row of `matrix get`: receiver `rx` shows transmitter `tx`.
///
/// `tx` is `None` when the receiver is disconnected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixAssignment {
    pub tx: Option<String>,
    pub rx: String,
}

impl MatrixAssignment {
    pub fn new(tx: Option<&str>, rx: &str) -> Self {
        Self {
            tx: tx.map(str::to_owned),
            rx: rx.to_owned(),
        }
    }
}

/// Controller firmware versions from `config get version`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub api_version: String,
    pub web_version: String,
    pub core_version: String,
}

/// Controller management interface from `config get ipsetting`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpSettings {
    pub ip4addr: String,
    pub netmask: String,
    pub gateway: String,
}

/// Display power command argument for `config set device sinkpower`.
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
pub enum PowerState {
    On,
    Off,
}

// ── Lenient scalar decoding ─────────────────────────────────────────

fn parse_bool_text(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" | "online" | "found" => Some(true),
        "false" | "off" | "no" | "0" | "offline" | "lost" => Some(false),
        _ => None,
    }
}

/// Interpret an arbitrary JSON value as a boolean the way the controller
/// means it. Returns `None` for values that carry no truth value.
pub fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => parse_bool_text(s),
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    }
}

fn lenient_opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(value_as_bool))
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(lenient_opt_bool(d)?.unwrap_or(false))
}

fn lenient_opt_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}
