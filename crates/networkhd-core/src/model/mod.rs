// ── Domain model ──

pub mod controller;
pub mod device;

pub use controller::ControllerInfo;
pub use device::{
    DecoderSettings, DeviceRole, EncoderSettings, Identity, MergedDevice, NetworkInfo, Receiver,
    ReceiverStatus, StreamStatus, Transmitter, TransmitterStatus,
};
