// ── Entity projections ──
//
// Read-only views of the snapshot for UI layers. Each `Entity` names one
// sensor, select, or button; its state and availability are computed from
// a snapshot on demand, and its actions become `Command`s. Entities never
// touch the transport.

use serde::Serialize;

use crate::command::Command;
use crate::error::CoreError;
use crate::model::{DeviceRole, MergedDevice};
use crate::store::CoordinatorSnapshot;

/// Option of the source select that disconnects the receiver.
pub const NO_SOURCE: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Online,
    VideoInput,
    VideoOutput,
    Source,
    DisplayPowerOn,
    DisplayPowerOff,
    Reboot,
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::VideoInput => "Video Input",
            Self::VideoOutput => "Video Output",
            Self::Source => "Input Source",
            Self::DisplayPowerOn => "Display Power On",
            Self::DisplayPowerOff => "Display Power Off",
            Self::Reboot => "Reboot",
        }
    }
}

/// One UI entity. `device` is the true name, or `None` for the controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Entity {
    pub unique_id: String,
    pub device: Option<String>,
    pub kind: EntityKind,
}

/// Current value of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityState {
    Binary { on: Option<bool> },
    Select { current: Option<String>, options: Vec<String> },
    Button,
}

/// Entities for every device in `snapshot`, plus the controller's.
pub fn entities(snapshot: &CoordinatorSnapshot, host: &str) -> Vec<Entity> {
    let mut out = vec![Entity::new(host, None, EntityKind::Reboot)];
    for device in snapshot.devices.iter() {
        let kinds: &[EntityKind] = match device.role() {
            DeviceRole::Transmitter => &[EntityKind::Online, EntityKind::VideoInput],
            DeviceRole::Receiver => &[
                EntityKind::Online,
                EntityKind::VideoOutput,
                EntityKind::Source,
                EntityKind::DisplayPowerOn,
                EntityKind::DisplayPowerOff,
            ],
        };
        out.extend(
            kinds
                .iter()
                .map(|&kind| Entity::new(host, Some(device.true_name()), kind)),
        );
    }
    out
}

impl Entity {
    fn new(host: &str, device: Option<&str>, kind: EntityKind) -> Self {
        let unique_id = match device {
            Some(name) => format!("{host}_{name}_{kind}"),
            None => format!("{host}_controller_{kind}"),
        };
        Self {
            unique_id,
            device: device.map(str::to_owned),
            kind,
        }
    }

    /// `"{device display name} {label}"`, or just the label for the controller.
    pub fn name(&self, snapshot: &CoordinatorSnapshot) -> String {
        match self.device(snapshot) {
            Some(device) => format!("{} {}", device.display_name(), self.kind.label()),
            None => self.kind.label().to_owned(),
        }
    }

    fn device<'a>(&self, snapshot: &'a CoordinatorSnapshot) -> Option<&'a MergedDevice> {
        snapshot.devices.get(self.device.as_deref()?)
    }

    /// Ready with no error; device entities also need their device known
    /// and online.
    pub fn is_available(&self, snapshot: Option<&CoordinatorSnapshot>) -> bool {
        let Some(snapshot) = snapshot.filter(|snap| !snap.has_error()) else {
            return false;
        };
        match &self.device {
            None => true,
            Some(_) => self.device(snapshot).is_some_and(MergedDevice::is_online),
        }
    }

    pub fn state(&self, snapshot: &CoordinatorSnapshot) -> EntityState {
        let device = self.device(snapshot);
        match self.kind {
            EntityKind::Online => EntityState::Binary {
                on: device.map(MergedDevice::is_online),
            },
            EntityKind::VideoInput => EntityState::Binary {
                on: device.and_then(MergedDevice::as_transmitter).map(|tx| {
                    tx.status.hdmi_in_active == Some(true) && has_text(tx.status.resolution.as_ref())
                }),
            },
            EntityKind::VideoOutput => EntityState::Binary {
                on: device.and_then(MergedDevice::as_receiver).map(|rx| {
                    rx.status.hdmi_out_active == Some(true)
                        && has_text(rx.status.hdmi_out_resolution.as_ref())
                }),
            },
            EntityKind::Source => EntityState::Select {
                current: device.map(|rx| current_option(snapshot, rx)),
                options: source_options(snapshot),
            },
            EntityKind::DisplayPowerOn | EntityKind::DisplayPowerOff | EntityKind::Reboot => {
                EntityState::Button
            }
        }
    }

    /// Command for pressing a button entity.
    pub fn press(&self) -> Result<Command, CoreError> {
        let receiver = || self.device.clone().ok_or_else(|| self.unsupported("press"));
        match self.kind {
            EntityKind::DisplayPowerOn => Ok(Command::power(&receiver()?, "on")),
            EntityKind::DisplayPowerOff => Ok(Command::power(&receiver()?, "off")),
            EntityKind::Reboot => Ok(Command::RebootController),
            _ => Err(self.unsupported("press")),
        }
    }

    /// Command for choosing `option` on a source select.
    pub fn select(&self, snapshot: &CoordinatorSnapshot, option: &str) -> Result<Command, CoreError> {
        let (EntityKind::Source, Some(target)) = (self.kind, self.device.as_deref()) else {
            return Err(self.unsupported("select"));
        };
        if option == NO_SOURCE {
            return Ok(Command::disconnect(target));
        }
        if !source_options(snapshot).iter().any(|o| o == option) {
            return Err(CoreError::validation(format!("unknown source option: {option}")));
        }
        Ok(Command::connect(option, target))
    }

    fn unsupported(&self, action: &str) -> CoreError {
        CoreError::validation(format!("{} does not support {action}", self.unique_id))
    }
}

/// `"None"` followed by every transmitter's command name.
pub fn source_options(snapshot: &CoordinatorSnapshot) -> Vec<String> {
    std::iter::once(NO_SOURCE.to_owned())
        .chain(
            snapshot
                .devices
                .transmitters()
                .map(|tx| tx.command_name().to_owned()),
        )
        .collect()
}

fn current_option(snapshot: &CoordinatorSnapshot, receiver: &MergedDevice) -> String {
    receiver
        .current_source()
        .map_or_else(
            || NO_SOURCE.to_owned(),
            |source| {
                snapshot
                    .devices
                    .get(source)
                    .map_or_else(|| source.to_owned(), |tx| tx.command_name().to_owned())
            },
        )
}

fn has_text(value: Option<&String>) -> bool {
    value.is_some_and(|s| !s.trim().is_empty())
}
