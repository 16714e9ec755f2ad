//! Data coordinator between `networkhd-api` and UI consumers.
//!
//! - **[`Coordinator`]**: owns the transport to one controller.
//!   [`setup()`](Coordinator::setup) connects, publishes a first snapshot,
//!   then spawns a poll task and a notification task. Reads come from the
//!   published [`CoordinatorSnapshot`]; writes go through
//!   [`set_matrix`](Coordinator::set_matrix),
//!   [`set_power`](Coordinator::set_power), and
//!   [`reboot_controller`](Coordinator::reboot_controller).
//!
//! - **Merge engine** ([`store::merge`]): joins identity, status, and
//!   static-info replies by true name into [`MergedDevice`]s and projects
//!   the routing matrix onto receivers.
//!
//! - **[`retry`]**: fixed-delay retry with a hook between attempts, used
//!   for per-query retries and reconnects.
//!
//! - **[`service`]** and **[`entity`]**: the service-call surface and the
//!   read-only entity projections a host UI renders.

pub mod command;
pub mod config;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod model;
pub mod retry;
pub mod service;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::Command;
pub use config::{ConnectionConfig, CoordinatorConfig, HostKeyPolicy};
pub use coordinator::{Coordinator, CoordinatorState, DataKind};
pub use entity::{Entity, EntityKind, EntityState};
pub use error::CoreError;
pub use model::{ControllerInfo, DeviceRole, MergedDevice, Receiver, Transmitter};
pub use retry::RetryPolicy;
pub use store::{CoordinatorSnapshot, DeviceCollection};
