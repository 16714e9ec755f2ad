//! Async client for the WyreStorm NetworkHD controller API.
//!
//! The controller speaks a line-oriented text protocol over an SSH shell.
//! This crate provides:
//!
//! - **[`Session`]**: the byte channel seam (open, execute, close,
//!   unsolicited lines).
//! - **[`NhdClient`]**: command serialization, timeouts, reply parsing,
//!   and notification dispatch on top of a session.
//! - **[`Transport`]**: the operation set the coordinator depends on.
//!   `NhdClient` implements it; tests substitute scripted fakes.
//! - **[`records`]**: typed views of the controller's JSON and table
//!   replies.

pub mod client;
pub mod codec;
pub mod error;
pub mod notification;
pub mod records;
pub mod session;
pub mod transport;

pub use client::NhdClient;
pub use error::Error;
pub use notification::{EndpointNotification, Notification, NotificationTopic, VideoNotification};
pub use records::{
    IdentityRecord, IpSettings, MatrixAssignment, PowerState, StaticInfoRecord, StatusRecord,
    VersionInfo,
};
pub use session::{ConnectionConfig, HostKeyPolicy, Session};
pub use transport::{NotificationCallback, Transport};
