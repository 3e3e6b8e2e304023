//! Serial request/response layer to the drawer controller.

pub mod command;
pub mod link;
pub mod serial;

pub use command::Command;
pub use link::{DeviceLink, LinkError, PollBudget, Response, TIMEOUT_MESSAGE};
pub use serial::{SerialLink, SerialTransport};
