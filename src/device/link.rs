use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::command::Command;
use super::serial::SerialTransport;

pub const TIMEOUT_MESSAGE: &str = "No response received in time from Arduino";

/// How long a single `send` may wait for the reply: `attempts` polls spaced by `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    pub attempts: u32,
    pub interval: Duration,
}

impl PollBudget {
    /// Tag-triggered unlock: 5 polls, 1s apart.
    pub const TAG: PollBudget = PollBudget { attempts: 5, interval: Duration::from_secs(1) };
    /// Voice commands and status notifications: 10 polls, 1s apart.
    pub const VOICE: PollBudget = PollBudget { attempts: 10, interval: Duration::from_secs(1) };

    pub fn total(&self) -> Duration {
        self.interval * self.attempts
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// One decoded line from the device, line terminator removed.
    Line(String),
    /// Nothing arrived within the budget.
    Timeout,
}

impl Response {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Response::Timeout)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Line(text) => f.write_str(text),
            Response::Timeout => f.write_str(TIMEOUT_MESSAGE),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("failed to write '{command}' to device: {source}")]
    Write {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read device response: {0}")]
    Read(#[source] std::io::Error),
}

/// Request/response channel to the drawer controller.
///
/// The transport sits behind an async mutex held for the whole write+poll exchange,
/// so the tag watcher and the voice session never interleave on the wire.
pub struct DeviceLink<T: SerialTransport> {
    transport: Mutex<T>,
}

impl<T: SerialTransport> DeviceLink<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Mutex::new(transport),
        }
    }

    /// One write followed by a bounded poll. No retries.
    pub async fn send(&self, command: &Command, budget: PollBudget) -> Result<Response, LinkError> {
        let mut transport = self.transport.lock().await;

        transport
            .write_all(&command.encode())
            .map_err(|source| LinkError::Write {
                command: command.token(),
                source,
            })?;
        debug!("Sent '{}' (budget {}x{:?})", command, budget.attempts, budget.interval);

        for attempt in 1..=budget.attempts {
            tokio::time::sleep(budget.interval).await;

            let waiting = match transport.bytes_available() {
                Ok(n) => n,
                Err(e) => {
                    warn!("Polling device failed on attempt {}: {}", attempt, e);
                    0
                }
            };

            if waiting > 0 {
                let raw = transport.read_line().map_err(LinkError::Read)?;
                let line = String::from_utf8_lossy(&raw).trim_end_matches(&['\r', '\n'][..]).to_string();
                debug!("'{}' answered on attempt {}: '{}'", command, attempt, line);
                return Ok(Response::Line(line));
            }
        }

        debug!("'{}' timed out after {:?}", command, budget.total());
        Ok(Response::Timeout)
    }

    /// Consumes the link, handing the transport back.
    pub fn into_inner(self) -> T {
        self.transport.into_inner()
    }
}
