use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::device::{Command, DeviceLink, LinkError, PollBudget, Response, SerialTransport};

/// Content the NFC reader writes when the drawer tag is presented.
pub const TAG_SENTINEL: &str = "Drawer NFC scanned";

pub const DEFAULT_TAG_POLL: Duration = Duration::from_millis(100);
const MIN_TAG_POLL: Duration = Duration::from_millis(1);

/// External flag the NFC reader raises. Cleared by the watcher after handling.
pub trait TagSignalStore {
    /// `None` when the store does not exist.
    fn read(&self) -> io::Result<Option<String>>;

    /// Empties the store so the same assertion is not handled twice.
    fn clear(&self) -> io::Result<()>;
}

/// Tag signal backed by a plain file.
#[derive(Debug, Clone)]
pub struct FileSignal {
    path: PathBuf,
}

impl FileSignal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TagSignalStore for FileSignal {
    fn read(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            // Not text, so not the sentinel either.
            Err(e) if e.kind() == io::ErrorKind::InvalidData => Ok(Some(String::new())),
            Err(e) => Err(e),
        }
    }

    fn clear(&self) -> io::Result<()> {
        std::fs::write(&self.path, b"")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagPoll {
    /// No assertion pending.
    Idle,
    /// Unlock sent and the store cleared.
    Unlocked(Response),
}

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("failed to read tag signal: {0}")]
    Read(#[source] io::Error),

    #[error("failed to clear tag signal: {0}")]
    Clear(#[source] io::Error),

    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Unlocks the bottom drawer once per tag assertion.
pub struct TagWatcher<T: SerialTransport, S: TagSignalStore> {
    link: Arc<DeviceLink<T>>,
    store: S,
    budget: PollBudget,
    poll_interval: Duration,
}

impl<T: SerialTransport, S: TagSignalStore> TagWatcher<T, S> {
    pub fn new(link: Arc<DeviceLink<T>>, store: S, poll_interval: Duration) -> Self {
        Self {
            link,
            store,
            budget: PollBudget::TAG,
            poll_interval,
        }
    }

    pub fn with_budget(mut self, budget: PollBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Checks the store once.
    ///
    /// The store is cleared even when the link fails, so an assertion is acted on at most once.
    pub async fn poll_once(&self) -> Result<TagPoll, TagError> {
        let asserted = self
            .store
            .read()
            .map_err(TagError::Read)?
            .is_some_and(|content| content.trim() == TAG_SENTINEL);
        if !asserted {
            return Ok(TagPoll::Idle);
        }

        info!("Drawer NFC scanned");
        info!("Sending command to unlock drawer");
        let sent = self.link.send(&Command::UnlockBottom, self.budget).await;
        self.store.clear().map_err(TagError::Clear)?;

        let response = sent?;
        info!("Arduino responded: {}", response);
        Ok(TagPoll::Unlocked(response))
    }

    /// Polls until `shutdown` fires. Errors are logged and polling continues.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!("Tag watcher started. Poll: {:?}", self.poll_interval);

        let mut cadence = interval(self.poll_interval.max(MIN_TAG_POLL));
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = cadence.tick() => {}
            }

            if let Err(e) = self.poll_once().await {
                warn!("Tag poll failed: {}", e);
            }
        }

        info!("Tag watcher stopped");
    }
}
