//! The two trigger loops and the voice session they drive.

pub mod session;
pub mod state;
pub mod tag_watcher;
pub mod wake_loop;

pub use session::{Dispatcher, SessionConfig, SessionEnd, VoiceSession};
pub use state::{SessionEvent, SessionGraph, SessionState};
pub use tag_watcher::{FileSignal, TagError, TagPoll, TagSignalStore, TagWatcher, TAG_SENTINEL};
pub use wake_loop::{WakeLoop, WakeLoopError};
