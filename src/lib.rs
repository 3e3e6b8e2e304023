//! Voice- and tag-activated drawer controller.
//!
//! A wake-word loop and an NFC tag watcher turn human intent into a small set of
//! commands for the drawer's microcontroller, sent over one shared serial link.

pub mod audio;
pub mod config;
pub mod device;
pub mod intent;
pub mod kernel;
pub mod logging;
pub mod services;

pub use config::Config;
pub use device::{Command, DeviceLink, PollBudget, Response};
pub use intent::{Drawer, Intent, IntentParser};
pub use kernel::{TagWatcher, VoiceSession, WakeLoop};
