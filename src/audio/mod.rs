//! Microphone input, phrase capture and wake-word spotting.

#[cfg(feature = "audio-io")]
pub mod capture;
pub mod frames;
pub mod listener;
pub mod wake;

#[cfg(feature = "audio-io")]
pub use capture::AudioCapture;
pub use frames::{CaptureError, FrameSource};
pub use listener::{ListenError, ListenerConfig, Utterance, UtteranceListener};
pub use wake::{WakeError, WakeWordEngine};
