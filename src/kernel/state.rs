use serde::{Deserialize, Serialize};

/// Where a voice session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Waiting for the wake word. No session running.
    Idle,
    /// "Listening..." shown, microphone calibrated, waiting for a phrase.
    Listening,
    /// Phrase captured, speech service working on it.
    Recognizing,
    /// Text in hand, device commands going out.
    Dispatching,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Things that happen to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    WakeWordDetected,
    UtteranceCaptured,
    NoSpeech,
    Transcribed,
    Unintelligible,
    ServiceFailed,
    /// Commands sent, or the parse was invalid. Either way the next phrase is awaited.
    TurnComplete,
    Shutdown,
}

pub struct SessionGraph;

impl SessionGraph {
    /// Pure function: (Current State, Event) -> New State.
    /// Returns None if the event does not apply in the current state.
    pub fn transition(current: SessionState, event: &SessionEvent) -> Option<SessionState> {
        use SessionEvent::*;
        use SessionState::*;

        match (current, event) {
            (_, Shutdown) => Some(Idle),

            (Idle, WakeWordDetected) => Some(Listening),

            (Listening, UtteranceCaptured) => Some(Recognizing),
            (Listening, NoSpeech) => Some(Idle),

            (Recognizing, Transcribed) => Some(Dispatching),
            (Recognizing, Unintelligible) => Some(Idle),
            (Recognizing, ServiceFailed) => Some(Idle),

            // Loop back for the next phrase; only recognition failures end a session.
            (Dispatching, TurnComplete) => Some(Listening),

            _ => None,
        }
    }
}
