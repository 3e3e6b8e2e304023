use serde::{Deserialize, Serialize};
use std::fmt;

/// Every token the drawer firmware understands.
///
/// Drawer actions move hardware; status notifications only update the LCD.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    OpenTopDrawer,
    OpenBottomDrawer,
    OpenAnyDrawer,
    CloseTopDrawer,
    CloseBottomDrawer,
    CloseAnyDrawer,
    LockBottom,
    UnlockBottom,

    // --- Status notifications ---
    Listening,
    Recognizing,
    Awakened,
    Unintelligible,
    /// Speech service failure, carries the service's error detail.
    RequestFailed(String),
}

impl Command {
    pub fn token(&self) -> String {
        match self {
            Command::OpenTopDrawer => "open_top_drawer".to_string(),
            Command::OpenBottomDrawer => "open_bottom_drawer".to_string(),
            Command::OpenAnyDrawer => "open_any_drawer".to_string(),
            Command::CloseTopDrawer => "close_top_drawer".to_string(),
            Command::CloseBottomDrawer => "close_bottom_drawer".to_string(),
            Command::CloseAnyDrawer => "close_any_drawer".to_string(),
            Command::LockBottom => "lock_bottom".to_string(),
            Command::UnlockBottom => "unlock_bottom".to_string(),
            Command::Listening => "Listening...".to_string(),
            Command::Recognizing => "Recognizing...".to_string(),
            Command::Awakened => "Fred Awakened!".to_string(),
            Command::Unintelligible => "Unable to understand audio".to_string(),
            Command::RequestFailed(detail) => format!("Unable to request results; {}", detail),
        }
    }

    /// Wire form: the bare ASCII token, no terminator. The firmware frames on its side.
    pub fn encode(&self) -> Vec<u8> {
        self.token().into_bytes()
    }

    pub fn is_drawer_action(&self) -> bool {
        matches!(
            self,
            Command::OpenTopDrawer
                | Command::OpenBottomDrawer
                | Command::OpenAnyDrawer
                | Command::CloseTopDrawer
                | Command::CloseBottomDrawer
                | Command::CloseAnyDrawer
                | Command::LockBottom
                | Command::UnlockBottom
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}
