use serde::{Deserialize, Serialize};

use crate::device::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Drawer {
    Top,
    Bottom,
    /// No drawer named; the firmware picks whichever one is in the right state.
    Any,
}

/// A normalized instruction derived from one recognized utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    Open(Drawer),
    Close(Drawer),
    Lock,
    /// Speech was recognized but matched no rule. The device is not contacted.
    Invalid,
}

impl Intent {
    /// Device commands for this intent, in the order they must be sent.
    ///
    /// Closing the bottom drawer (or whichever drawer is open) re-arms the lock afterwards.
    pub fn commands(&self) -> Vec<Command> {
        match self {
            Intent::Open(Drawer::Top) => vec![Command::OpenTopDrawer],
            Intent::Open(Drawer::Bottom) => vec![Command::OpenBottomDrawer],
            Intent::Open(Drawer::Any) => vec![Command::OpenAnyDrawer],
            Intent::Close(Drawer::Top) => vec![Command::CloseTopDrawer],
            Intent::Close(Drawer::Bottom) => vec![Command::CloseBottomDrawer, Command::LockBottom],
            Intent::Close(Drawer::Any) => vec![Command::CloseAnyDrawer, Command::LockBottom],
            Intent::Lock => vec![Command::LockBottom],
            Intent::Invalid => Vec::new(),
        }
    }

    /// Operator-facing line logged before the commands go out.
    pub fn describe(&self) -> &'static str {
        match self {
            Intent::Open(Drawer::Top) => "Sending command to open top drawer",
            Intent::Open(Drawer::Bottom) => "Sending command to open bottom drawer",
            Intent::Open(Drawer::Any) => "Opening any closed drawer",
            Intent::Close(Drawer::Top) => "Sending command to close top drawer",
            Intent::Close(Drawer::Bottom) => "Sending command to close bottom drawer",
            Intent::Close(Drawer::Any) => "Closing any open drawer",
            Intent::Lock => "Sending command to lock drawer",
            Intent::Invalid => "Invalid command. Please try again.",
        }
    }
}
