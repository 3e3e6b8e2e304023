pub mod parser;
pub mod types;

pub use parser::{parse, IntentParser, Rule};
pub use types::{Drawer, Intent};
