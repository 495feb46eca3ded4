//! The newline-delimited JSON wire protocol spoken on a module child
//! process's stdin (`Command`) and stdout (`Status`); spec §4.1.

mod command;
mod correlation;
mod status;

pub use command::{Command, CommandKind};
pub use correlation::{command_id, parse_command_id};
pub use status::{Status, StatusKind};
