pub mod commands;
pub mod parser;

pub use commands::execute_command;
pub use parser::{Cli, RunMode};
