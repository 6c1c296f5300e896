mod args;
mod commands;

pub use args::{Args, Command, OpenArgs};
pub use commands::run_cli;
