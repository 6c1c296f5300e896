pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod flow;
pub mod git;
pub mod mux;
pub mod picker;
pub mod repo;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
