//! Command-line interface module.

mod args;
pub mod common;
pub mod edit;
pub mod project;

pub use args::{Cli, Commands};
