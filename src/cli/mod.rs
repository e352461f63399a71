//! Command-line interface module.

mod args;
pub mod check;
pub mod dump;
mod report;
mod session;

pub use args::{Cli, Commands, InputArgs};
pub use report::Report;
pub use session::build_graph;
