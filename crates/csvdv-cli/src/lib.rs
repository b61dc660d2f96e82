//! Library side of the `csvdv` command-line tool.

pub mod commands;
pub mod logging;
pub mod output;
pub mod summary;
