//! CLI command implementations

pub mod init;
pub mod memorize;
pub mod search;
pub mod stats;
pub mod tags;
