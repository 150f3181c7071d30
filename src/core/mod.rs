//! Core types shared across the crate

pub mod config;
pub mod error;

pub use config::{Config, DataPaths};
pub use error::{EngineError, Result};
