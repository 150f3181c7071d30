//! mnemo: persistent memory with smart tag consolidation
//!
//! A memory store for AI agents, exposed over MCP. The tag engine keeps the
//! vocabulary small by steering new tags toward existing ones (embedding
//! similarity with a lexical fallback) and expands search-time tag filters
//! the same way.

pub mod core;
pub mod embedding;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod memory;
pub mod store;
pub mod tags;

pub use crate::core::{Config, EngineError};
pub use crate::memory::MemoryEngine;
