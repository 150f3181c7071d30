//! MCP server for the memory engine
//!
//! Exposes memory storage, recall, search, and the tag tooling to MCP
//! clients over stdio.

mod server;

pub use server::{run_mcp_server, MemoryService};
