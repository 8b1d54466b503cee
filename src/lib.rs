//! Core of the MCP log reader: log directory resolution, file discovery,
//! filtering, byte-budget truncation and pagination.

pub mod budget;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod http;
pub mod mcp;
pub mod model;
pub mod reader;
pub mod retriever;
pub mod scanner;
