//! # Application Module
//!
//! Core logic of the chat client.
//!
//! ## Submodules
//!
//! - [`catalog`] - Maps the MCP tool catalogue onto model tool definitions
//! - [`client`] - Query orchestration between the model and the tool server
//! - [`stdio`] - Interactive console session
//! - [`tooling`] - MCP tool server connection over stdio

pub mod catalog;
pub mod client;
pub mod stdio;
pub mod tooling;

#[cfg(test)]
pub(crate) mod test_support;
