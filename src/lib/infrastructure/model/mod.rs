//! Model infrastructure module
//!
//! # Structure
//! - `types` - Request, Response, Error types
//! - `traits` - ModelProvider trait
//! - `clients` - HTTP client implementations

pub mod clients;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use clients::AnthropicClient;
pub use traits::ModelProvider;
pub use types::{ModelError, ModelRequest, ModelResponse};
