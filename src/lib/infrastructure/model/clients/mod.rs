pub mod anthropic;
pub mod base;

pub use anthropic::AnthropicClient;
pub use base::HttpClientBase;
