pub mod app;
pub mod error;
pub mod loader;
pub mod server;

/// Env file read once at startup, relative to the working directory.
pub const ENV_PATH: &str = ".env";

pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com";

pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const MODEL_VAR: &str = "ANTHROPIC_MODEL";
pub const MAX_TOKENS_VAR: &str = "ANTHROPIC_MAX_TOKENS";
pub const ENDPOINT_VAR: &str = "ANTHROPIC_BASE_URL";

pub use app::AppConfig;
pub use error::ConfigError;
pub use server::ServerConfig;
