use super::error::ConfigError;

/// Provider settings resolved from the environment.
#[derive(Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub endpoint: String,
}

impl AppConfig {
    /// Load `.env` (once) and read the provider settings from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        super::loader::load_config()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
