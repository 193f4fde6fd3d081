use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path:?}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("missing required environment variable '{var}' (Anthropic API key)")]
    MissingApiKey { var: &'static str },

    #[error("missing required environment variable '{var}' (model id)")]
    MissingModel { var: &'static str },

    #[error("'{var}' must be a positive integer, got '{value}'")]
    InvalidMaxTokens { var: &'static str, value: String },
}
