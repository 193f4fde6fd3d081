use super::error::ConfigError;
use super::{
    API_KEY_VAR, AppConfig, DEFAULT_ANTHROPIC_ENDPOINT, DEFAULT_MAX_TOKENS, ENDPOINT_VAR,
    ENV_PATH, MAX_TOKENS_VAR, MODEL_VAR,
};
use std::env;
use std::path::Path;
use std::sync::Once;
use tracing::{debug, warn};

static ENV_LOADER: Once = Once::new();

/// Ensures variables from `.env` are loaded into the process environment.
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        if let Err(err) = load_env_file(Path::new(ENV_PATH)) {
            warn!(%err, "Ignoring unreadable environment file");
        }
    });
}

/// Load an env file without overriding variables that are already set.
///
/// Returns `Ok(false)` when the file does not exist.
pub fn load_env_file(path: &Path) -> Result<bool, ConfigError> {
    match dotenvy::from_path(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Loaded environment file");
            Ok(true)
        }
        Err(err) if err.not_found() => {
            debug!(path = %path.display(), "No environment file found");
            Ok(false)
        }
        Err(source) => Err(ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Load configuration from the process environment (after `.env`).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_env_loaded();
    build_config(|key| env::var(key).ok())
}

/// Build configuration from an arbitrary variable source.
pub fn build_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    let api_key = non_empty(API_KEY_VAR).ok_or(ConfigError::MissingApiKey { var: API_KEY_VAR })?;
    let model = non_empty(MODEL_VAR)
        .map(|value| value.trim().to_string())
        .ok_or(ConfigError::MissingModel { var: MODEL_VAR })?;

    let max_tokens = match non_empty(MAX_TOKENS_VAR) {
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(value) if value > 0 => value,
            _ => {
                return Err(ConfigError::InvalidMaxTokens {
                    var: MAX_TOKENS_VAR,
                    value: raw,
                });
            }
        },
        None => DEFAULT_MAX_TOKENS,
    };

    let endpoint = non_empty(ENDPOINT_VAR)
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_ANTHROPIC_ENDPOINT.to_string());

    debug!(model = model.as_str(), max_tokens, endpoint = endpoint.as_str(), "Resolved provider configuration");

    Ok(AppConfig {
        api_key,
        model,
        max_tokens,
        endpoint,
    })
}
