//! Configuration validation.
//!
//! Validates config fields before a command touches data or the network.

use crate::domain::error::ShipscopeError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_TIMEOUT_SECS: i64 = 60;

/// Everything a full run needs: data source, forecast and language model.
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), ShipscopeError> {
    validate_data_config(config)?;
    validate_forecast_config(config)?;
    validate_language_model_config(config)?;
    validate_report_config(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), ShipscopeError> {
    match config.get_string("data", "path") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(ShipscopeError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        }),
    }
}

pub fn validate_forecast_config(config: &dyn ConfigPort) -> Result<(), ShipscopeError> {
    if let Some(raw) = config.get_string("forecast", "weekly_seasonality") {
        let known = ["true", "yes", "1", "on", "false", "no", "0", "off"];
        if !known.contains(&raw.trim().to_lowercase().as_str()) {
            return Err(ShipscopeError::ConfigInvalid {
                section: "forecast".to_string(),
                key: "weekly_seasonality".to_string(),
                reason: format!("expected a boolean, got '{}'", raw),
            });
        }
    }
    Ok(())
}

pub fn validate_language_model_config(config: &dyn ConfigPort) -> Result<(), ShipscopeError> {
    validate_endpoint(config)?;
    validate_timeout(config)?;

    for key in ["model", "api_key_env"] {
        let value = config.get_string("language_model", key);
        if value.is_some_and(|v| v.trim().is_empty()) {
            return Err(ShipscopeError::ConfigInvalid {
                section: "language_model".to_string(),
                key: key.to_string(),
                reason: format!("{} must not be empty", key),
            });
        }
    }
    Ok(())
}

fn validate_endpoint(config: &dyn ConfigPort) -> Result<(), ShipscopeError> {
    let Some(endpoint) = config.get_string("language_model", "endpoint") else {
        return Ok(());
    };
    let endpoint = endpoint.trim();
    if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
        return Err(ShipscopeError::ConfigInvalid {
            section: "language_model".to_string(),
            key: "endpoint".to_string(),
            reason: "endpoint must be an http(s) URL".to_string(),
        });
    }
    Ok(())
}

fn validate_timeout(config: &dyn ConfigPort) -> Result<(), ShipscopeError> {
    if config.get_string("language_model", "timeout_secs").is_none() {
        return Ok(());
    }
    let value = config.get_int("language_model", "timeout_secs", 0);
    if value < 1 {
        return Err(ShipscopeError::ConfigInvalid {
            section: "language_model".to_string(),
            key: "timeout_secs".to_string(),
            reason: "timeout_secs must be a positive integer".to_string(),
        });
    }
    Ok(())
}

fn validate_report_config(config: &dyn ConfigPort) -> Result<(), ShipscopeError> {
    match config.get_string("report", "output") {
        Some(s) if s.trim().is_empty() => Err(ShipscopeError::ConfigInvalid {
            section: "report".to_string(),
            key: "output".to_string(),
            reason: "output path must not be empty".to_string(),
        }),
        _ => Ok(()),
    }
}
