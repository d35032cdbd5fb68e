// src/config.rs

//! Configuration loading utilities.
//!
//! Reads the TOML config, applies environment overrides and validates the
//! result.

use std::path::Path;

use crate::error::Result;
use crate::models::Config;

/// Environment variable overriding `api.base_url`.
pub const API_BASE_ENV: &str = "CRICKET_LIVE_API_BASE";

/// Load configuration from a TOML file, apply environment overrides and
/// validate.
///
/// A missing or unreadable file falls back to defaults; invalid values are
/// an error.
pub fn load_all(path: &Path) -> Result<Config> {
    let mut config = Config::load_or_default(path);
    apply_api_base(&mut config, std::env::var(API_BASE_ENV).ok());
    config.validate()?;
    Ok(config)
}

fn apply_api_base(config: &mut Config, value: Option<String>) {
    let Some(base) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return;
    };
    log::info!("Using API base from {}: {}", API_BASE_ENV, base);
    config.api.base_url = base;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use tempfile::TempDir;

    #[test]
    fn test_api_base_override() {
        let mut config = Config::default();
        apply_api_base(&mut config, Some(" https://scores.example.com/api ".into()));
        assert_eq!(config.api.base_url, "https://scores.example.com/api");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let mut config = Config::default();
        apply_api_base(&mut config, Some("   ".into()));
        apply_api_base(&mut config, None);
        assert_eq!(config.api.base_url, Config::default().api.base_url);
    }

    #[test]
    fn test_load_all_rejects_invalid_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[events]\ncapacity = 0\n").unwrap();

        assert!(matches!(load_all(&path), Err(AppError::Validation(_))));
    }
}
