//! Application settings loaded from `<root>/settings.toml`.
//!
//! Every key is optional; a missing file yields the defaults.
//!
//! ```toml
//! default_model = "gpt-4o-mini"
//! max_steps = 30
//! bullet_marker = "• "
//! openai_base_url = "https://api.openai.com/v1"
//! request_timeout_secs = 60
//!
//! [api]
//! host = "127.0.0.1"
//! port = 5000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::tool_report::DEFAULT_BULLET_MARKER;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_STEPS: usize = 30;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Model used when a caller does not name one
    pub default_model: String,
    /// Upper bound on agent-internal steps per query
    pub max_steps: usize,
    /// Prefix marking a tool entry in discovery transcripts
    pub bullet_marker: String,
    pub openai_base_url: String,
    /// Per-request timeout for protocol and model calls
    pub request_timeout_secs: u64,
    pub api: ApiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            max_steps: DEFAULT_MAX_STEPS,
            bullet_marker: DEFAULT_BULLET_MARKER.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            request_timeout_secs: 60,
            api: ApiSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&content).map_err(|reason| Error::MalformedConfig {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        let settings: Settings = toml::from_str(content).map_err(|e| e.to_string())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Caller's model, or the configured default when absent or blank.
    pub fn model_or_default(&self, model: Option<&str>) -> String {
        model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_model)
            .to_string()
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.max_steps == 0 {
            return Err("max_steps must be at least 1".to_string());
        }
        if self.bullet_marker.trim().is_empty() {
            return Err("bullet_marker must not be blank".to_string());
        }
        url::Url::parse(&self.openai_base_url)
            .map_err(|e| format!("invalid openai_base_url '{}': {e}", self.openai_base_url))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(Settings::parse("").unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_override() {
        let settings = Settings::parse(
            r#"
default_model = "gpt-4o-mini"

[api]
port = 8080
"#,
        )
        .unwrap();

        assert_eq!(settings.default_model, "gpt-4o-mini");
        assert_eq!(settings.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(settings.api.port, 8080);
        assert_eq!(settings.api.host, "0.0.0.0");
    }

    #[test]
    fn test_rejects_zero_steps() {
        let err = Settings::parse("max_steps = 0").unwrap_err();
        assert!(err.contains("max_steps"));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(Settings::parse(r#"openai_base_url = "not a url""#).is_err());
    }

    #[test]
    fn test_model_or_default() {
        let settings = Settings::default();
        assert_eq!(settings.model_or_default(None), DEFAULT_MODEL);
        assert_eq!(settings.model_or_default(Some("  ")), DEFAULT_MODEL);
        assert_eq!(settings.model_or_default(Some("gpt-4o")), "gpt-4o");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let settings = Settings::load(&temp.path().join("settings.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
