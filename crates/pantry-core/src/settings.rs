use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "tngtech/deepseek-r1t2-chimera:free";
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const MODEL_ENV: &str = "PANTRY_CHEF_MODEL";
pub const ENDPOINT_ENV: &str = "PANTRY_CHEF_ENDPOINT";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    /// Ask the provider for schema-constrained JSON in addition to the prompt grammar.
    pub structured_output: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            structured_output: false,
        }
    }
}

impl Settings {
    /// Overlay values from the process environment, when set and non-blank.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(key) = present(API_KEY_ENV) {
            self.api_key = key;
        }
        if let Some(model) = present(MODEL_ENV) {
            self.model = model;
        }
        if let Some(endpoint) = present(ENDPOINT_ENV) {
            self.endpoint = endpoint;
        }
        self
    }

    /// The key with surrounding whitespace removed, if any.
    pub fn credential(&self) -> Option<&str> {
        let key = self.api_key.trim();
        (!key.is_empty()).then_some(key)
    }

    /// Key with everything but the last four characters hidden.
    pub fn masked_key(&self) -> String {
        match self.credential() {
            None => "(not set)".to_string(),
            Some(key) if key.chars().count() <= 4 => "****".to_string(),
            Some(key) => {
                let start = key.char_indices().rev().nth(3).map_or(0, |(i, _)| i);
                format!("****{}", &key[start..])
            }
        }
    }
}

fn settings_path() -> PathBuf {
    crate::data_dir().join("settings.json")
}

pub fn read_settings() -> Settings {
    let path = settings_path();
    if !path.exists() {
        return Settings::default();
    }
    fs::read_to_string(&path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_else(|| {
            tracing::warn!(path = %path.display(), "ignoring unreadable settings file");
            Settings::default()
        })
}

pub fn write_settings(settings: &Settings) -> Result<(), String> {
    let dir = crate::data_dir();
    fs::create_dir_all(&dir).map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(settings).map_err(|e| e.to_string())?;
    fs::write(settings_path(), json).map_err(|e| e.to_string())
}

pub fn ai_configured(settings: &Settings) -> bool {
    settings.credential().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"apiKey":"sk-1"}"#).unwrap();
        assert_eq!(settings.api_key, "sk-1");
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert!(!settings.structured_output);
    }

    #[test]
    fn overrides_replace_only_non_blank_values() {
        let settings = Settings {
            api_key: "from-file".to_string(),
            ..Settings::default()
        }
        .with_overrides(|name| match name {
            API_KEY_ENV => Some("  ".to_string()),
            MODEL_ENV => Some("other/model".to_string()),
            _ => None,
        });

        assert_eq!(settings.api_key, "from-file");
        assert_eq!(settings.model, "other/model");
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn blank_key_is_not_configured() {
        let mut settings = Settings::default();
        assert!(!ai_configured(&settings));
        settings.api_key = "   ".to_string();
        assert!(!ai_configured(&settings));
        settings.api_key = "sk-or-123456".to_string();
        assert!(ai_configured(&settings));
        assert_eq!(settings.masked_key(), "****3456");
    }
}
