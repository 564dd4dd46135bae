use serde::Deserialize;
use std::collections::HashMap;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct FeatureToggles {
    #[serde(flatten)]
    pub flags: HashMap<String, bool>,
}

impl FeatureToggles {
    // Load from a provided path or env var FEATURE_TOGGLES_PATH, defaulting to ./feature-toggles.json
    pub fn from_path(path: Option<String>) -> Self {
        let default_path = std::env::var("FEATURE_TOGGLES_PATH")
            .unwrap_or_else(|_| "feature-toggles.json".to_string());
        let path = path.unwrap_or(default_path);

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed feature toggles at {}: {}", path, e);
                FeatureToggles::default()
            }),
            Err(_) => FeatureToggles::default(),
        }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn is_enabled_or(&self, name: &str, default: bool) -> bool {
        self.flags.get(name).copied().unwrap_or(default)
    }

    // Master switch for the external chat completion path; the local responder is always on
    pub fn external_chat_enabled(&self) -> bool {
        self.is_enabled_or("ExternalChat", true)
    }

    // Mounts the /api/users routes
    pub fn user_management_enabled(&self) -> bool {
        self.is_enabled_or("UserManagement", true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let toggles = FeatureToggles::from_path(Some("/nonexistent/feature-toggles.json".into()));
        assert!(toggles.external_chat_enabled());
        assert!(toggles.user_management_enabled());
        assert!(!toggles.is_enabled("Anything"));
    }

    #[test]
    fn test_flags_are_read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ExternalChat": false, "Beta": true}}"#).unwrap();

        let toggles = FeatureToggles::from_path(Some(file.path().display().to_string()));
        assert!(!toggles.external_chat_enabled());
        assert!(toggles.is_enabled("Beta"));
        assert!(toggles.user_management_enabled());
    }
}
