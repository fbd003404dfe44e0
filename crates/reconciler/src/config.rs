use serde::{Deserialize, Serialize};
use shared::{error::ValidationError, ValidateModel};

/// Names the reconciler uses for its stores and cache keys.
///
/// Every field has a default so hosts only pass what they want to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Store holding every cached resource
    pub content_cache: String,
    /// Store the shell files are downloaded into during install
    pub staging_cache: String,
    /// Store holding the snapshot of the last activated manifest
    pub manifest_cache: String,
    /// Request key of the snapshot inside `manifest_cache`
    pub snapshot_key: String,
    /// Cache-busting query marker stripped before looking a request up
    pub version_query: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            content_cache: "app-cache".to_string(),
            staging_cache: "app-temp-cache".to_string(),
            manifest_cache: "app-manifest".to_string(),
            snapshot_key: "manifest".to_string(),
            version_query: "?v=".to_string(),
        }
    }
}

impl ReconcilerConfig {
    pub fn cache_names(&self) -> [&str; 3] {
        [
            &self.content_cache,
            &self.staging_cache,
            &self.manifest_cache,
        ]
    }
}

impl ValidateModel for ReconcilerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut error_messages = Vec::new();

        let names = self.cache_names();
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                error_messages.push("Cache names must not be empty".to_string());
            } else if names[..i].contains(name) {
                error_messages.push(format!("Cache name \"{name}\" is used for two stores"));
            }
        }
        if self.snapshot_key.is_empty() {
            error_messages.push("snapshot_key must not be empty".to_string());
        }
        if self.version_query.is_empty() {
            error_messages.push("version_query must not be empty".to_string());
        }

        ValidationError::from_messages(error_messages)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: ReconcilerConfig =
            serde_json::from_str(r#"{ "content_cache": "shell-v2" }"#).unwrap();
        assert_eq!(config.content_cache, "shell-v2");
        assert_eq!(
            config.staging_cache,
            ReconcilerConfig::default().staging_cache
        );
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(ReconcilerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_shared_store_names() {
        let config = ReconcilerConfig {
            staging_cache: "app-cache".to_string(),
            version_query: String::new(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.error_messages.len(), 2);
        assert!(err.error_messages[0].contains("app-cache"));
    }
}
