use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{CoreShellList, ResourceManifest, ValidateModel};
use crate::error::ValidationError;

/// Everything the build hands the worker for one deployment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflinePackage {
    pub version: String,
    pub resources: ResourceManifest,
    pub core: CoreShellList,
}

impl ValidateModel for OfflinePackage {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut error_messages = Vec::new();

        for (path, fingerprint) in &self.resources {
            if path.as_str().is_empty() {
                error_messages.push("Resource with an empty path".to_string());
            } else if !path.is_root() && path.as_str().starts_with('/') {
                error_messages.push(format!(
                    "Resource \"{path}\" must be relative to the origin, without a leading '/'"
                ));
            }
            if fingerprint.as_str().is_empty() {
                error_messages.push(format!("Resource \"{path}\" has an empty fingerprint"));
            }
        }

        let mut seen = BTreeSet::new();
        for path in &self.core {
            if !self.resources.contains(path.as_str()) {
                error_messages.push(format!("Shell file \"{path}\" is not in the manifest"));
            }
            if !seen.insert(path) {
                error_messages.push(format!("Shell file \"{path}\" is listed twice"));
            }
        }

        ValidationError::from_messages(error_messages)
    }
}
