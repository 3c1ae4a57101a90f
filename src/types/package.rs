//! Package type.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema tag for package documents.
pub const SCHEMA_PACKAGE: &str = "olm.package";

/// An operator package and its default channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Document schema tag.
    #[serde(default = "default_package_schema")]
    pub schema: String,
    /// Package name.
    pub name: String,
    /// Channel subscribers land on when none is requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_channel: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Fields this kernel does not interpret (icons and the like).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_package_schema() -> String {
    SCHEMA_PACKAGE.to_string()
}

impl Package {
    /// Create a package without a default channel.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: default_package_schema(),
            name: name.into(),
            default_channel: None,
            description: None,
            extra: BTreeMap::new(),
        }
    }

    /// Set the default channel.
    pub fn with_default_channel(mut self, channel: impl Into<String>) -> Self {
        self.default_channel = Some(channel.into());
        self
    }
}
