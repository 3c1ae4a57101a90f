//! Bundle types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema tag for bundle documents.
pub const SCHEMA_BUNDLE: &str = "olm.bundle";

/// Property type carrying the owning package and version of a bundle.
pub const PROPERTY_PACKAGE: &str = "olm.package";

/// A typed property attached to a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Property type (e.g. `olm.package`).
    #[serde(rename = "type")]
    pub type_: String,
    /// Opaque property value.
    pub value: serde_json::Value,
}

impl Property {
    /// Create a new property.
    pub fn new(type_: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            type_: type_.into(),
            value,
        }
    }

    /// Create an `olm.package` property.
    pub fn package(package_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(
            PROPERTY_PACKAGE,
            serde_json::json!({
                "packageName": package_name.into(),
                "version": version.into(),
            }),
        )
    }

    /// Whether this is an `olm.package` property.
    pub fn is_package(&self) -> bool {
        self.type_ == PROPERTY_PACKAGE
    }
}

/// Value of an `olm.package` property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageProperty {
    /// Owning package name.
    pub package_name: String,
    /// Semantic version string.
    pub version: String,
    /// Optional release qualifier, ordered after the version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
}

/// A single immutable release of an operator package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    /// Document schema tag.
    #[serde(default = "default_bundle_schema")]
    pub schema: String,
    /// Unique bundle name.
    pub name: String,
    /// Owning package name.
    pub package: String,
    /// Opaque image reference.
    #[serde(default)]
    pub image: String,
    /// Bundle properties.
    #[serde(default)]
    pub properties: Vec<Property>,
    /// Fields this kernel does not interpret, kept for lossless output.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_bundle_schema() -> String {
    SCHEMA_BUNDLE.to_string()
}

impl Bundle {
    /// Create a bundle with an `olm.package` property for `version`.
    pub fn new(
        name: impl Into<String>,
        package: impl Into<String>,
        image: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let package = package.into();
        Self {
            schema: default_bundle_schema(),
            name: name.into(),
            properties: vec![Property::package(package.clone(), version)],
            package,
            image: image.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Set the release qualifier on the package property.
    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        let release = release.into();
        for prop in self.properties.iter_mut().filter(|p| p.is_package()) {
            if let serde_json::Value::Object(map) = &mut prop.value {
                map.insert("release".to_string(), serde_json::Value::String(release.clone()));
            }
        }
        self
    }

    /// All `olm.package` properties on this bundle.
    pub fn package_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter().filter(|p| p.is_package())
    }
}
