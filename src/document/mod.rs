//! Declarative catalog document model.
//!
//! A catalog is a flat stream of documents, each tagged by `schema`.
//! This module loads such streams into a [`DeclarativeConfig`] and writes
//! them back out. Documents with schemas this kernel does not model are
//! kept verbatim in `others`.
//!
//! ## Output Order
//!
//! Packages, then channels, then bundles, then unrecognized documents,
//! each group in stored order. Loading a stream and writing it again is
//! stable: a second load/write cycle produces identical bytes.

pub mod validate;

use serde::de::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::canonical::canonical_hash_hex;
use crate::types::{Bundle, Channel, Package, SCHEMA_BUNDLE, SCHEMA_CHANNEL, SCHEMA_PACKAGE};

pub use validate::{DocumentValidator, ModelValidator, ValidationError};

/// Error type for document loading and writing.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// A document has no string `schema` field.
    #[error("Document {index} has no schema")]
    MissingSchema {
        /// Position in the input stream.
        index: usize,
    },
    /// A document with a known schema failed to decode.
    #[error("Failed to decode {schema} document {index}: {source}")]
    Decode {
        /// Schema tag of the document.
        schema: String,
        /// Position in the input stream.
        index: usize,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
    /// YAML input could not be parsed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// JSON input could not be parsed or output could not be written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialization format for catalog streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `---`-separated YAML documents.
    #[default]
    Yaml,
    /// Newline-separated pretty JSON objects.
    Json,
}

impl OutputFormat {
    /// Parse output format from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// An in-memory catalog document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclarativeConfig {
    /// Package documents.
    pub packages: Vec<Package>,
    /// Channel documents.
    pub channels: Vec<Channel>,
    /// Bundle documents.
    pub bundles: Vec<Bundle>,
    /// Documents with other schemas, untouched.
    pub others: Vec<Value>,
}

impl DeclarativeConfig {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from already-decoded entries.
    pub fn load_slice(entries: &[Value]) -> Result<Self, DocumentError> {
        let mut cfg = Self::new();
        for (index, entry) in entries.iter().enumerate() {
            let schema = entry
                .get("schema")
                .and_then(Value::as_str)
                .ok_or(DocumentError::MissingSchema { index })?;
            let decode = |source: serde_json::Error| DocumentError::Decode {
                schema: schema.to_string(),
                index,
                source,
            };
            match schema {
                SCHEMA_PACKAGE => cfg.packages.push(Package::deserialize(entry).map_err(decode)?),
                SCHEMA_CHANNEL => cfg.channels.push(Channel::deserialize(entry).map_err(decode)?),
                SCHEMA_BUNDLE => cfg.bundles.push(Bundle::deserialize(entry).map_err(decode)?),
                _ => cfg.others.push(entry.clone()),
            }
        }
        Ok(cfg)
    }

    /// Load a `---`-separated YAML stream.
    pub fn from_yaml_str(input: &str) -> Result<Self, DocumentError> {
        let mut entries = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(input) {
            let value = Value::deserialize(doc)?;
            if !value.is_null() {
                entries.push(value);
            }
        }
        Self::load_slice(&entries)
    }

    /// Load a stream of concatenated JSON objects.
    pub fn from_json_str(input: &str) -> Result<Self, DocumentError> {
        let entries = serde_json::Deserializer::from_str(input)
            .into_iter::<Value>()
            .collect::<Result<Vec<_>, _>>()?;
        Self::load_slice(&entries)
    }

    /// Load a stream in the given format.
    pub fn from_str_as(input: &str, format: OutputFormat) -> Result<Self, DocumentError> {
        match format {
            OutputFormat::Yaml => Self::from_yaml_str(input),
            OutputFormat::Json => Self::from_json_str(input),
        }
    }

    /// All documents in output order, as JSON values.
    pub fn to_entries(&self) -> Result<Vec<Value>, DocumentError> {
        let mut entries = Vec::with_capacity(
            self.packages.len() + self.channels.len() + self.bundles.len() + self.others.len(),
        );
        for p in &self.packages {
            entries.push(serde_json::to_value(p)?);
        }
        for c in &self.channels {
            entries.push(serde_json::to_value(c)?);
        }
        for b in &self.bundles {
            entries.push(serde_json::to_value(b)?);
        }
        entries.extend(self.others.iter().cloned());
        Ok(entries)
    }

    /// Write as a YAML stream.
    pub fn to_yaml_string(&self) -> Result<String, DocumentError> {
        let mut out = String::new();
        for entry in self.to_entries()? {
            out.push_str("---\n");
            out.push_str(&serde_yaml::to_string(&entry)?);
        }
        Ok(out)
    }

    /// Write as newline-separated pretty JSON.
    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        let mut out = String::new();
        for entry in self.to_entries()? {
            out.push_str(&serde_json::to_string_pretty(&entry)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Write in the given format.
    pub fn to_string_as(&self, format: OutputFormat) -> Result<String, DocumentError> {
        match format {
            OutputFormat::Yaml => self.to_yaml_string(),
            OutputFormat::Json => self.to_json_string(),
        }
    }

    /// Find a bundle by name.
    pub fn bundle(&self, name: &str) -> Option<&Bundle> {
        self.bundles.iter().find(|b| b.name == name)
    }

    /// Find a package by name.
    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Total number of channel entries across all channels.
    pub fn num_entries(&self) -> usize {
        self.channels.iter().map(|c| c.entries.len()).sum()
    }

    /// Deterministic fingerprint of the document contents.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(&Fingerprint {
            packages: &self.packages,
            channels: &self.channels,
            bundles: &self.bundles,
            others: &self.others,
        })
    }
}

#[derive(Serialize)]
struct Fingerprint<'a> {
    packages: &'a [Package],
    channels: &'a [Channel],
    bundles: &'a [Bundle],
    others: &'a [Value],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelEntry;

    const CATALOG: &str = r#"---
schema: olm.package
name: a
defaultChannel: stable
icon:
  base64data: PHN2Zz4=
  mediatype: image/svg+xml
---
schema: olm.channel
name: stable
package: a
entries:
  - name: a-v0.1.0
  - name: a-v0.2.0
    replaces: a-v0.1.0
    skipRange: "<0.2.0"
---
schema: olm.bundle
name: a-v0.1.0
package: a
image: quay.io/a/a-bundle:v0.1.0
properties:
  - type: olm.package
    value:
      packageName: a
      version: 0.1.0
---
schema: olm.deprecations
package: a
entries: []
"#;

    #[test]
    fn test_load_yaml_stream() {
        let cfg = DeclarativeConfig::from_yaml_str(CATALOG).unwrap();
        assert_eq!(cfg.packages.len(), 1);
        assert_eq!(cfg.packages[0].default_channel.as_deref(), Some("stable"));
        assert!(cfg.packages[0].extra.contains_key("icon"));
        assert_eq!(cfg.channels[0].entries[1].replaces.as_deref(), Some("a-v0.1.0"));
        assert_eq!(cfg.bundles.len(), 1);
        assert_eq!(cfg.others.len(), 1);
    }

    #[test]
    fn test_yaml_json_rewrite_is_stable() {
        let cfg = DeclarativeConfig::from_yaml_str(CATALOG).unwrap();
        let yaml = cfg.to_yaml_string().unwrap();
        let reloaded = DeclarativeConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(cfg, reloaded);
        assert_eq!(yaml, reloaded.to_yaml_string().unwrap());

        let json = cfg.to_json_string().unwrap();
        let from_json = DeclarativeConfig::from_json_str(&json).unwrap();
        assert_eq!(cfg, from_json);
        assert_eq!(cfg.fingerprint(), from_json.fingerprint());
    }

    #[test]
    fn test_missing_schema_rejected() {
        let entries = vec![serde_json::json!({"name": "orphan"})];
        let err = DeclarativeConfig::load_slice(&entries).unwrap_err();
        assert!(matches!(err, DocumentError::MissingSchema { index: 0 }));
    }

    #[test]
    fn test_fingerprint_changes_with_edges() {
        let cfg = DeclarativeConfig::from_yaml_str(CATALOG).unwrap();
        let mut changed = cfg.clone();
        changed.channels[0].entries.push(ChannelEntry::new("a-v0.3.0"));
        assert_ne!(cfg.fingerprint(), changed.fingerprint());
    }
}
