//! # channel-graph-kernel
//!
//! Deterministic upgrade-graph synthesis and substitution splicing for
//! declarative operator catalogs.
//!
//! The kernel answers two questions:
//!
//! > Given a set of bundle versions, which channels exist and how does each
//! > release upgrade from the ones before it?
//!
//! > Given an existing graph, how is one release replaced by another without
//! > stranding anyone who could upgrade from it?
//!
//! ## Core Contract
//!
//! 1. Classify rendered bundles by archetype and version, rejecting
//!    ambiguous orderings
//! 2. Synthesize per-archetype channels and pick the default channel
//! 3. Link entries with `replaces`/`skips` edges that never cross a
//!    stream boundary
//! 4. Splice substitutes into existing graphs, re-validating the result
//!
//! ## Architecture
//!
//! ```text
//! Template ─┬─ Semver ──────→ classify → synthesize → link ─┬→ DeclarativeConfig
//!           │                                                │
//!           └─ Substitutes → load entries → splice × N ──────┘
//!                    ↑
//!              BundleRenderer (image reference → bundles)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same template + same rendered bundles → byte-identical output
//! - Channels are emitted sorted by name, skips as ordered sets
//! - Render completion order never affects the result

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod document;
pub mod policy;
pub mod render;
pub mod semver;
pub mod substitutes;
pub mod template;
pub mod canonical;

// Re-exports
pub use types::{
    Archetype, StreamType, Bundle, Property, PackageProperty, Channel, ChannelEntry, Package,
    CompositeVersion, VersionError,
};
pub use document::{
    DeclarativeConfig, DocumentError, OutputFormat,
    DocumentValidator, ModelValidator, ValidationError,
};
pub use policy::{GenerationPolicy, PolicyError, RenderPolicy};
pub use render::{BundleRenderer, InMemoryBundleRenderer, RenderContext, RenderError};
pub use crate::semver::{
    SemverError, SemverTemplate, BundleVersions, EntryTuple, HighwaterChannel,
    classify, synthesize, link,
};
pub use substitutes::{splice, Substitute, SpliceError, SubstitutesError, SubstitutesTemplate};
pub use template::{Template, TemplateError};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};

/// Schema version for all catalog kernel types.
/// Increment on breaking changes to any schema type.
pub const CHANNEL_GRAPH_SCHEMA_VERSION: &str = "1.0.0";
