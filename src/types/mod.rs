//! Core types for the upgrade graph.

pub mod archetype;
pub mod bundle;
pub mod channel;
pub mod package;
pub mod version;

pub use archetype::{Archetype, StreamType};
pub use bundle::{Bundle, PackageProperty, Property, PROPERTY_PACKAGE, SCHEMA_BUNDLE};
pub use channel::{Channel, ChannelEntry, SCHEMA_CHANNEL};
pub use package::{Package, SCHEMA_PACKAGE};
pub use version::{bundle_version, cmp_precedence, strip_build, CompositeVersion, VersionError};
