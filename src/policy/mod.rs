//! Channel generation and rendering policies.

pub mod generation;
pub mod render;

pub use generation::{GenerationPolicy, PolicyError};
pub use render::RenderPolicy;
