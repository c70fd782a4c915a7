//! GPU-side scene data.
//!
//! - `model` holds meshes, materials and the instanced draw helpers
//! - `texture` wraps wgpu textures (diffuse, solid colour and depth)
//! - `instance` is the per-instance transform uploaded next to each model
//! - `scene_graph` nests models under containers and tracks the look highlight
pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
