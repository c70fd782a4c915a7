//! Render pipelines.
//!
//! - `basic`: the lit and fogged pipeline all models go through
//! - `light`: the light/fog uniform it reads from bind group 2

pub mod basic;
pub mod light;

/// All pipelines owned by the [`crate::context::Context`].
#[derive(Debug)]
pub struct Pipelines {
    pub basic: wgpu::RenderPipeline,
}
