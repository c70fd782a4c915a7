//! home-vr
//!
//! A small walkable outdoor "home" scene for native and WASM targets. A
//! third-person character controller with gravity, ground raycasting and a
//! following camera moves an invisible pawn around a ground plane, a shed and
//! a sky dome; whatever the camera looks at is highlighted.
//!
//! Engine modules
//! - `camera`: camera, projection, uniform and the mouse-look controller
//! - `context`: window and GPU context owning device, queue and pipelines
//! - `data_structures`: instances, models, textures and the scene graph
//! - `flow`: the event loop and the `GraphicsFlow` lifecycle
//! - `pipelines`: the lit and fogged basic pipeline
//! - `render`: render batching
//! - `resources`: asset loading, glTF import and procedural meshes
//!
//! Game modules
//! - `input`: keyboard sampling into smoothed axes
//! - `physics`: rays, triangles, picking and collide-and-slide
//! - `pawn`: the player's collision body
//! - `character`: the character controller
//! - `config`: tunables and defaults
//! - `scene`: the `HomeScene` flow tying everything together
//! - `xr`: WebXR capability probe
//!
//! Everything in the game modules runs on the CPU only and can be driven
//! without a window, e.g. from tests.

pub mod camera;
pub mod character;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod input;
pub mod pawn;
pub mod physics;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;
pub mod xr;

use crate::{config::HomeConfig, scene::HomeScene};

// Re-exports for flows written outside this crate.
pub use winit::event::{DeviceEvent, WindowEvent};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Opens a window and runs the home scene with `config` until it closes.
pub fn start_with(config: HomeConfig) -> anyhow::Result<()> {
    flow::run(vec![HomeScene::constructor(config)])
}

/// Runs the home scene with the default configuration.
pub fn start() -> anyhow::Result<()> {
    start_with(HomeConfig::default())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    start().map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
