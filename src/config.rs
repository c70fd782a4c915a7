//! Tunables for the home scene.
//!
//! Everything has a `Default` matching the reference scene, so the usual way
//! to tweak a value is struct update syntax:
//!
//! ```
//! use home_vr::config::{ControllerConfig, HomeConfig};
//!
//! let config = HomeConfig {
//!     controller: ControllerConfig { use_gravity: false, ..Default::default() },
//!     ..Default::default()
//! };
//! assert_eq!(config.controller.player_speed, 7.0);
//! ```

use cgmath::{Deg, Point3, Rad, Vector3};

use crate::scene::layout::SceneLayout;

/// Turns 0-255 channel values into a linear 0-1 colour.
pub const fn rgb8(r: u8, g: u8, b: u8) -> [f32; 3] {
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
}

/// Character controller constants. Distances are world units, speeds are per second
/// unless stated otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerConfig {
    pub player_speed: f32,
    /// Upward velocity of a jump and the cap on falling speed, in units per frame.
    pub jump_force: f32,
    /// Added to the vertical velocity every second while airborne.
    pub gravity: f32,
    /// Eye height of the camera above the pawn's feet.
    pub y_offset: f32,
    /// Fraction of the way the camera moves towards the eye point each frame.
    pub camera_follow: f32,
    /// How fast the pawn turns towards its heading (slerp factor per second).
    pub turn_rate: f32,
    /// The floor ray starts this far above the feet...
    pub floor_ray_height: f32,
    /// ...and reaches this far down.
    pub floor_ray_length: f32,
    /// Reach of the look ray used for highlighting.
    pub look_distance: f32,
    pub use_gravity: bool,
    /// Falling below this height puts the pawn back on its last ground position.
    pub respawn_height: f32,
    /// Where the camera is parked before it starts following the pawn.
    pub camera_root: Vector3<f32>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            player_speed: 7.0,
            jump_force: 0.8,
            gravity: -2.8,
            y_offset: 1.7,
            camera_follow: 0.4,
            turn_rate: 10.0,
            floor_ray_height: 0.5,
            floor_ray_length: 0.6,
            look_distance: 10.0,
            use_gravity: true,
            respawn_height: -50.0,
            camera_root: Vector3::new(0.0, 1.7, -50.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
    /// Vertical field of view.
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    /// Mouse pixels per radian of rotation.
    pub angular_sensibility: f32,
    /// Detaches the camera from the pawn and moves it with WASD.
    pub free_fly: bool,
    pub free_fly_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 5.0, -10.0),
            yaw: Deg(90.0).into(),
            pitch: Rad(0.0),
            fovy: Rad(0.9),
            znear: 0.1,
            zfar: 1000.0,
            angular_sensibility: 2000.0,
            free_fly: false,
            free_fly_speed: 4.0,
        }
    }
}

/// Hemisphere light, one point light and linear fog.
#[derive(Clone, Debug, PartialEq)]
pub struct LightingConfig {
    pub hemisphere_direction: Vector3<f32>,
    /// Defaults to 0.6, not the 0.06 the Babylon.js home scene uses. The
    /// hemisphere is the only ambient term in the basic shader, and at 0.06
    /// everything outside the point light's reach renders nearly black.
    pub hemisphere_intensity: f32,
    pub hemisphere_sky: [f32; 3],
    pub hemisphere_ground: [f32; 3],
    pub point_position: Vector3<f32>,
    pub point_intensity: f32,
    pub point_colour: [f32; 3],
    pub fog_enabled: bool,
    pub fog_start: f32,
    pub fog_end: f32,
    pub fog_colour: [f32; 3],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            hemisphere_direction: Vector3::unit_y(),
            hemisphere_intensity: 0.6,
            hemisphere_sky: rgb8(141, 186, 175),
            hemisphere_ground: rgb8(102, 71, 53),
            point_position: Vector3::new(0.0, 1.65, 5.5),
            point_intensity: 0.6,
            point_colour: [1.0, 1.0, 1.0],
            fog_enabled: true,
            fog_start: 5.0,
            fog_end: 750.0,
            fog_colour: rgb8(169, 133, 90),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HomeConfig {
    pub controller: ControllerConfig,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    pub layout: SceneLayout,
    /// Colour given to whatever the look ray hits.
    pub highlight_colour: [f32; 3],
    /// Draws a cylinder where the otherwise invisible pawn stands.
    pub show_pawn_body: bool,
    pub pawn_body_colour: [f32; 3],
    /// Period of `on_tick`, which drives the debug inspector output.
    pub tick_duration_millis: u64,
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            camera: CameraConfig::default(),
            lighting: LightingConfig::default(),
            layout: SceneLayout::default(),
            highlight_colour: [1.0, 0.0, 0.46],
            show_pawn_body: false,
            pawn_body_colour: [0.8, 0.5, 0.5],
            tick_duration_millis: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb8_scales_channels() {
        let [r, g, b] = rgb8(255, 0, 51);
        assert_eq!(r, 1.0);
        assert_eq!(g, 0.0);
        assert!((b - 0.2).abs() < 1e-6);
    }

    #[test]
    fn camera_root_sits_at_eye_height() {
        let controller = ControllerConfig::default();
        assert_eq!(controller.camera_root.y, controller.y_offset);
    }

    #[test]
    fn ambient_light_outshines_the_fog_floor() {
        let lighting = LightingConfig::default();
        assert_eq!(lighting.hemisphere_intensity, 0.6);
        assert!(lighting.hemisphere_intensity >= lighting.point_intensity);
    }
}
