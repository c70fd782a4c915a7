//! Third-person character controller.
//!
//! Every frame the controller turns the sampled input into a camera-relative
//! move, integrates gravity, moves the pawn through the [`CollisionWorld`]
//! with collide-and-slide, pulls the camera towards the pawn's eye point and
//! finally casts a look ray from the camera.
//!
//! The controller owns a copy of the camera. The scene copies the mouse-look
//! orientation in before [`CharacterController::update`] and writes the new
//! position back to the engine afterwards.

use cgmath::{InnerSpace, Quaternion, Rad, Rotation3, Vector3, VectorSpace, Zero};
use instant::Duration;

use crate::{
    camera::Camera,
    config::ControllerConfig,
    input::InputManager,
    pawn::Pawn,
    physics::{Collider, CollisionWorld, EPSILON, PickInfo, Ray},
};

#[derive(Debug)]
pub struct CharacterController {
    pub pawn: Pawn,
    pub camera: Camera,
    config: ControllerConfig,
    move_direction: Vector3<f32>,
    input_amount: f32,
    /// Vertical velocity in units per frame.
    gravity: Vector3<f32>,
    last_ground_position: Vector3<f32>,
    grounded: bool,
}

impl CharacterController {
    pub fn new(pawn: Pawn, camera: Camera, config: ControllerConfig) -> Self {
        let mut controller = Self {
            pawn,
            camera,
            config,
            move_direction: Vector3::zero(),
            input_amount: 0.0,
            gravity: Vector3::zero(),
            last_ground_position: Vector3::zero(),
            grounded: false,
        };
        controller.assign_camera(camera);
        controller
    }

    /// Takes over `camera`: it is parked at the camera root and then pulled
    /// once towards the pawn.
    pub fn assign_camera(&mut self, camera: Camera) {
        self.camera = camera;
        let root = self.config.camera_root;
        self.camera.position = (root.x, root.y, root.z).into();
        self.update_camera();
    }

    /// Runs one frame. `input` must already be updated for this frame.
    /// Returns what the camera looks at, if anything.
    pub fn update(
        &mut self,
        input: &InputManager,
        world: &CollisionWorld,
        dt: Duration,
    ) -> Option<PickInfo> {
        let dt = dt.as_secs_f32();
        self.update_from_controls(input, dt);
        self.update_ground_detection(input, world, dt);
        self.update_camera();
        self.look_raycast(world)
    }

    fn update_from_controls(&mut self, input: &InputManager, dt: f32) {
        let (h, v) = (input.horizontal, input.vertical);

        // camera relative, pitch included, then flattened onto the ground
        let movement = self.camera.right() * h + self.camera.forward() * v;
        self.move_direction = if movement.magnitude2() > EPSILON * EPSILON {
            let dir = movement.normalize();
            Vector3::new(dir.x, 0.0, dir.z)
        } else {
            Vector3::zero()
        };

        // diagonal input must not be faster than straight input
        self.input_amount = (h.abs() + v.abs()).clamp(0.0, 1.0);
        self.move_direction *= self.input_amount * self.config.player_speed * dt;

        if input.horizontal_axis == 0.0 && input.vertical_axis == 0.0 {
            return;
        }
        let heading = self.camera.right() * input.horizontal_axis
            + self.camera.forward_flat() * input.vertical_axis;
        if heading.magnitude2() < EPSILON * EPSILON {
            return;
        }
        let target = Quaternion::from_angle_y(Rad(heading.x.atan2(heading.z)));
        let current = self.pawn.transform.rotation;
        // q and -q are the same rotation; slerp along the short arc
        let target = if current.dot(target) < 0.0 { -target } else { target };
        let amount = (self.config.turn_rate * dt).min(1.0);
        self.pawn.transform.rotation = current.slerp(target, amount).normalize();
    }

    fn update_ground_detection(&mut self, input: &InputManager, world: &CollisionWorld, dt: f32) {
        if !self.is_grounded(world) {
            self.gravity.y += dt * self.config.gravity;
            self.grounded = false;
        }
        self.gravity.y = self.gravity.y.max(-self.config.jump_force);

        if self.config.use_gravity && self.grounded && input.jump_key_down {
            self.gravity.y = self.config.jump_force;
            self.grounded = false;
        }

        let displacement = if self.config.use_gravity {
            self.move_direction + self.gravity
        } else {
            self.move_direction
        };
        let position =
            world.move_with_collisions(self.pawn.position(), &self.pawn.ellipsoid, displacement);
        self.pawn.set_position(position);

        if self.is_grounded(world) {
            self.gravity.y = 0.0;
            self.grounded = true;
            self.last_ground_position = position;
        } else if position.y < self.config.respawn_height {
            log::info!(
                "Pawn fell below {} and respawns at {:?}",
                self.config.respawn_height,
                self.last_ground_position
            );
            self.pawn.set_position(self.last_ground_position);
            self.gravity = Vector3::zero();
        }
    }

    /// Moves the camera part of the way towards the pawn's eye point.
    pub fn update_camera(&mut self) {
        let pawn = self.pawn.position();
        let eye = Vector3::new(pawn.x, pawn.y + self.config.y_offset, pawn.z);
        let current = Vector3::new(
            self.camera.position.x,
            self.camera.position.y,
            self.camera.position.z,
        );
        let next = current.lerp(eye, self.config.camera_follow);
        self.camera.position = (next.x, next.y, next.z).into();
    }

    /// Casts straight down from just above the pawn's feet and returns the
    /// floor point, if any floor is close enough.
    pub fn floor_raycast(
        &self,
        world: &CollisionWorld,
        offset_x: f32,
        offset_z: f32,
        length: f32,
    ) -> Option<Vector3<f32>> {
        let feet = self.pawn.position();
        let origin = Vector3::new(
            feet.x + offset_x,
            feet.y + self.config.floor_ray_height,
            feet.z + offset_z,
        );
        world
            .pick_with_ray(&Ray::down(origin, length), Collider::is_pickable)
            .map(|pick| pick.point)
    }

    pub fn is_grounded(&self, world: &CollisionWorld) -> bool {
        self.floor_raycast(world, 0.0, 0.0, self.config.floor_ray_length)
            .is_some()
    }

    pub fn look_raycast(&self, world: &CollisionWorld) -> Option<PickInfo> {
        let ray = self.camera.forward_ray(self.config.look_distance);
        world.pick_with_ray(&ray, Collider::is_pickable)
    }

    pub fn grounded(&self) -> bool {
        self.grounded
    }

    pub fn gravity(&self) -> Vector3<f32> {
        self.gravity
    }

    pub fn last_ground_position(&self) -> Vector3<f32> {
        self.last_ground_position
    }

    pub fn move_direction(&self) -> Vector3<f32> {
        self.move_direction
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Rotation};
    use winit::keyboard::KeyCode;

    use super::*;
    use crate::physics::Triangle;

    const FRAME: Duration = Duration::from_millis(16);

    fn flat_world() -> CollisionWorld {
        let mut world = CollisionWorld::new();
        let (a, b, c, d) = (
            Vector3::new(-50.0, 0.0, -50.0),
            Vector3::new(-50.0, 0.0, 50.0),
            Vector3::new(50.0, 0.0, 50.0),
            Vector3::new(50.0, 0.0, -50.0),
        );
        world.add(Collider::new(
            1,
            "ground",
            vec![Triangle::new(a, b, c), Triangle::new(a, c, d)],
        ));
        world
    }

    fn controller_at(position: Vector3<f32>) -> CharacterController {
        let camera = Camera::new((0.0, 5.0, -10.0), Deg(90.0), Deg(0.0));
        CharacterController::new(Pawn::at(position), camera, ControllerConfig::default())
    }

    #[test]
    fn assign_camera_starts_from_the_root() {
        let controller = controller_at(Vector3::zero());
        // one 0.4 step from (0, 1.7, -50) towards (0, 1.7, 0)
        assert!((controller.camera.position.z - -30.0).abs() < 1e-4);
        assert!((controller.camera.position.y - 1.7).abs() < 1e-4);
    }

    #[test]
    fn standing_still_on_the_ground_stays_put() {
        let world = flat_world();
        let mut controller = controller_at(Vector3::zero());
        let input = InputManager::new();
        for _ in 0..10 {
            controller.update(&input, &world, FRAME);
        }
        assert!(controller.grounded());
        assert!(controller.pawn.position().magnitude() < 1e-3);
        assert_eq!(controller.gravity().y, 0.0);
    }

    #[test]
    fn falling_speed_is_capped_by_the_jump_force() {
        let world = CollisionWorld::new();
        let mut controller = controller_at(Vector3::new(0.0, 10.0, 0.0));
        let input = InputManager::new();
        for _ in 0..60 {
            controller.update(&input, &world, Duration::from_millis(100));
        }
        assert_eq!(controller.gravity().y, -0.8);
    }

    #[test]
    fn walking_forward_follows_the_camera() {
        let world = flat_world();
        let mut controller = controller_at(Vector3::zero());
        let mut input = InputManager::new();
        input.press(KeyCode::KeyW);
        for _ in 0..30 {
            input.update();
            controller.update(&input, &world, FRAME);
        }
        let pos = controller.pawn.position();
        assert!(pos.z > 1.0, "did not move forward: {pos:?}");
        assert!(pos.x.abs() < 1e-3);

        // turned from facing -Z to facing +Z
        let facing = controller.pawn.rotation().rotate_vector(Vector3::unit_z());
        assert!(facing.z > 0.9, "still facing {facing:?}");
    }

    #[test]
    fn heading_follows_strafe_direction() {
        let world = flat_world();
        let mut controller = controller_at(Vector3::zero());
        let mut input = InputManager::new();
        input.press(KeyCode::KeyD);
        for _ in 0..60 {
            input.update();
            controller.update(&input, &world, FRAME);
        }
        // screen-right is -X while the camera looks down +Z
        assert!(controller.pawn.position().x < -1.0);
        let facing = controller.pawn.rotation().rotate_vector(Vector3::unit_z());
        assert!(facing.x < -0.9, "facing {facing:?}");
    }

    #[test]
    fn jump_leaves_the_ground_and_lands_again() {
        let world = flat_world();
        let mut controller = controller_at(Vector3::zero());
        let mut input = InputManager::new();
        controller.update(&input, &world, FRAME);
        assert!(controller.grounded());

        input.press(KeyCode::Space);
        input.update();
        controller.update(&input, &world, FRAME);
        assert!(controller.pawn.position().y > 0.5);
        assert!(!controller.grounded());

        input.release(KeyCode::Space);
        input.update();
        for _ in 0..200 {
            controller.update(&input, &world, FRAME);
        }
        assert!(controller.grounded());
        assert!(controller.pawn.position().y.abs() < 1e-3);
    }

    #[test]
    fn gravity_can_be_switched_off() {
        let world = CollisionWorld::new();
        let config = ControllerConfig {
            use_gravity: false,
            ..Default::default()
        };
        let camera = Camera::new((0.0, 0.0, 0.0), Deg(90.0), Deg(0.0));
        let mut controller =
            CharacterController::new(Pawn::at(Vector3::new(0.0, 3.0, 0.0)), camera, config);
        for _ in 0..10 {
            controller.update(&InputManager::new(), &world, FRAME);
        }
        assert_eq!(controller.pawn.position().y, 3.0);
    }

    #[test]
    fn falling_off_the_world_respawns_on_last_ground() {
        let mut world = flat_world();
        let mut controller = controller_at(Vector3::new(1.0, 0.0, 2.0));
        let input = InputManager::new();
        controller.update(&input, &world, FRAME);
        assert_eq!(controller.last_ground_position(), controller.pawn.position());

        world.remove(1);
        for _ in 0..200 {
            controller.update(&input, &world, FRAME);
        }
        let pos = controller.pawn.position();
        assert!(pos.y >= -50.0, "kept falling: {pos:?}");
        assert!((pos.x - 1.0).abs() < 1e-3 && (pos.z - 2.0).abs() < 1e-3);
    }

    #[test]
    fn look_ray_reports_what_is_in_front_of_the_camera() {
        let mut world = flat_world();
        let (a, b, c, d) = (
            Vector3::new(-5.0, 0.0, 4.0),
            Vector3::new(5.0, 0.0, 4.0),
            Vector3::new(5.0, 5.0, 4.0),
            Vector3::new(-5.0, 5.0, 4.0),
        );
        world.add(Collider::new(
            7,
            "shed",
            vec![Triangle::new(a, b, c), Triangle::new(a, c, d)],
        ));
        let mut controller = controller_at(Vector3::zero());
        let input = InputManager::new();
        let mut hit = None;
        for _ in 0..30 {
            hit = controller.update(&input, &world, FRAME);
        }
        let hit = hit.expect("shed should be in view");
        assert_eq!(hit.id, 7);
        assert!((hit.point.z - 4.0).abs() < 1e-3);
    }
}
