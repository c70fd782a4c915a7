//! Camera, projection and the mouse-look controller.
//!
//! The camera is a position plus yaw/pitch in a right-handed, Y-up world.
//! A yaw of 90° looks down +Z. [`CameraResources`] owns the uniform buffer and
//! bind group (group 1 in the basic pipeline).

use std::f32::consts::FRAC_PI_2;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use instant::Duration;
use winit::{
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::physics::Ray;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        }
    }

    /// View direction including pitch.
    pub fn forward(&self) -> Vector3<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
    }

    /// View direction projected onto the ground plane.
    pub fn forward_flat(&self) -> Vector3<f32> {
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        Vector3::new(cos_yaw, 0.0, sin_yaw)
    }

    /// Screen-right, always horizontal.
    pub fn right(&self) -> Vector3<f32> {
        self.forward_flat().cross(Vector3::unit_y()).normalize()
    }

    pub fn forward_ray(&self, length: f32) -> Ray {
        Ray::new(
            Vector3::new(self.position.x, self.position.y, self.position.z),
            self.forward(),
            length,
        )
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward(), Vector3::unit_y())
    }
}

#[derive(Debug)]
pub struct Projection {
    aspect: f32,
    pub fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Mouse look plus an optional free-fly keyboard mode.
///
/// Mouse deltas rotate the camera by `delta / angular_sensibility` radians,
/// so a larger sensibility means slower turning. Keyboard movement only
/// happens while `free_fly` is set; otherwise something else (a character
/// controller) owns the camera position.
#[derive(Debug)]
pub struct CameraController {
    pub angular_sensibility: f32,
    pub speed: f32,
    pub free_fly: bool,
    amount_left: f32,
    amount_right: f32,
    amount_forward: f32,
    amount_backward: f32,
    amount_up: f32,
    amount_down: f32,
    rotate_horizontal: f32,
    rotate_vertical: f32,
}

impl CameraController {
    pub fn new(speed: f32, angular_sensibility: f32) -> Self {
        Self {
            angular_sensibility,
            speed,
            free_fly: false,
            amount_left: 0.0,
            amount_right: 0.0,
            amount_forward: 0.0,
            amount_backward: 0.0,
            amount_up: 0.0,
            amount_down: 0.0,
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
        }
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => self.process_keyboard(*key, *state),
            WindowEvent::Focused(false) => {
                self.release_all();
                false
            }
            _ => false,
        }
    }

    fn process_keyboard(&mut self, key: KeyCode, state: ElementState) -> bool {
        if !self.free_fly {
            return false;
        }
        let amount = if state == ElementState::Pressed { 1.0 } else { 0.0 };
        match key {
            KeyCode::KeyW | KeyCode::ArrowUp => self.amount_forward = amount,
            KeyCode::KeyS | KeyCode::ArrowDown => self.amount_backward = amount,
            KeyCode::KeyA | KeyCode::ArrowLeft => self.amount_left = amount,
            KeyCode::KeyD | KeyCode::ArrowRight => self.amount_right = amount,
            KeyCode::Space => self.amount_up = amount,
            KeyCode::ShiftLeft => self.amount_down = amount,
            _ => return false,
        }
        true
    }

    fn release_all(&mut self) {
        self.amount_left = 0.0;
        self.amount_right = 0.0;
        self.amount_forward = 0.0;
        self.amount_backward = 0.0;
        self.amount_up = 0.0;
        self.amount_down = 0.0;
    }

    pub fn handle_mouse(&mut self, mouse_dx: f64, mouse_dy: f64) {
        self.rotate_horizontal += mouse_dx as f32;
        self.rotate_vertical += mouse_dy as f32;
    }

    pub fn update(&mut self, camera: &mut Camera, dt: Duration) {
        if self.free_fly {
            let dt = dt.as_secs_f32();
            let forward = camera.forward();
            let right = camera.right();
            camera.position += forward * (self.amount_forward - self.amount_backward) * self.speed * dt;
            camera.position += right * (self.amount_right - self.amount_left) * self.speed * dt;
            camera.position.y += (self.amount_up - self.amount_down) * self.speed * dt;
        }

        let sensibility = self.angular_sensibility.max(f32::EPSILON);
        camera.yaw += Rad(self.rotate_horizontal / sensibility);
        // screen y grows downwards
        camera.pitch += Rad(-self.rotate_vertical / sensibility);
        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;

        camera.pitch.0 = camera.pitch.0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2);
    }
}

/// GPU side of the camera: uniform, buffer and bind group.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: CameraController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[cfg(test)]
mod tests {
    use cgmath::Deg;

    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn yaw_of_ninety_degrees_looks_down_positive_z() {
        let camera = Camera::new((0.0, 5.0, -10.0), Deg(90.0), Deg(0.0));
        assert!((camera.forward() - Vector3::unit_z()).magnitude() < EPS);
        // screen-right is -X when looking down +Z in a right-handed world
        assert!((camera.right() - -Vector3::unit_x()).magnitude() < EPS);
    }

    #[test]
    fn right_ignores_pitch() {
        let camera = Camera::new((0.0, 0.0, 0.0), Deg(30.0), Deg(-60.0));
        assert!(camera.right().y.abs() < EPS);
        assert!(camera.forward().y < 0.0);
        assert!(camera.forward_flat().y.abs() < EPS);
    }

    #[test]
    fn mouse_look_uses_angular_sensibility_and_clamps_pitch() {
        let mut camera = Camera::new((0.0, 0.0, 0.0), Rad(0.0), Rad(0.0));
        let mut controller = CameraController::new(4.0, 2000.0);
        controller.handle_mouse(200.0, 0.0);
        controller.update(&mut camera, Duration::from_millis(16));
        assert!((camera.yaw.0 - 0.1).abs() < EPS);

        controller.handle_mouse(0.0, -1_000_000.0);
        controller.update(&mut camera, Duration::from_millis(16));
        assert!((camera.pitch.0 - SAFE_FRAC_PI_2).abs() < EPS);
    }

    #[test]
    fn keyboard_only_moves_in_free_fly() {
        let mut camera = Camera::new((0.0, 0.0, 0.0), Deg(90.0), Deg(0.0));
        let mut controller = CameraController::new(4.0, 2000.0);
        assert!(!controller.process_keyboard(KeyCode::KeyW, ElementState::Pressed));
        controller.update(&mut camera, Duration::from_secs(1));
        assert!(camera.position.z.abs() < EPS);

        controller.free_fly = true;
        assert!(controller.process_keyboard(KeyCode::KeyW, ElementState::Pressed));
        controller.update(&mut camera, Duration::from_secs(1));
        assert!((camera.position.z - 4.0).abs() < 1e-4);
    }

    #[test]
    fn projection_survives_zero_sized_surfaces() {
        let mut projection = Projection::new(0, 0, Rad(0.9), 0.1, 1000.0);
        assert!((projection.aspect() - 1.0).abs() < EPS);
        projection.resize(1920, 1080);
        assert!((projection.aspect() - 1920.0 / 1080.0).abs() < EPS);
    }
}
