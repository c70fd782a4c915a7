//! Keyboard sampling for the character controller.
//!
//! Window events only record which keys are held; [`InputManager::update`]
//! turns that into smoothed axis values once per frame, before the
//! controller reads them.

use std::collections::HashSet;

use winit::{
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

/// Fraction of the remaining distance to the target covered per frame.
const AXIS_SMOOTHING: f32 = 0.2;

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[derive(Debug, Default)]
pub struct InputManager {
    held: HashSet<KeyCode>,
    /// Smoothed left/right input in -1..=1, positive is right.
    pub horizontal: f32,
    /// Smoothed back/forward input in -1..=1, positive is forward.
    pub vertical: f32,
    /// Raw left/right direction: -1, 0 or 1.
    pub horizontal_axis: f32,
    /// Raw back/forward direction: -1, 0 or 1.
    pub vertical_axis: f32,
    pub jump_key_down: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records key presses and releases. Returns true if the key is one the
    /// controller listens to.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => {
                match state {
                    ElementState::Pressed => self.press(*key),
                    ElementState::Released => self.release(*key),
                }
                is_bound(*key)
            }
            WindowEvent::Focused(false) => {
                self.held.clear();
                false
            }
            _ => false,
        }
    }

    pub fn press(&mut self, key: KeyCode) {
        self.held.insert(key);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.held.remove(&key);
    }

    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    fn any_held(&self, keys: &[KeyCode]) -> bool {
        keys.iter().any(|key| self.held.contains(key))
    }

    /// Advances the smoothed axes by one frame. Forward wins over back and
    /// left wins over right when both are held.
    pub fn update(&mut self) {
        if self.any_held(&FORWARD) {
            self.vertical = lerp(self.vertical, 1.0, AXIS_SMOOTHING);
            self.vertical_axis = 1.0;
        } else if self.any_held(&BACKWARD) {
            self.vertical = lerp(self.vertical, -1.0, AXIS_SMOOTHING);
            self.vertical_axis = -1.0;
        } else {
            self.vertical = 0.0;
            self.vertical_axis = 0.0;
        }

        if self.any_held(&LEFT) {
            self.horizontal = lerp(self.horizontal, -1.0, AXIS_SMOOTHING);
            self.horizontal_axis = -1.0;
        } else if self.any_held(&RIGHT) {
            self.horizontal = lerp(self.horizontal, 1.0, AXIS_SMOOTHING);
            self.horizontal_axis = 1.0;
        } else {
            self.horizontal = 0.0;
            self.horizontal_axis = 0.0;
        }

        self.jump_key_down = self.any_held(&JUMP);
    }
}

const FORWARD: [KeyCode; 2] = [KeyCode::KeyW, KeyCode::ArrowUp];
const BACKWARD: [KeyCode; 2] = [KeyCode::KeyS, KeyCode::ArrowDown];
const LEFT: [KeyCode; 2] = [KeyCode::KeyA, KeyCode::ArrowLeft];
const RIGHT: [KeyCode; 2] = [KeyCode::KeyD, KeyCode::ArrowRight];
const JUMP: [KeyCode; 1] = [KeyCode::Space];

fn is_bound(key: KeyCode) -> bool {
    let groups: [&[KeyCode]; 5] = [&FORWARD, &BACKWARD, &LEFT, &RIGHT, &JUMP];
    groups.iter().any(|keys| keys.contains(&key))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    #[test]
    fn forward_eases_towards_one() {
        let mut input = InputManager::new();
        input.press(KeyCode::KeyW);
        input.update();
        assert!((input.vertical - 0.2).abs() < EPS);
        assert_eq!(input.vertical_axis, 1.0);
        input.update();
        assert!((input.vertical - 0.36).abs() < EPS);
    }

    #[test]
    fn releasing_snaps_back_to_zero() {
        let mut input = InputManager::new();
        input.press(KeyCode::KeyD);
        input.update();
        input.update();
        assert!(input.horizontal > 0.0);
        input.release(KeyCode::KeyD);
        input.update();
        assert_eq!(input.horizontal, 0.0);
        assert_eq!(input.horizontal_axis, 0.0);
    }

    #[test]
    fn forward_and_left_take_priority() {
        let mut input = InputManager::new();
        input.press(KeyCode::KeyW);
        input.press(KeyCode::KeyS);
        input.press(KeyCode::KeyA);
        input.press(KeyCode::KeyD);
        input.update();
        assert_eq!(input.vertical_axis, 1.0);
        assert_eq!(input.horizontal_axis, -1.0);
        assert!((input.horizontal + 0.2).abs() < EPS);
    }

    #[test]
    fn arrow_keys_mirror_wasd() {
        let mut input = InputManager::new();
        input.press(KeyCode::ArrowDown);
        input.press(KeyCode::ArrowRight);
        input.update();
        assert_eq!(input.vertical_axis, -1.0);
        assert_eq!(input.horizontal_axis, 1.0);
    }

    #[test]
    fn space_sets_jump() {
        let mut input = InputManager::new();
        input.press(KeyCode::Space);
        input.update();
        assert!(input.jump_key_down);
        assert!(is_bound(KeyCode::Space));
        assert!(!is_bound(KeyCode::KeyQ));
    }
}
