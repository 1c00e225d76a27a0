//! Window input mapped onto simulation inputs.
//!
//! Left mouse and touch contacts become touch magnets, arrow keys tilt the
//! gravity vector (a stand-in for device orientation), digits `1`-`4` pick
//! the morph shape, and right-drag / scroll move the orbit camera.

use std::collections::{HashMap, HashSet};

use glam::{Vec2, Vec3};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::config::SimParams;
use crate::gpu::Camera;
use crate::shape::ShapeKind;
use crate::simulator::StepInputs;
use crate::touch::TouchSlots;

const TILT: f32 = 0.8;
const GRAVITY_RESPONSE: f32 = 8.0;
const ORBIT_SPEED: f32 = 0.005;
const PIXELS_PER_SCROLL_LINE: f32 = 40.0;

/// Something the input asks the application to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    SelectShape(ShapeKind),
    TogglePause,
    Exit,
}

/// Which pointer owns a touch slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pointer {
    Mouse,
    Finger(u64),
}

/// Convert a window pixel position to normalized device coordinates.
pub fn to_ndc(position: Vec2, width: u32, height: u32) -> Vec2 {
    let size = Vec2::new(width.max(1) as f32, height.max(1) as f32);
    let uv = position / size;
    Vec2::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0)
}

/// Accumulated input state between frames.
pub struct FluidInput {
    touches: TouchSlots,
    owners: HashMap<Pointer, usize>,
    cursor: Vec2,
    window_size: (u32, u32),
    held: HashSet<KeyCode>,
    gravity_enabled: bool,
    gravity: Vec3,
    orbiting: bool,
    orbit_delta: Vec2,
    zoom_delta: f32,
}

impl FluidInput {
    pub fn new(params: &SimParams, width: u32, height: u32) -> Self {
        Self {
            touches: TouchSlots::new(params.touch_decay, params.touch_epsilon),
            owners: HashMap::new(),
            cursor: Vec2::ZERO,
            window_size: (width, height),
            held: HashSet::new(),
            gravity_enabled: true,
            gravity: Vec3::NEG_Y,
            orbiting: false,
            orbit_delta: Vec2::ZERO,
            zoom_delta: 0.0,
        }
    }

    /// Feed one window event; returns a command when the event maps to one.
    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<Command> {
        match event {
            WindowEvent::Resized(size) => {
                self.window_size = (size.width, size.height);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    return self.key(code, event.state == ElementState::Pressed, event.repeat);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let cursor = Vec2::new(position.x as f32, position.y as f32);
                if self.orbiting {
                    self.orbit_delta += cursor - self.cursor;
                }
                self.cursor = cursor;
                self.pointer_moved(Pointer::Mouse, self.ndc(cursor));
            }
            WindowEvent::MouseInput { state, button, .. } => match (button, state) {
                (MouseButton::Left, ElementState::Pressed) => {
                    self.pointer_down(Pointer::Mouse, self.ndc(self.cursor), 1.0);
                }
                (MouseButton::Left, ElementState::Released) => self.pointer_up(Pointer::Mouse),
                (MouseButton::Right, state) => self.orbiting = *state == ElementState::Pressed,
                _ => {}
            },
            WindowEvent::MouseWheel { delta, .. } => {
                self.zoom_delta += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_SCROLL_LINE,
                };
            }
            WindowEvent::Touch(touch) => {
                let pointer = Pointer::Finger(touch.id);
                let ndc = self.ndc(Vec2::new(touch.location.x as f32, touch.location.y as f32));
                match touch.phase {
                    TouchPhase::Started => {
                        let strength = touch.force.map(|f| f.normalized() as f32).unwrap_or(1.0);
                        self.pointer_down(pointer, ndc, strength.max(0.25));
                    }
                    TouchPhase::Moved => self.pointer_moved(pointer, ndc),
                    TouchPhase::Ended | TouchPhase::Cancelled => self.pointer_up(pointer),
                }
            }
            _ => {}
        }
        None
    }

    /// Apply a key transition.
    pub fn key(&mut self, code: KeyCode, pressed: bool, repeat: bool) -> Option<Command> {
        if !pressed {
            self.held.remove(&code);
            return None;
        }
        self.held.insert(code);
        if repeat {
            return None;
        }
        match code {
            KeyCode::Digit1 => Some(Command::SelectShape(ShapeKind::Sphere)),
            KeyCode::Digit2 => Some(Command::SelectShape(ShapeKind::Cube)),
            KeyCode::Digit3 => Some(Command::SelectShape(ShapeKind::Torus)),
            KeyCode::Digit4 => Some(Command::SelectShape(ShapeKind::Heart)),
            KeyCode::KeyG => {
                self.gravity_enabled = !self.gravity_enabled;
                None
            }
            KeyCode::Space => Some(Command::TogglePause),
            KeyCode::Escape => Some(Command::Exit),
            _ => None,
        }
    }

    /// Claim a free touch slot for `pointer`. Ignored when all slots are busy.
    pub fn pointer_down(&mut self, pointer: Pointer, ndc: Vec2, strength: f32) {
        let slot = match self.owners.get(&pointer) {
            Some(&slot) => slot,
            None => match self.touches.free_slot() {
                Some(slot) => slot,
                None => return,
            },
        };
        self.owners.insert(pointer, slot);
        self.touches.press(slot, ndc.x, ndc.y, strength);
    }

    pub fn pointer_moved(&mut self, pointer: Pointer, ndc: Vec2) {
        if let Some(&slot) = self.owners.get(&pointer) {
            self.touches.move_to(slot, ndc.x, ndc.y);
        }
    }

    /// Release the pointer's slot; its pull fades out over the next frames.
    pub fn pointer_up(&mut self, pointer: Pointer) {
        if let Some(slot) = self.owners.remove(&pointer) {
            self.touches.release(slot);
        }
    }

    /// Advance touch decay and gravity smoothing by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.touches.update(dt);
        let target = self.gravity_target();
        let blend = 1.0 - (-GRAVITY_RESPONSE * dt).exp();
        self.gravity += (target - self.gravity) * blend;
    }

    /// Inputs for the next simulation step.
    ///
    /// Gravity is exactly zero while switched off with `G`; the step only
    /// uses its direction, so an eased-down vector would still pull at full
    /// strength.
    pub fn step_inputs(&self) -> StepInputs {
        StepInputs {
            gravity: if self.gravity_enabled { self.gravity } else { Vec3::ZERO },
            touches: *self.touches.points(),
        }
    }

    /// Apply accumulated drag and scroll to `camera`.
    pub fn apply_camera(&mut self, camera: &mut Camera) {
        if self.orbit_delta != Vec2::ZERO {
            camera.orbit(-self.orbit_delta.x * ORBIT_SPEED, self.orbit_delta.y * ORBIT_SPEED);
            self.orbit_delta = Vec2::ZERO;
        }
        if self.zoom_delta != 0.0 {
            camera.zoom(self.zoom_delta);
            self.zoom_delta = 0.0;
        }
    }

    pub fn touches(&self) -> &TouchSlots {
        &self.touches
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    fn ndc(&self, position: Vec2) -> Vec2 {
        to_ndc(position, self.window_size.0, self.window_size.1)
    }

    fn gravity_target(&self) -> Vec3 {
        let axis = |neg: KeyCode, pos: KeyCode| {
            let mut value = 0.0;
            if self.held.contains(&neg) {
                value -= TILT;
            }
            if self.held.contains(&pos) {
                value += TILT;
            }
            value
        };
        let tilt_x = axis(KeyCode::ArrowLeft, KeyCode::ArrowRight);
        let tilt_z = axis(KeyCode::ArrowUp, KeyCode::ArrowDown);
        Vec3::new(tilt_x, -1.0, tilt_z).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> FluidInput {
        FluidInput::new(&SimParams::default(), 200, 100)
    }

    #[test]
    fn test_to_ndc_corners() {
        assert_eq!(to_ndc(Vec2::ZERO, 200, 100), Vec2::new(-1.0, 1.0));
        assert_eq!(to_ndc(Vec2::new(200.0, 100.0), 200, 100), Vec2::new(1.0, -1.0));
        assert_eq!(to_ndc(Vec2::new(100.0, 50.0), 200, 100), Vec2::ZERO);
    }

    #[test]
    fn test_digits_select_shapes() {
        let mut input = input();
        assert_eq!(
            input.key(KeyCode::Digit3, true, false),
            Some(Command::SelectShape(ShapeKind::Torus))
        );
        assert_eq!(input.key(KeyCode::Digit3, true, true), None);
        assert_eq!(input.key(KeyCode::Digit3, false, false), None);
        assert_eq!(input.key(KeyCode::Escape, true, false), Some(Command::Exit));
    }

    #[test]
    fn test_pointers_take_separate_slots_and_release() {
        let mut input = input();
        input.pointer_down(Pointer::Mouse, Vec2::new(0.5, 0.5), 1.0);
        input.pointer_down(Pointer::Finger(7), Vec2::new(-0.5, 0.0), 1.0);
        let points = input.touches().points();
        assert!(points[0].active && points[1].active);
        assert_eq!(points[1].x, -0.5);

        input.pointer_moved(Pointer::Finger(7), Vec2::new(-0.25, 0.25));
        assert_eq!(input.touches().points()[1].x, -0.25);

        input.pointer_up(Pointer::Mouse);
        assert!(!input.touches().points()[0].active);
        assert!(input.touches().points()[0].strength > 0.0);
    }

    #[test]
    fn test_extra_pointers_are_ignored() {
        let mut input = input();
        for id in 0..7 {
            input.pointer_down(Pointer::Finger(id), Vec2::ZERO, 1.0);
        }
        assert!(input.touches().points().iter().all(|p| p.active));
        assert_eq!(input.touches().free_slot(), None);
    }

    #[test]
    fn test_gravity_eases_toward_tilt() {
        let mut input = input();
        assert_eq!(input.gravity(), Vec3::NEG_Y);
        input.key(KeyCode::ArrowRight, true, false);
        for _ in 0..120 {
            input.update(1.0 / 60.0);
        }
        let g = input.gravity();
        assert!(g.x > 0.5 && g.y < -0.5);

    }

    #[test]
    fn test_gravity_toggle_zeroes_step_gravity() {
        let mut input = input();
        input.key(KeyCode::KeyG, true, false);
        assert_eq!(input.step_inputs().gravity, Vec3::ZERO);
        for _ in 0..30 {
            input.update(1.0 / 60.0);
            assert_eq!(input.step_inputs().gravity, Vec3::ZERO);
        }

        input.key(KeyCode::KeyG, false, false);
        input.key(KeyCode::KeyG, true, false);
        assert_eq!(input.step_inputs().gravity, Vec3::NEG_Y);
    }

    #[test]
    fn test_camera_drag_is_consumed() {
        let mut input = input();
        let mut camera = Camera::new();
        input.zoom_delta = 1.0;
        input.apply_camera(&mut camera);
        assert!(camera.distance < Camera::new().distance);
        let distance = camera.distance;
        input.apply_camera(&mut camera);
        assert_eq!(camera.distance, distance);
    }
}
