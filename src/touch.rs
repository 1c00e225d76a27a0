//! Touch-magnet slots.
//!
//! Up to [`MAX_TOUCHES`] pointers pull particles toward them. A released
//! slot keeps pulling with an exponentially decaying strength until it drops
//! below the inert threshold.

use glam::Vec3;

/// Number of simultaneous touch magnets.
pub const MAX_TOUCHES: usize = 5;

/// One touch magnet.
///
/// `x` and `y` are normalized device coordinates in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TouchPoint {
    pub x: f32,
    pub y: f32,
    /// Pull strength in `[0, 1]`.
    pub strength: f32,
    pub active: bool,
}

impl TouchPoint {
    /// Whether this slot contributes any force.
    #[inline]
    pub fn is_inert(&self) -> bool {
        !self.active && self.strength == 0.0
    }

    /// World-space magnet position on the `z = 0` plane of the simulation box.
    pub fn world_position(&self, half_bounds: Vec3) -> Vec3 {
        Vec3::new(self.x * half_bounds.x, self.y * half_bounds.y, 0.0)
    }
}

/// The fixed set of touch slots plus their release decay.
#[derive(Debug, Clone)]
pub struct TouchSlots {
    points: [TouchPoint; MAX_TOUCHES],
    decay_rate: f32,
    inert_epsilon: f32,
}

impl TouchSlots {
    /// Create empty slots. Released strengths decay as `exp(-decay_rate * t)`
    /// and snap to zero below `inert_epsilon`.
    pub fn new(decay_rate: f32, inert_epsilon: f32) -> Self {
        Self {
            points: [TouchPoint::default(); MAX_TOUCHES],
            decay_rate,
            inert_epsilon,
        }
    }

    /// Activate `slot` at `(x, y)`.
    pub fn press(&mut self, slot: usize, x: f32, y: f32, strength: f32) {
        if let Some(point) = self.points.get_mut(slot) {
            *point = TouchPoint {
                x: x.clamp(-1.0, 1.0),
                y: y.clamp(-1.0, 1.0),
                strength: strength.clamp(0.0, 1.0),
                active: true,
            };
        }
    }

    /// Move an active slot. Released slots keep their last position.
    pub fn move_to(&mut self, slot: usize, x: f32, y: f32) {
        if let Some(point) = self.points.get_mut(slot) {
            if point.active {
                point.x = x.clamp(-1.0, 1.0);
                point.y = y.clamp(-1.0, 1.0);
            }
        }
    }

    /// Deactivate `slot`; its strength starts decaying on the next update.
    pub fn release(&mut self, slot: usize) {
        if let Some(point) = self.points.get_mut(slot) {
            point.active = false;
        }
    }

    /// Index of the first inert slot, if any.
    pub fn free_slot(&self) -> Option<usize> {
        self.points.iter().position(|p| p.is_inert())
    }

    /// Advance the release decay by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        let factor = (-self.decay_rate * dt).exp();
        for point in self.points.iter_mut().filter(|p| !p.active) {
            point.strength *= factor;
            if point.strength < self.inert_epsilon {
                point.strength = 0.0;
            }
        }
    }

    /// All slots, including inert ones.
    pub fn points(&self) -> &[TouchPoint; MAX_TOUCHES] {
        &self.points
    }
}

impl Default for TouchSlots {
    fn default() -> Self {
        Self::new(6.0, 1e-3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release_decay() {
        let mut slots = TouchSlots::new(2.0, 1e-3);
        slots.press(0, 0.5, -0.5, 1.0);
        slots.update(1.0);
        // Active slots do not decay
        assert_eq!(slots.points()[0].strength, 1.0);

        slots.release(0);
        slots.update(0.5);
        let expected = (-1.0_f32).exp();
        assert!((slots.points()[0].strength - expected).abs() < 1e-6);
        assert!(!slots.points()[0].is_inert());
    }

    #[test]
    fn test_decay_becomes_inert() {
        let mut slots = TouchSlots::new(6.0, 1e-3);
        slots.press(2, 0.0, 0.0, 1.0);
        slots.release(2);
        for _ in 0..120 {
            slots.update(1.0 / 60.0);
        }
        assert_eq!(slots.points()[2].strength, 0.0);
        assert!(slots.points()[2].is_inert());
        assert_eq!(slots.free_slot(), Some(0));
    }

    #[test]
    fn test_inputs_are_clamped_and_out_of_range_ignored() {
        let mut slots = TouchSlots::default();
        slots.press(1, 3.0, -2.0, 7.0);
        let p = slots.points()[1];
        assert_eq!((p.x, p.y, p.strength), (1.0, -1.0, 1.0));

        slots.press(MAX_TOUCHES, 0.0, 0.0, 1.0);
        assert!(slots.points().iter().filter(|p| p.active).count() == 1);
    }

    #[test]
    fn test_world_position() {
        let p = TouchPoint {
            x: 0.5,
            y: -1.0,
            strength: 1.0,
            active: true,
        };
        assert_eq!(p.world_position(Vec3::new(2.0, 1.0, 1.0)), Vec3::new(1.0, -1.0, 0.0));
    }
}
