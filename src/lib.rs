//! Kart Sim - deterministic 2D motion and collision core
//!
//! Core modules:
//! - `sim`: Motion model, shapes, collision pass and entity factory
//! - `settings`: Step tuning (interval clamping, collision cooldown)
//! - `error`: Error taxonomy shared by every fallible operation

pub mod error;
pub mod settings;
pub mod sim;

pub use error::{Result, SimError};
pub use settings::SimSettings;

/// Simulation configuration constants
pub mod consts {
    /// Numeric tolerance used by "is static" and angle-cache checks
    pub const PRECISION: f64 = 1e-6;

    /// Entities per group; ids encode `group * GROUP_SIZE + sequence`
    pub const GROUP_SIZE: u64 = 1_000_000;

    /// Intervals above this are considered a hitch and get clamped
    pub const MAX_INTERVAL: f64 = 1.0 / 50.0;
    /// Interval used in place of a clamped one
    pub const FALLBACK_INTERVAL: f64 = 1.0 / 60.0;

    /// Time a pair stays suppressed after colliding
    pub const COLLISION_COOLDOWN: f64 = 1.0 / 60.0;

    /// Kart defaults
    pub const KART_MASS: f64 = 1.0;
    pub const KART_FRICTION: f64 = 0.6;
    pub const KART_HALF_LENGTH: f64 = 25.0;
    pub const KART_HALF_WIDTH: f64 = 8.0;

    /// Fireball defaults
    pub const FIREBALL_RADIUS: f64 = 10.0;
    pub const FIREBALL_MASS: f64 = 1.0;

    /// Fill used for lava when none is given
    pub const LAVA_COLOR: &str = "#ffa500";
}

/// Normalized angle to [0, 2π)
#[inline]
pub fn wrap_phase(angle: f64) -> f64 {
    angle.rem_euclid(std::f64::consts::TAU)
}

/// True when `value` is within [`consts::PRECISION`] of zero
#[inline]
pub fn near_zero(value: f64) -> bool {
    value.abs() <= consts::PRECISION
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    #[test]
    fn test_wrap_phase() {
        assert!((wrap_phase(TAU + 0.5) - 0.5).abs() < 1e-12);
        assert!((wrap_phase(-0.5) - (TAU - 0.5)).abs() < 1e-12);
        assert_eq!(wrap_phase(0.0), 0.0);
    }

    #[test]
    fn test_near_zero() {
        assert!(near_zero(5e-7));
        assert!(near_zero(-1e-6));
        assert!(!near_zero(2e-6));
    }
}
