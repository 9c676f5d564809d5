//! Kinematic motion model
//!
//! A motion answers "how far, how fast, how hard" for a look-ahead time `t`
//! measured from its current time origin, without changing anything. The only
//! mutation is [`Motion::commit`], which moves the origin forward once per
//! simulation step.
//!
//! The same enum drives both families: angular motion over `f64` (radians) and
//! linear motion over `DVec2` (world units).

use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::{near_zero, wrap_phase};

/// A kinematic quantity: scalar for rotation, vector for translation
pub trait Quantity:
    Copy + Debug + PartialEq + Add<Output = Self> + Sub<Output = Self> + Mul<f64, Output = Self>
{
    const ZERO: Self;

    /// Absolute size, used for tolerance checks
    fn magnitude(self) -> f64;

    fn is_finite(self) -> bool;
}

impl Quantity for f64 {
    const ZERO: Self = 0.0;

    #[inline]
    fn magnitude(self) -> f64 {
        self.abs()
    }

    #[inline]
    fn is_finite(self) -> bool {
        f64::is_finite(self)
    }
}

impl Quantity for DVec2 {
    const ZERO: Self = DVec2::ZERO;

    #[inline]
    fn magnitude(self) -> f64 {
        self.length()
    }

    #[inline]
    fn is_finite(self) -> bool {
        DVec2::is_finite(self)
    }
}

/// Motion profile shared by the angular and linear families
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Motion<T> {
    /// Never moves
    #[default]
    Static,
    /// Constant acceleration; committing folds the gained speed
    UniformlyAccelerated { speed: T, acceleration: T },
    /// Simple harmonic oscillation around the committed equilibrium
    Harmonic {
        amplitude: T,
        angular_frequency: f64,
        /// Current phase in [0, 2π)
        phase: f64,
    },
}

/// Linear (translational) motion of an entity center
pub type LinearMotion = Motion<DVec2>;

impl<T: Quantity> Motion<T> {
    /// Constant speed, no acceleration
    pub fn uniform(speed: T) -> Self {
        Self::accelerated(speed, T::ZERO)
    }

    pub fn accelerated(speed: T, acceleration: T) -> Self {
        Motion::UniformlyAccelerated {
            speed,
            acceleration,
        }
    }

    /// Harmonic oscillation with the given period (seconds)
    ///
    /// A zero or non-finite period has no angular frequency and is rejected.
    pub fn harmonic(amplitude: T, period: f64, phase: f64) -> Result<Self> {
        if period == 0.0 || !period.is_finite() {
            return Err(SimError::InvalidMotionParameters(format!(
                "harmonic period must be finite and non-zero, got {period}"
            )));
        }
        if !phase.is_finite() {
            return Err(SimError::InvalidMotionParameters(format!(
                "harmonic phase must be finite, got {phase}"
            )));
        }
        Ok(Motion::Harmonic {
            amplitude,
            angular_frequency: std::f64::consts::TAU / period,
            phase: wrap_phase(phase),
        })
    }

    /// Check parameters of a motion that bypassed the constructors
    pub fn validate(&self) -> Result<()> {
        let valid = match *self {
            Motion::Static => true,
            Motion::UniformlyAccelerated {
                speed,
                acceleration,
            } => speed.is_finite() && acceleration.is_finite(),
            Motion::Harmonic {
                amplitude,
                angular_frequency,
                phase,
            } => {
                amplitude.is_finite()
                    && angular_frequency.is_finite()
                    && angular_frequency != 0.0
                    && phase.is_finite()
            }
        };
        if valid {
            Ok(())
        } else {
            Err(SimError::InvalidMotionParameters(format!(
                "non-finite or degenerate motion: {self:?}"
            )))
        }
    }

    /// Displacement accumulated between the time origin and `t`
    pub fn displacement(&self, t: f64) -> T {
        match *self {
            Motion::Static => T::ZERO,
            Motion::UniformlyAccelerated {
                speed,
                acceleration,
            } => speed * t + acceleration * (t * t / 2.0),
            Motion::Harmonic {
                amplitude,
                angular_frequency,
                phase,
            } => amplitude * ((phase + angular_frequency * t).sin() - phase.sin()),
        }
    }

    /// Offset from the oscillation equilibrium at `t` (zero for non-harmonic motions)
    pub fn offset(&self, t: f64) -> T {
        match *self {
            Motion::Harmonic {
                amplitude,
                angular_frequency,
                phase,
            } => amplitude * (phase + angular_frequency * t).sin(),
            _ => T::ZERO,
        }
    }

    pub fn speed(&self, t: f64) -> T {
        match *self {
            Motion::Static => T::ZERO,
            Motion::UniformlyAccelerated {
                speed,
                acceleration,
            } => speed + acceleration * t,
            Motion::Harmonic {
                amplitude,
                angular_frequency,
                phase,
            } => amplitude * (angular_frequency * (phase + angular_frequency * t).cos()),
        }
    }

    pub fn acceleration(&self, t: f64) -> T {
        match *self {
            Motion::Static => T::ZERO,
            Motion::UniformlyAccelerated { acceleration, .. } => acceleration,
            Motion::Harmonic {
                amplitude,
                angular_frequency,
                phase,
            } => {
                amplitude
                    * (-angular_frequency * angular_frequency * (phase + angular_frequency * t).sin())
            }
        }
    }

    /// True when the motion currently produces no movement
    pub fn is_static(&self) -> bool {
        match *self {
            Motion::Static => true,
            Motion::UniformlyAccelerated {
                speed,
                acceleration,
            } => near_zero(speed.magnitude()) && near_zero(acceleration.magnitude()),
            Motion::Harmonic {
                amplitude,
                angular_frequency,
                ..
            } => {
                near_zero(amplitude.magnitude())
                    && near_zero(angular_frequency)
                    && near_zero(self.speed(0.0).magnitude())
            }
        }
    }

    /// Advance the time origin by `t`
    pub fn commit(&mut self, t: f64) {
        match self {
            Motion::Static => {}
            Motion::UniformlyAccelerated {
                speed,
                acceleration,
            } => *speed = *speed + *acceleration * t,
            Motion::Harmonic {
                angular_frequency,
                phase,
                ..
            } => *phase = wrap_phase(*phase + *angular_frequency * t),
        }
    }

    /// Replace the speed at the time origin
    ///
    /// Static and harmonic motions become uniformly accelerated; a harmonic
    /// motion loses its oscillation.
    pub fn set_speed(&mut self, new_speed: T) {
        let acceleration = match *self {
            Motion::UniformlyAccelerated { acceleration, .. } => acceleration,
            _ => T::ZERO,
        };
        *self = Self::accelerated(new_speed, acceleration);
    }

    /// Replace the acceleration at the time origin, keeping the current speed
    pub fn set_acceleration(&mut self, new_acceleration: T) {
        let speed = self.speed(0.0);
        *self = Self::accelerated(speed, new_acceleration);
    }

    /// Oscillation period, if harmonic
    pub fn period(&self) -> Option<f64> {
        match *self {
            Motion::Harmonic {
                angular_frequency, ..
            } if angular_frequency != 0.0 => Some(std::f64::consts::TAU / angular_frequency),
            _ => None,
        }
    }
}

/// Rotation of an entity around a pivot
///
/// The pivot is expressed in the body frame relative to the entity center, so
/// it turns with the body.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AngularMotion {
    #[serde(default)]
    pub pivot: DVec2,
    #[serde(default)]
    pub motion: Motion<f64>,
}

impl AngularMotion {
    pub fn new(pivot: DVec2, motion: Motion<f64>) -> Self {
        Self { pivot, motion }
    }

    /// Rotation around the entity center
    pub fn centered(motion: Motion<f64>) -> Self {
        Self::new(DVec2::ZERO, motion)
    }

    #[inline]
    pub fn displacement(&self, t: f64) -> f64 {
        self.motion.displacement(t)
    }

    #[inline]
    pub fn speed(&self, t: f64) -> f64 {
        self.motion.speed(t)
    }

    #[inline]
    pub fn acceleration(&self, t: f64) -> f64 {
        self.motion.acceleration(t)
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.motion.is_static()
    }

    #[inline]
    pub fn commit(&mut self, t: f64) {
        self.motion.commit(t);
    }

    pub fn set_speed(&mut self, new_speed: f64) {
        self.motion.set_speed(new_speed);
    }

    pub fn set_acceleration(&mut self, new_acceleration: f64) {
        self.motion.set_acceleration(new_acceleration);
    }
}

impl From<Motion<f64>> for AngularMotion {
    fn from(motion: Motion<f64>) -> Self {
        Self::centered(motion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    #[test]
    fn test_validate_rejects_raw_degenerate_motions() {
        assert!(Motion::<f64>::Static.validate().is_ok());
        assert!(Motion::harmonic(1.0, 2.0, 0.0).unwrap().validate().is_ok());
        assert!(Motion::uniform(DVec2::new(3.0, 4.0)).validate().is_ok());

        let bad_frequency = Motion::Harmonic {
            amplitude: 1.0,
            angular_frequency: f64::INFINITY,
            phase: 0.0,
        };
        assert!(matches!(
            bad_frequency.validate(),
            Err(SimError::InvalidMotionParameters(_))
        ));
        let frozen = Motion::Harmonic {
            amplitude: DVec2::X,
            angular_frequency: 0.0,
            phase: 0.0,
        };
        assert!(frozen.validate().is_err());
        assert!(Motion::uniform(DVec2::new(f64::NAN, 0.0)).validate().is_err());
    }

    #[test]
    fn test_uniformly_accelerated() {
        let m = LinearMotion::accelerated(DVec2::new(10.0, 0.0), DVec2::new(0.0, 4.0));
        let d = m.displacement(2.0);
        assert!((d - DVec2::new(20.0, 8.0)).length() < 1e-12);
        assert!((m.speed(2.0) - DVec2::new(10.0, 8.0)).length() < 1e-12);
        assert_eq!(m.acceleration(5.0), DVec2::new(0.0, 4.0));
        assert_eq!(m.displacement(0.0), DVec2::ZERO);
    }

    #[test]
    fn test_static_is_inert() {
        let mut m = Motion::<f64>::Static;
        assert!(m.is_static());
        assert_eq!(m.displacement(10.0), 0.0);
        m.commit(1.0);
        assert_eq!(m, Motion::Static);
    }

    #[test]
    fn test_harmonic_values() {
        // Period 4s: ω = π/2, start at phase 0
        let m = Motion::<f64>::harmonic(2.0, 4.0, 0.0).unwrap();
        assert!((m.displacement(1.0) - 2.0).abs() < 1e-12);
        assert!((m.speed(0.0) - 2.0 * FRAC_PI_2).abs() < 1e-12);
        assert!(m.speed(1.0).abs() < 1e-12);
        assert!((m.acceleration(1.0) + 2.0 * FRAC_PI_2 * FRAC_PI_2).abs() < 1e-12);
        assert_eq!(m.period(), Some(4.0));
    }

    #[test]
    fn test_harmonic_displacement_is_relative() {
        // Starting mid-swing, zero look-ahead means zero displacement
        let m = Motion::<f64>::harmonic(3.0, 2.0, FRAC_PI_2).unwrap();
        assert_eq!(m.displacement(0.0), 0.0);
        assert!((m.offset(0.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_period_rejected() {
        let err = Motion::<f64>::harmonic(1.0, 0.0, 0.0).unwrap_err();
        assert!(matches!(err, SimError::InvalidMotionParameters(_)));
        assert!(LinearMotion::harmonic(DVec2::X, f64::INFINITY, 0.0).is_err());
    }

    #[test]
    fn test_harmonic_commit_wraps_phase() {
        let mut m = Motion::<f64>::harmonic(1.0, 1.0, 0.0).unwrap();
        m.commit(1.25);
        match m {
            Motion::Harmonic { phase, .. } => assert!((phase - FRAC_PI_2).abs() < 1e-9),
            other => panic!("unexpected motion {other:?}"),
        }
    }

    #[test]
    fn test_is_static_tolerance() {
        assert!(Motion::<f64>::uniform(1e-7).is_static());
        assert!(!Motion::<f64>::uniform(1e-3).is_static());
        assert!(
            Motion::Harmonic {
                amplitude: 0.0,
                angular_frequency: 0.0,
                phase: 1.0
            }
            .is_static()
        );
        assert!(!Motion::<f64>::harmonic(1.0, 2.0, 0.0).unwrap().is_static());
    }

    #[test]
    fn test_set_speed_and_acceleration() {
        let mut m = LinearMotion::Static;
        m.set_speed(DVec2::new(5.0, 0.0));
        assert_eq!(m, LinearMotion::uniform(DVec2::new(5.0, 0.0)));

        m.set_acceleration(DVec2::new(0.0, -1.0));
        assert_eq!(
            m,
            LinearMotion::accelerated(DVec2::new(5.0, 0.0), DVec2::new(0.0, -1.0))
        );

        let mut h = Motion::<f64>::harmonic(1.0, 2.0, 0.0).unwrap();
        let speed = h.speed(0.0);
        h.set_acceleration(0.5);
        assert_eq!(h, Motion::accelerated(speed, 0.5));
    }

    #[test]
    fn test_serde_keeps_harmonic_phase() {
        let mut m = Motion::harmonic(DVec2::new(3.0, 1.0), 0.7, 0.0).unwrap();
        m.commit(0.3);
        let json = serde_json::to_string(&m).unwrap();
        let back: LinearMotion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_angular_motion_defaults() {
        let a: AngularMotion = serde_json::from_str("{}").unwrap();
        assert_eq!(a, AngularMotion::default());
        assert!(a.is_static());

        let spin = AngularMotion::from(Motion::<f64>::uniform(PI));
        assert!((spin.displacement(0.5) - PI / 2.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_commit_composes_accelerated(
            v in -500.0f64..500.0, acc in -200.0f64..200.0,
            a in 0.0f64..0.05, b in 0.0f64..0.05,
        ) {
            let start = Motion::accelerated(v, acc);
            let mut split = start;
            let first = split.displacement(a);
            split.commit(a);
            let second = split.displacement(b);
            split.commit(b);

            let mut whole = start;
            let total = whole.displacement(a + b);
            whole.commit(a + b);

            prop_assert!((first + second - total).abs() < 1e-9);
            prop_assert!((split.speed(0.0) - whole.speed(0.0)).abs() < 1e-9);
        }

        #[test]
        fn prop_commit_composes_harmonic(
            amp in -50.0f64..50.0, period in 0.1f64..10.0, phase in 0.0f64..TAU,
            a in 0.0f64..1.0, b in 0.0f64..1.0,
        ) {
            let start = Motion::<f64>::harmonic(amp, period, phase).unwrap();
            let mut split = start;
            let first = split.displacement(a);
            split.commit(a);
            let second = split.displacement(b);
            split.commit(b);

            let total = start.displacement(a + b);
            prop_assert!((first + second - total).abs() < 1e-7);
            prop_assert!((split.speed(0.0) - start.speed(a + b)).abs() < 1e-6);
        }
    }
}
