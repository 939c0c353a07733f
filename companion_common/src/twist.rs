//! Differential-drive twist type shared by mode drivers, the safety
//! pipeline, and the Reflex wire codec.

use serde::{Deserialize, Serialize};

/// Linear/angular velocity pair for differential drive.
///
/// `v_mm_s` is forward linear velocity in millimeters per second (negative
/// is reverse). `w_mrad_s` is angular velocity in milliradians per second
/// (positive is counter-clockwise). Both fields mirror the `i16` wire
/// representation used by the Reflex `SET_TWIST` command and `STATE`
/// telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Twist {
    pub v_mm_s: i16,
    pub w_mrad_s: i16,
}

impl Twist {
    /// The zero twist — stationary.
    pub const ZERO: Self = Self {
        v_mm_s: 0,
        w_mrad_s: 0,
    };

    pub const fn new(v_mm_s: i16, w_mrad_s: i16) -> Self {
        Self { v_mm_s, w_mrad_s }
    }

    /// True if both components are zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.v_mm_s == 0 && self.w_mrad_s == 0
    }

    /// Scale both components by `factor`, saturating on the `i16` round
    /// trip. `factor` is expected in `[0.0, 1.0]` but is not clamped here;
    /// callers in the safety pipeline are responsible for only ever
    /// passing down-scaling factors.
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            v_mm_s: scale_i16(self.v_mm_s, factor),
            w_mrad_s: scale_i16(self.w_mrad_s, factor),
        }
    }
}

fn scale_i16(value: i16, factor: f32) -> i16 {
    let scaled = (f32::from(value) * factor).round();
    if scaled >= f32::from(i16::MAX) {
        i16::MAX
    } else if scaled <= f32::from(i16::MIN) {
        i16::MIN
    } else {
        scaled as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_zero() {
        assert!(Twist::ZERO.is_zero());
        assert!(!Twist::new(1, 0).is_zero());
    }

    #[test]
    fn scaled_halves_both_components() {
        let t = Twist::new(300, 200).scaled(0.5);
        assert_eq!(t, Twist::new(150, 100));
    }

    #[test]
    fn scaled_by_zero_is_zero() {
        assert!(Twist::new(300, -200).scaled(0.0).is_zero());
    }

    #[test]
    fn scaled_never_exceeds_desired_magnitude() {
        for factor in [0.0_f32, 0.25, 0.5, 0.75, 1.0] {
            let t = Twist::new(500, -500).scaled(factor);
            assert!(t.v_mm_s.abs() <= 500);
            assert!(t.w_mrad_s.abs() <= 500);
        }
    }
}
