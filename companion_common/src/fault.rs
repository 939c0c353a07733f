//! Fault bitflags reported by the Reflex MCU.
//!
//! Uses the `bitflags` crate for compact bitflag representation, matching
//! the wire-level `faults u16` field in `STATE` telemetry.
//!
//! ESTOP, TILT, BROWNOUT, ENCODER_FAULT, and DISCONNECT are *latching* —
//! once set they persist until an explicit `clear_faults` command is
//! acknowledged. OBSTACLE is *continuous* — recomputed every tick from the
//! current range sample and never latched.

use bitflags::bitflags;

bitflags! {
    /// Fault bits reported by the Reflex MCU, mirrored in supervisor state.
    ///
    /// Any of ESTOP, TILT, BROWNOUT forces the state machine into ERROR.
    /// OBSTACLE never forces a transition; it is consumed entirely by the
    /// safety pipeline's range gate.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FaultSet: u16 {
        /// Emergency stop latched, either by hardware button or command.
        const ESTOP         = 0x0001;
        /// Tilt/fall sensor latched.
        const TILT          = 0x0002;
        /// Battery brownout latched.
        const BROWNOUT      = 0x0004;
        /// Ultrasonic range below the hard-stop threshold this tick.
        const OBSTACLE      = 0x0008;
        /// Wheel encoder fault latched.
        const ENCODER_FAULT = 0x0010;
        /// Logical disconnect: no fresh Reflex telemetry within the stale window.
        const DISCONNECT    = 0x0020;
    }
}

impl FaultSet {
    /// Mask of latching bits that force the state machine into ERROR.
    pub const ERROR_MASK: Self =
        Self::from_bits_truncate(Self::ESTOP.bits() | Self::TILT.bits() | Self::BROWNOUT.bits());

    /// Mask of every fault that is latched rather than recomputed each tick.
    pub const LATCHING_MASK: Self = Self::from_bits_truncate(
        Self::ESTOP.bits()
            | Self::TILT.bits()
            | Self::BROWNOUT.bits()
            | Self::ENCODER_FAULT.bits()
            | Self::DISCONNECT.bits(),
    );

    /// True if any fault in [`Self::ERROR_MASK`] is present.
    #[inline]
    pub const fn forces_error(&self) -> bool {
        self.intersects(Self::ERROR_MASK)
    }

    /// True if this set has no faults other than (possibly) OBSTACLE.
    ///
    /// Used by the state machine's ERROR→IDLE transition, which requires
    /// the fault set to be clear of everything except the continuous
    /// OBSTACLE bit.
    #[inline]
    pub const fn clear_of_latching(&self) -> bool {
        self.intersection(Self::LATCHING_MASK).is_empty()
    }

    /// Replace the continuous OBSTACLE bit for this tick's range sample,
    /// leaving every latching bit untouched.
    #[inline]
    pub fn with_obstacle(self, obstacle: bool) -> Self {
        if obstacle {
            self | Self::OBSTACLE
        } else {
            self & !Self::OBSTACLE
        }
    }

    /// Set or clear DISCONNECT based on current link staleness. Unlike the
    /// other latching bits, DISCONNECT is never reported by the MCU itself
    /// (a disconnected MCU can't report anything) — the supervisor raises
    /// and clears it directly from the age of the last telemetry frame.
    #[inline]
    pub fn with_disconnect(self, disconnected: bool) -> Self {
        if disconnected {
            self | Self::DISCONNECT
        } else {
            self & !Self::DISCONNECT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estop_forces_error() {
        assert!(FaultSet::ESTOP.forces_error());
        assert!(FaultSet::TILT.forces_error());
        assert!(FaultSet::BROWNOUT.forces_error());
        assert!(!FaultSet::OBSTACLE.forces_error());
        assert!(!FaultSet::ENCODER_FAULT.forces_error());
        assert!(!FaultSet::DISCONNECT.forces_error());
    }

    #[test]
    fn obstacle_alone_is_clear_of_latching() {
        let set = FaultSet::empty().with_obstacle(true);
        assert!(set.clear_of_latching());
        assert!(!set.forces_error());
    }

    #[test]
    fn with_obstacle_preserves_latching_bits() {
        let set = FaultSet::ESTOP.with_obstacle(true);
        assert!(set.contains(FaultSet::ESTOP));
        assert!(set.contains(FaultSet::OBSTACLE));
        let cleared = set.with_obstacle(false);
        assert!(cleared.contains(FaultSet::ESTOP));
        assert!(!cleared.contains(FaultSet::OBSTACLE));
    }

    #[test]
    fn default_is_empty() {
        assert_eq!(FaultSet::default(), FaultSet::empty());
    }

    #[test]
    fn with_disconnect_preserves_other_latching_bits() {
        let set = FaultSet::ESTOP.with_disconnect(true);
        assert!(set.contains(FaultSet::ESTOP));
        assert!(set.contains(FaultSet::DISCONNECT));
        assert!(!set.forces_error(), "DISCONNECT alone must not force ERROR directly");
        let cleared = set.with_disconnect(false);
        assert!(cleared.contains(FaultSet::ESTOP));
        assert!(!cleared.contains(FaultSet::DISCONNECT));
    }
}
