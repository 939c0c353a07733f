//! WANDER mode driver (§4.2): forward motion with a gentle periodic drift
//! curve. Obstacle avoidance is not this module's job — it relies entirely
//! on the next-tick safety pipeline's range/vision gates to attenuate the
//! desired twist it produces here.

use companion_common::twist::Twist;

use crate::config::WanderConfig;

/// Deterministic drift/avoid policy. Holds only a tick counter, so it
/// reproduces the same curve for the same elapsed tick count regardless of
/// when WANDER mode was entered.
#[derive(Debug, Clone, Default)]
pub struct WanderSkill {
    tick: u32,
}

impl WanderSkill {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the drift phase. Called on every TELEOP/IDLE → WANDER entry so
    /// a re-entry always starts at the same point in the curve.
    pub fn reset(&mut self) {
        self.tick = 0;
    }

    /// Compute this tick's desired twist and advance the phase counter.
    pub fn step(&mut self, config: &WanderConfig) -> Twist {
        let phase = self.tick % config.curve_period_ticks;
        let half = config.curve_period_ticks / 2;
        // Triangle wave over [-curve_w_mrad_s, +curve_w_mrad_s], one full
        // left-right sweep per `curve_period_ticks`.
        let w = if phase < half {
            triangle_up(phase, half, config.curve_w_mrad_s)
        } else {
            triangle_up(phase - half, half, config.curve_w_mrad_s).saturating_neg()
        };

        self.tick = self.tick.wrapping_add(1);
        Twist::new(config.forward_v_mm_s, w)
    }
}

fn triangle_up(phase: u32, half: u32, peak: i16) -> i16 {
    if half == 0 {
        return 0;
    }
    let quarter = half / 2;
    if quarter == 0 {
        return 0;
    }
    let ramp = if phase < quarter {
        phase
    } else {
        half.saturating_sub(phase)
    };
    ((ramp as i64 * peak as i64) / quarter as i64) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WanderConfig {
        WanderConfig {
            forward_v_mm_s: 120,
            curve_w_mrad_s: 150,
            curve_period_ticks: 200,
        }
    }

    #[test]
    fn always_drives_forward_at_configured_speed() {
        let mut skill = WanderSkill::new();
        let config = config();
        for _ in 0..500 {
            let twist = skill.step(&config);
            assert_eq!(twist.v_mm_s, config.forward_v_mm_s);
        }
    }

    #[test]
    fn angular_velocity_stays_within_configured_peak() {
        let mut skill = WanderSkill::new();
        let config = config();
        for _ in 0..1000 {
            let twist = skill.step(&config);
            assert!(twist.w_mrad_s.abs() <= config.curve_w_mrad_s);
        }
    }

    #[test]
    fn reset_restarts_the_phase() {
        let mut skill = WanderSkill::new();
        let config = config();
        let first_cycle: Vec<_> = (0..config.curve_period_ticks)
            .map(|_| skill.step(&config))
            .collect();
        skill.reset();
        let second_cycle: Vec<_> = (0..config.curve_period_ticks)
            .map(|_| skill.step(&config))
            .collect();
        assert_eq!(first_cycle, second_cycle);
    }

    #[test]
    fn curve_crosses_zero_each_period() {
        let mut skill = WanderSkill::new();
        let config = config();
        let mut saw_near_zero = false;
        for _ in 0..config.curve_period_ticks {
            let twist = skill.step(&config);
            if twist.w_mrad_s.abs() < 5 {
                saw_near_zero = true;
            }
        }
        assert!(saw_near_zero);
    }
}
