// Rate-limited ramp with a startup kick floor
//
// The ramp bounds how far `current` moves per tick. When a side leaves rest
// the kick window opens, and while it is open any small nonzero output is
// lifted to the minimum start magnitude so the motor breaks static friction.
// The kick only touches the value sent to the bridge, never `current`.

use tracing::debug;

use crate::config::DriveConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampConfig {
    pub step: u16,
    pub kick_duration_ms: u64,
    pub min_start_magnitude: u16,
}

impl From<&DriveConfig> for RampConfig {
    fn from(config: &DriveConfig) -> Self {
        Self {
            step: config.ramp_step,
            kick_duration_ms: config.kick_duration_ms,
            min_start_magnitude: config.min_start_magnitude,
        }
    }
}

/// Ramp state for one motor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorSide {
    current: i16,
    kick_until: Option<u64>,
}

impl MotorSide {
    pub fn current(&self) -> i16 {
        self.current
    }

    pub fn kick_until(&self) -> Option<u64> {
        self.kick_until
    }

    /// Advance one tick toward `target`. Returns the output for the bridge.
    pub fn step(&mut self, target: i16, now_ms: u64, config: &RampConfig) -> i16 {
        if self.current == 0 && target != 0 {
            let until = now_ms.saturating_add(config.kick_duration_ms);
            debug!("Kick armed until {}ms (target {})", until, target);
            self.kick_until = Some(until);
        }

        self.current = ramp_toward(self.current, target, config.step);

        match self.kick_until {
            Some(until) if now_ms < until => kick_floor(self.current, config.min_start_magnitude),
            _ => self.current,
        }
    }
}

/// Move `current` toward `target` by at most `step`, never overshooting
pub fn ramp_toward(current: i16, target: i16, step: u16) -> i16 {
    let delta = target as i32 - current as i32;
    let limited = delta.clamp(-(step as i32), step as i32);
    (current as i32 + limited) as i16
}

/// Lift a nonzero magnitude below `min_start` up to it, keeping its sign
pub fn kick_floor(value: i16, min_start: u16) -> i16 {
    let min_start = min_start as i16;
    if value != 0 && value.abs() < min_start {
        value.signum() * min_start
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RampConfig {
        RampConfig {
            step: 30,
            kick_duration_ms: 80,
            min_start_magnitude: 90,
        }
    }

    #[test]
    fn test_ramp_toward_limits_step() {
        assert_eq!(ramp_toward(0, 420, 30), 30);
        assert_eq!(ramp_toward(400, 420, 30), 420);
        assert_eq!(ramp_toward(0, -420, 30), -30);
        assert_eq!(ramp_toward(-10, 0, 30), 0);
        assert_eq!(ramp_toward(420, 420, 30), 420);
    }

    #[test]
    fn test_gap_shrinks_by_exact_step() {
        let targets = [420i16, -511, 0, 17, -420, 511];
        let mut current = 0i16;
        for &target in &targets {
            for _ in 0..40 {
                let gap = (target as i32 - current as i32).abs();
                let next = ramp_toward(current, target, 30);
                let next_gap = (target as i32 - next as i32).abs();
                assert_eq!(gap - next_gap, gap.min(30));
                current = next;
            }
            assert_eq!(current, target);
        }
    }

    #[test]
    fn test_kick_floor_keeps_sign() {
        assert_eq!(kick_floor(30, 90), 90);
        assert_eq!(kick_floor(-30, 90), -90);
        assert_eq!(kick_floor(0, 90), 0);
        assert_eq!(kick_floor(90, 90), 90);
        assert_eq!(kick_floor(-150, 90), -150);
    }

    #[test]
    fn test_kick_applies_only_to_output() {
        let cfg = config();
        let mut side = MotorSide::default();

        let out = side.step(420, 0, &cfg);
        assert_eq!(side.current(), 30);
        assert_eq!(out, 90);
        assert_eq!(side.kick_until(), Some(80));

        let out = side.step(420, 20, &cfg);
        assert_eq!(side.current(), 60);
        assert_eq!(out, 90);

        let out = side.step(420, 40, &cfg);
        assert_eq!(side.current(), 90);
        assert_eq!(out, 90);

        let out = side.step(420, 60, &cfg);
        assert_eq!(out, 120);
    }

    #[test]
    fn test_kick_expires() {
        let cfg = RampConfig {
            step: 10,
            ..config()
        };
        let mut side = MotorSide::default();
        for (i, now) in (0..120).step_by(20).enumerate() {
            let out = side.step(420, now, &cfg);
            let current = side.current();
            assert_eq!(current, 10 * (i as i16 + 1));
            if now < 80 {
                assert_eq!(out, 90, "floored at {}ms", now);
            } else {
                assert_eq!(out, current, "no floor at {}ms", now);
            }
        }
    }

    #[test]
    fn test_kick_not_rearmed_while_moving() {
        let cfg = config();
        let mut side = MotorSide::default();
        side.step(420, 0, &cfg);
        side.step(-420, 200, &cfg);
        assert_eq!(side.kick_until(), Some(80));
    }

    #[test]
    fn test_reversal_through_zero_rearms_kick() {
        let cfg = config();
        let mut side = MotorSide::default();
        side.step(60, 0, &cfg);
        side.step(60, 20, &cfg);
        assert_eq!(side.current(), 60);

        // 60 -> 30 -> 0, then leaving zero toward reverse arms a new window
        side.step(-60, 200, &cfg);
        side.step(-60, 220, &cfg);
        assert_eq!(side.current(), 0);
        let out = side.step(-60, 240, &cfg);
        assert_eq!(side.current(), -30);
        assert_eq!(side.kick_until(), Some(320));
        assert_eq!(out, -90);
    }

    #[test]
    fn test_kick_window_saturates_at_clock_end() {
        let cfg = RampConfig {
            kick_duration_ms: u64::MAX,
            ..config()
        };
        let mut side = MotorSide::default();
        let out = side.step(420, 1_000, &cfg);
        assert_eq!(side.kick_until(), Some(u64::MAX));
        assert_eq!(out, 90);
    }

    #[test]
    fn test_decel_to_rest_inside_window_outputs_zero() {
        let cfg = config();
        let mut side = MotorSide::default();
        side.step(30, 0, &cfg);
        let out = side.step(0, 20, &cfg);
        assert_eq!(side.current(), 0);
        assert_eq!(out, 0);
    }
}
