// H-bridge output stage
//
// Truth table per half-bridge pair:
//   A=0, B=0  coast (free-wheel)
//   A=d, B=0  forward
//   A=0, B=d  reverse
//   A=1, B=1  brake (both legs high)

use crate::messages::DutyFrame;

use super::mixer::DriveCommand;

/// State of one half-bridge pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeMode {
    Coast,
    Forward(u16),
    Reverse(u16),
    Brake,
}

impl BridgeMode {
    /// Mode for a signed output on a side that may be wired inverted
    pub fn for_output(output: i16, inverted: bool, max_duty: u16) -> Self {
        if output == 0 {
            return BridgeMode::Coast;
        }
        let duty = output.unsigned_abs().min(max_duty);
        if (output > 0) ^ inverted {
            BridgeMode::Forward(duty)
        } else {
            BridgeMode::Reverse(duty)
        }
    }

    /// (A, B) channel duties
    pub fn channels(self, max_duty: u16) -> (u16, u16) {
        match self {
            BridgeMode::Coast => (0, 0),
            BridgeMode::Forward(duty) => (duty, 0),
            BridgeMode::Reverse(duty) => (0, duty),
            BridgeMode::Brake => (max_duty, max_duty),
        }
    }
}

/// Sink for the four duty-cycle registers
pub trait DutyOutput {
    type Error;

    fn write(&mut self, frame: &DutyFrame) -> Result<(), Self::Error>;
}

/// Maps ramped outputs onto both bridges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HBridge {
    pub left_inverted: bool,
    pub right_inverted: bool,
    pub max_duty: u16,
}

impl HBridge {
    /// Modes for (left, right).
    ///
    /// Coast and brake are decided from the command signs, not the ramped
    /// outputs: once both targets are zero the bridges release (or brake)
    /// immediately while the ramp state winds down on its own. Brake is
    /// ignored while either side is asked to move.
    pub fn modes(&self, command: &DriveCommand, left_out: i16, right_out: i16) -> [BridgeMode; 2] {
        if command.is_stopped() {
            let mode = if command.brake_requested {
                BridgeMode::Brake
            } else {
                BridgeMode::Coast
            };
            return [mode, mode];
        }
        [
            BridgeMode::for_output(left_out, self.left_inverted, self.max_duty),
            BridgeMode::for_output(right_out, self.right_inverted, self.max_duty),
        ]
    }

    pub fn frame(&self, command: &DriveCommand, left_out: i16, right_out: i16) -> DutyFrame {
        let [left, right] = self.modes(command, left_out, right_out);
        let (left_a, left_b) = left.channels(self.max_duty);
        let (right_a, right_b) = right.channels(self.max_duty);
        DutyFrame {
            left_a,
            left_b,
            right_a,
            right_b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u16 = 511;

    fn bridge(left_inverted: bool, right_inverted: bool) -> HBridge {
        HBridge {
            left_inverted,
            right_inverted,
            max_duty: MAX,
        }
    }

    fn moving(left_sign: i8, right_sign: i8, brake: bool) -> DriveCommand {
        DriveCommand {
            left_sign,
            right_sign,
            magnitude: 420,
            brake_requested: brake,
        }
    }

    #[test]
    fn test_stopped_with_brake_drives_all_high() {
        let frame = bridge(false, true).frame(&moving(0, 0, true), 0, 0);
        assert_eq!(
            frame,
            DutyFrame {
                left_a: MAX,
                left_b: MAX,
                right_a: MAX,
                right_b: MAX
            }
        );
    }

    #[test]
    fn test_stopped_without_brake_coasts() {
        let frame = bridge(false, true).frame(&moving(0, 0, false), 0, 0);
        assert_eq!(frame, DutyFrame::coast());
    }

    #[test]
    fn test_stop_coasts_while_ramp_winds_down() {
        let frame = bridge(false, false).frame(&moving(0, 0, false), 300, 300);
        assert_eq!(frame, DutyFrame::coast());
    }

    #[test]
    fn test_forward_not_inverted() {
        assert_eq!(BridgeMode::for_output(200, false, MAX).channels(MAX), (200, 0));
        assert_eq!(BridgeMode::for_output(-200, false, MAX).channels(MAX), (0, 200));
    }

    #[test]
    fn test_double_inversion_cancels() {
        assert_eq!(BridgeMode::for_output(-200, true, MAX).channels(MAX), (200, 0));
        assert_eq!(BridgeMode::for_output(200, true, MAX).channels(MAX), (0, 200));
    }

    #[test]
    fn test_brake_ignored_while_moving() {
        let frame = bridge(false, false).frame(&moving(1, 1, true), 90, 90);
        assert_eq!(
            frame,
            DutyFrame {
                left_a: 90,
                left_b: 0,
                right_a: 90,
                right_b: 0
            }
        );
    }

    #[test]
    fn test_pivot_side_coasts() {
        let modes = bridge(false, true).modes(&moving(1, 0, false), 120, 0);
        assert_eq!(modes, [BridgeMode::Forward(120), BridgeMode::Coast]);
    }

    #[test]
    fn test_duty_clamped_to_range() {
        assert_eq!(BridgeMode::for_output(i16::MIN, false, MAX), BridgeMode::Reverse(MAX));
        assert_eq!(BridgeMode::for_output(900, false, MAX), BridgeMode::Forward(MAX));
    }

    #[test]
    fn test_mirror_mounted_sides_spin_same_way() {
        let frame = bridge(false, true).frame(&moving(1, 1, false), 250, 250);
        assert_eq!((frame.left_a, frame.left_b), (250, 0));
        assert_eq!((frame.right_a, frame.right_b), (0, 250));
    }
}
