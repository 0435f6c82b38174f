// Differential mixer: button flags -> per-side signs and a speed tier

use crate::input::ButtonFlags;

/// Per-tick drive request. Derived fresh from the flags each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveCommand {
    pub left_sign: i8,
    pub right_sign: i8,
    pub magnitude: u16,
    pub brake_requested: bool,
}

impl DriveCommand {
    /// Both sides asked to rest
    pub fn is_stopped(&self) -> bool {
        self.left_sign == 0 && self.right_sign == 0
    }

    pub fn left_target(&self) -> i16 {
        self.left_sign as i16 * self.magnitude as i16
    }

    pub fn right_target(&self) -> i16 {
        self.right_sign as i16 * self.magnitude as i16
    }
}

fn flag(on: bool) -> i8 {
    if on { 1 } else { 0 }
}

/// Mix the held controls into a drive command.
///
/// `base` drives both sides; `turn` biases them apart. Pure forward/back is
/// straight motion, pure left/right spins in place, and both together pivot
/// around the inner wheel. Turning right speeds up the left side.
pub fn mix(flags: &ButtonFlags, cruise_duty: u16, max_duty: u16) -> DriveCommand {
    let base = flag(flags.forward) - flag(flags.back);
    let turn = flag(flags.right) - flag(flags.left);

    DriveCommand {
        left_sign: (base + turn).clamp(-1, 1),
        right_sign: (base - turn).clamp(-1, 1),
        magnitude: if flags.boost { max_duty } else { cruise_duty },
        brake_requested: flags.brake,
    }
}
