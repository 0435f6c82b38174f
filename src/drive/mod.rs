// Drive core for the two-motor differential base
//
// Provides:
// - Differential mixing (button flags -> per-side targets)
// - Ramp and startup kick per motor side
// - H-bridge truth table and duty-frame output

pub mod hbridge;
pub mod mixer;
pub mod ramp;

pub use hbridge::{BridgeMode, DutyOutput, HBridge};
pub use mixer::{mix, DriveCommand};
pub use ramp::{MotorSide, RampConfig};
