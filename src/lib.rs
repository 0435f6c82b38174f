// Differential-drive motion runtime
//
// The control core (input, drive, scheduler, control) is synchronous and
// clock-injected; runtime wires it to zenoh and the serial channel.

pub mod clock;
pub mod config;
pub mod control;
pub mod drive;
pub mod error;
pub mod input;
pub mod messages;
pub mod runtime;
pub mod scheduler;
pub mod serial;
