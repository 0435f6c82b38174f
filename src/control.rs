// Control loop: aggregator -> mixer -> ramp -> bridge, once per tick

use tracing::debug;

use crate::clock::Clock;
use crate::config::DriveConfig;
use crate::drive::{mix, DriveCommand, HBridge, MotorSide, RampConfig};
use crate::input::{ButtonFlags, InputAggregator, InputEvent};
use crate::messages::DutyFrame;
use crate::scheduler::TickScheduler;

/// All mutable control state, owned by the loop
#[derive(Debug, Clone)]
pub struct ControlState {
    pub input: InputAggregator,
    pub left: MotorSide,
    pub right: MotorSide,
}

impl ControlState {
    pub fn new(config: &DriveConfig) -> Self {
        Self {
            input: InputAggregator::new(config.hold_window_ms),
            left: MotorSide::default(),
            right: MotorSide::default(),
        }
    }
}

/// What one tick computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub now_ms: u64,
    pub flags: ButtonFlags,
    pub command: DriveCommand,
    pub left_out: i16,
    pub right_out: i16,
    pub frame: DutyFrame,
}

pub struct ControlLoop<C: Clock> {
    config: DriveConfig,
    ramp: RampConfig,
    bridge: HBridge,
    clock: C,
    scheduler: TickScheduler,
    state: ControlState,
    ticks: u64,
}

impl<C: Clock> ControlLoop<C> {
    pub fn new(config: DriveConfig, clock: C) -> Self {
        let config = config.sanitized();
        Self {
            ramp: RampConfig::from(&config),
            bridge: HBridge {
                left_inverted: config.left_inverted,
                right_inverted: config.right_inverted,
                max_duty: config.max_duty,
            },
            scheduler: TickScheduler::new(config.tick_period_ms),
            state: ControlState::new(&config),
            clock,
            config,
            ticks: 0,
        }
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Feed an adapter event, stamped with the loop clock
    pub fn apply(&mut self, event: InputEvent) {
        let now = self.clock.now_ms();
        self.state.input.apply(event, now);
    }

    /// Run a tick if one is due
    pub fn poll(&mut self) -> Option<TickReport> {
        let now = self.clock.now_ms();
        if self.scheduler.poll(now) {
            Some(self.tick(now))
        } else {
            None
        }
    }

    fn tick(&mut self, now_ms: u64) -> TickReport {
        self.ticks += 1;
        let flags = self.state.input.sample(now_ms);
        let command = mix(&flags, self.config.cruise_duty, self.config.max_duty);
        let left_out = self.state.left.step(command.left_target(), now_ms, &self.ramp);
        let right_out = self.state.right.step(command.right_target(), now_ms, &self.ramp);
        let frame = self.bridge.frame(&command, left_out, right_out);

        debug!(
            "Tick {}: cmd={:?} out=({}, {}) duty={:?}",
            self.ticks,
            command,
            left_out,
            right_out,
            frame.as_array()
        );

        TickReport {
            now_ms,
            flags,
            command,
            left_out,
            right_out,
            frame,
        }
    }
}
