// Host loop: services zenoh + serial adapters and polls the 50 Hz control tick
// Note: network flags are a snapshot, not a heartbeat. Unless a network timeout
// is configured, a dropped link leaves the robot executing its last command;
// health goes quiet and a warning is logged so this is visible.

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use zenoh::pubsub::Publisher;

// local imports
use crate::clock::{Clock, MonotonicClock};
use crate::config::{
    DriveConfig, HOST_POLL, LINK_QUIET_AFTER_MS, PWM_FREQ_HZ, TOPIC_CMD_KEY, TOPIC_CMD_PING,
    TOPIC_HEALTH, TOPIC_RT_DUTY,
};
use crate::control::ControlLoop;
use crate::drive::DutyOutput;
use crate::error::RuntimeError;
use crate::input::InputEvent;
use crate::messages::{DutyFrame, HealthReport, KeyCommand, LinkHealth};
use crate::serial::SerialInput;

#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port: String,
    pub baud: u32,
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    pub config: DriveConfig,
    pub serial: Option<SerialSettings>,
}

/// Result of checking the network link at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkUpdate {
    pub changed: Option<LinkHealth>,
    pub coast: bool,
}

/// Tracks when the network channel was last heard from
#[derive(Debug, Clone)]
pub struct LinkMonitor {
    quiet_after_ms: u64,
    coast_after_ms: Option<u64>,
    last_seen: Option<u64>,
    health: LinkHealth,
    coasted: bool,
}

impl LinkMonitor {
    pub fn new(quiet_after_ms: u64, coast_after_ms: Option<u64>) -> Self {
        Self {
            quiet_after_ms,
            coast_after_ms,
            last_seen: None,
            health: LinkHealth::NeverSeen,
            coasted: false,
        }
    }

    pub fn health(&self) -> LinkHealth {
        self.health
    }

    /// Any key command or ping counts as a sign of life
    pub fn seen(&mut self, now_ms: u64) {
        self.last_seen = Some(now_ms);
        self.coasted = false;
    }

    pub fn silent_for(&self, now_ms: u64) -> Option<u64> {
        self.last_seen.map(|at| now_ms.saturating_sub(at))
    }

    pub fn evaluate(&mut self, now_ms: u64) -> LinkUpdate {
        let Some(silent) = self.silent_for(now_ms) else {
            return LinkUpdate::default();
        };

        let health = if silent >= self.quiet_after_ms {
            LinkHealth::Quiet
        } else {
            LinkHealth::Ok
        };
        let changed = (health != self.health).then_some(health);
        self.health = health;

        let coast = match self.coast_after_ms {
            Some(limit) if silent >= limit && !self.coasted => {
                self.coasted = true;
                true
            }
            _ => false,
        };

        LinkUpdate { changed, coast }
    }

    pub fn report(&self, now_ms: u64, ticks: u64) -> HealthReport {
        HealthReport {
            link: self.health,
            ticks,
            last_seen_ms_ago: self.silent_for(now_ms),
        }
    }
}

/// Hands duty frames to the publisher task without blocking the host loop.
/// Only the latest frame matters, so a slow publish drops stale frames.
pub struct WatchDutyOutput {
    tx: watch::Sender<DutyFrame>,
}

impl WatchDutyOutput {
    pub fn channel() -> (Self, watch::Receiver<DutyFrame>) {
        let (tx, rx) = watch::channel(DutyFrame::coast());
        (Self { tx }, rx)
    }
}

impl DutyOutput for WatchDutyOutput {
    type Error = RuntimeError;

    fn write(&mut self, frame: &DutyFrame) -> Result<(), RuntimeError> {
        self.tx.send(*frame).map_err(|_| RuntimeError::OutputClosed)
    }
}

async fn put_frame(publisher: &Publisher<'_>, frame: &DutyFrame) {
    match serde_json::to_string(frame) {
        Ok(json) => {
            if let Err(e) = publisher.put(json).await {
                warn!("Failed to publish duty frame: {}", e);
            }
        }
        Err(e) => warn!("Failed to encode duty frame: {}", e),
    }
}

/// Publishes every frame written to the watch channel. Once the sender is
/// gone the last frame (coast on shutdown) is published one more time.
async fn publish_duty(publisher: Publisher<'static>, mut rx: watch::Receiver<DutyFrame>) {
    while rx.changed().await.is_ok() {
        let frame = *rx.borrow_and_update();
        put_frame(&publisher, &frame).await;
    }
    let frame = *rx.borrow();
    put_frame(&publisher, &frame).await;
}

/// Key command sample: refreshes the link and updates the controls
pub fn handle_key_sample<C: Clock>(
    control: &mut ControlLoop<C>,
    link: &mut LinkMonitor,
    payload: &[u8],
) {
    link.seen(control.now_ms());
    let event = KeyCommand::from_payload(payload).and_then(|cmd| {
        debug!("Received key command: {:?}", cmd);
        cmd.to_event()
    });
    match event {
        Ok(Some(event)) => control.apply(event),
        Ok(None) => {}
        Err(e) => warn!("Ignoring key command: {}", e),
    }
}

/// Ping sample: refreshes the link only, controls stay as they are
pub fn handle_ping<C: Clock>(control: &ControlLoop<C>, link: &mut LinkMonitor) {
    link.seen(control.now_ms());
}

pub async fn run(options: RuntimeOptions) -> Result<(), RuntimeError> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let key_sub = session.declare_subscriber(TOPIC_CMD_KEY).await?;
    let ping_sub = session.declare_subscriber(TOPIC_CMD_PING).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;
    let pub_duty = session.declare_publisher(TOPIC_RT_DUTY).await?;

    let mut serial = match &options.serial {
        Some(settings) => Some(SerialInput::open(&settings.port, settings.baud)?),
        None => None,
    };

    let (mut output, duty_rx) = WatchDutyOutput::channel();
    let duty_task = tokio::spawn(publish_duty(pub_duty, duty_rx));

    let mut control = ControlLoop::new(options.config, MonotonicClock::new());
    let mut link = LinkMonitor::new(LINK_QUIET_AFTER_MS, control.config().network_timeout_ms);

    let config = control.config();
    info!(
        "Runtime started: {}ms tick, hold {}ms, ramp {}/tick, kick {}ms @ {}, duty {}..{} @ {}Hz",
        config.tick_period_ms,
        config.hold_window_ms,
        config.ramp_step,
        config.kick_duration_ms,
        config.min_start_magnitude,
        config.cruise_duty,
        config.max_duty,
        PWM_FREQ_HZ
    );
    match config.network_timeout_ms {
        Some(ms) => info!("Network timeout: coast after {}ms of silence", ms),
        None => warn!("No network timeout: last command keeps running if the link drops"),
    }
    info!("Subscribed to: {}, {}", TOPIC_CMD_KEY, TOPIC_CMD_PING);
    info!("Publishing to: {}, {}", TOPIC_RT_DUTY, TOPIC_HEALTH);

    let mut host = interval(HOST_POLL);
    host.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let result: Result<(), RuntimeError> = async {
        loop {
            tokio::select! {
                _ = host.tick() => {}
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    return Ok::<(), RuntimeError>(());
                }
            }

            // 1. Drain network commands (non-blocking)
            while let Ok(Some(sample)) = key_sub.try_recv() {
                let payload = sample.payload().to_bytes();
                handle_key_sample(&mut control, &mut link, &payload);
            }

            let mut pinged = false;
            while let Ok(Some(_)) = ping_sub.try_recv() {
                handle_ping(&control, &mut link);
                pinged = true;
            }

            // 2. Drain serial keystrokes
            if let Some(polled) = serial.as_mut().map(SerialInput::poll) {
                match polled {
                    Ok(events) => events.into_iter().for_each(|e| control.apply(e)),
                    Err(e) => {
                        warn!("Serial channel failed, disabling it: {}", e);
                        serial = None;
                    }
                }
            }

            // 3. Link watch
            let now = control.now_ms();
            let update = link.evaluate(now);
            match update.changed {
                Some(LinkHealth::Quiet) => warn!(
                    "Network link quiet for {}ms",
                    link.silent_for(now).unwrap_or_default()
                ),
                Some(health) => info!("Network link: {:?}", health),
                None => {}
            }
            if update.coast {
                warn!("Network timeout, coasting");
                control.apply(InputEvent::NetworkCoast);
            }
            if pinged || update.changed.is_some() {
                let health_json = serde_json::to_string(&link.report(now, control.ticks()))?;
                pub_health.put(health_json).await?;
            }

            // 4. Control tick, when due
            if let Some(report) = control.poll() {
                output.write(&report.frame)?;
            }
        }
    }
    .await;

    // Release the bridges whatever ended the loop
    if let Err(e) = output.write(&DutyFrame::coast()) {
        warn!("Could not queue coast frame: {}", e);
    }
    drop(output);
    if let Err(e) = duty_task.await {
        warn!("Duty publisher task failed: {}", e);
    }

    match &result {
        Ok(()) => info!("Outputs released, runtime stopped after {} ticks", control.ticks()),
        Err(e) => warn!("Outputs released after error: {}", e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_never_seen_until_first_message() {
        let mut link = LinkMonitor::new(3_000, Some(500));
        assert_eq!(link.evaluate(10_000), LinkUpdate::default());
        assert_eq!(link.health(), LinkHealth::NeverSeen);
    }

    #[test]
    fn test_link_transitions() {
        let mut link = LinkMonitor::new(3_000, None);
        link.seen(100);
        assert_eq!(link.evaluate(100).changed, Some(LinkHealth::Ok));
        assert_eq!(link.evaluate(3_099).changed, None);
        let update = link.evaluate(3_100);
        assert_eq!(update.changed, Some(LinkHealth::Quiet));
        // No timeout configured: silence never coasts
        assert!(!update.coast);
        assert!(!link.evaluate(60_000).coast);

        link.seen(60_000);
        assert_eq!(link.evaluate(60_001).changed, Some(LinkHealth::Ok));
    }

    #[test]
    fn test_timeout_coasts_once_per_silence() {
        let mut link = LinkMonitor::new(3_000, Some(500));
        link.seen(0);
        assert!(!link.evaluate(499).coast);
        assert!(link.evaluate(500).coast);
        assert!(!link.evaluate(520).coast);

        link.seen(1_000);
        assert!(!link.evaluate(1_400).coast);
        assert!(link.evaluate(1_500).coast);
    }

    #[test]
    fn test_report_age() {
        let mut link = LinkMonitor::new(3_000, None);
        assert_eq!(link.report(50, 0).last_seen_ms_ago, None);
        link.seen(50);
        link.evaluate(80);
        let report = link.report(80, 2);
        assert_eq!(report.last_seen_ms_ago, Some(30));
        assert_eq!(report.link, LinkHealth::Ok);
        assert_eq!(report.ticks, 2);
    }

    #[test]
    fn test_ping_leaves_flags_untouched() {
        use crate::clock::ManualClock;

        let clock = ManualClock::new(0);
        let mut control = ControlLoop::new(DriveConfig::default(), &clock);
        let mut link = LinkMonitor::new(3_000, None);
        handle_key_sample(&mut control, &mut link, br#"{"key":"W","down":true,"shift":true}"#);

        clock.advance(2_000);
        let now = clock.now_ms();
        let before = control.state().input.sample(now);
        assert!(before.forward && before.boost);
        assert_eq!(link.silent_for(now), Some(2_000));

        handle_ping(&control, &mut link);
        assert_eq!(control.state().input.sample(now), before);
        assert_eq!(link.silent_for(now), Some(0));
    }

    #[test]
    fn test_key_sample_refreshes_link_even_when_rejected() {
        use crate::clock::ManualClock;
        use crate::input::ButtonFlags;

        let clock = ManualClock::new(500);
        let mut control = ControlLoop::new(DriveConfig::default(), &clock);
        let mut link = LinkMonitor::new(3_000, None);
        handle_key_sample(&mut control, &mut link, br#"{"key":"q","down":true}"#);
        handle_key_sample(&mut control, &mut link, b"garbage");

        assert_eq!(control.state().input.sample(500), ButtonFlags::default());
        assert_eq!(link.silent_for(500), Some(0));
    }

    #[test]
    fn test_watch_output_keeps_latest_frame() {
        let (mut output, mut rx) = WatchDutyOutput::channel();
        assert!(!rx.has_changed().unwrap());

        let forward = DutyFrame {
            left_a: 120,
            left_b: 0,
            right_a: 0,
            right_b: 120,
        };
        output.write(&forward).unwrap();
        output.write(&DutyFrame::coast()).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), DutyFrame::coast());
    }

    #[test]
    fn test_watch_output_reports_closed() {
        let (mut output, rx) = WatchDutyOutput::channel();
        drop(rx);
        assert!(matches!(
            output.write(&DutyFrame::coast()),
            Err(RuntimeError::OutputClosed)
        ));
    }
}
