// Duty monitor: prints duty frames and health published by the runtime
//
// Usage: cargo run --example duty_monitor
use tracing::{info, warn};

use diffdrive_runtime::config::{MAX_DUTY, TOPIC_HEALTH, TOPIC_RT_DUTY};
use diffdrive_runtime::messages::{DutyFrame, HealthReport};

fn describe(a: u16, b: u16) -> String {
    match (a, b) {
        (0, 0) => "coast".to_string(),
        (a, b) if a == MAX_DUTY && b == MAX_DUTY => "BRAKE".to_string(),
        (a, 0) => format!("fwd {:>3}", a),
        (0, b) => format!("rev {:>3}", b),
        (a, b) => format!("?? {}/{}", a, b),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let duty = session.declare_subscriber(TOPIC_RT_DUTY).await?;
    let health = session.declare_subscriber(TOPIC_HEALTH).await?;

    let mut last: Option<DutyFrame> = None;
    loop {
        tokio::select! {
            sample = duty.recv_async() => {
                let sample = sample?;
                match serde_json::from_slice::<DutyFrame>(&sample.payload().to_bytes()) {
                    // Only print changes; the runtime publishes every tick
                    Ok(frame) if last != Some(frame) => {
                        info!(
                            "left: {:<8} right: {:<8} raw={:?}",
                            describe(frame.left_a, frame.left_b),
                            describe(frame.right_a, frame.right_b),
                            frame.as_array()
                        );
                        last = Some(frame);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Bad duty frame: {}", e),
                }
            }
            sample = health.recv_async() => {
                let sample = sample?;
                match serde_json::from_slice::<HealthReport>(&sample.payload().to_bytes()) {
                    Ok(report) => info!("health: {:?}", report),
                    Err(e) => warn!("Bad health report: {}", e),
                }
            }
        }
    }
}
