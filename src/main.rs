use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use diffdrive_runtime::config::{DriveConfig, SERIAL_BAUD, SERIAL_PORT};
use diffdrive_runtime::error::RuntimeError;
use diffdrive_runtime::runtime::{RuntimeOptions, SerialSettings};

/// Differential-drive motion runtime: key commands in, PWM duty frames out
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Serial port for the local key channel
    #[arg(long, default_value = SERIAL_PORT)]
    serial_port: String,

    /// Serial baud rate
    #[arg(long, default_value_t = SERIAL_BAUD)]
    baud: u32,

    /// Run without the serial key channel
    #[arg(long)]
    no_serial: bool,

    /// JSON file overriding drive tunables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the serial hold window
    #[arg(long)]
    hold_window_ms: Option<u64>,

    /// Coast after this much network silence (off by default)
    #[arg(long)]
    network_timeout_ms: Option<u64>,
}

impl Args {
    fn into_options(self) -> Result<RuntimeOptions, RuntimeError> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading drive config from {}", path.display());
                DriveConfig::from_json_file(path)?
            }
            None => DriveConfig::default(),
        };
        if let Some(ms) = self.hold_window_ms {
            config.hold_window_ms = ms;
        }
        if self.network_timeout_ms.is_some() {
            config.network_timeout_ms = self.network_timeout_ms;
        }

        let serial = (!self.no_serial).then(|| SerialSettings {
            port: self.serial_port,
            baud: self.baud,
        });

        Ok(RuntimeOptions { config, serial })
    }
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let result = match Args::parse().into_options() {
        Ok(options) => diffdrive_runtime::runtime::run(options).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
