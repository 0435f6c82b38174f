// Local serial command channel
//
// Single ASCII keystrokes, no release events:
//   w/a/s/d  forward/left/back/right (either case)
//   space    brake
//   x/X      release all

use serialport::{self, SerialPort};
use std::io::Read;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::SERIAL_TIMEOUT_MS;
use crate::input::{Button, InputEvent};

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SerialError>;

/// Map one byte to an input event. Unrecognised bytes are dropped.
pub fn parse_serial_byte(byte: u8) -> Option<InputEvent> {
    let event = match byte.to_ascii_lowercase() {
        b'w' => InputEvent::SerialPress(Button::Forward),
        b's' => InputEvent::SerialPress(Button::Back),
        b'a' => InputEvent::SerialPress(Button::Left),
        b'd' => InputEvent::SerialPress(Button::Right),
        b' ' => InputEvent::SerialPress(Button::Brake),
        b'x' => InputEvent::SerialReleaseAll,
        _ => return None,
    };
    Some(event)
}

pub struct SerialInput {
    port: Box<dyn SerialPort>,
    buf: Vec<u8>,
}

impl SerialInput {
    pub fn open(port_name: &str, baudrate: u32) -> Result<Self> {
        info!("Opening serial command channel on {} @ {}", port_name, baudrate);
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(SERIAL_TIMEOUT_MS))
            .open()?;
        Ok(Self {
            port,
            buf: Vec::with_capacity(64),
        })
    }

    /// Read whatever is already buffered, never waiting for more
    pub fn poll(&mut self) -> Result<Vec<InputEvent>> {
        let pending = self.port.bytes_to_read()? as usize;
        if pending == 0 {
            return Ok(Vec::new());
        }

        self.buf.resize(pending, 0);
        let n = self.port.read(&mut self.buf)?;
        let bytes = &self.buf[..n];
        debug!("Serial read {} bytes: {:02X?}", n, bytes);

        Ok(bytes.iter().copied().filter_map(parse_serial_byte).collect())
    }
}
