// Keyboard teleop: WASD drive, SPACE brake, X coast, Shift boost, Q quit
//
// Terminals only report presses and auto-repeats, so a key is released
// after RELEASE_AFTER_MS without a repeat (or on a real release event when
// the terminal supports keyboard enhancement).
use crossterm::{
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
        KeyboardEnhancementFlags, PushKeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement},
};
use std::collections::HashMap;
use std::io::stdout;
use std::time::{Duration, Instant};
use tracing::info;

use diffdrive_runtime::config::{TOPIC_CMD_KEY, TOPIC_CMD_PING};
use diffdrive_runtime::messages::KeyCommand;

const RELEASE_AFTER_MS: u64 = 550; // longer than the usual auto-repeat delay
const PING_EVERY: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let keys = session.declare_publisher(TOPIC_CMD_KEY).await?;
    let ping = session.declare_publisher(TOPIC_CMD_PING).await?;

    info!("Controls: WASD=drive, SPACE=brake, X=coast, Shift=boost, Q=quit");

    enable_raw_mode()?;
    let enhanced = supports_keyboard_enhancement().unwrap_or(false);
    if enhanced {
        execute!(
            stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    let result = run_teleop(&keys, &ping).await;
    if enhanced {
        execute!(stdout(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;

    result
}

fn key_name(code: KeyCode) -> Option<&'static str> {
    match code {
        KeyCode::Char('w' | 'W') => Some("w"),
        KeyCode::Char('a' | 'A') => Some("a"),
        KeyCode::Char('s' | 'S') => Some("s"),
        KeyCode::Char('d' | 'D') => Some("d"),
        KeyCode::Char(' ') => Some("SPACE"),
        KeyCode::Char('x' | 'X') => Some("X"),
        _ => None,
    }
}

async fn send(
    publisher: &zenoh::pubsub::Publisher<'_>,
    cmd: &KeyCommand,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    publisher.put(serde_json::to_string(cmd)?).await?;
    Ok(())
}

async fn run_teleop(
    keys: &zenoh::pubsub::Publisher<'_>,
    ping: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Keys currently held down, with their last press/repeat time
    let mut held: HashMap<&'static str, Instant> = HashMap::new();
    let mut shift = false;
    let mut last_ping: Option<Instant> = None;

    loop {
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent {
                code,
                kind,
                modifiers,
                ..
            }) = event::read()?
            {
                if matches!(code, KeyCode::Char('q') | KeyCode::Esc) {
                    break;
                }

                if let Some(name) = key_name(code) {
                    let upper = matches!(code, KeyCode::Char(c) if c.is_ascii_uppercase());
                    shift = upper || modifiers.contains(KeyModifiers::SHIFT);
                    let down = kind != KeyEventKind::Release;
                    if down {
                        held.insert(name, Instant::now());
                    } else {
                        held.remove(name);
                    }
                    send(keys, &KeyCommand::new(name, down, shift)).await?;
                }
            }
        }

        // Release keys that stopped repeating
        let expired: Vec<&'static str> = held
            .iter()
            .filter(|(_, at)| at.elapsed() > Duration::from_millis(RELEASE_AFTER_MS))
            .map(|(name, _)| *name)
            .collect();
        for name in expired {
            held.remove(name);
            send(keys, &KeyCommand::new(name, false, shift)).await?;
        }

        if last_ping.is_none_or(|at| at.elapsed() >= PING_EVERY) {
            ping.put("ping").await?;
            last_ping = Some(Instant::now());
        }
    }

    info!("Quitting, sending coast");
    send(keys, &KeyCommand::new("X", true, false)).await?;
    Ok(())
}
