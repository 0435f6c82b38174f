// Input aggregation: network + serial key events -> logical button flags
//
// Network events carry explicit press/release and are held exactly as given.
// Serial events only carry a press time and stay held for the hold window.

use tracing::debug;

/// Directional and brake controls shared by both channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Forward,
    Back,
    Left,
    Right,
    Brake,
}

impl Button {
    pub const ALL: [Button; 5] = [
        Button::Forward,
        Button::Back,
        Button::Left,
        Button::Right,
        Button::Brake,
    ];

    fn index(self) -> usize {
        match self {
            Button::Forward => 0,
            Button::Back => 1,
            Button::Left => 2,
            Button::Right => 3,
            Button::Brake => 4,
        }
    }
}

/// One update from an I/O adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Network key press/release; `boost` is the shift state sent with it
    Network {
        button: Button,
        down: bool,
        boost: bool,
    },
    /// Network coast: clears every control, boost included
    NetworkCoast,
    /// Serial keystroke, held for the hold window
    SerialPress(Button),
    /// Serial release-all (`x`)
    SerialReleaseAll,
}

/// Logically held controls at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonFlags {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub brake: bool,
    pub boost: bool,
}

impl ButtonFlags {
    fn set(&mut self, button: Button, pressed: bool) {
        match button {
            Button::Forward => self.forward = pressed,
            Button::Back => self.back = pressed,
            Button::Left => self.left = pressed,
            Button::Right => self.right = pressed,
            Button::Brake => self.brake = pressed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InputAggregator {
    hold_window_ms: u64,
    network: [bool; 5],
    serial_pressed_at: [Option<u64>; 5],
    boost: bool,
}

impl InputAggregator {
    pub fn new(hold_window_ms: u64) -> Self {
        Self {
            hold_window_ms,
            network: [false; 5],
            serial_pressed_at: [None; 5],
            boost: false,
        }
    }

    pub fn apply(&mut self, event: InputEvent, now_ms: u64) {
        debug!("Input event at {}ms: {:?}", now_ms, event);
        match event {
            InputEvent::Network {
                button,
                down,
                boost,
            } => {
                self.network[button.index()] = down;
                self.boost = boost;
            }
            InputEvent::NetworkCoast => {
                self.clear_directions();
                self.boost = false;
            }
            InputEvent::SerialPress(button) => {
                self.serial_pressed_at[button.index()] = Some(now_ms);
            }
            InputEvent::SerialReleaseAll => self.clear_directions(),
        }
    }

    /// Drop forward/back/left/right/brake from both channels
    fn clear_directions(&mut self) {
        self.network = [false; 5];
        self.serial_pressed_at = [None; 5];
    }

    fn serial_held(&self, button: Button, now_ms: u64) -> bool {
        match self.serial_pressed_at[button.index()] {
            Some(at) => now_ms.saturating_sub(at) < self.hold_window_ms,
            None => false,
        }
    }

    /// Flags held at `now_ms`. Does not mutate; expired serial presses simply
    /// stop counting.
    pub fn sample(&self, now_ms: u64) -> ButtonFlags {
        let mut flags = ButtonFlags {
            boost: self.boost,
            ..ButtonFlags::default()
        };
        for button in Button::ALL {
            let held = self.network[button.index()] || self.serial_held(button, now_ms);
            flags.set(button, held);
        }
        flags
    }
}
