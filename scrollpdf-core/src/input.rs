use std::collections::{BTreeMap, HashMap};

use tracing::warn;

/// Logical keys the viewer reacts to, independent of any keyboard layout or
/// windowing system code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Digit(u8),
    Char(char),
    Enter,
    Escape,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
}

impl Key {
    /// Translates a classic X11 keycode (evdev offset 8, US layout).
    pub fn from_x11_keycode(code: u8) -> Option<Self> {
        match code {
            10..=18 => Some(Key::Digit(code - 9)),
            19 => Some(Key::Digit(0)),
            9 => Some(Key::Escape),
            24 => Some(Key::Char('q')),
            30 => Some(Key::Char('u')),
            40 => Some(Key::Char('d')),
            36 => Some(Key::Enter),
            110 => Some(Key::Home),
            111 => Some(Key::Up),
            112 => Some(Key::PageUp),
            113 => Some(Key::Left),
            114 => Some(Key::Right),
            115 => Some(Key::End),
            116 => Some(Key::Down),
            117 => Some(Key::PageDown),
            _ => None,
        }
    }

    /// Parses a key name as written in the keymap section of the config file.
    pub fn parse(name: &str) -> Option<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        let key = match lowered.as_str() {
            "enter" | "return" => Key::Enter,
            "esc" | "escape" => Key::Escape,
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            "pageup" | "pgup" => Key::PageUp,
            "pagedown" | "pgdn" => Key::PageDown,
            "home" => Key::Home,
            "end" => Key::End,
            "space" => Key::Char(' '),
            _ => {
                let mut chars = name.trim().chars();
                let c = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                Key::from_char(c)
            }
        };
        Some(key)
    }

    pub fn from_char(c: char) -> Self {
        match c.to_digit(10) {
            Some(digit) => Key::Digit(digit as u8),
            None => Key::Char(c),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    WheelUp,
    WheelDown,
    Other(u8),
}

impl Button {
    /// Translates an X11 pointer button number.
    pub fn from_code(code: u8) -> Self {
        match code {
            4 => Button::WheelUp,
            5 => Button::WheelDown,
            other => Button::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Scrolls by `steps` multiples of the configured scroll step.
    Scroll { steps: i32 },
    ConfirmJump,
    Quit,
}

impl Action {
    /// Parses `quit`, `confirm` or `scroll:<signed steps>`.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        match name {
            "quit" => Some(Action::Quit),
            "confirm" => Some(Action::ConfirmJump),
            _ => {
                let steps = name.strip_prefix("scroll:")?;
                let steps = steps.trim().trim_start_matches('+').parse().ok()?;
                Some(Action::Scroll { steps })
            }
        }
    }
}

/// Outcome of an input callback, used by the windowing side to decide
/// whether to repaint or close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Ignored,
    Redraw,
    Quit,
}

#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: HashMap<Key, Action>,
}

impl Default for Keymap {
    fn default() -> Self {
        let mut keymap = Self {
            bindings: HashMap::new(),
        };
        let scroll = |steps| Action::Scroll { steps };
        for (key, action) in [
            (Key::PageUp, scroll(-3)),
            (Key::Char('u'), scroll(-3)),
            (Key::PageDown, scroll(3)),
            (Key::Char('d'), scroll(3)),
            (Key::Up, scroll(-2)),
            (Key::Home, scroll(-2)),
            (Key::Down, scroll(2)),
            (Key::End, scroll(2)),
            (Key::Left, scroll(-1)),
            (Key::Char('k'), scroll(-1)),
            (Key::Right, scroll(1)),
            (Key::Char('j'), scroll(1)),
            (Key::Enter, Action::ConfirmJump),
            (Key::Escape, Action::Quit),
            (Key::Char('q'), Action::Quit),
        ] {
            keymap.bind(key, action);
        }
        keymap
    }
}

impl Keymap {
    /// Default bindings with `overrides` (key name to action name) applied on top.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut keymap = Self::default();
        for (key_name, action_name) in overrides {
            let Some(key) = Key::parse(key_name) else {
                warn!(key = %key_name, "ignoring binding for unknown key");
                continue;
            };
            if matches!(key, Key::Digit(_)) {
                warn!(key = %key_name, "digit keys are reserved for page entry");
                continue;
            }
            if action_name.trim() == "none" {
                keymap.bindings.remove(&key);
                continue;
            }
            match Action::parse(action_name) {
                Some(action) => keymap.bind(key, action),
                None => warn!(key = %key_name, action = %action_name, "ignoring unknown action"),
            }
        }
        keymap
    }

    pub fn bind(&mut self, key: Key, action: Action) {
        self.bindings.insert(key, action);
    }

    pub fn action(&self, key: Key) -> Option<Action> {
        self.bindings.get(&key).copied()
    }
}
