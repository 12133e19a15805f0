//! Logical key model.
//!
//! Hosts feed keys as strings: either a single char (including raw control
//! chars like `\x1b` or `\r`) or a bracketed name such as `<esc>` or
//! `<left>`. Both spellings normalize to the same `Key`.

/// A single logical key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Esc,
    Enter,
    Backspace,
    Left,
    Right,
    Up,
    Down,
    CtrlR,
}

impl Key {
    /// Parses a host key string. Returns `None` for anything unrecognized.
    pub fn parse(input: &str) -> Option<Self> {
        let mut chars = input.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(match c {
                '\x1b' => Self::Esc,
                '\r' | '\n' => Self::Enter,
                '\x08' | '\x7f' => Self::Backspace,
                '\x12' => Self::CtrlR,
                other => Self::Char(other),
            });
        }
        match input.to_ascii_lowercase().as_str() {
            "<esc>" | "<escape>" => Some(Self::Esc),
            "<cr>" | "<enter>" | "<return>" => Some(Self::Enter),
            "<bs>" | "<backspace>" => Some(Self::Backspace),
            "<left>" => Some(Self::Left),
            "<right>" => Some(Self::Right),
            "<up>" => Some(Self::Up),
            "<down>" => Some(Self::Down),
            "<c-r>" => Some(Self::CtrlR),
            _ => None,
        }
    }

    /// Printable ASCII payload, if this is one.
    pub fn printable(self) -> Option<char> {
        match self {
            Self::Char(c) if (' '..='~').contains(&c) => Some(c),
            _ => None,
        }
    }
}
