//! Terminal colours for rendered output.

use crossterm::style::{style, Color, Stylize};

pub const DEFAULT_GREEN: &str = "2";
pub const DEFAULT_RED: &str = "1";
pub const DEFAULT_GRAY: &str = "8";

/// Colours for passed, failed, and secondary text. `None` prints plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Theme {
    pub green: Option<Color>,
    pub red: Option<Color>,
    pub gray: Option<Color>,
}

impl Theme {
    /// Build from colour strings: an ANSI index (`"2"`) or `#rrggbb`.
    /// Unparseable values fall back to plain text.
    pub fn from_strings(green: &str, red: &str, gray: &str) -> Self {
        Self {
            green: parse_color(green),
            red: parse_color(red),
            gray: parse_color(gray),
        }
    }

    /// No colours at all.
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn green(&self, text: &str) -> String {
        paint(text, self.green)
    }

    pub fn red(&self, text: &str) -> String {
        paint(text, self.red)
    }

    pub fn gray(&self, text: &str) -> String {
        paint(text, self.gray)
    }
}

fn paint(text: &str, color: Option<Color>) -> String {
    match color {
        Some(color) => style(text).with(color).to_string(),
        None => text.to_string(),
    }
}

pub fn parse_color(value: &str) -> Option<Color> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
        let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
        let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;
        return Some(Color::Rgb { r, g, b });
    }
    value.parse::<u8>().ok().map(Color::AnsiValue)
}
