//! RGBA colors parsed from CSS-like strings.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Straight (non-premultiplied) 8-bit RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const START_GREEN: Self = Self::rgb(0, 255, 0);
    pub const END_RED: Self = Self::rgb(255, 0, 0);
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Black with the given alpha in `[0, 1]`.
    pub fn black_alpha(alpha: f32) -> Self {
        Self::rgba(0, 0, 0, unit_to_u8(alpha))
    }

    /// Alpha as a fraction in `[0, 1]`.
    pub fn alpha_f32(self) -> f32 {
        f32::from(self.a) / 255.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

fn unit_to_u8(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Error for a color string that could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorParseError(pub Box<str>);

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color {:?}", self.0)
    }
}

impl std::error::Error for ColorParseError {}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let err = || ColorParseError(raw.into());
        let lower = raw.to_ascii_lowercase();
        match lower.as_str() {
            "white" => return Ok(Self::WHITE),
            "black" => return Ok(Self::BLACK),
            "transparent" => return Ok(Self::TRANSPARENT),
            _ => {}
        }
        if let Some(hex) = lower.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(err);
        }
        let (body, has_alpha) = if let Some(body) = lower.strip_prefix("rgba(") {
            (body, true)
        } else if let Some(body) = lower.strip_prefix("rgb(") {
            (body, false)
        } else {
            return Err(err());
        };
        let body = body.strip_suffix(')').ok_or_else(err)?;
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != if has_alpha { 4 } else { 3 } {
            return Err(err());
        }
        let channel = |part: &str| part.parse::<u8>().ok();
        let r = channel(parts[0]).ok_or_else(err)?;
        let g = channel(parts[1]).ok_or_else(err)?;
        let b = channel(parts[2]).ok_or_else(err)?;
        let a = if has_alpha {
            let alpha = parts[3].parse::<f32>().map_err(|_| err())?;
            unit_to_u8(alpha)
        } else {
            255
        };
        Ok(Self::rgba(r, g, b, a))
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Color::rgba(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}
