//! # Colour Scale
//!
//! Sequential "Blues" colormap (the nine ColorBrewer anchors) sampled into a 256-entry
//! lookup table, and the fixed-range [`ColorScale`] that maps rainfall values onto it.
//! Every frame shares one scale, so a value always gets the same colour.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Nc2GifError, Result};

/// Number of discrete colours in a colormap lookup table.
pub const LUT_SIZE: usize = 256;

/// An opaque RGB colour, written `#rrggbb` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const DARK_GREEN: Color = Color::rgb(0, 100, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Parses `#rrggbb` or `rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Color { r, g, b })
    }

    pub fn to_rgba(self, alpha: u8) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, alpha])
    }

    pub fn to_skia(self, alpha: u8) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, alpha)
    }

    fn lerp(self, other: Color, t: f64) -> Color {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8;
        Color {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Color::from_hex(&value).ok_or_else(|| format!("invalid colour '{}', expected #rrggbb", value))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

const BLUES: [&str; 9] = [
    "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c", "#08306b",
];

/// A colormap stored as a lookup table of evenly spaced colours.
#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
    pub name: String,
    lut: Vec<Color>,
}

impl Colormap {
    /// Light-to-dark sequential blues.
    pub fn blues() -> Self {
        let anchors: Vec<Color> = BLUES.iter().filter_map(|hex| Color::from_hex(hex)).collect();
        Self::from_anchors("Blues", &anchors, LUT_SIZE)
    }

    /// Linearly interpolates evenly spaced `anchors` into `levels` table entries.
    pub fn from_anchors(name: &str, anchors: &[Color], levels: usize) -> Self {
        let lut = match anchors {
            [] => vec![Color::BLACK; levels.max(1)],
            [only] => vec![*only; levels.max(1)],
            _ => {
                let levels = levels.max(2);
                let segments = (anchors.len() - 1) as f64;
                (0..levels)
                    .map(|i| {
                        let position = i as f64 / (levels - 1) as f64 * segments;
                        let k = (position.floor() as usize).min(anchors.len() - 2);
                        anchors[k].lerp(anchors[k + 1], position - k as f64)
                    })
                    .collect()
            }
        };
        Colormap {
            name: name.to_string(),
            lut,
        }
    }

    pub fn levels(&self) -> usize {
        self.lut.len()
    }

    /// Colour for a fraction of the range; values outside `[0, 1]` clip to the ends.
    pub fn at(&self, fraction: f64) -> Color {
        let n = self.lut.len();
        let index = if fraction.is_nan() || fraction <= 0.0 {
            0
        } else {
            ((fraction * n as f64) as usize).min(n - 1)
        };
        self.lut[index]
    }
}

/// Fixed `[min, max]` mapping from data values to colours.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
    pub colormap: Colormap,
}

impl ColorScale {
    pub fn new(min: f64, max: f64, colormap: Colormap) -> Result<Self> {
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(Nc2GifError::Configuration(format!(
                "colour range must satisfy min < max, got {}..{}",
                min, max
            )));
        }
        Ok(ColorScale { min, max, colormap })
    }

    /// Position of `value` within the range, clipped to `[0, 1]`.
    pub fn normalize(&self, value: f64) -> f64 {
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    /// Colour for a data value; missing values have none.
    pub fn color(&self, value: f32) -> Option<Color> {
        if value.is_nan() {
            return None;
        }
        Some(self.colormap.at(self.normalize(value as f64)))
    }
}
