//! Text rendering on RGBA frames with the embedded DejaVu Sans faces.

use image::{Rgba, RgbaImage, imageops};
use imageproc::drawing::draw_text_mut;
use rusttype::{Font, Scale, point};

use crate::colormap::Color;
use crate::error::{Nc2GifError, Result};

const REGULAR: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
const BOLD: &[u8] = include_bytes!("../assets/DejaVuSans-Bold.ttf");
const OBLIQUE: &[u8] = include_bytes!("../assets/DejaVuSans-Oblique.ttf");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Oblique,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Center,
    Baseline,
    Bottom,
}

/// Size, face and colour of a piece of text. Size is in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub style: FontStyle,
    pub color: Color,
    pub alpha: u8,
}

impl TextStyle {
    pub fn new(size: f32, style: FontStyle, color: Color) -> Self {
        TextStyle {
            size,
            style,
            color,
            alpha: 255,
        }
    }
}

/// Horizontal advance and vertical metrics of a single line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f32,
    /// Distance from baseline up to the top of the line
    pub ascent: f32,
    /// Distance from baseline down to the bottom of the line (positive)
    pub descent: f32,
}

impl TextExtent {
    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

pub struct FontSet {
    regular: Font<'static>,
    bold: Font<'static>,
    oblique: Font<'static>,
}

impl FontSet {
    pub fn load() -> Result<Self> {
        let load = |bytes: &'static [u8], name: &str| {
            Font::try_from_bytes(bytes).ok_or_else(|| Nc2GifError::Render(format!("failed to load font {}", name)))
        };
        Ok(FontSet {
            regular: load(REGULAR, "DejaVuSans")?,
            bold: load(BOLD, "DejaVuSans-Bold")?,
            oblique: load(OBLIQUE, "DejaVuSans-Oblique")?,
        })
    }

    fn font(&self, style: FontStyle) -> &Font<'static> {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Oblique => &self.oblique,
        }
    }

    pub fn measure(&self, text: &str, style: &TextStyle) -> TextExtent {
        let font = self.font(style.style);
        let scale = Scale::uniform(style.size);
        let metrics = font.v_metrics(scale);
        let width = font
            .layout(text, scale, point(0.0, 0.0))
            .last()
            .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0);
        TextExtent {
            width,
            ascent: metrics.ascent,
            descent: -metrics.descent,
        }
    }

    /// Draws one line anchored at `(x, y)`.
    pub fn draw(
        &self,
        img: &mut RgbaImage,
        text: &str,
        x: f32,
        y: f32,
        halign: HAlign,
        valign: VAlign,
        style: &TextStyle,
    ) {
        let extent = self.measure(text, style);
        let left = match halign {
            HAlign::Left => x,
            HAlign::Center => x - extent.width / 2.0,
            HAlign::Right => x - extent.width,
        };
        // draw_text_mut positions the top of the ascent at y
        let top = match valign {
            VAlign::Top => y,
            VAlign::Center => y - extent.height() / 2.0,
            VAlign::Baseline => y - extent.ascent,
            VAlign::Bottom => y - extent.height(),
        };
        let color = blend_over_white(style.color, style.alpha);
        draw_text_mut(
            img,
            color,
            left.round() as i32,
            top.round() as i32,
            Scale::uniform(style.size),
            self.font(style.style),
            text,
        );
    }

    /// Draws text on several lines; the last line's baseline sits at `y`.
    pub fn draw_lines(&self, img: &mut RgbaImage, text: &str, x: f32, y: f32, halign: HAlign, style: &TextStyle) {
        let lines: Vec<&str> = text.lines().collect();
        let line_height = self.measure("Ag", style).height() * 1.2;
        let count = lines.len();
        for (i, line) in lines.into_iter().enumerate() {
            let baseline = y - (count - 1 - i) as f32 * line_height;
            self.draw(img, line, x, baseline, halign, VAlign::Baseline, style);
        }
    }

    /// Draws text rotated 90 degrees counter-clockwise, centred on `(x, y)`.
    pub fn draw_vertical(&self, img: &mut RgbaImage, text: &str, x: f32, y: f32, style: &TextStyle) {
        let extent = self.measure(text, style);
        let width = extent.width.ceil().max(1.0) as u32 + 2;
        let height = extent.height().ceil().max(1.0) as u32 + 2;
        let mut label = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 0]));
        draw_text_mut(
            &mut label,
            style.color.to_rgba(255),
            1,
            1,
            Scale::uniform(style.size),
            self.font(style.style),
            text,
        );
        // Text drawn on a transparent canvas blends its colour channels with zero,
        // so restore them from the alpha coverage
        for pixel in label.pixels_mut() {
            if pixel[3] > 0 {
                *pixel = style.color.to_rgba(pixel[3]);
            }
        }
        let rotated = imageops::rotate270(&label);
        let left = (x - rotated.width() as f32 / 2.0).round() as i64;
        let top = (y - rotated.height() as f32 / 2.0).round() as i64;
        imageops::overlay(img, &rotated, left, top);
    }
}

/// Pre-blends a translucent colour against the white figure background.
fn blend_over_white(color: Color, alpha: u8) -> Rgba<u8> {
    let a = alpha as f32 / 255.0;
    let mix = |c: u8| (c as f32 * a + 255.0 * (1.0 - a)).round() as u8;
    Rgba([mix(color.r), mix(color.g), mix(color.b), 255])
}
