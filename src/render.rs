//! # Frame Renderer
//!
//! Draws one time step as a complete figure: the pseudocolour raster on the lon/lat mesh,
//! dashed grid lines, the boundary outlines on top, axis ticks and labels, a horizontal
//! colour bar, the persistent title block and the per-frame date label.
//!
//! Geometry is drawn with tiny-skia; the finished pixmap is converted to an
//! [`RgbaImage`] and text is laid over it with rusttype. Everything that does not depend
//! on the time step (layout, pixel-to-cell lookup, boundary paths, clip mask) is
//! computed once in [`FrameRenderer::new`].

use image::{Rgba, RgbaImage};
use log::debug;
use tiny_skia::{
    FillRule, LineCap, Mask, Paint, Path, PathBuilder, Pixmap, PremultipliedColorU8, Rect, Stroke, StrokeDash,
    Transform,
};

use crate::boundary::BoundaryDataset;
use crate::colormap::{Color, ColorScale, Colormap};
use crate::error::{Nc2GifError, Result};
use crate::input::{Extent, RenderConfig};
use crate::mesh::Mesh;
use crate::text::{FontSet, FontStyle, HAlign, TextStyle, VAlign};
use crate::timeaxis::CfDateTime;

/// Axes position as figure fractions `[left, bottom, width, height]`.
pub const AXES_RECT: [f32; 4] = [0.08, 0.15, 0.85, 0.72];
/// Colour bar position as figure fractions `[left, bottom, width, height]`.
pub const COLORBAR_RECT: [f32; 4] = [0.15, 0.08, 0.70, 0.03];

const TITLE_Y: f32 = 0.96;
const ATTRIBUTION_Y: f32 = 0.91;
const CAPTION_Y: f32 = 0.87;
/// Date label anchor in axes fractions (bottom centre of the text)
const DATE_ANCHOR: (f32, f32) = (0.7, 0.9);

// Sizes in points
const TITLE_PT: f32 = 18.0;
const ATTRIBUTION_PT: f32 = 11.0;
const CAPTION_PT: f32 = 12.0;
const DATE_PT: f32 = 14.0;
const AXIS_LABEL_PT: f32 = 10.0;
const TICK_LABEL_PT: f32 = 9.0;
const TICK_LENGTH_PT: f32 = 3.5;
const TICK_PAD_PT: f32 = 3.5;
const LABEL_PAD_PT: f32 = 4.0;
const LINE_PT: f32 = 0.8;

const GRID_COLOR: Color = Color::rgb(0xb0, 0xb0, 0xb0);
const GRID_ALPHA: u8 = 77;
const BOX_ALPHA: u8 = 204;
const ATTRIBUTION_ALPHA: u8 = 179;
const MAX_TICKS: usize = 8;

/// An axis-aligned pixel rectangle, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl PixelRect {
    /// Converts a matplotlib-style `[left, bottom, width, height]` figure fraction.
    pub fn from_fraction(fraction: [f32; 4], width: u32, height: u32) -> Self {
        let [l, b, w, h] = fraction;
        let (width, height) = (width as f32, height as f32);
        PixelRect {
            left: l * width,
            top: (1.0 - (b + h)) * height,
            right: (l + w) * width,
            bottom: (1.0 - b) * height,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    fn to_skia(self) -> Option<Rect> {
        Rect::from_ltrb(self.left, self.top, self.right, self.bottom)
    }

    /// Whole pixel columns covered by the rectangle.
    fn columns(&self) -> std::ops::Range<u32> {
        self.left.round().max(0.0) as u32..self.right.round().max(0.0) as u32
    }

    fn rows(&self) -> std::ops::Range<u32> {
        self.top.round().max(0.0) as u32..self.bottom.round().max(0.0) as u32
    }
}

/// Pixel geometry of the figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureLayout {
    pub width: u32,
    pub height: u32,
    pub axes: PixelRect,
    pub colorbar: PixelRect,
    /// Pixels per point
    pub pt: f32,
}

impl FigureLayout {
    pub fn new(config: &RenderConfig) -> Self {
        let (width, height) = config.figure.pixel_size();
        FigureLayout {
            width,
            height,
            axes: PixelRect::from_fraction(AXES_RECT, width, height),
            colorbar: PixelRect::from_fraction(COLORBAR_RECT, width, height),
            pt: config.figure.px_per_pt(),
        }
    }
}

/// Maps longitude/latitude to pixels inside the axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxesTransform {
    pub extent: Extent,
    pub rect: PixelRect,
}

impl AxesTransform {
    pub fn to_pixel(&self, lon: f64, lat: f64) -> (f32, f32) {
        let e = &self.extent;
        let fx = (lon - e.lon_min) / (e.lon_max - e.lon_min);
        let fy = (lat - e.lat_min) / (e.lat_max - e.lat_min);
        (
            self.rect.left + (fx as f32) * self.rect.width(),
            self.rect.bottom - (fy as f32) * self.rect.height(),
        )
    }

    pub fn to_geo(&self, x: f32, y: f32) -> (f64, f64) {
        let e = &self.extent;
        let fx = ((x - self.rect.left) / self.rect.width()) as f64;
        let fy = ((self.rect.bottom - y) / self.rect.height()) as f64;
        (
            e.lon_min + fx * (e.lon_max - e.lon_min),
            e.lat_min + fy * (e.lat_max - e.lat_min),
        )
    }
}

/// Round tick positions covering `[min, max]`, at most `max_ticks + 1` of them.
///
/// Steps are 1, 2, 2.5 or 5 times a power of ten.
pub fn nice_ticks(min: f64, max: f64, max_ticks: usize) -> Vec<f64> {
    if !(min.is_finite() && max.is_finite() && min < max) || max_ticks == 0 {
        return Vec::new();
    }
    let raw = (max - min) / max_ticks as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 2.5, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|step| *step >= raw * (1.0 - 1e-9))
        .unwrap_or(10.0 * magnitude);

    let eps = step * 1e-9;
    let first = (min / step - 1e-9).ceil() as i64;
    let last = (max / step + 1e-9).floor() as i64;
    (first..=last)
        .map(|k| k as f64 * step)
        .filter(|v| *v >= min - eps && *v <= max + eps)
        .map(|v| if v.abs() < eps { 0.0 } else { v })
        .collect()
}

/// Tick label text: integers without a decimal point, others trimmed.
pub fn format_tick(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        let text = format!("{:.3}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Renders frames for one dataset. Reuse one renderer for every time step.
pub struct FrameRenderer {
    config: RenderConfig,
    layout: FigureLayout,
    transform: AxesTransform,
    scale: ColorScale,
    fonts: FontSet,
    mesh_shape: (usize, usize),
    /// Mesh column for every pixel column of the axes, `None` outside the grid
    column_cells: Vec<Option<usize>>,
    row_cells: Vec<Option<usize>>,
    boundaries: Vec<Path>,
    axes_clip: Mask,
    lon_ticks: Vec<f64>,
    lat_ticks: Vec<f64>,
    color_ticks: Vec<f64>,
}

impl FrameRenderer {
    /// Prepares everything that stays constant across frames.
    pub fn new(config: &RenderConfig, mesh: &Mesh, boundaries: &BoundaryDataset) -> Result<Self> {
        let layout = FigureLayout::new(config);
        let transform = AxesTransform {
            extent: config.extent,
            rect: layout.axes,
        };
        let scale = ColorScale::new(config.color_range.min, config.color_range.max, Colormap::blues())?;
        let fonts = FontSet::load()?;

        let column_cells = layout
            .axes
            .columns()
            .map(|x| mesh.lon_cell(transform.to_geo(x as f32 + 0.5, layout.axes.top).0))
            .collect();
        let row_cells = layout
            .axes
            .rows()
            .map(|y| mesh.lat_cell(transform.to_geo(layout.axes.left, y as f32 + 0.5).1))
            .collect();

        let boundary_paths: Vec<Path> = boundaries
            .features
            .iter()
            .flat_map(|feature| feature.parts.iter().map(move |part| (part, feature.closed)))
            .filter_map(|(part, closed)| {
                let mut pb = PathBuilder::new();
                let mut points = part.iter().map(|&(lon, lat)| transform.to_pixel(lon, lat));
                let (x, y) = points.next()?;
                pb.move_to(x, y);
                for (x, y) in points {
                    pb.line_to(x, y);
                }
                if closed {
                    pb.close();
                }
                pb.finish()
            })
            .collect();

        let mut axes_clip = Mask::new(layout.width, layout.height)
            .ok_or_else(|| Nc2GifError::Render("invalid figure size".to_string()))?;
        let axes_rect = layout
            .axes
            .to_skia()
            .ok_or_else(|| Nc2GifError::Render("degenerate axes rectangle".to_string()))?;
        axes_clip.fill_path(&PathBuilder::from_rect(axes_rect), FillRule::Winding, false, Transform::identity());

        let extent = transform.extent;
        debug!(
            "Figure {}x{} px, axes {:.0}x{:.0} px, {} boundary paths",
            layout.width,
            layout.height,
            layout.axes.width(),
            layout.axes.height(),
            boundary_paths.len()
        );

        Ok(FrameRenderer {
            config: config.clone(),
            layout,
            transform,
            scale,
            fonts,
            mesh_shape: mesh.shape(),
            column_cells,
            row_cells,
            boundaries: boundary_paths,
            axes_clip,
            lon_ticks: nice_ticks(extent.lon_min, extent.lon_max, MAX_TICKS),
            lat_ticks: nice_ticks(extent.lat_min, extent.lat_max, MAX_TICKS),
            color_ticks: nice_ticks(config.color_range.min, config.color_range.max, MAX_TICKS),
        })
    }

    pub fn layout(&self) -> &FigureLayout {
        &self.layout
    }

    pub fn transform(&self) -> &AxesTransform {
        &self.transform
    }

    pub fn color_scale(&self) -> &ColorScale {
        &self.scale
    }

    /// Renders one time step.
    ///
    /// # Arguments
    ///
    /// * `values` - The `[lat][lon]` slice for this step
    /// * `timestamp` - Decoded time of the step, shown in the date label
    pub fn render(&self, values: &[f32], timestamp: &CfDateTime) -> Result<RgbaImage> {
        let (rows, cols) = self.mesh_shape;
        if values.len() != rows * cols {
            return Err(Nc2GifError::ShapeMismatch(format!(
                "frame has {} values but the mesh is {} x {}",
                values.len(),
                rows,
                cols
            )));
        }

        let mut pixmap = Pixmap::new(self.layout.width, self.layout.height)
            .ok_or_else(|| Nc2GifError::Render("invalid figure size".to_string()))?;
        pixmap.fill(tiny_skia::Color::WHITE);

        self.paint_mesh(&mut pixmap, values);
        if self.config.grid_lines {
            self.stroke_grid(&mut pixmap);
        }
        self.stroke_boundaries(&mut pixmap);
        self.stroke_axes_frame(&mut pixmap);
        self.paint_colorbar(&mut pixmap);

        let date = timestamp.format(&self.config.date_format);
        let date_style = TextStyle::new(DATE_PT * self.layout.pt, FontStyle::Bold, Color::BLACK);
        let date_extent = self.fonts.measure(&date, &date_style);
        let anchor = self.date_anchor();
        let text_rect = PixelRect {
            left: anchor.0 - date_extent.width / 2.0,
            top: anchor.1 - date_extent.height(),
            right: anchor.0 + date_extent.width / 2.0,
            bottom: anchor.1,
        };
        self.paint_label_box(&mut pixmap, text_rect, 0.3 * date_style.size);

        let mut img = pixmap_to_image(&pixmap);
        self.draw_static_text(&mut img);
        self.fonts
            .draw(&mut img, &date, anchor.0, anchor.1, HAlign::Center, VAlign::Bottom, &date_style);
        Ok(img)
    }

    fn date_anchor(&self) -> (f32, f32) {
        let axes = self.layout.axes;
        (
            axes.left + DATE_ANCHOR.0 * axes.width(),
            axes.bottom - DATE_ANCHOR.1 * axes.height(),
        )
    }

    fn paint_mesh(&self, pixmap: &mut Pixmap, values: &[f32]) {
        let cols = self.mesh_shape.1;
        let cell_colors: Vec<Option<PremultipliedColorU8>> = values
            .iter()
            .map(|&v| {
                self.scale
                    .color(v)
                    .and_then(|c| PremultipliedColorU8::from_rgba(c.r, c.g, c.b, 255))
            })
            .collect();

        let width = self.layout.width as usize;
        let x0 = self.layout.axes.columns().start as usize;
        let y0 = self.layout.axes.rows().start as usize;
        let pixels = pixmap.pixels_mut();
        for (dy, row) in self.row_cells.iter().enumerate() {
            let Some(i) = row else { continue };
            let line = (y0 + dy) * width;
            for (dx, column) in self.column_cells.iter().enumerate() {
                let Some(j) = column else { continue };
                if let Some(color) = cell_colors[i * cols + j]
                    && let Some(pixel) = pixels.get_mut(line + x0 + dx)
                {
                    *pixel = color;
                }
            }
        }
    }

    fn stroke_grid(&self, pixmap: &mut Pixmap) {
        let axes = self.layout.axes;
        let width = LINE_PT * self.layout.pt;
        let mut pb = PathBuilder::new();
        for &lon in &self.lon_ticks {
            let (x, _) = self.transform.to_pixel(lon, self.transform.extent.lat_min);
            pb.move_to(x, axes.top);
            pb.line_to(x, axes.bottom);
        }
        for &lat in &self.lat_ticks {
            let (_, y) = self.transform.to_pixel(self.transform.extent.lon_min, lat);
            pb.move_to(axes.left, y);
            pb.line_to(axes.right, y);
        }
        let Some(path) = pb.finish() else { return };

        let stroke = Stroke {
            width,
            dash: StrokeDash::new(vec![3.7 * width, 1.6 * width], 0.0),
            ..Stroke::default()
        };
        pixmap.stroke_path(
            &path,
            &solid_paint(GRID_COLOR, GRID_ALPHA),
            &stroke,
            Transform::identity(),
            Some(&self.axes_clip),
        );
    }

    fn stroke_boundaries(&self, pixmap: &mut Pixmap) {
        let stroke = Stroke {
            width: self.config.boundary_width_pt * self.layout.pt,
            line_cap: LineCap::Round,
            line_join: tiny_skia::LineJoin::Round,
            ..Stroke::default()
        };
        let paint = solid_paint(self.config.boundary_color, 255);
        for boundary in &self.boundaries {
            pixmap.stroke_path(
                boundary,
                &paint,
                &stroke,
                Transform::identity(),
                Some(&self.axes_clip),
            );
        }
    }

    fn stroke_axes_frame(&self, pixmap: &mut Pixmap) {
        let pt = self.layout.pt;
        let axes = self.layout.axes;
        let stroke = Stroke {
            width: LINE_PT * pt,
            ..Stroke::default()
        };
        let paint = solid_paint(Color::BLACK, 255);
        if let Some(rect) = axes.to_skia() {
            pixmap.stroke_path(&PathBuilder::from_rect(rect), &paint, &stroke, Transform::identity(), None);
        }

        let tick = TICK_LENGTH_PT * pt;
        let mut pb = PathBuilder::new();
        for &lon in &self.lon_ticks {
            let (x, _) = self.transform.to_pixel(lon, self.transform.extent.lat_min);
            pb.move_to(x, axes.bottom);
            pb.line_to(x, axes.bottom + tick);
        }
        for &lat in &self.lat_ticks {
            let (_, y) = self.transform.to_pixel(self.transform.extent.lon_min, lat);
            pb.move_to(axes.left, y);
            pb.line_to(axes.left - tick, y);
        }
        if let Some(path) = pb.finish() {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }

    fn paint_colorbar(&self, pixmap: &mut Pixmap) {
        let bar = self.layout.colorbar;
        let width = self.layout.width as usize;
        let columns = bar.columns();
        let span = (columns.end - columns.start).max(1) as f64;
        let pixels = pixmap.pixels_mut();
        for x in columns.clone() {
            let fraction = (x - columns.start) as f64 / span;
            let c = self.scale.colormap.at(fraction);
            let Some(color) = PremultipliedColorU8::from_rgba(c.r, c.g, c.b, 255) else {
                continue;
            };
            for y in bar.rows() {
                if let Some(pixel) = pixels.get_mut(y as usize * width + x as usize) {
                    *pixel = color;
                }
            }
        }

        let pt = self.layout.pt;
        let stroke = Stroke {
            width: LINE_PT * pt,
            ..Stroke::default()
        };
        let paint = solid_paint(Color::BLACK, 255);
        if let Some(rect) = bar.to_skia() {
            pixmap.stroke_path(&PathBuilder::from_rect(rect), &paint, &stroke, Transform::identity(), None);
        }
        let mut pb = PathBuilder::new();
        for &value in &self.color_ticks {
            let x = self.colorbar_x(value);
            pb.move_to(x, bar.bottom);
            pb.line_to(x, bar.bottom + TICK_LENGTH_PT * pt);
        }
        if let Some(path) = pb.finish() {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }

    fn colorbar_x(&self, value: f64) -> f32 {
        let bar = self.layout.colorbar;
        bar.left + self.scale.normalize(value) as f32 * bar.width()
    }

    /// White rounded box with a gray edge around `text`, padded by `pad` pixels.
    fn paint_label_box(&self, pixmap: &mut Pixmap, text: PixelRect, pad: f32) {
        let rect = PixelRect {
            left: text.left - pad,
            top: text.top - pad,
            right: text.right + pad,
            bottom: text.bottom + pad,
        };
        let Some(path) = rounded_rect(rect, pad) else { return };
        pixmap.fill_path(
            &path,
            &solid_paint(Color::WHITE, BOX_ALPHA),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
        let stroke = Stroke {
            width: LINE_PT * self.layout.pt,
            ..Stroke::default()
        };
        pixmap.stroke_path(
            &path,
            &solid_paint(Color::GRAY, BOX_ALPHA),
            &stroke,
            Transform::identity(),
            None,
        );
    }

    fn draw_static_text(&self, img: &mut RgbaImage) {
        let pt = self.layout.pt;
        let fig_w = self.layout.width as f32;
        let fig_h = self.layout.height as f32;
        let center = fig_w / 2.0;
        let axes = self.layout.axes;
        let bar = self.layout.colorbar;
        let fonts = &self.fonts;

        if !self.config.title.is_empty() {
            let style = TextStyle::new(TITLE_PT * pt, FontStyle::Bold, Color::BLACK);
            let y = (1.0 - TITLE_Y) * fig_h;
            fonts.draw(img, &self.config.title, center, y, HAlign::Center, VAlign::Top, &style);
        }
        if !self.config.attribution.is_empty() {
            let mut style = TextStyle::new(ATTRIBUTION_PT * pt, FontStyle::Oblique, Color::BLACK);
            style.alpha = ATTRIBUTION_ALPHA;
            let y = (1.0 - ATTRIBUTION_Y) * fig_h;
            fonts.draw_lines(img, &self.config.attribution, center, y, HAlign::Center, &style);
        }
        if !self.config.caption.is_empty() {
            let style = TextStyle::new(CAPTION_PT * pt, FontStyle::Regular, self.config.caption_color);
            let y = (1.0 - CAPTION_Y) * fig_h;
            fonts.draw_lines(img, &self.config.caption, center, y, HAlign::Center, &style);
        }

        let tick_style = TextStyle::new(TICK_LABEL_PT * pt, FontStyle::Regular, Color::BLACK);
        let label_style = TextStyle::new(AXIS_LABEL_PT * pt, FontStyle::Regular, Color::BLACK);
        let tick_offset = (TICK_LENGTH_PT + TICK_PAD_PT) * pt;

        for &lon in &self.lon_ticks {
            let (x, _) = self.transform.to_pixel(lon, self.transform.extent.lat_min);
            fonts.draw(img, &format_tick(lon), x, axes.bottom + tick_offset, HAlign::Center, VAlign::Top, &tick_style);
        }
        let tick_height = fonts.measure("0", &tick_style).height();
        let x_label_y = axes.bottom + tick_offset + tick_height + LABEL_PAD_PT * pt;
        fonts.draw(
            img,
            "Longitude",
            axes.left + axes.width() / 2.0,
            x_label_y,
            HAlign::Center,
            VAlign::Top,
            &label_style,
        );

        let mut widest = 0.0f32;
        for &lat in &self.lat_ticks {
            let (_, y) = self.transform.to_pixel(self.transform.extent.lon_min, lat);
            let text = format_tick(lat);
            widest = widest.max(fonts.measure(&text, &tick_style).width);
            fonts.draw(img, &text, axes.left - tick_offset, y, HAlign::Right, VAlign::Center, &tick_style);
        }
        let label_height = fonts.measure("Latitude", &label_style).height();
        let y_label_x = axes.left - tick_offset - widest - LABEL_PAD_PT * pt - label_height / 2.0;
        fonts.draw_vertical(img, "Latitude", y_label_x, axes.top + axes.height() / 2.0, &label_style);

        for &value in &self.color_ticks {
            let x = self.colorbar_x(value);
            fonts.draw(img, &format_tick(value), x, bar.bottom + tick_offset, HAlign::Center, VAlign::Top, &tick_style);
        }
        if !self.config.units_label.is_empty() {
            let y = bar.bottom + tick_offset + tick_height + LABEL_PAD_PT * pt;
            fonts.draw(
                img,
                &self.config.units_label,
                bar.left + bar.width() / 2.0,
                y,
                HAlign::Center,
                VAlign::Top,
                &label_style,
            );
        }
    }
}

fn solid_paint(color: Color, alpha: u8) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia(alpha));
    paint.anti_alias = true;
    paint
}

fn rounded_rect(rect: PixelRect, radius: f32) -> Option<Path> {
    let r = radius.min(rect.width() / 2.0).min(rect.height() / 2.0).max(0.0);
    let PixelRect { left, top, right, bottom } = rect;
    let mut pb = PathBuilder::new();
    pb.move_to(left + r, top);
    pb.line_to(right - r, top);
    pb.quad_to(right, top, right, top + r);
    pb.line_to(right, bottom - r);
    pb.quad_to(right, bottom, right - r, bottom);
    pb.line_to(left + r, bottom);
    pb.quad_to(left, bottom, left, bottom - r);
    pb.line_to(left, top + r);
    pb.quad_to(left, top, left + r, top);
    pb.close();
    pb.finish()
}

fn pixmap_to_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    img
}
