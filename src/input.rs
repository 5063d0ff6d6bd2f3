//! # Input Configuration Module
//!
//! Job configuration for nc2gif runs: which files to read, how to draw each frame
//! and how to assemble the animation. Configurations load from JSON or YAML and
//! every section except the three paths has defaults.
//!
//! ## Configuration Structure
//!
//! - **grid_path**: NetCDF file with the precipitation time series
//! - **boundary_path**: Shapefile with the boundary outlines
//! - **output_path**: Animated GIF to write
//! - **variables**: Names of the field, latitude, longitude and time variables
//! - **render**: Colour range, map extent, figure size and annotation text
//! - **animation**: Frame duration, repeat count and encoder speed
//! - **frames_dir**: Optional directory receiving every frame as PNG
//!
//! ## Example Usage
//!
//! ```rust
//! use nc2gif::input::JobConfig;
//!
//! let json = r#"
//! {
//!   "grid_path": "rainfall.nc",
//!   "boundary_path": "india.shp",
//!   "output_path": "monsoon.gif",
//!   "render": { "color_range": { "min": 0.0, "max": 40.0 } }
//! }"#;
//! let config = JobConfig::from_json(json)?;
//! assert_eq!(config.render.color_range.max, 40.0);
//! assert_eq!(config.animation.frame_duration, 0.4);
//! # Ok::<(), nc2gif::Nc2GifError>(())
//! ```

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::colormap::Color;
use crate::error::{Nc2GifError, Result};

/// Complete description of one animation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Input NetCDF file
    pub grid_path: String,
    /// Input `.shp` file; `.dbf`, `.shx` and `.prj` siblings are used when present
    pub boundary_path: String,
    /// Output animated GIF
    pub output_path: String,
    #[serde(default)]
    pub variables: VariableConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    /// When set, each frame is also written here as `frame_NNN.png`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames_dir: Option<String>,
}

/// NetCDF variable names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableConfig {
    pub precip: String,
    pub lat: String,
    pub lon: String,
    pub time: String,
}

impl Default for VariableConfig {
    fn default() -> Self {
        VariableConfig {
            precip: "precip".to_string(),
            lat: "lat".to_string(),
            lon: "lon".to_string(),
            time: "datetime".to_string(),
        }
    }
}

/// Fixed colour-scale range shared by every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ColorRange {
    fn default() -> Self {
        ColorRange { min: 0.0, max: 50.0 }
    }
}

/// Map viewport in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl Default for Extent {
    fn default() -> Self {
        Extent {
            lon_min: 65.0,
            lon_max: 100.0,
            lat_min: 5.0,
            lat_max: 38.0,
        }
    }
}

/// Figure size in inches and resolution in dots per inch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: f64,
}

impl Default for FigureConfig {
    fn default() -> Self {
        FigureConfig {
            width_in: 8.0,
            height_in: 10.0,
            dpi: 100.0,
        }
    }
}

impl FigureConfig {
    /// Output frame size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width_in * self.dpi).round() as u32,
            (self.height_in * self.dpi).round() as u32,
        )
    }

    /// Pixels per typographic point.
    pub fn px_per_pt(&self) -> f32 {
        (self.dpi / 72.0) as f32
    }
}

const DEFAULT_TITLE: &str = "Monsoon Rainfall Progression over India (2023)";
const DEFAULT_ATTRIBUTION: &str = "Data Source: CHRS";
const DEFAULT_CAPTION: &str = "Monsoon Phases: Incoming → Peak → Retreat\nObserve the south-to-north progression";

/// Longest frame delay a GIF can express, in seconds (65535 hundredths).
pub const MAX_FRAME_DURATION: f64 = 655.35;

/// How each frame is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub color_range: ColorRange,
    pub extent: Extent,
    pub figure: FigureConfig,
    pub title: String,
    pub attribution: String,
    /// May span several lines separated by `\n`
    pub caption: String,
    pub units_label: String,
    /// chrono strftime pattern for the per-frame date label
    pub date_format: String,
    pub boundary_color: Color,
    pub boundary_width_pt: f32,
    pub caption_color: Color,
    pub grid_lines: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            color_range: ColorRange::default(),
            extent: Extent::default(),
            figure: FigureConfig::default(),
            title: DEFAULT_TITLE.to_string(),
            attribution: DEFAULT_ATTRIBUTION.to_string(),
            caption: DEFAULT_CAPTION.to_string(),
            units_label: "Rainfall (mm)".to_string(),
            date_format: "%d %B %Y".to_string(),
            boundary_color: Color::BLACK,
            boundary_width_pt: 0.8,
            caption_color: Color::DARK_GREEN,
            grid_lines: true,
        }
    }
}

/// How frames are assembled into the GIF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Display time of each frame in seconds
    pub frame_duration: f64,
    /// `None` loops forever
    pub repeat: Option<u16>,
    /// GIF quantiser speed, 1 (best) to 30 (fastest)
    pub speed: i32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        AnimationConfig {
            frame_duration: 0.4,
            repeat: None,
            speed: 10,
        }
    }
}

impl AnimationConfig {
    pub fn frame_delay_ms(&self) -> u32 {
        (self.frame_duration * 1000.0).round() as u32
    }
}

impl JobConfig {
    /// Creates a configuration with default rendering for the given paths.
    pub fn new(grid_path: &str, boundary_path: &str, output_path: &str) -> Self {
        JobConfig {
            grid_path: grid_path.to_string(),
            boundary_path: boundary_path.to_string(),
            output_path: output_path.to_string(),
            variables: VariableConfig::default(),
            render: RenderConfig::default(),
            animation: AnimationConfig::default(),
            frames_dir: None,
        }
    }

    /// Loads a job configuration from a JSON or YAML file.
    ///
    /// Files ending in `.yaml` or `.yml` are parsed as YAML, anything else as JSON.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use nc2gif::input::JobConfig;
    ///
    /// let config = JobConfig::from_file("monsoon.yaml")?;
    /// println!("Rendering {} to {}", config.grid_path, config.output_path);
    /// # Ok::<(), nc2gif::Nc2GifError>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::from_yaml(&content)
            }
            _ => Self::from_json(&content),
        }
    }

    pub fn from_json(json_str: &str) -> Result<Self> {
        Ok(serde_json::from_str(json_str)?)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml_str)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Checks every numeric and format constraint, reporting all problems at once.
    pub fn validate(&self) -> Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Nc2GifError::Configuration(problems.join("; ")))
        }
    }

    /// Human-readable list of everything wrong with this configuration.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let render = &self.render;

        for (name, value) in [
            ("grid_path", &self.grid_path),
            ("boundary_path", &self.boundary_path),
            ("output_path", &self.output_path),
        ] {
            if value.trim().is_empty() {
                problems.push(format!("{} must not be empty", name));
            }
        }

        let range = render.color_range;
        if !(range.min.is_finite() && range.max.is_finite() && range.min < range.max) {
            problems.push(format!(
                "color_range must satisfy min < max (got {}..{})",
                range.min, range.max
            ));
        }

        let extent = render.extent;
        if !(extent.lon_min.is_finite() && extent.lon_max.is_finite() && extent.lon_min < extent.lon_max) {
            problems.push(format!(
                "extent longitude must satisfy lon_min < lon_max (got {}..{})",
                extent.lon_min, extent.lon_max
            ));
        }
        if !(extent.lat_min.is_finite() && extent.lat_max.is_finite() && extent.lat_min < extent.lat_max) {
            problems.push(format!(
                "extent latitude must satisfy lat_min < lat_max (got {}..{})",
                extent.lat_min, extent.lat_max
            ));
        }

        let figure = render.figure;
        if !(figure.width_in > 0.0 && figure.height_in > 0.0 && figure.dpi > 0.0) {
            problems.push("figure width, height and dpi must be positive".to_string());
        } else {
            let (w, h) = figure.pixel_size();
            if w < 100 || h < 100 || w > 10_000 || h > 10_000 {
                problems.push(format!("figure size {}x{} px is outside 100..10000", w, h));
            }
        }

        if !(render.boundary_width_pt.is_finite() && render.boundary_width_pt > 0.0) {
            problems.push("boundary_width_pt must be positive".to_string());
        }

        for (name, value) in [
            ("title", &render.title),
            ("attribution", &render.attribution),
            ("caption", &render.caption),
            ("units_label", &render.units_label),
        ] {
            if value.trim().is_empty() {
                problems.push(format!("{} must not be empty", name));
            }
        }

        if render.date_format.is_empty() {
            problems.push("date_format must not be empty".to_string());
        } else if StrftimeItems::new(&render.date_format).any(|item| matches!(item, Item::Error)) {
            problems.push(format!("date_format '{}' is not a valid strftime pattern", render.date_format));
        }

        let animation = &self.animation;
        if !(animation.frame_duration.is_finite() && animation.frame_duration > 0.0) {
            problems.push(format!(
                "frame_duration must be positive (got {})",
                animation.frame_duration
            ));
        } else if animation.frame_delay_ms() < 10 {
            problems.push("frame_duration must be at least 0.01 seconds".to_string());
        } else if animation.frame_duration > MAX_FRAME_DURATION {
            problems.push(format!(
                "frame_duration must be at most {} seconds (got {})",
                MAX_FRAME_DURATION, animation.frame_duration
            ));
        }
        if !(1..=30).contains(&animation.speed) {
            problems.push(format!("speed must be between 1 and 30 (got {})", animation.speed));
        }

        problems
    }

    /// Starter configuration with default rendering.
    pub fn basic_template() -> Self {
        Self::new("data/rainfall.nc", "data/boundaries.shp", "rainfall.gif")
    }

    /// Monsoon progression over India with the full annotation set.
    pub fn monsoon_template() -> Self {
        let mut config = Self::new(
            "Data/PERSIANN_India_2023.nc",
            "IND_SHP/India_State_Boundary.shp",
            "monsoon_progression.gif",
        );
        config.render.attribution = "Data Source: CHRS PERSIANN".to_string();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = JobConfig::from_json(
            r#"{"grid_path": "a.nc", "boundary_path": "b.shp", "output_path": "c.gif"}"#,
        )
        .unwrap();
        assert_eq!(config.variables, VariableConfig::default());
        assert_eq!(config.variables.time, "datetime");
        assert_eq!(config.render.color_range, ColorRange { min: 0.0, max: 50.0 });
        assert_eq!(config.render.extent.lat_min, 5.0);
        assert_eq!(config.render.figure.pixel_size(), (800, 1000));
        assert_eq!(config.animation.frame_delay_ms(), 400);
        assert_eq!(config.animation.repeat, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = JobConfig::from_json(
            r##"{
                "grid_path": "a.nc", "boundary_path": "b.shp", "output_path": "c.gif",
                "variables": {"time": "time"},
                "render": {"boundary_color": "#ff0000", "figure": {"dpi": 50}},
                "animation": {"repeat": 2}
            }"##,
        )
        .unwrap();
        assert_eq!(config.variables.time, "time");
        assert_eq!(config.variables.precip, "precip");
        assert_eq!(config.render.boundary_color, Color::rgb(255, 0, 0));
        assert_eq!(config.render.figure.pixel_size(), (400, 500));
        assert_eq!(config.animation.repeat, Some(2));
        assert_eq!(config.animation.speed, 10);
    }

    #[test]
    fn test_missing_required_path() {
        let result = JobConfig::from_json(r#"{"grid_path": "a.nc", "boundary_path": "b.shp"}"#);
        assert!(matches!(result, Err(Nc2GifError::Json(_))));
    }

    #[test]
    fn test_yaml_roundtrip_of_template() {
        let template = JobConfig::monsoon_template();
        let yaml = template.to_yaml().unwrap();
        assert_eq!(JobConfig::from_yaml(&yaml).unwrap(), template);
        let json = template.to_json().unwrap();
        assert_eq!(JobConfig::from_json(&json).unwrap(), template);
    }

    #[test]
    fn test_from_file_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let yaml_path = dir.path().join("job.yml");
        fs::write(&yaml_path, "grid_path: a.nc\nboundary_path: b.shp\noutput_path: c.gif\n").unwrap();
        assert_eq!(JobConfig::from_file(&yaml_path).unwrap().grid_path, "a.nc");

        let json_path = dir.path().join("job.json");
        fs::write(&json_path, JobConfig::basic_template().to_json().unwrap()).unwrap();
        assert_eq!(JobConfig::from_file(&json_path).unwrap(), JobConfig::basic_template());
    }

    #[test]
    fn test_validate_collects_all_problems() {
        let mut config = JobConfig::basic_template();
        config.render.color_range = ColorRange { min: 10.0, max: 10.0 };
        config.render.extent.lon_min = 120.0;
        config.animation.frame_duration = 0.0;
        config.animation.speed = 0;

        let problems = config.problems();
        assert_eq!(problems.len(), 4, "{:?}", problems);
        match config.validate() {
            Err(Nc2GifError::Configuration(message)) => {
                assert!(message.contains("color_range"));
                assert!(message.contains("frame_duration"));
            }
            other => panic!("Expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_date_format() {
        let mut config = JobConfig::basic_template();
        config.render.date_format = "%Y-%m-%d".to_string();
        assert!(config.validate().is_ok());
        config.render.date_format = "%Q".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_frames_carry_every_annotation() {
        let render = RenderConfig::default();
        assert_eq!(render.title, "Monsoon Rainfall Progression over India (2023)");
        assert_eq!(render.attribution, "Data Source: CHRS");
        assert_eq!(render.caption.lines().count(), 2);
        assert_eq!(render.units_label, "Rainfall (mm)");
        assert!(JobConfig::new("a.nc", "b.shp", "c.gif").validate().is_ok());
    }

    #[test]
    fn test_empty_annotations_rejected() {
        let mut config = JobConfig::basic_template();
        config.render.attribution = String::new();
        config.render.caption = "  ".to_string();
        let problems = config.problems();
        assert_eq!(problems.len(), 2, "{:?}", problems);
        assert!(problems[0].starts_with("attribution"));
        assert!(problems[1].starts_with("caption"));
    }

    #[test]
    fn test_frame_duration_limited_to_gif_delay_range() {
        let mut config = JobConfig::basic_template();
        config.animation.frame_duration = MAX_FRAME_DURATION;
        assert!(config.validate().is_ok());
        assert_eq!(config.animation.frame_delay_ms(), 655_350);

        config.animation.frame_duration = 655.36;
        assert_eq!(config.problems().len(), 1);
        config.animation.frame_duration = 1.0e12;
        match config.validate() {
            Err(Nc2GifError::Configuration(message)) => assert!(message.contains("at most 655.35")),
            other => panic!("Expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_paths_rejected() {
        let config = JobConfig::new("", "b.shp", " ");
        assert_eq!(config.problems().len(), 2);
    }
}
