//! # nc2gif
//!
//! A Rust library for rendering gridded NetCDF rainfall time series as animated GIFs,
//! with administrative boundaries from a shapefile drawn over every frame.
//!
//! ## Features
//!
//! - **CF time decoding**: numeric time axes with `units`/`calendar` attributes become calendar dates
//! - **Reprojection**: boundary shapefiles in common projected systems are brought to WGS84
//! - **Stable colours**: one fixed colour range is shared by every frame
//! - **Atomic output**: the animation is encoded in memory and written in a single rename
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nc2gif::{process_animation_job, RunOptions, input::JobConfig};
//!
//! // Load configuration from a JSON or YAML file
//! let config = JobConfig::from_file("monsoon.yaml").expect("Failed to load config");
//!
//! // Render every time step and write the GIF
//! let summary = process_animation_job(&config, &RunOptions::default()).expect("Failed to render");
//! println!("{} frames written to {}", summary.frames, summary.output_path);
//! ```
//!
//! ## Configuration Example
//!
//! ```json
//! {
//!   "grid_path": "imerg_july.nc",
//!   "boundary_path": "india_states.shp",
//!   "output_path": "rainfall.gif",
//!   "render": {
//!     "color_range": { "min": 0.0, "max": 50.0 },
//!     "title": "Daily Rainfall over India"
//!   },
//!   "animation": { "frame_duration": 0.4 }
//! }
//! ```

pub mod animation;
pub mod boundary;
pub mod cli;
pub mod colormap;
pub mod error;
pub mod grid;
pub mod info;
pub mod input;
pub mod log;
pub mod mesh;
pub mod projection;
pub mod render;
pub mod text;
pub mod timeaxis;


use ::log::{debug, info};
use image::RgbaImage;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

pub use error::{Nc2GifError, Result};

use crate::boundary::{BoundaryDataset, load_boundaries};
use crate::grid::{GriddedField, load_gridded_field};
use crate::input::JobConfig;
use crate::mesh::Mesh;
use crate::render::FrameRenderer;

/// Switches that affect a run but not what is drawn.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Replace an existing output file
    pub force: bool,
    /// Show a progress bar while rendering
    pub show_progress: bool,
}

/// Both inputs of a job, loaded and validated.
#[derive(Debug, Clone)]
pub struct JobInputs {
    pub field: GriddedField,
    pub boundaries: BoundaryDataset,
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub output_path: String,
    pub frames: usize,
    pub width: u32,
    pub height: u32,
    pub first_time: String,
    pub last_time: String,
    pub bytes_written: u64,
    pub frame_files: Vec<PathBuf>,
}

/// Loads the boundary shapefile and the gridded field named by `config`.
///
/// The configuration is validated first, so a bad config fails before any file is opened.
pub fn load_job_inputs(config: &JobConfig) -> Result<JobInputs> {
    config.validate()?;
    let boundaries = load_boundaries(Path::new(&config.boundary_path))?;
    let field = load_gridded_field(Path::new(&config.grid_path), &config.variables)?;
    Ok(JobInputs { field, boundaries })
}

/// Renders one frame per time step, in time-axis order.
pub fn render_frames(config: &JobConfig, inputs: &JobInputs, progress: Option<&ProgressBar>) -> Result<Vec<RgbaImage>> {
    let field = &inputs.field;
    let mesh = Mesh::from_axes(&field.lons, &field.lats);
    let renderer = FrameRenderer::new(&config.render, &mesh, &inputs.boundaries)?;

    let mut frames = Vec::with_capacity(field.time_len());
    for (t, timestamp) in field.times.iter().enumerate() {
        debug!("Rendering frame {} ({})", t, timestamp);
        frames.push(renderer.render(field.slice(t), timestamp)?);
        if let Some(pb) = progress {
            pb.inc(1);
        }
    }
    Ok(frames)
}

/// Runs a whole job: load, render every time step, write the animation.
///
/// This function orchestrates the entire pipeline:
/// 1. Validates the configuration
/// 2. Loads the boundaries (reprojected to WGS84) and the gridded field
/// 3. Renders one frame per time step with a fixed extent and colour range
/// 4. Optionally writes each frame as a PNG to `frames_dir`
/// 5. Encodes the frames as a looping GIF and writes it atomically
///
/// # Arguments
///
/// * `config` - The job configuration
/// * `options` - Overwrite and progress switches
///
/// # Examples
///
/// ```rust,no_run
/// use nc2gif::{process_animation_job, RunOptions, input::JobConfig};
///
/// let config = JobConfig::new("rain.nc", "india.shp", "rain.gif");
/// let options = RunOptions { force: true, show_progress: false };
/// process_animation_job(&config, &options)?;
/// # Ok::<(), nc2gif::Nc2GifError>(())
/// ```
///
/// # Errors
///
/// This function will return an error if:
/// - The configuration is invalid
/// - Either input cannot be read or lacks required variables
/// - The output exists and `options.force` is not set
/// - Encoding or writing the animation fails
pub fn process_animation_job(config: &JobConfig, options: &RunOptions) -> Result<RenderSummary> {
    let output = Path::new(&config.output_path);
    if output.exists() && !options.force {
        return Err(Nc2GifError::OutputExists(config.output_path.clone()));
    }

    let inputs = load_job_inputs(config)?;
    let steps = inputs.field.time_len();

    let progress = options.show_progress.then(|| {
        let pb = ProgressBar::new(steps as u64);
        if let Ok(style) = ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames {msg}") {
            pb.set_style(style.progress_chars("##-"));
        }
        pb
    });
    let frames = render_frames(config, &inputs, progress.as_ref())?;
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }
    info!("Rendered {} frames", frames.len());

    let frame_files = match &config.frames_dir {
        Some(dir) => animation::write_frame_images(&frames, Path::new(dir))?,
        None => Vec::new(),
    };
    let bytes_written = animation::write_animation(&frames, &config.animation, output, options.force)?;

    let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or_default();
    let times = &inputs.field.times;
    Ok(RenderSummary {
        output_path: config.output_path.clone(),
        frames: frames.len(),
        width,
        height,
        first_time: times.first().map(|t| t.to_string()).unwrap_or_default(),
        last_time: times.last().map(|t| t.to_string()).unwrap_or_default(),
        bytes_written,
        frame_files,
    })
}
