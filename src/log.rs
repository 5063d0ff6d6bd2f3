use std::time::Duration;

use crate::input::JobConfig;

/// Initialises `env_logger` for the given verbosity. `RUST_LOG` takes precedence.
pub fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

pub fn show_greeting(source: &str) {
    log::info!("=== NetCDF to GIF Renderer ===");
    log::info!("Loading configuration from: {}", source);
}

pub fn config_echo(config: &JobConfig) {
    let render = &config.render;
    log::info!("Configuration:");
    log::info!("  Grid NetCDF: {} (variable '{}')", config.grid_path, config.variables.precip);
    log::info!("  Boundary shapefile: {}", config.boundary_path);
    log::info!("  Output GIF: {}", config.output_path);
    log::info!("  Colour range: {} to {}", render.color_range.min, render.color_range.max);
    log::info!(
        "  Extent: {}..{} E, {}..{} N",
        render.extent.lon_min,
        render.extent.lon_max,
        render.extent.lat_min,
        render.extent.lat_max
    );
    let (width, height) = render.figure.pixel_size();
    log::info!(
        "  Frames: {}x{} px, {} s each",
        width,
        height,
        config.animation.frame_duration
    );
    if let Some(dir) = &config.frames_dir {
        log::info!("  Frame images: {}", dir);
    }
}

pub fn show_farewell_with_timing(elapsed: Duration) {
    log::info!("=== Animation completed in {:.2}s ===", elapsed.as_secs_f64());
}
