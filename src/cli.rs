//! # CLI Module
//!
//! This module provides the command-line interface for nc2gif, including:
//! - Argument parsing with clap
//! - Configuration file loading (JSON/YAML)
//! - Environment variable support with the NC2GIF_ prefix
//! - Merging of CLI, environment and config file values by priority
//! - Subcommands for rendering, validation, inspection and templates

use crate::error::{Nc2GifError, Result};
use crate::input::{ColorRange, Extent, JobConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Animated rainfall maps from NetCDF grids and boundary shapefiles
#[derive(Parser, Debug)]
#[command(name = "nc2gif")]
#[command(about = "Render NetCDF rainfall time series over boundary shapefiles as animated GIFs")]
#[command(version)]
#[command(long_about = "
nc2gif renders a gridded NetCDF precipitation time series as a looping animated GIF,
one frame per time step, with administrative boundaries from a shapefile drawn on top.

FEATURES:
  • CF time axes: units and calendar attributes decoded into calendar dates
  • Reprojection: boundary shapefiles in Mercator, LCC or UTM brought to WGS84
  • Fixed colour range: the same rainfall value has the same colour in every frame
  • Configuration files: JSON and YAML format support with templates
  • Progress indicators: a progress bar while frames are rendered
  • Shell completions: Auto-completion for bash, zsh, fish, and PowerShell

EXAMPLES:
  # Basic rendering
  nc2gif render rainfall.nc india.shp rainfall.gif

  # Fixed colour range and viewport
  nc2gif render rainfall.nc india.shp rainfall.gif \\
    --color-range 0:80 --extent 65:100:5:38

  # Using config file
  nc2gif render --config monsoon.yaml

  # Generate templates
  nc2gif template monsoon --format yaml > monsoon.yaml

  # File inspection
  nc2gif info rainfall.nc --detailed

  # Generate completions
  nc2gif completions bash > ~/.bash_completion.d/nc2gif
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format for structured data
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Configuration file path (JSON or YAML)
    #[arg(short, long, global = true, env = "NC2GIF_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a NetCDF time series to an animated GIF
    #[command(long_about = "
Render every time step of a NetCDF rainfall field as one frame of a looping GIF.

Paths and options can come from the command line, NC2GIF_* environment variables
or a configuration file. Command-line values win over environment variables, which
win over the configuration file.

EXAMPLES:
  # Basic rendering
  nc2gif render rainfall.nc india.shp rainfall.gif

  # Slower animation with a custom title
  nc2gif render rainfall.nc india.shp rainfall.gif \\
    --duration 0.8 --title 'July 2023 Rainfall'

  # Own credit line and a two-line caption
  nc2gif render rainfall.nc india.shp rainfall.gif \\
    --attribution 'Data Source: IMD' --caption 'Onset phase\\nDaily totals'

  # Keep the individual frames for inspection
  nc2gif render rainfall.nc india.shp rainfall.gif --frames-dir frames/

  # Dry run for validation
  nc2gif render rainfall.nc india.shp rainfall.gif --dry-run

  # Using config file with overrides
  nc2gif render --config monsoon.yaml --color-range 0:30 --force
")]
    Render(RenderArgs),

    /// Validate configuration file
    #[command(long_about = "
Validate a configuration file without rendering anything.

This command checks:
• Configuration file syntax and structure
• Colour range, extent, figure and animation values
• Existence of the input NetCDF and shapefile
• Whether the output directory exists and the output would be overwritten

EXAMPLES:
  # Validate a configuration file
  nc2gif validate monsoon.json

  # Validate with detailed output
  nc2gif validate monsoon.yaml --detailed

  # Validate using global config
  nc2gif validate --config ~/.nc2gif.yaml
")]
    Validate {
        /// Configuration file to validate
        config_file: Option<PathBuf>,

        /// Show detailed validation report
        #[arg(long)]
        detailed: bool,
    },

    /// Show information about NetCDF file
    #[command(long_about = "
Inspect NetCDF files and display structure information.

This command displays:
• File dimensions and their sizes
• Available variables and their attributes
• The decoded first and last timestamp of the time axis

EXAMPLES:
  # Basic file info
  nc2gif info rainfall.nc

  # Detailed information
  nc2gif info rainfall.nc --detailed

  # Info about specific variable
  nc2gif info rainfall.nc -n precip

  # JSON output for scripting
  nc2gif info rainfall.nc --format json
")]
    Info {
        /// NetCDF file path
        file: String,

        /// Show detailed information, including global attributes
        #[arg(long)]
        detailed: bool,

        /// Show only specific variable info
        #[arg(short = 'n', long)]
        variable: Option<String>,

        /// Output format for file information
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Generate configuration templates
    #[command(long_about = "
Generate configuration file templates.

Available templates:
• basic: input/output paths with default rendering
• monsoon: PERSIANN India 2023 inputs with the matching credit line

EXAMPLES:
  # Generate basic JSON template
  nc2gif template basic

  # Generate YAML template to file
  nc2gif template monsoon --format yaml -o monsoon.yaml

  # Generate and edit template
  nc2gif template monsoon > monsoon.json
  # ... edit monsoon.json ...
  nc2gif render --config monsoon.json
")]
    Template {
        /// Template type to generate
        #[arg(value_enum)]
        template_type: TemplateType,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration format
        #[arg(long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,
    },

    /// Generate shell completions
    #[command(long_about = "
Generate shell completion scripts for bash, zsh, fish, and PowerShell.

INSTALLATION:
  # Bash
  nc2gif completions bash > ~/.bash_completion.d/nc2gif

  # Zsh
  nc2gif completions zsh > ~/.zsh/completions/_nc2gif

  # Fish
  nc2gif completions fish > ~/.config/fish/completions/nc2gif.fish

  # PowerShell
  nc2gif completions powershell > nc2gif.ps1
")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Arguments of the `render` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct RenderArgs {
    /// Input NetCDF file
    #[arg(value_name = "GRID", env = "NC2GIF_GRID")]
    pub grid: Option<String>,

    /// Boundary shapefile (.shp)
    #[arg(value_name = "BOUNDARY", env = "NC2GIF_BOUNDARY")]
    pub boundary: Option<String>,

    /// Output GIF file
    #[arg(value_name = "OUTPUT", env = "NC2GIF_OUTPUT")]
    pub output: Option<String>,

    /// Name of the precipitation variable
    #[arg(short = 'n', long, env = "NC2GIF_VARIABLE")]
    pub variable: Option<String>,

    /// Fixed colour range: min:max
    #[arg(long, value_parser = parse_color_range, allow_hyphen_values = true, env = "NC2GIF_COLOR_RANGE")]
    pub color_range: Option<ColorRange>,

    /// Map extent: lon_min:lon_max:lat_min:lat_max
    #[arg(long, value_parser = parse_extent, allow_hyphen_values = true, env = "NC2GIF_EXTENT")]
    pub extent: Option<Extent>,

    /// Display time of each frame in seconds
    #[arg(long, value_parser = parse_duration, env = "NC2GIF_DURATION")]
    pub duration: Option<f64>,

    /// Figure title
    #[arg(long, env = "NC2GIF_TITLE")]
    pub title: Option<String>,

    /// Credit line under the title
    #[arg(long, env = "NC2GIF_ATTRIBUTION")]
    pub attribution: Option<String>,

    /// Descriptive caption above the map; `\n` starts a new line
    #[arg(long, env = "NC2GIF_CAPTION")]
    pub caption: Option<String>,

    /// strftime pattern of the per-frame date label
    #[arg(long, env = "NC2GIF_DATE_FORMAT")]
    pub date_format: Option<String>,

    /// Also write every frame as a PNG into this directory
    #[arg(long, env = "NC2GIF_FRAMES_DIR")]
    pub frames_dir: Option<String>,

    /// Force overwrite existing output files
    #[arg(long, env = "NC2GIF_FORCE")]
    pub force: bool,

    /// Dry run - load and validate inputs without rendering
    #[arg(long, env = "NC2GIF_DRY_RUN")]
    pub dry_run: bool,

    /// Hide the progress bar
    #[arg(long, env = "NC2GIF_NO_PROGRESS")]
    pub no_progress: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON structured output
    Json,
    /// YAML structured output
    Yaml,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateType {
    /// Paths with default rendering
    Basic,
    /// Monsoon progression over India
    Monsoon,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON configuration format
    Json,
    /// YAML configuration format
    Yaml,
}

fn parse_numbers(s: &str, expected: usize, format: &str) -> std::result::Result<Vec<f64>, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != expected {
        return Err(format!("Value must be in format '{}'", format));
    }
    parts
        .iter()
        .map(|p| {
            p.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("Invalid number '{}' in '{}'", p, s))
        })
        .collect()
}

/// Parse colour range from command line argument
/// Format: min:max
fn parse_color_range(s: &str) -> std::result::Result<ColorRange, String> {
    let values = parse_numbers(s, 2, "min:max")?;
    if values[0] >= values[1] {
        return Err("Minimum value must be less than maximum value".to_string());
    }
    Ok(ColorRange {
        min: values[0],
        max: values[1],
    })
}

/// Parse map extent from command line argument
/// Format: lon_min:lon_max:lat_min:lat_max
fn parse_extent(s: &str) -> std::result::Result<Extent, String> {
    let values = parse_numbers(s, 4, "lon_min:lon_max:lat_min:lat_max")?;
    if values[0] >= values[1] {
        return Err("lon_min must be less than lon_max".to_string());
    }
    if values[2] >= values[3] {
        return Err("lat_min must be less than lat_max".to_string());
    }
    Ok(Extent {
        lon_min: values[0],
        lon_max: values[1],
        lat_min: values[2],
        lat_max: values[3],
    })
}

fn parse_duration(s: &str) -> std::result::Result<f64, String> {
    let seconds: f64 = s.trim().parse().map_err(|_| format!("Invalid duration '{}'", s))?;
    if !(seconds.is_finite() && seconds > 0.0) {
        return Err("Duration must be a positive number of seconds".to_string());
    }
    Ok(seconds)
}

/// Builds the job for `render` from an optional config file and the arguments.
///
/// Priority: CLI arguments > environment variables > config file > defaults. Clap has
/// already folded the environment into `args`, so any value present there wins.
pub fn build_job_config(config_path: Option<&Path>, args: &RenderArgs) -> Result<JobConfig> {
    let mut config = match config_path {
        Some(path) => JobConfig::from_file(path)?,
        None => JobConfig::new("", "", ""),
    };

    if let Some(grid) = &args.grid {
        config.grid_path = grid.clone();
    }
    if let Some(boundary) = &args.boundary {
        config.boundary_path = boundary.clone();
    }
    if let Some(output) = &args.output {
        config.output_path = output.clone();
    }
    if let Some(variable) = &args.variable {
        config.variables.precip = variable.clone();
    }
    if let Some(range) = args.color_range {
        config.render.color_range = range;
    }
    if let Some(extent) = args.extent {
        config.render.extent = extent;
    }
    if let Some(duration) = args.duration {
        config.animation.frame_duration = duration;
    }
    if let Some(title) = &args.title {
        config.render.title = title.clone();
    }
    if let Some(attribution) = &args.attribution {
        config.render.attribution = attribution.clone();
    }
    if let Some(caption) = &args.caption {
        config.render.caption = caption.replace("\\n", "\n");
    }
    if let Some(date_format) = &args.date_format {
        config.render.date_format = date_format.clone();
    }
    if let Some(frames_dir) = &args.frames_dir {
        config.frames_dir = Some(frames_dir.clone());
    }

    let missing: Vec<&str> = [
        ("GRID", &config.grid_path),
        ("BOUNDARY", &config.boundary_path),
        ("OUTPUT", &config.output_path),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect();
    if !missing.is_empty() {
        return Err(Nc2GifError::Configuration(format!(
            "missing {}: pass them as arguments, NC2GIF_* variables or in a config file",
            missing.join(", ")
        )));
    }

    config.validate()?;
    Ok(config)
}

/// Checks the local files a job refers to. Returns one message per problem.
pub fn check_job_files(config: &JobConfig) -> Vec<String> {
    let mut problems = Vec::new();
    if !Path::new(&config.grid_path).is_file() {
        problems.push(format!("Grid file not found: {}", config.grid_path));
    }
    let boundary = Path::new(&config.boundary_path);
    if !boundary.is_file() {
        problems.push(format!("Boundary file not found: {}", config.boundary_path));
    } else if !boundary.with_extension("shx").is_file() && !boundary.with_extension("SHX").is_file() {
        problems.push(format!("Boundary index (.shx) not found next to {}", config.boundary_path));
    }
    let output = Path::new(&config.output_path);
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
        && !parent.is_dir()
    {
        problems.push(format!("Output directory does not exist: {}", parent.display()));
    }
    problems
}

/// Serialises the requested template.
pub fn render_template(template: TemplateType, format: ConfigFormat) -> Result<String> {
    let config = match template {
        TemplateType::Basic => JobConfig::basic_template(),
        TemplateType::Monsoon => JobConfig::monsoon_template(),
    };
    match format {
        ConfigFormat::Json => config.to_json(),
        ConfigFormat::Yaml => config.to_yaml(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::tempdir;

    // Global mutex to ensure environment variable tests run sequentially
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn args(grid: &str, boundary: &str, output: &str) -> RenderArgs {
        RenderArgs {
            grid: Some(grid.to_string()),
            boundary: Some(boundary.to_string()),
            output: Some(output.to_string()),
            ..RenderArgs::default()
        }
    }

    #[test]
    fn test_parse_color_range() {
        let range = parse_color_range("0:50").unwrap();
        assert_eq!(range, ColorRange { min: 0.0, max: 50.0 });
        assert_eq!(parse_color_range("-5.5:10").unwrap().min, -5.5);

        assert!(parse_color_range("0").is_err());
        assert!(parse_color_range("0:10:20").is_err());
        assert!(parse_color_range("zero:10").is_err());
        assert!(parse_color_range("50:0").is_err()); // min > max
        assert!(parse_color_range("5:5").is_err());
        assert!(parse_color_range("0:inf").is_err());
    }

    #[test]
    fn test_parse_extent() {
        let extent = parse_extent("65:100:5:38").unwrap();
        assert_eq!(extent, Extent::default());
        let west = parse_extent("-20:10.5:-35:40").unwrap();
        assert_eq!(west.lon_min, -20.0);
        assert_eq!(west.lat_min, -35.0);

        assert!(parse_extent("65:100:5").is_err());
        assert!(parse_extent("100:65:5:38").is_err());
        assert!(parse_extent("65:100:38:5").is_err());
        assert!(parse_extent("65:100:a:38").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("0.4").unwrap(), 0.4);
        assert!(parse_duration("0").is_err());
        assert!(parse_duration("-1").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_build_from_arguments_only() {
        let mut render = args("rain.nc", "india.shp", "rain.gif");
        render.color_range = Some(ColorRange { min: 0.0, max: 80.0 });
        render.duration = Some(0.25);
        render.title = Some("July".to_string());

        let config = build_job_config(None, &render).unwrap();
        assert_eq!(config.grid_path, "rain.nc");
        assert_eq!(config.boundary_path, "india.shp");
        assert_eq!(config.output_path, "rain.gif");
        assert_eq!(config.render.color_range.max, 80.0);
        assert_eq!(config.animation.frame_delay_ms(), 250);
        assert_eq!(config.render.title, "July");
        assert_eq!(config.render.extent, Extent::default());
    }

    #[test]
    fn test_build_requires_paths_without_config() {
        let render = RenderArgs {
            grid: Some("rain.nc".to_string()),
            ..RenderArgs::default()
        };
        match build_job_config(None, &render) {
            Err(Nc2GifError::Configuration(message)) => {
                assert!(message.contains("BOUNDARY"));
                assert!(message.contains("OUTPUT"));
                assert!(!message.contains("GRID"));
            }
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_arguments_override_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("job.yaml");
        let mut base = JobConfig::monsoon_template();
        base.render.color_range = ColorRange { min: 0.0, max: 30.0 };
        std::fs::write(&path, base.to_yaml().unwrap()).unwrap();

        let render = RenderArgs {
            output: Some("override.gif".to_string()),
            extent: Some(parse_extent("60:100:0:40").unwrap()),
            ..RenderArgs::default()
        };
        let config = build_job_config(Some(&path), &render).unwrap();
        assert_eq!(config.grid_path, base.grid_path);
        assert_eq!(config.output_path, "override.gif");
        assert_eq!(config.render.color_range.max, 30.0);
        assert_eq!(config.render.extent.lon_min, 60.0);
        assert_eq!(config.render.title, base.render.title);
    }

    #[test]
    fn test_annotation_arguments() {
        let mut render = args("rain.nc", "india.shp", "rain.gif");
        render.attribution = Some("Data Source: IMD".to_string());
        render.caption = Some("Onset\\nWithdrawal".to_string());
        let config = build_job_config(None, &render).unwrap();
        assert_eq!(config.render.attribution, "Data Source: IMD");
        assert_eq!(config.render.caption, "Onset\nWithdrawal");

        render.caption = Some(String::new());
        match build_job_config(None, &render) {
            Err(Nc2GifError::Configuration(message)) => assert!(message.contains("caption")),
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_merged_config_is_rejected() {
        let mut render = args("rain.nc", "india.shp", "rain.gif");
        render.date_format = Some("%Q".to_string());
        assert!(matches!(
            build_job_config(None, &render),
            Err(Nc2GifError::Configuration(_))
        ));
    }

    #[test]
    fn test_environment_variables_fill_render_args() {
        // Acquire mutex to ensure exclusive access to environment variables
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        let previous_range = env::var("NC2GIF_COLOR_RANGE").ok();
        let previous_title = env::var("NC2GIF_TITLE").ok();

        unsafe {
            env::set_var("NC2GIF_COLOR_RANGE", "0:25");
            env::set_var("NC2GIF_TITLE", "From env");
        }

        let cli = Cli::try_parse_from(["nc2gif", "render", "a.nc", "b.shp", "c.gif", "--title", "From CLI"]).unwrap();
        let Commands::Render(render) = cli.command else {
            panic!("Expected Render command");
        };
        assert_eq!(render.color_range, Some(ColorRange { min: 0.0, max: 25.0 }));
        assert_eq!(render.title.as_deref(), Some("From CLI"));

        unsafe {
            match previous_range {
                Some(value) => env::set_var("NC2GIF_COLOR_RANGE", value),
                None => env::remove_var("NC2GIF_COLOR_RANGE"),
            }
            match previous_title {
                Some(value) => env::set_var("NC2GIF_TITLE", value),
                None => env::remove_var("NC2GIF_TITLE"),
            }
        }
    }

    #[test]
    fn test_check_job_files() {
        let dir = tempdir().unwrap();
        let grid = dir.path().join("rain.nc");
        let shp = dir.path().join("india.shp");
        std::fs::write(&grid, b"").unwrap();
        std::fs::write(&shp, b"").unwrap();
        let config = JobConfig::new(
            grid.to_str().unwrap(),
            shp.to_str().unwrap(),
            dir.path().join("missing/rain.gif").to_str().unwrap(),
        );

        let problems = check_job_files(&config);
        assert_eq!(problems.len(), 2, "{:?}", problems);
        assert!(problems[0].contains(".shx"));
        assert!(problems[1].contains("Output directory"));

        std::fs::write(shp.with_extension("shx"), b"").unwrap();
        std::fs::create_dir(dir.path().join("missing")).unwrap();
        assert!(check_job_files(&config).is_empty());
    }

    #[test]
    fn test_templates_parse_back() {
        for template in [TemplateType::Basic, TemplateType::Monsoon] {
            let json = render_template(template, ConfigFormat::Json).unwrap();
            let yaml = render_template(template, ConfigFormat::Yaml).unwrap();
            let from_json = JobConfig::from_json(&json).unwrap();
            let from_yaml = JobConfig::from_yaml(&yaml).unwrap();
            assert_eq!(from_json, from_yaml);
            assert!(from_json.validate().is_ok());
        }
        let monsoon = render_template(TemplateType::Monsoon, ConfigFormat::Yaml).unwrap();
        assert!(monsoon.contains("PERSIANN"));
    }
}
