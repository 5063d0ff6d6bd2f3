use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{info, warn};
use std::fs;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::time::Instant;

use nc2gif::cli::{Cli, Commands, OutputFormat, RenderArgs, build_job_config, check_job_files, render_template};
use nc2gif::info::{get_netcdf_info, print_file_info_human, print_file_info_json, print_file_info_yaml};
use nc2gif::input::JobConfig;
use nc2gif::log::{config_echo, init_logging, show_farewell_with_timing, show_greeting};
use nc2gif::{RenderSummary, RunOptions, load_job_inputs, process_animation_job};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match &cli.command {
        Commands::Render(args) => run_render(&cli, args),
        Commands::Validate { config_file, detailed } => {
            let path = config_file
                .as_deref()
                .or(cli.config.as_deref())
                .context("No configuration file given; pass one as an argument or with --config")?;
            run_validate(path, *detailed)
        }
        Commands::Info {
            file,
            detailed,
            variable,
            format,
        } => {
            let info = get_netcdf_info(file, variable.as_deref(), *detailed)?;
            match format.unwrap_or(cli.output_format) {
                OutputFormat::Human => print_file_info_human(&info),
                OutputFormat::Json => print_file_info_json(&info)?,
                OutputFormat::Yaml => print_file_info_yaml(&info)?,
            }
            Ok(())
        }
        Commands::Template {
            template_type,
            output,
            format,
        } => {
            let text = render_template(*template_type, *format)?;
            write_or_print(output.as_deref(), &text)
        }
        Commands::Completions { shell, output } => {
            let mut buffer = Vec::new();
            clap_complete::generate(*shell, &mut Cli::command(), "nc2gif", &mut buffer);
            let text = String::from_utf8(buffer).context("Completion script is not UTF-8")?;
            write_or_print(output.as_deref(), &text)
        }
    }
}

fn run_render(cli: &Cli, args: &RenderArgs) -> Result<()> {
    let start_time = Instant::now();
    let source = cli
        .config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "command line".to_string());
    show_greeting(&source);

    let config = build_job_config(cli.config.as_deref(), args).context("Invalid render configuration")?;
    config_echo(&config);

    if args.dry_run {
        let inputs = load_job_inputs(&config).context("Dry run failed")?;
        info!(
            "Dry run OK: {} frames of {}x{} cells, {} boundary features",
            inputs.field.time_len(),
            inputs.field.lat_len(),
            inputs.field.lon_len(),
            inputs.boundaries.features.len()
        );
        return Ok(());
    }

    let options = RunOptions {
        force: args.force,
        show_progress: !cli.quiet && !args.no_progress && io::stderr().is_terminal(),
    };
    let summary = process_animation_job(&config, &options)
        .with_context(|| format!("Failed to render {}", config.grid_path))?;
    report_summary(&summary, cli.output_format)?;
    show_farewell_with_timing(start_time.elapsed());
    Ok(())
}

fn report_summary(summary: &RenderSummary, format: OutputFormat) -> Result<()> {
    let value = serde_json::json!({
        "output_path": summary.output_path,
        "frames": summary.frames,
        "width": summary.width,
        "height": summary.height,
        "first_time": summary.first_time,
        "last_time": summary.last_time,
        "bytes_written": summary.bytes_written,
        "frame_files": summary.frame_files,
    });
    match format {
        OutputFormat::Human => info!(
            "Wrote {} ({} frames, {}x{} px, {} to {})",
            summary.output_path, summary.frames, summary.width, summary.height, summary.first_time, summary.last_time
        ),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&value)?),
    }
    Ok(())
}

fn run_validate(path: &Path, detailed: bool) -> Result<()> {
    let config = JobConfig::from_file(path).with_context(|| format!("Failed to parse {}", path.display()))?;
    let mut problems = config.problems();
    problems.extend(check_job_files(&config));

    if detailed {
        config_echo(&config);
    }
    if Path::new(&config.output_path).exists() {
        warn!("Output {} exists and will only be replaced with --force", config.output_path);
    }
    if problems.is_empty() {
        println!("✓ Configuration {} is valid", path.display());
        Ok(())
    } else {
        for problem in &problems {
            println!("✗ {}", problem);
        }
        anyhow::bail!("{} problem(s) found in {}", problems.len(), path.display())
    }
}

fn write_or_print(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}
