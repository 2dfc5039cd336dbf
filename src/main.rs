mod areas;
mod calibrate;
mod chart;
mod config;
mod error;
mod milestones;
mod overlay;
mod preprocess;
mod scale;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;
use std::fs;
use std::path::{Path, PathBuf};

use crate::calibrate::ImageDimensions;
use crate::chart::ChartConfig;
use crate::config::StaticTables;
use crate::preprocess::Rotation;

const EXAMPLE_AGE_MONTHS: f64 = 12.0;

fn main() -> Result<()> {
    let matches = cli().get_matches();

    init_logging(matches.get_count("verbose"));

    match matches.subcommand() {
        Some(("calibrate", sub)) => run_calibrate(sub),
        Some(("prepare", sub)) => run_prepare(sub),
        Some(("chart", sub)) => run_chart(sub),
        Some(("overlay", sub)) => run_overlay(sub),
        _ => unreachable!("subcommand is required"),
    }
}

fn cli() -> Command {
    Command::new("haizea-chart")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Calibrates the Haizea-Llevant developmental chart for milestone overlays")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log verbosity (-v debug, -vv trace)"),
        )
        .subcommand(
            Command::new("calibrate")
                .about("Resolve milestone marker positions and write the calibration JSON")
                .arg(path_arg("image", "Horizontal chart image", "public/tabla_haizea_horizontal.png"))
                .arg(path_arg("output", "Calibration JSON to write", "public/haizea_table_config.json"))
                .arg(
                    Arg::new("tables")
                        .long("tables")
                        .value_name("JSON")
                        .value_parser(value_parser!(PathBuf))
                        .help("Replace the embedded knot/area/milestone tables"),
                ),
        )
        .subcommand(
            Command::new("prepare")
                .about("Rotate and enhance the original table into web and HD PNGs")
                .arg(path_arg("input", "Original vertical table", "tabla_haizea_original.png"))
                .arg(path_arg("web-output", "Web PNG (max 1200px wide)", "public/tabla_haizea_horizontal.png"))
                .arg(path_arg("hd-output", "Full resolution PNG", "public/tabla_haizea_hd.png")),
        )
        .subcommand(
            Command::new("chart")
                .about("Rotate the graphic chart and write its month-scale config")
                .arg(path_arg("input", "Original graphic chart", "tabla_grafica-1.png"))
                .arg(path_arg(
                    "output-image",
                    "Rotated chart PNG",
                    "public/tabla_haizea_grafica_horizontal.png",
                ))
                .arg(path_arg("config", "Chart config JSON to write", "public/haizea_chart_config.json"))
                .arg(path_arg(
                    "example-overlay",
                    "Example 12 month age line overlay",
                    "public/age_line_example.png",
                ))
                .arg(font_arg()),
        )
        .subcommand(
            Command::new("overlay")
                .about("Draw the current age line over a processed chart")
                .arg(
                    Arg::new("age")
                        .long("age")
                        .value_name("MONTHS")
                        .required(true)
                        .value_parser(value_parser!(f64))
                        .help("Patient age in months"),
                )
                .arg(path_arg("config", "Chart config JSON", "public/haizea_chart_config.json"))
                .arg(path_arg("output", "Overlay PNG to write", "public/age_line.png"))
                .arg(font_arg()),
        )
}

fn font_arg() -> Arg {
    Arg::new("font")
        .long("font")
        .value_name("TTF")
        .value_parser(value_parser!(PathBuf))
        .help("TrueType font for the age label (bundled DejaVu Sans Mono when omitted)")
}

fn path_arg(name: &'static str, help: &'static str, default: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("PATH")
        .value_parser(value_parser!(PathBuf))
        .default_value(default)
        .help(help)
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn path<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    matches
        .try_get_one::<PathBuf>(name)
        .with_context(|| format!("--{} is not a path argument", name))?
        .map(PathBuf::as_path)
        .with_context(|| format!("--{} is required", name))
}

fn run_calibrate(matches: &ArgMatches) -> Result<()> {
    let image = path(matches, "image")?;
    let output = path(matches, "output")?;
    let tables_path = matches.get_one::<PathBuf>("tables").map(PathBuf::as_path);

    println!("Calibrating Haizea-Llevant table...");

    let tables = StaticTables::load_or_embedded(tables_path).context("Failed to load calibration tables")?;
    let doc = calibrate::run(image, &tables, output)
        .with_context(|| format!("Calibration of {} into {} failed", image.display(), output.display()))?;

    println!("Calibration complete");
    let lines = calibrate::summary(&doc, 5);
    let (totals, examples) = lines.split_at(2.min(lines.len()));
    for line in totals {
        println!("{}", line);
    }
    println!("Config saved to: {}", output.display());
    println!();
    println!("Positioning examples:");
    for line in examples {
        println!("   {}", line);
    }
    Ok(())
}

fn run_prepare(matches: &ArgMatches) -> Result<()> {
    let input = path(matches, "input")?;
    let web_output = path(matches, "web-output")?;
    let hd_output = path(matches, "hd-output")?;

    println!("Processing Haizea-Llevant table...");
    let prepared = preprocess::prepare_table(input, web_output, hd_output)
        .with_context(|| format!("Failed to prepare table from {}", input.display()))?;

    let (ww, wh) = prepared.web_dimensions;
    let (hw, hh) = prepared.hd_dimensions;
    println!("Web image: {}x{} - {:.1}KB", ww, wh, file_kb(web_output)?);
    println!("HD image: {}x{} - {:.1}KB", hw, hh, file_kb(hd_output)?);
    println!("Table processed and ready to use");
    Ok(())
}

fn run_chart(matches: &ArgMatches) -> Result<()> {
    let input = path(matches, "input")?;
    let output_image = path(matches, "output-image")?;
    let config_path = path(matches, "config")?;
    let example_overlay = path(matches, "example-overlay")?;
    let font = matches.get_one::<PathBuf>("font").map(PathBuf::as_path);

    println!("Processing Haizea-Llevant graphic chart...");

    let original = preprocess::load(input).context("Failed to load graphic chart")?;
    let rotated = preprocess::rotate(&original, Rotation::Right);
    preprocess::save_png(&rotated, output_image).context("Failed to save rotated chart")?;

    let dims = ImageDimensions {
        width: rotated.width(),
        height: rotated.height(),
    };
    let image_name = output_image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let chart = ChartConfig::for_chart(image_name, dims)?;
    config::write_json_atomic(&chart, config_path)
        .with_context(|| format!("Failed to write chart config {}", config_path.display()))?;

    println!("Config saved to: {}", config_path.display());
    println!("Horizontal chart saved to: {}", output_image.display());
    println!();
    println!("Month positions:");
    for mark in &chart.month_scale.positions {
        println!("  {}m -> x={} ({}%)", mark.month, mark.x_position, mark.percentage);
    }

    let example = overlay::write_age_line(&chart, EXAMPLE_AGE_MONTHS, font, example_overlay)?;
    println!();
    println!("Example age line ({}m) created", scale::format_age(example.age_months));
    println!(
        "   X position: {} ({:.2}%)",
        example.position.x_pixel.round(),
        example.position.x_percent
    );
    Ok(())
}

fn run_overlay(matches: &ArgMatches) -> Result<()> {
    let age = *matches.get_one::<f64>("age").context("--age is required")?;
    let config_path = path(matches, "config")?;
    let output = path(matches, "output")?;
    let font = matches.get_one::<PathBuf>("font").map(PathBuf::as_path);

    let chart: ChartConfig = config::read_json(config_path)
        .with_context(|| format!("Failed to read chart config {}", config_path.display()))?;

    let result = overlay::write_age_line(&chart, age, font, output)?;
    println!("Age overlay created: {}", output.display());
    println!(
        "   X position: {} ({:.2}%)",
        result.position.x_pixel.round(),
        result.position.x_percent
    );
    Ok(())
}

fn file_kb(path: &Path) -> Result<f64> {
    let meta = fs::metadata(path).with_context(|| format!("Failed to stat {}", path.display()))?;
    Ok(meta.len() as f64 / 1024.0)
}
