use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use img2ico::{AlphaMode, ConversionRequest, IconConverter, config, ico};

#[derive(Parser, Debug)]
#[command(
    name = "img2ico",
    version,
    about = "Convert a JPG or PNG image into a Windows ICO file with optional rounded corners"
)]
struct Cli {
    /// Image to convert (or, with --inspect, an .ico file to describe)
    #[arg(value_name = "IMAGE")]
    image: Option<PathBuf>,

    /// Output width in pixels (1-512)
    #[arg(short = 'W', long, value_parser = clap::value_parser!(u32).range(1..=512))]
    width: Option<u32>,

    /// Output height in pixels (1-512)
    #[arg(short = 'H', long, value_parser = clap::value_parser!(u32).range(1..=512))]
    height: Option<u32>,

    /// Corner radius in pixels (0-100, 0 = square corners)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=100))]
    radius: Option<u32>,

    /// Output directory (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Make the corner mask the alpha channel instead of intersecting with it
    #[arg(long)]
    replace_alpha: bool,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Describe the frames of an existing .ico file and exit
    #[arg(long)]
    inspect: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    if let Err(e) = run(&cli) {
        if cli.json {
            let kind = e
                .downcast_ref::<img2ico::ConvertError>()
                .map(|c| c.kind())
                .unwrap_or("other");
            println!("{}", serde_json::json!({ "error": format!("{e:#}"), "kind": kind }));
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let Some(image) = cli.image.as_deref() else {
        anyhow::bail!("No input image specified. Use --help for usage.");
    };

    // Handle --inspect
    if cli.inspect {
        let info = ico::inspect(image)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&info)?);
        } else {
            print_icon_info(image, &info);
        }
        return Ok(());
    }

    let config = config::Config::load(cli.config.as_deref())?;
    let request = build_request(cli, &config, image)?;

    log::debug!(
        "Converting {} to {}x{} (radius {}, {:?})",
        image.display(),
        request.target_width(),
        request.target_height(),
        request.corner_radius(),
        request.alpha_mode()
    );

    let outcome = IconConverter::new().convert(&request)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("Converted to: {}", outcome.output_path.display());
    }
    Ok(())
}

/// Merge CLI flags over config defaults.
fn build_request(cli: &Cli, config: &config::Config, image: &Path) -> Result<ConversionRequest> {
    let defaults = &config.defaults;
    let alpha_mode = if cli.replace_alpha {
        AlphaMode::Replace
    } else {
        config.output.alpha_mode
    };

    let mut builder = ConversionRequest::builder(image)
        .size(
            cli.width.unwrap_or(defaults.width),
            cli.height.unwrap_or(defaults.height),
        )
        .corner_radius(cli.radius.unwrap_or(defaults.corner_radius))
        .alpha_mode(alpha_mode);

    let output_dir = cli
        .output_dir
        .clone()
        .or_else(|| config.output_dir().map(PathBuf::from));
    if let Some(dir) = output_dir {
        builder = builder.output_dir(dir);
    }

    builder.build().context("Invalid conversion settings")
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Print the directory of an ICO file as a table.
fn print_icon_info(path: &Path, info: &ico::IconInfo) {
    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "═".repeat(56));
    println!(
        "  {BOLD}{:<3} {:>11} {:>11} {:>5} {:>7} {:>9}{RESET}",
        "#", "Declared", "Actual", "Bits", "Format", "Bytes"
    );
    println!("  {DIM}{}{RESET}", "─".repeat(54));
    for (i, frame) in info.frames.iter().enumerate() {
        let format = match frame.payload {
            ico::PayloadKind::Png => "PNG",
            ico::PayloadKind::Bmp => "BMP",
        };
        println!(
            "  {:<3} {:>11} {:>11} {:>5} {:>7} {:>9}",
            i,
            format!("{}x{}", frame.declared_width, frame.declared_height),
            format!("{}x{}", frame.width, frame.height),
            frame.bit_count,
            format,
            frame.size
        );
    }
    println!();
}
