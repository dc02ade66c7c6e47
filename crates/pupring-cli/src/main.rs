//! pupring: engrave image files from the command line.
//!
//! Runs the engraving pipeline on a given image file, writes one PNG
//! mask per produced style and the SVG of the primary style, and prints
//! per-style ink coverage plus vectorizer counts. Useful for:
//!
//! - Comparing styles side by side on the same photo
//! - Checking how a face crop or the pendant mask changes the output
//! - Tuning the vectorizer tolerance and stroke width
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin pupring -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use pupring_pipeline::{CropRect, EngraveConfig, EngraveOptions, EngravingResult, StyleSelection};
use tracing_subscriber::EnvFilter;

/// Turn a pet photo into engraving masks and vector paths.
#[derive(Parser)]
#[command(name = "pupring", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Style name, or `all`.
    #[arg(long, default_value = "all")]
    style: String,

    /// Restrict `all` to these styles (repeatable). The standard,
    /// detailed and bold styles are always produced.
    #[arg(long = "filter", value_name = "STYLE")]
    filter: Vec<String>,

    /// Confine every mask to the centered pendant circle.
    #[arg(long)]
    pendant: bool,

    /// Crop to `X,Y,W,H` before engraving (e.g. a detected face).
    #[arg(long, value_parser = parse_crop)]
    crop: Option<CropRect>,

    /// Grow the crop by 20% of its longer side on every side.
    #[arg(long, requires = "crop")]
    pad_crop: bool,

    /// Skip vectorization of the primary style.
    #[arg(long)]
    no_vectorize: bool,

    /// Polygon simplification tolerance in pixels.
    #[arg(long, default_value_t = EngraveConfig::DEFAULT_SIMPLIFY_TOLERANCE)]
    simplify_tolerance: f64,

    /// Stroke width of SVG paths.
    #[arg(long, default_value_t = EngraveConfig::DEFAULT_STROKE_WIDTH)]
    stroke_width: f64,

    /// Pendant margin in pixels.
    #[arg(long, default_value_t = EngraveConfig::DEFAULT_PENDANT_MARGIN)]
    pendant_margin: u32,

    /// Full engraving config as a JSON string.
    ///
    /// When provided, the individual config flags are ignored. The JSON
    /// must be a valid `EngraveConfig` serialization; missing fields
    /// take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// The input file holds base64 text (optionally a data URI) instead
    /// of raw image bytes.
    #[arg(long)]
    base64: bool,

    /// Directory to write one `<stem>-<style>.png` per style into.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Write the primary style's SVG to this file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Also cut the subject out of its backdrop and write it as an RGBA
    /// PNG to this file.
    #[arg(long)]
    cutout: Option<PathBuf>,

    /// Print the service JSON response instead of the report.
    #[arg(long)]
    json: bool,

    /// Log per-stage detail (overridden by `RUST_LOG`).
    #[arg(short, long)]
    verbose: bool,
}

/// Parse `X,Y,W,H`.
fn parse_crop(s: &str) -> Result<CropRect, String> {
    let parts: Vec<u32> = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("crop must be X,Y,W,H: {e}"))?;
    match parts.as_slice() {
        &[x, y, width, height] if width > 0 && height > 0 => Ok(CropRect {
            x,
            y,
            width,
            height,
        }),
        &[_, _, _, _] => Err("crop width and height must be positive".to_owned()),
        _ => Err(format!("crop must have 4 values, got {}", parts.len())),
    }
}

/// Build an [`EngraveConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual config flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<EngraveConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(EngraveConfig {
        simplify_tolerance: cli.simplify_tolerance,
        stroke_width: cli.stroke_width,
        pendant_margin: cli.pendant_margin,
        ..EngraveConfig::default()
    })
}

/// Build the request options from CLI arguments.
fn options_from_cli(cli: &Cli) -> Result<EngraveOptions, String> {
    let selection: StyleSelection = cli.style.parse().map_err(|e| format!("{e}"))?;
    let filter = pupring_pipeline::style::parse_styles(&cli.filter).map_err(|e| format!("{e}"))?;
    let crop = cli.crop.map(|rect| {
        if cli.pad_crop {
            rect.padded(CropRect::FACE_PADDING)
        } else {
            rect
        }
    });
    Ok(EngraveOptions {
        selection,
        filter,
        pendant: cli.pendant,
        crop,
        vectorize: !cli.no_vectorize,
    })
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_input(cli: &Cli) -> Result<Vec<u8>, String> {
    if cli.base64 {
        let text = std::fs::read_to_string(&cli.image_path)
            .map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))?;
        pupring_service::decode_payload(&text).map_err(|e| format!("{e}"))
    } else {
        std::fs::read(&cli.image_path)
            .map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;
    let options = options_from_cli(cli)?;
    let image_bytes = read_input(cli)?;

    tracing::info!(
        image = %cli.image_path.display(),
        bytes = image_bytes.len(),
        selection = %options.selection,
        "engraving"
    );

    let result = pupring_pipeline::engrave(&image_bytes, &options, &config)
        .map_err(|e| format!("Pipeline error ({:?}): {e}", e.kind()))?;

    let stem = cli
        .image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("pupring");

    if let Some(ref dir) = cli.out_dir {
        write_masks(dir, stem, &result)?;
    }
    if let Some(ref svg_path) = cli.svg {
        write_svg(svg_path, stem, &result)?;
    }
    if let Some(ref cutout_path) = cli.cutout {
        write_cutout(cutout_path, &image_bytes)?;
    }

    if cli.json {
        let response = pupring_service::EngraveResponse::from_result(options.selection, &result)
            .map_err(|e| format!("Error encoding response: {e}"))?;
        let json = serde_json::to_string_pretty(&response)
            .map_err(|e| format!("Error serializing response: {e}"))?;
        println!("{json}");
    } else {
        println!("{}", report(&result));
    }
    Ok(())
}

fn write_masks(dir: &Path, stem: &str, result: &EngravingResult) -> Result<(), String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("Error creating {}: {e}", dir.display()))?;
    for (style, mask) in &result.masks {
        let png = pupring_export::encode_png(mask)
            .map_err(|e| format!("Error encoding {style}: {e}"))?;
        let path = dir.join(format!("{stem}-{style}.png"));
        std::fs::write(&path, &png)
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        eprintln!("Wrote {} ({} bytes)", path.display(), png.len());
    }
    Ok(())
}

fn write_svg(path: &Path, stem: &str, result: &EngravingResult) -> Result<(), String> {
    let Some(ref doc) = result.vector else {
        eprintln!("No SVG written: vectorization was disabled");
        return Ok(());
    };
    let desc = format!("style={}", result.primary);
    let metadata = pupring_export::SvgMetadata {
        title: Some(stem),
        description: Some(&desc),
    };
    let svg = pupring_export::to_svg(doc, &metadata);
    std::fs::write(path, &svg).map_err(|e| format!("Error writing SVG to {}: {e}", path.display()))?;
    eprintln!("SVG written to {} ({} bytes)", path.display(), svg.len());
    Ok(())
}

fn write_cutout(path: &Path, image_bytes: &[u8]) -> Result<(), String> {
    let cutout = pupring_pipeline::remove_background(image_bytes)
        .map_err(|e| format!("Background removal error ({:?}): {e}", e.kind()))?;
    if !cutout.has_transparency {
        eprintln!("No subject found; cutout is the unchanged photo");
    }
    let png = pupring_export::encode_rgba_png(&cutout.image)
        .map_err(|e| format!("Error encoding cutout: {e}"))?;
    std::fs::write(path, &png)
        .map_err(|e| format!("Error writing cutout to {}: {e}", path.display()))?;
    eprintln!("Cutout written to {} ({} bytes)", path.display(), png.len());
    Ok(())
}

/// Human-readable coverage table.
fn report(result: &EngravingResult) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Image: {}x{}  primary: {}",
        result.dimensions.width, result.dimensions.height, result.primary
    );
    let _ = writeln!(out, "{}", "=".repeat(44));
    let _ = writeln!(out, "{:<16} {:>12} {:>12}", "Style", "Black %", "White %");
    let _ = writeln!(out, "{}", "-".repeat(44));
    for (style, m) in &result.metrics {
        let marker = if *style == result.primary { "*" } else { "" };
        let _ = writeln!(
            out,
            "{:<16} {:>12.2} {:>12.2}",
            format!("{style}{marker}"),
            m.black_ratio * 100.0,
            m.white_ratio * 100.0
        );
    }
    if let Some(ref doc) = result.vector {
        let s = doc.stats;
        let _ = writeln!(out, "{}", "-".repeat(44));
        let _ = write!(
            out,
            "Vector: {} paths from {} contours, {} -> {} points",
            s.paths, s.contours, s.points_before, s.points_after
        );
    }
    out
}
