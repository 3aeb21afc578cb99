//! patchgrid - measure a photographed colour chart
//!
//! Places a reference chart on a scan or camera capture, samples every patch
//! and prints the per-patch measurements together with the predicted
//! quality of a profile built from them.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use patchgrid::config::Config;
use patchgrid::{
    analyze, CaptureAnalysisResult, CfaPattern, ChartDefinition, Point, Quad, Rotation,
    SourceImage, WorkingGrid,
};

type Drag = (Point, Point);

/// patchgrid - colour chart patch sampling and quality scoring
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Chart definition (JSON)
    #[arg(long)]
    chart: PathBuf,

    /// Captured chart image (TIFF, PNG or JPEG)
    #[arg(short, long)]
    image: PathBuf,

    /// Target workflow (DCP, ICC, LUT, Cineon, ICC_NEGATIVE, LUT_COLOR_NEG, LUT_BW_NEG)
    #[arg(short, long)]
    workflow: Option<String>,

    /// The capture is a film negative
    #[arg(long)]
    negative: bool,

    /// Treat a single-channel image as a RAW mosaic with this filter layout (e.g. RGGB)
    #[arg(long)]
    cfa: Option<CfaPattern>,

    /// Chart corners in pixels: "x,y;x,y;x,y;x,y" (TL, TR, BL, BR)
    #[arg(long, value_parser = parse_corners)]
    corners: Option<Quad>,

    /// Drag the corner handle near the first point to the second: "x,y>x,y" (repeatable)
    #[arg(long, value_parser = parse_drag)]
    drag: Vec<Drag>,

    /// Rotation applied when fitting the chart (auto, cw, ccw)
    #[arg(long, default_value = "auto")]
    rotate: Rotation,

    /// Sampling box size in percent of the patch size
    #[arg(short, long)]
    scale: Option<u32>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_point(pair: &str) -> std::result::Result<Point, String> {
    let (x, y) = pair
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{}'", pair))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("{}: {}", x, e))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("{}: {}", y, e))?;
    Ok(Point::new(x, y))
}

fn parse_corners(s: &str) -> std::result::Result<Quad, String> {
    let points = s
        .split(';')
        .map(parse_point)
        .collect::<std::result::Result<Vec<_>, String>>()?;

    points
        .try_into()
        .map_err(|v: Vec<Point>| format!("expected 4 corners, got {}", v.len()))
}

fn parse_drag(s: &str) -> std::result::Result<Drag, String> {
    let (from, to) = s
        .split_once('>')
        .ok_or_else(|| format!("expected x,y>x,y but got '{}'", s))?;
    Ok((parse_point(from)?, parse_point(to)?))
}

fn print_text(chart: &ChartDefinition, result: &CaptureAnalysisResult) -> Result<()> {
    println!(
        "{:<6} {:>16} {:>13} {:>26} {:>20}  {:<8} {:<8} {:<28} quality",
        "patch", "center", "size", "mean rgb", "std rgb", "expected", "measured", "method"
    );
    for p in &result.patches {
        let s = &p.sample;
        let expected = chart.patch(&p.name)?.preview;
        println!(
            "{:<6} {:>16} {:>13} {:>26} {:>20}  {:<8} {:<8} {:<28} {}",
            p.name,
            format!("({:.1}, {:.1})", p.center.x, p.center.y),
            format!("{:.1}x{:.1}", p.size.w, p.size.h),
            format!("({:.1}, {:.1}, {:.1})", s.mean_rgb[0], s.mean_rgb[1], s.mean_rgb[2]),
            format!("({:.1}, {:.1}, {:.1})", s.std_rgb[0], s.std_rgb[1], s.std_rgb[2]),
            expected.hex(),
            p.verdict.mean_preview.hex(),
            s.method.as_str(),
            p.verdict.tier,
        );
    }
    println!();
    println!("{}", result.report);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("patchgrid v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => Config::load_or_create(path)?,
        None => Config::default(),
    };

    let chart = ChartDefinition::load(&args.chart)
        .with_context(|| format!("Failed to load chart {:?}", args.chart))?;
    let chart = Arc::new(chart);

    let image = match args.cfa {
        Some(pattern) => SourceImage::open_mosaic(&args.image, pattern),
        None => SourceImage::open(&args.image),
    }
    .with_context(|| format!("Failed to load image {:?}", args.image))?;

    let mut grid =
        WorkingGrid::attach(chart.clone(), image.width(), image.height(), &config.grid)?;
    if let Some(corners) = args.corners {
        match grid.set_corners(corners) {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => {
                warn!("Ignoring --corners ({}), keeping the automatic placement", e)
            }
            Err(e) => return Err(e.into()),
        }
    }
    for &(from, to) in &args.drag {
        match grid.drag_corner(from, to) {
            Ok(Some(id)) => info!("Moved {} corner to ({:.1}, {:.1})", id.as_str(), to.x, to.y),
            Ok(None) => warn!("No corner handle near ({:.1}, {:.1})", from.x, from.y),
            Err(e) if e.is_recoverable() => warn!("Drag rejected: {}", e),
            Err(e) => return Err(e.into()),
        }
    }
    if args.corners.is_some() || !args.drag.is_empty() || args.rotate != Rotation::Auto {
        let outcome = grid.adopt(args.rotate)?;
        info!("Corner adoption ({}): {:?}", args.rotate, outcome);
    }
    for (name, p) in grid.range_points()? {
        debug!("Range patch {} at ({:.1}, {:.1})", name, p.x, p.y);
    }
    if let Some(scale) = args.scale {
        grid.set_scale(scale);
    }

    if let Some(key) = &args.workflow {
        config.quality.workflow = key.clone();
    }
    config.quality.negative |= args.negative;
    let workflow = config.quality.workflow();
    info!("Workflow: {}", workflow);

    let result = analyze(&grid, &image, &config.sampler, workflow)?;

    if args.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialize results")?;
        println!("{}", json);
    } else {
        print_text(&chart, &result)?;
    }

    Ok(())
}
