use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use cardguard_core::authenticity::AnalysisMode;
use cardguard_core::pipeline::context::{DetectionContext, DetectorConfig};
use cardguard_core::pipeline::coordinator::DetectionCoordinator;
use cardguard_core::shared::frame::Frame;
use cardguard_core::shared::region::Region;

/// ID-card detection and authenticity analysis for still images.
#[derive(Parser)]
#[command(name = "cardguard")]
struct Cli {
    /// Input image file.
    input: PathBuf,

    /// Directory holding the reference template catalog.
    #[arg(long, default_value = "assets")]
    assets_dir: PathBuf,

    /// Authenticity analysis mode: fast, thorough, or adaptive.
    #[arg(long, default_value = "adaptive")]
    mode: String,

    /// Run the low-rigor overlay path instead of the full pipeline.
    #[arg(long)]
    overlay: bool,

    /// Save the detected document crop to this file.
    #[arg(long)]
    crop: Option<PathBuf>,

    /// Emit results as JSON.
    #[arg(long)]
    json: bool,

    /// Print the loaded template catalog summary and exit.
    #[arg(long)]
    catalog_info: bool,

    /// Print per-technique timing statistics after detection.
    #[arg(long)]
    stats: bool,

    /// Override the texture (LBP) base threshold.
    #[arg(long)]
    texture_threshold: Option<f64>,

    /// Override the co-occurrence (GLCM) base threshold.
    #[arg(long)]
    cooccurrence_threshold: Option<f64>,

    /// Override the sensor-noise base threshold.
    #[arg(long)]
    noise_threshold: Option<f64>,

    /// Override the frequency-analysis base threshold.
    #[arg(long)]
    frequency_threshold: Option<f64>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mode: AnalysisMode = cli.mode.parse()?;

    let context = DetectionContext::load(&cli.assets_dir, DetectorConfig::default());
    if cli.catalog_info {
        return print_catalog_info(&context, cli.json);
    }
    if context.catalog().is_empty() {
        return Err(format!(
            "no templates found under {}",
            cli.assets_dir.display()
        )
        .into());
    }

    let decoded = image::open(&cli.input)?;
    let frame = Frame::from_image(&decoded);
    log::info!(
        "loaded {} ({}x{})",
        cli.input.display(),
        frame.width(),
        frame.height()
    );

    let mut coordinator = DetectionCoordinator::new(&context);
    coordinator.set_authenticity_bases(
        cli.texture_threshold,
        cli.cooccurrence_threshold,
        cli.noise_threshold,
        cli.frequency_threshold,
    );

    if cli.overlay {
        run_overlay(&mut coordinator, &frame, cli.json)?;
    } else {
        run_detection(&mut coordinator, &frame, mode, &cli, cli.crop.as_deref())?;
    }

    if cli.stats {
        let stats = coordinator.performance();
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "detections: {} (fast mode used {} times)",
                stats.total_detections, stats.fast_mode_used
            );
            for (technique, avg) in &stats.average_ms {
                println!("  {technique:13}: avg {avg:6.1}ms");
            }
        }
    }

    Ok(())
}

fn run_detection(
    coordinator: &mut DetectionCoordinator<'_>,
    frame: &Frame,
    mode: AnalysisMode,
    cli: &Cli,
    crop_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    match coordinator.detect(frame, mode)? {
        Some(result) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let r = result.region;
                println!(
                    "document detected at ({}, {}) {}x{}",
                    r.x, r.y, r.width, r.height
                );
                println!(
                    "  template {:?} scale {:.1} confidence {:.3}",
                    result.template_kind, result.scale, result.confidence
                );
                if let Some(v) = result.validation_score {
                    println!("  validation {:.3} ({:?})", v, result.analysis_mode.unwrap());
                }
                if let Some(f) = result.feature_score {
                    println!("  feature score {f:.3}");
                }
                println!("  combined confidence {:.3}", result.combined_confidence);
            }
            if let Some(path) = crop_path {
                save_crop(frame, &result.region, path)?;
                log::info!("saved document crop to {}", path.display());
            }
        }
        None => {
            if cli.json {
                println!("null");
            } else {
                println!("no document detected");
            }
        }
    }
    Ok(())
}

fn run_overlay(
    coordinator: &mut DetectionCoordinator<'_>,
    frame: &Frame,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match coordinator.detect_overlay(frame) {
        Some(overlay) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&overlay)?);
            } else {
                let r = overlay.region;
                println!(
                    "{} at ({}, {}) {}x{} (confidence {:.3})",
                    overlay.band.label(),
                    r.x,
                    r.y,
                    r.width,
                    r.height,
                    overlay.combined_confidence
                );
            }
        }
        None => {
            if json {
                println!("null");
            } else {
                println!("no document detected");
            }
        }
    }
    Ok(())
}

fn print_catalog_info(
    context: &DetectionContext,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let summary = context.catalog().summary();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!("{} template(s) loaded", summary.total_templates);
    for entry in &summary.entries {
        println!(
            "  {:13} brightness {:6.1}  contrast {:5.1}  header {:.3}  quality {:.3}",
            entry.kind, entry.brightness, entry.contrast, entry.header_color_ratio, entry.quality_score
        );
    }
    if let Some(best) = summary.best_kind {
        println!("best template: {best}");
    }
    Ok(())
}

fn save_crop(frame: &Frame, region: &Region, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let crop = frame
        .crop(region)
        .ok_or("detected region does not fit the frame")?;
    let mut rgb = image::RgbImage::new(crop.width(), crop.height());
    for y in 0..crop.height() {
        for x in 0..crop.width() {
            let [b, g, r] = crop.pixel(x, y);
            rgb.put_pixel(x, y, image::Rgb([r, g, b]));
        }
    }
    rgb.save(path)?;
    Ok(())
}
