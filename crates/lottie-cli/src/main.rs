//! # lottie-inspect
//!
//! Loads a Lottie document, prints what the composition contains and,
//! optionally, the evaluated render tree at one or more frames.

use anyhow::{Context, Result};
use clap::Parser;
use lottie_core::{AnimationInstance, Composition, LayerSummary, RenderTreeSummary};
use lottie_engine::{load_composition, FileAssetLoader, LoaderConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "lottie-inspect")]
#[command(about = "Inspect a Lottie composition and its evaluated frames")]
#[command(version)]
struct Cli {
    /// Path to the animation document (.json)
    path: PathBuf,

    /// Evaluate a single frame
    #[arg(short, long)]
    frame: Option<f32>,

    /// Evaluate this many evenly spaced frames across the whole animation
    #[arg(long, conflicts_with = "frame")]
    frames: Option<usize>,

    /// Resolution factor applied to every spatial value
    #[arg(short, long, default_value_t = 1.0)]
    scale: f32,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct MarkerReport {
    name: String,
    start_frame: f32,
    duration_frames: f32,
}

#[derive(Serialize)]
struct FrameReport {
    frame: f32,
    progress: f32,
    tree: RenderTreeSummary,
}

#[derive(Serialize)]
struct Report {
    name: Option<String>,
    version: Option<String>,
    width: f32,
    height: f32,
    start_frame: f32,
    end_frame: f32,
    frame_rate: f32,
    duration_ms: f32,
    layers: usize,
    precomps: usize,
    images: usize,
    fonts: usize,
    characters: usize,
    markers: Vec<MarkerReport>,
    warnings: Vec<String>,
    frames: Vec<FrameReport>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lottie_inspect=info,lottie_core=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let path = cli.path.to_string_lossy().into_owned();
    let composition = load_composition(
        Arc::new(FileAssetLoader),
        &path,
        LoaderConfig { scale: cli.scale },
    )
    .await
    .with_context(|| format!("failed to load {path}"))?;
    info!(path = %path, "Loaded composition");

    let frames = requested_frames(&composition, cli.frame, cli.frames);
    let report = build_report(composition, &frames);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn requested_frames(composition: &Composition, frame: Option<f32>, count: Option<usize>) -> Vec<f32> {
    match (frame, count) {
        (Some(frame), _) => vec![frame],
        (None, Some(0)) | (None, None) => Vec::new(),
        (None, Some(1)) => vec![composition.start_frame()],
        (None, Some(n)) => (0..n)
            .map(|i| composition.frame_for_progress(i as f32 / (n - 1) as f32))
            .collect(),
    }
}

fn build_report(composition: Arc<Composition>, frames: &[f32]) -> Report {
    let (width, height) = composition
        .bounds
        .map(|b| (b.width() as f32, b.height() as f32))
        .unwrap_or_default();
    let mut instance = AnimationInstance::new(composition.clone());
    let frames = frames
        .iter()
        .map(|&frame| {
            instance.set_frame(frame);
            FrameReport {
                frame: instance.frame(),
                progress: instance.progress(),
                tree: instance.render_tree().summary(),
            }
        })
        .collect();

    Report {
        name: composition.name.clone(),
        version: composition.version.clone(),
        width,
        height,
        start_frame: composition.start_frame(),
        end_frame: composition.end_frame(),
        frame_rate: composition.frame_rate(),
        duration_ms: composition.duration_ms(),
        layers: composition.layers.len(),
        precomps: composition.precomps.len(),
        images: composition.images.len(),
        fonts: composition.fonts.len(),
        characters: composition.characters.len(),
        markers: composition
            .markers
            .iter()
            .map(|m| MarkerReport {
                name: m.name.clone(),
                start_frame: m.start_frame,
                duration_frames: m.duration_frames,
            })
            .collect(),
        warnings: composition.warnings().iter().cloned().collect(),
        frames,
    }
}

fn print_report(report: &Report) {
    println!("Composition: {}", report.name.as_deref().unwrap_or("<unnamed>"));
    if let Some(version) = &report.version {
        println!("  Version:   {version}");
    }
    println!("  Size:      {} x {}", report.width, report.height);
    println!(
        "  Frames:    {} to {} at {} fps ({} ms)",
        report.start_frame, report.end_frame, report.frame_rate, report.duration_ms
    );
    println!(
        "  Contents:  {} layers, {} precomps, {} images, {} fonts, {} glyphs",
        report.layers, report.precomps, report.images, report.fonts, report.characters
    );
    for marker in &report.markers {
        println!(
            "  Marker:    {} at {} for {} frames",
            marker.name, marker.start_frame, marker.duration_frames
        );
    }
    for warning in &report.warnings {
        println!("  Warning:   {warning}");
    }

    for frame in &report.frames {
        println!();
        println!("Frame {} (progress {:.3})", frame.frame, frame.progress);
        for layer in &frame.tree.layers {
            print_layer(layer, 1);
        }
    }
}

fn print_layer(layer: &LayerSummary, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{indent}[{}] {} ({}, opacity {})",
        layer.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
        layer.name,
        layer.kind,
        layer.opacity
    );
    for shape in &layer.shapes {
        let [x0, y0, x1, y1] = shape.bounds;
        println!(
            "{indent}  shape bounds ({x0:.1}, {y0:.1})..({x1:.1}, {y1:.1}) opacity {}",
            shape.opacity
        );
    }
    for child in &layer.children {
        print_layer(child, depth + 1);
    }
}
