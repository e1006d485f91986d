//! Triad Tracker
//!
//! Replays per-frame motions of a Gaussian point cloud through the windowed
//! tracking pipeline and reports how the cloud moves.

mod error;

use clap::Parser;
use error::AppError;
use glam::Vec3;
use std::path::PathBuf;
use tracing::{info, warn};
use triad_data::{CameraManifest, GaussianCloud};
use triad_track::{
    CompensationMode, ReplayMotionEstimator, Tracker, TrackerConfig, ViewCollection,
};

/// Triad - Dynamic Gaussian tracking over fixed-camera video
#[derive(Parser, Debug)]
#[command(name = "triad-track")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera manifest (JSON, frame-major)
    #[arg(short, long)]
    manifest: PathBuf,

    /// Initial Gaussian snapshot (PLY)
    #[arg(short, long)]
    ply: PathBuf,

    /// Precomputed motions to replay (JSON array, one entry per transition)
    #[arg(long)]
    motions: PathBuf,

    /// Tracker config (JSON); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured batch size
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Override the configured neighbor count
    #[arg(short, long)]
    neighbors: Option<usize>,

    /// Apply raw motions instead of filtered ones
    #[arg(long)]
    raw: bool,
}

fn centroid(frame: &GaussianCloud) -> Vec3 {
    if frame.is_empty() {
        return Vec3::ZERO;
    }
    frame.positions().iter().sum::<Vec3>() / frame.len() as f32
}

fn resolve_config(args: &Args) -> Result<TrackerConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(neighbors) = args.neighbors {
        config.neighbors = neighbors;
    }
    if args.raw {
        config.compensation = CompensationMode::Raw;
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}

fn run(args: &Args, config: &TrackerConfig) -> Result<(), AppError> {
    let manifest = CameraManifest::load(&args.manifest)?;
    let views = ViewCollection::from_dataset(&manifest)?;
    let baseframe = triad_data::load_gaussians_from_ply(&args.ply)?;
    if baseframe.is_empty() {
        return Err(AppError::InvalidArgument(format!(
            "{} contains no Gaussians",
            args.ply.display()
        )));
    }
    let estimator = ReplayMotionEstimator::load(&args.motions, &views)?;

    info!(
        "Tracking {} Gaussians over {} frames from {} cameras",
        baseframe.len(),
        views.sequence_len(),
        views.view_count()
    );

    let start = centroid(&baseframe);
    let mut tracker = Tracker::from_config(views, estimator, baseframe, config)?;
    let mut last = start;
    while let Some(tracked) = tracker.step()? {
        last = centroid(&tracked.frame);
        info!(
            "Frame {}: centroid ({:.4}, {:.4}, {:.4}){}",
            tracked.index,
            last.x,
            last.y,
            last.z,
            if tracked.baseframe_updated { " [base frame]" } else { "" }
        );
    }

    let scheduler = tracker.scheduler();
    info!(
        "Done: {} estimator calls, {} base frame updates, centroid moved by {:.4}",
        scheduler.invocations(),
        tracker.estimator().baseframe_updates(),
        last.distance(start)
    );
    if scheduler.invocations() != scheduler.plan().window_count() {
        warn!(
            "Expected {} estimator calls",
            scheduler.plan().window_count()
        );
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };
    init_logging(&config.log_level);

    if let Err(e) = run(&args, &config) {
        tracing::error!("Tracking failed: {}", e);
        std::process::exit(1);
    }
}
