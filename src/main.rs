use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use lapsim::SimConfig;
use lapsim::domain::{Action, Track, TrackData};
use lapsim::sim::{Constant, Driver, Race};

/// Run a headless race on a track file
///
/// Examples:
///   # One car, accelerating, for ten simulated seconds
///   lapsim --track map.json
///
///   # Full grid of five cars for 3000 ticks
///   lapsim --track map.json --cars 5 --ticks 3000
///
///   # Track still in authoring coordinates, fitted to a 1200x800 screen
///   lapsim --track raw.json --fit 1200x800 --fit-scale 0.9
///
///   # Dump what every car perceives after the last tick
///   lapsim --track map.json --cars 3 --perception out.json
#[derive(Parser, Debug)]
#[command(name = "lapsim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Track JSON file (outer_points, inner_points, checkpoints, finish_line)
    #[arg(short = 't', long)]
    track: PathBuf,

    /// Path to config file (optional, auto-searches lapsim.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of cars placed on the starting grid
    #[arg(short = 'n', long, default_value = "1")]
    cars: usize,

    /// Maximum number of ticks to simulate
    #[arg(long, default_value = "600")]
    ticks: u64,

    /// Action every car repeats: accelerate, brake, left, right or coast
    #[arg(short = 'a', long, default_value = "accelerate")]
    action: Action,

    /// Fit the track into a WIDTHxHEIGHT viewport before racing
    #[arg(long, value_parser = parse_viewport)]
    fit: Option<(f64, f64)>,

    /// Extra scale applied with --fit
    #[arg(long, default_value = "1.0", requires = "fit")]
    fit_scale: f64,

    /// Write the final perceptions as JSON to this file
    #[arg(long)]
    perception: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let total_start = Instant::now();

    let default_level = if args.verbose { "lapsim=debug" } else { "lapsim=warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .try_init();

    let config = if let Some(ref config_path) = args.config {
        if config_path.exists() {
            SimConfig::from_path(config_path)?
        } else {
            bail!("Config file not found: {:?}", config_path);
        }
    } else {
        SimConfig::load().unwrap_or_default()
    };

    let mut data = TrackData::load(&args.track)?;
    if let Some((width, height)) = args.fit {
        data = data.fit_to_viewport(width, height, args.fit_scale);
    }
    let track = Track::new(data, config.race.gate_depth)
        .with_context(|| format!("Invalid track: {:?}", args.track))?;

    if args.verbose {
        println!("Configuration:");
        println!("  Track: {}", args.track.display());
        println!(
            "  Width at finish: {:.1}, checkpoints: {}",
            track.width_at_finish(),
            track.checkpoints().len()
        );
        println!("  Cars: {}", args.cars);
        println!("  Action: {}", args.action);
        println!("  Collision policy: {:?}", config.race.collision_policy);
        println!("  Progress rule: {:?}", config.race.progress);
        println!();
    }

    let mut race = Race::new(Arc::new(track), config).context("Invalid configuration")?;
    race.spawn_grid(args.cars)
        .context("Failed to place cars on the starting grid")?;

    let mut drivers: Vec<Box<dyn Driver>> = (0..args.cars)
        .map(|_| Box::new(Constant(args.action)) as Box<dyn Driver>)
        .collect();

    let bar = create_progress_bar(args.ticks)?;
    let mut contacts = 0usize;
    let mut finishes = 0usize;
    while race.tick() < args.ticks && !race.is_over() {
        let report = race.drive(&mut drivers);
        contacts += report.contacts.len();
        finishes += report
            .events
            .iter()
            .filter(|e| matches!(e, lapsim::sim::ProgressEvent::Finished { .. }))
            .count();
        bar.inc(1);
        bar.set_message(format!("{finishes}/{} finished", args.cars));
    }
    bar.finish_with_message(format!(
        "{} ticks ({:.1}s simulated), {} contacts [{:.1}s]",
        race.tick(),
        race.elapsed_secs(),
        contacts,
        total_start.elapsed().as_secs_f32()
    ));

    println!();
    println!("Standings");
    println!("=========");
    for row in race.standings() {
        match row.finished_at {
            Some(tick) => println!(
                "  {}. {:<8} finished at tick {}",
                row.position, row.name, tick
            ),
            None => println!(
                "  {}. {:<8} {} checkpoints, {:.1} to {:?}",
                row.position, row.name, row.visited, row.distance_to_target, row.target
            ),
        }
    }

    if let Some(ref path) = args.perception {
        let json = serde_json::to_string_pretty(&race.perceptions())
            .context("Failed to serialize perceptions")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write perceptions: {:?}", path))?;
        println!();
        println!("Perceptions: {}", path.display());
    }

    Ok(())
}

fn parse_viewport(s: &str) -> std::result::Result<(f64, f64), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let w: f64 = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h: f64 = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    if !(w > 0.0 && h > 0.0) {
        return Err(format!("viewport must be positive, got {s:?}"));
    }
    Ok((w, h))
}

fn create_progress_bar(ticks: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(ticks);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ticks {msg}")?
            .progress_chars("=> ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    Ok(pb)
}
