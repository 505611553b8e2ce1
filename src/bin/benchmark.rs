use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use contour_wallpaper::engine::ShaderEngine;
use contour_wallpaper::params::{Rgb8, ShaderParams, SharedParams};
use contour_wallpaper::properties::PropertyUpdate;

#[derive(Parser, Debug, Clone)]
#[command(name = "benchmark", about = "CPU frame-time benchmark for the wallpaper shader")]
struct Args {
    #[arg(long, default_value_t = 120)]
    frames: usize,

    #[arg(long = "w", default_value_t = 320)]
    width: usize,

    #[arg(long = "h", default_value_t = 180)]
    height: usize,

    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Fail when the full-resolution pass is slower than `--max-ms` or draws no edges.
    #[arg(long, default_value_t = false)]
    ci_smoke: bool,

    #[arg(long, default_value_t = 20.0)]
    max_ms: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    contour_wallpaper::logging::init_stderr("warn")?;

    let params = ShaderParams::seeded(args.seed);
    let frames = args.frames.max(1);
    println!(
        "CPU benchmark: frames={} size={}x{} seed={} threads={}",
        frames,
        args.width,
        args.height,
        args.seed,
        rayon::current_num_threads()
    );

    let mut full_ms = 0.0f64;
    let mut full_edges = 0usize;
    for scale in [1usize, 2, 4] {
        let (ms, edges) = bench_scale(&args, &params, frames, scale);
        println!(
            "  block {}x{}: {:>8.3} ms/frame  {:>7.2} FPS  edge px/frame={}",
            scale,
            scale,
            ms,
            if ms > 0.0 { 1000.0 / ms } else { 0.0 },
            edges
        );
        if scale == 1 {
            full_ms = ms;
            full_edges = edges;
        }
    }

    bench_snapshot_churn(&args, frames)?;

    if args.ci_smoke {
        let mut failures = Vec::new();
        if full_edges == 0 {
            failures.push("no edge pixels rendered".to_string());
        }
        if full_ms > args.max_ms {
            failures.push(format!("{:.3} ms/frame > {:.3}", full_ms, args.max_ms));
        }
        if !failures.is_empty() {
            eprintln!("CI smoke: FAIL");
            for f in &failures {
                eprintln!("  {f}");
            }
            anyhow::bail!("ci smoke failed");
        }
        println!("CI smoke: PASS (max_ms={:.3})", args.max_ms);
    }

    Ok(())
}

/// Average ms/frame and average count of pixels differing from the background.
fn bench_scale(args: &Args, params: &ShaderParams, frames: usize, scale: usize) -> (f64, usize) {
    let mut engine = ShaderEngine::new();
    engine.resize(args.width, args.height);
    let bg = params.colors.background;

    let start = Instant::now();
    let mut edges = 0usize;
    for f in 0..frames {
        let px = engine.render(f as f32 / 60.0, params, scale);
        edges += count_off_background(px, bg);
    }
    let ms = start.elapsed().as_secs_f64() * 1000.0 / frames as f64;
    (ms, edges / frames)
}

fn count_off_background(px: &[u8], bg: Rgb8) -> usize {
    px.chunks_exact(4)
        .filter(|p| p[0] != bg.r || p[1] != bg.g || p[2] != bg.b)
        .count()
}

/// Render while another thread keeps swapping the palette, to measure the cost of
/// snapshot reads under write contention.
fn bench_snapshot_churn(args: &Args, frames: usize) -> Result<()> {
    let shared = Arc::new(SharedParams::new(ShaderParams::seeded(args.seed)));
    let stop = Arc::new(AtomicBool::new(false));

    let writer = {
        let shared = Arc::clone(&shared);
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            let palettes = [
                ("0 0 0", "1 1 1"),
                ("0.1 0.2 0.3", "0.9 0.8 0.7"),
            ];
            let mut i = 0usize;
            while !stop.load(Ordering::Relaxed) {
                let (bg, edge) = palettes[i % palettes.len()];
                let updates = [
                    PropertyUpdate::parse("backgroundColor", bg),
                    PropertyUpdate::parse("edgeColor", edge),
                ];
                let updates: Vec<PropertyUpdate> = updates
                    .into_iter()
                    .filter_map(|u| u.ok().flatten())
                    .collect();
                shared.apply_all(&updates);
                i += 1;
                std::thread::sleep(Duration::from_micros(200));
            }
        })
    };

    let mut engine = ShaderEngine::new();
    engine.resize(args.width, args.height);
    let start = Instant::now();
    for f in 0..frames {
        let snapshot = shared.load();
        engine.render(f as f32 / 60.0, &snapshot, 1);
    }
    let ms = start.elapsed().as_secs_f64() * 1000.0 / frames as f64;

    stop.store(true, Ordering::Relaxed);
    writer
        .join()
        .map_err(|_| anyhow::anyhow!("palette writer thread panicked"))?;

    println!(
        "  snapshot churn: {:>8.3} ms/frame  writes={}",
        ms,
        shared.version()
    );
    Ok(())
}
