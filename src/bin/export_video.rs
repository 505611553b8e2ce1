use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use contour_wallpaper::app::startup_params;
use contour_wallpaper::engine::ShaderEngine;
use contour_wallpaper::params::ShaderParams;

const DEFAULT_OUTPUT: &str = "export.mp4";
const DEFAULT_SEED: u64 = 0xF15D_2026;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "export_video",
    version,
    about = "Offline wallpaper export (raw frames -> MP4 via ffmpeg, or a single PNG still)"
)]
pub(crate) struct Cli {
    #[arg(long, value_name = "MP4", default_value = DEFAULT_OUTPUT)]
    pub(crate) out: PathBuf,

    #[arg(long, default_value_t = 1280)]
    pub(crate) width: usize,

    #[arg(long, default_value_t = 720)]
    pub(crate) height: usize,

    #[arg(long, default_value_t = 60)]
    pub(crate) fps: u32,

    #[arg(long, value_name = "SECONDS", default_value_t = 10.0)]
    pub(crate) duration: f32,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub(crate) seed: u64,

    #[arg(long, default_value_t = 2.0)]
    pub(crate) scale: f32,

    #[arg(long, allow_hyphen_values = true)]
    pub(crate) speed: Option<f32>,

    #[arg(long, value_name = "R G B")]
    pub(crate) background: Option<String>,

    #[arg(long, value_name = "R G B")]
    pub(crate) edge: Option<String>,

    #[arg(long, value_name = "FILE")]
    pub(crate) properties: Option<PathBuf>,

    /// Write one frame at `--time` to this PNG instead of encoding a video.
    #[arg(long, value_name = "PNG")]
    pub(crate) still: Option<PathBuf>,

    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub(crate) time: f32,
}

impl Cli {
    pub(crate) fn property_overrides(&self) -> Vec<(&'static str, String)> {
        let mut v = Vec::new();
        if let Some(bg) = &self.background {
            v.push(("backgroundColor", bg.clone()));
        }
        if let Some(edge) = &self.edge {
            v.push(("edgeColor", edge.clone()));
        }
        if let Some(speed) = self.speed {
            v.push(("speed", speed.to_string()));
        }
        v
    }
}

pub(crate) fn compute_frame_count(duration_s: f32, fps: u32) -> usize {
    ((duration_s.max(0.0) * fps as f32).floor() as usize).max(1)
}

pub(crate) fn validate_args(args: &Cli) -> Result<()> {
    if args.width == 0 {
        bail!("--width must be >= 1");
    }
    if args.height == 0 {
        bail!("--height must be >= 1");
    }
    if args.fps == 0 {
        bail!("--fps must be >= 1");
    }
    if !args.duration.is_finite() || args.duration <= 0.0 {
        bail!("--duration must be a finite number of seconds > 0");
    }
    if !args.time.is_finite() || args.time < 0.0 {
        bail!("--time must be a finite, non-negative number of seconds");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    contour_wallpaper::logging::init_stderr("info")?;
    run(args)
}

fn run(args: Cli) -> Result<()> {
    validate_args(&args)?;

    let params = startup_params(
        args.seed,
        args.scale,
        args.properties.as_deref(),
        &args.property_overrides(),
    )?;
    let mut engine = ShaderEngine::new();
    engine.resize(args.width, args.height);

    if let Some(path) = &args.still {
        return write_still(&mut engine, &params, args.time, path);
    }

    ensure_ffmpeg_available()?;
    let frames = compute_frame_count(args.duration, args.fps);
    tracing::info!(
        frames,
        width = args.width,
        height = args.height,
        fps = args.fps,
        out = %args.out.display(),
        "exporting video"
    );

    let mut ffmpeg = spawn_ffmpeg(&args.out, args.width, args.height, args.fps)?;
    let mut ffmpeg_in = ffmpeg
        .stdin
        .take()
        .context("failed to open ffmpeg stdin for rawvideo input")?;
    render_frames(&mut engine, &params, frames, args.fps, &mut ffmpeg_in)?;
    drop(ffmpeg_in);

    let status = ffmpeg.wait().context("wait for ffmpeg")?;
    if !status.success() {
        bail!("ffmpeg exited with status {status}");
    }
    tracing::info!(out = %args.out.display(), "export finished");
    Ok(())
}

pub(crate) fn write_still(
    engine: &mut ShaderEngine,
    params: &ShaderParams,
    time: f32,
    path: &Path,
) -> Result<()> {
    let (w, h) = engine.viewport().resolution();
    let pixels = engine.render(time, params, 1).to_vec();
    let img = image::RgbaImage::from_raw(w, h, pixels)
        .ok_or_else(|| anyhow!("frame buffer does not match {w}x{h}"))?;
    img.save(path)
        .with_context(|| format!("write still to {}", path.display()))?;
    tracing::info!(path = %path.display(), time, "wrote still");
    Ok(())
}

fn ensure_ffmpeg_available() -> Result<()> {
    match Command::new("ffmpeg")
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(anyhow!("ffmpeg -version exited with status {status}")),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            bail!("ffmpeg not found in PATH (install ffmpeg and retry)")
        }
        Err(err) => Err(anyhow!("failed to run ffmpeg: {err}")),
    }
}

fn spawn_ffmpeg(
    out_path: &Path,
    width: usize,
    height: usize,
    fps: u32,
) -> Result<std::process::Child> {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-hide_banner")
        .arg("-loglevel")
        .arg("error")
        .arg("-y")
        .arg("-f")
        .arg("rawvideo")
        .arg("-pix_fmt")
        .arg("rgba")
        .arg("-video_size")
        .arg(format!("{width}x{height}"))
        .arg("-framerate")
        .arg(fps.to_string())
        .arg("-i")
        .arg("-")
        .arg("-c:v")
        .arg("libx264")
        .arg("-pix_fmt")
        .arg("yuv420p")
        .arg("-movflags")
        .arg("+faststart")
        .arg(out_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    cmd.spawn()
        .with_context(|| format!("spawn ffmpeg for output {}", out_path.display()))
}

pub(crate) fn render_frames(
    engine: &mut ShaderEngine,
    params: &ShaderParams,
    frames: usize,
    fps: u32,
    sink: &mut dyn Write,
) -> Result<()> {
    let fps_f = fps as f32;
    for frame_idx in 0..frames {
        let t = frame_idx as f32 / fps_f;
        let pixels = engine.render(t, params, 1);
        sink.write_all(pixels).context("write frame to ffmpeg stdin")?;
    }
    Ok(())
}
