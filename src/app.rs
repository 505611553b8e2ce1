use crate::config::{Config, RendererMode};
use crate::engine::ShaderEngine;
use crate::params::{ShaderParams, SharedParams};
use crate::properties::{load_property_file, report_batch, PropertyBatch, PropertyError, PropertyUpdate};
use crate::property_feed::{PropertyFeed, DEFAULT_POLL};
use crate::render::{AsciiRenderer, Frame, HalfBlockRenderer, Renderer};
use crate::terminal::{TermSize, TerminalSession};
use crate::uniforms::{FrameClock, FrameRate};
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Speed step for the `+`/`-` keys, in property units.
const SPEED_STEP: f32 = 1.0;

/// Seeded defaults, then the property file, then command-line overrides. Rejected
/// values are logged and leave the earlier value in place.
pub fn startup_params(
    seed: u64,
    scale: f32,
    properties: Option<&Path>,
    overrides: &[(&str, String)],
) -> anyhow::Result<ShaderParams> {
    let mut params = ShaderParams::seeded(seed);
    if scale.is_finite() {
        params.noise.scale = scale;
    } else {
        tracing::warn!(scale, "ignoring non-finite scale");
    }

    if let Some(path) = properties {
        let batch = load_property_file(path)
            .with_context(|| format!("read properties from {}", path.display()))?;
        report_batch(&path.display().to_string(), &batch);
        params = batch.updates.iter().fold(params, |p, u| p.apply(u));
    }

    let mut cli = PropertyBatch::default();
    for (name, value) in overrides {
        match PropertyUpdate::parse(name, value) {
            Ok(Some(u)) => cli.updates.push(u),
            Ok(None) => cli.ignored.push(name.to_string()),
            Err(err) => cli.errors.push(err),
        }
    }
    report_batch("command line", &cli);
    Ok(cli.updates.iter().fold(params, |p, u| p.apply(u)))
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let seed = cfg.resolve_seed();
    let overrides = cfg.property_overrides();
    let initial = startup_params(seed, cfg.scale, cfg.properties.as_deref(), &overrides)?;
    tracing::info!(
        seed,
        y_offset = initial.noise.y_offset,
        scale = initial.noise.scale,
        speed = initial.noise.speed,
        background = %initial.colors.background,
        edge = %initial.colors.edge,
        "starting wallpaper"
    );

    let shared = Arc::new(SharedParams::new(initial));
    let feed = match &cfg.properties {
        Some(path) => Some(PropertyFeed::spawn(
            path.clone(),
            Arc::clone(&shared),
            DEFAULT_POLL,
        )?),
        None => None,
    };

    let _term = TerminalSession::enter()?;
    let mut out = BufWriter::new(TerminalSession::stdout());

    let mut renderer: Box<dyn Renderer> = match cfg.renderer {
        RendererMode::HalfBlock => Box::new(HalfBlockRenderer::new()),
        RendererMode::Ascii => Box::new(AsciiRenderer::new()),
    };
    let cell = renderer.cell_pixels();

    let mut engine = ShaderEngine::new();
    let mut last_size = TerminalSession::size()?;
    let mut show_hud = true;
    let mut show_help = false;
    let mut hud_rows = hud_rows_for_size(last_size, show_hud);
    resize_engine(&mut engine, last_size, cell, hud_rows);

    let clock = FrameClock::start();
    let mut runtime = RuntimeTuning::new(cfg.adaptive_quality);
    let mut fps = FrameRate::new(0.5);
    let mut last_engine_ms = 0.0f32;
    let mut last_render_ms = 0.0f32;
    let mut last_total_ms = 0.0f32;

    loop {
        let now = Instant::now();

        // Drain input events (non-blocking).
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    let old_hud = show_hud;
                    if handle_key(k.code, k.modifiers, &shared, &mut show_hud, &mut show_help) {
                        return Ok(());
                    }
                    if show_hud != old_hud {
                        hud_rows = hud_rows_for_size(last_size, show_hud);
                        resize_engine(&mut engine, last_size, cell, hud_rows);
                    }
                }
                Event::Resize(c, r) => {
                    last_size = TermSize::new(c, r);
                    hud_rows = hud_rows_for_size(last_size, show_hud);
                    resize_engine(&mut engine, last_size, cell, hud_rows);
                    tracing::debug!(cols = c, rows = r, "terminal resized");
                }
                _ => {}
            }
        }

        // Resize events can be missed in some terminals.
        let (cols, rows) = crossterm::terminal::size()?;
        let sz = TermSize::new(cols, rows);
        if sz != last_size {
            last_size = sz;
            hud_rows = hud_rows_for_size(last_size, show_hud);
            resize_engine(&mut engine, last_size, cell, hud_rows);
        }

        // One snapshot for the whole frame.
        let params = shared.load();

        let TermSize {
            cols: term_cols,
            rows: term_rows,
        } = last_size;
        let viewport = engine.viewport();
        let hud = if show_hud {
            build_wrapped_hud(
                term_cols as usize,
                &HudStatus {
                    seed,
                    params: &params,
                    resolution: viewport.resolution(),
                    scale: runtime.scale,
                    updates: feed.as_ref().map(PropertyFeed::applied),
                    fps: fps.fps(),
                    engine_ms: last_engine_ms,
                    render_ms: last_render_ms,
                    total_ms: last_total_ms,
                    renderer: renderer.name(),
                },
            )
        } else {
            String::new()
        };

        let target_hud_rows = hud_rows_for_text(term_rows, show_hud, &hud);
        if target_hud_rows != hud_rows {
            hud_rows = target_hud_rows;
            resize_engine(&mut engine, last_size, cell, hud_rows);
        }
        let area = last_size.picture(cell, hud_rows);

        let engine_start = Instant::now();
        let pixels = engine.render(clock.seconds_at(now), &params, runtime.scale);
        last_engine_ms = engine_start.elapsed().as_secs_f32() * 1000.0;

        let frame = Frame {
            term_cols,
            term_rows,
            visual_rows: area.visual_rows,
            pixel_width: area.width,
            pixel_height: area.height,
            pixels_rgba: pixels,
            hud: &hud,
            hud_rows,
            overlay: show_help.then_some(help_popup_text()),
            sync_updates: cfg.sync_updates,
        };

        let render_start = Instant::now();
        renderer.render(&frame, &mut out)?;
        last_render_ms = render_start.elapsed().as_secs_f32() * 1000.0;
        last_total_ms = now.elapsed().as_secs_f32() * 1000.0;

        fps.record(clock.seconds());
        if let Some(scale) = runtime.update(last_total_ms, 1000.0 / cfg.fps.max(1) as f32) {
            tracing::debug!(scale, ema_ms = runtime.ema_ms, "adaptive block scale changed");
        }

        // Frame pacing.
        let target = Duration::from_secs_f32(1.0 / cfg.fps.max(1) as f32);
        let elapsed = now.elapsed();
        if elapsed < target {
            std::thread::sleep(target - elapsed);
        }
    }
}

fn resize_engine(engine: &mut ShaderEngine, size: TermSize, cell: (usize, usize), hud_rows: u16) {
    let area = size.picture(cell, hud_rows);
    engine.resize(area.width, area.height);
}

/// Returns `true` when the user asked to quit.
fn handle_key(
    code: KeyCode,
    mods: KeyModifiers,
    params: &SharedParams,
    show_hud: &mut bool,
    show_help: &mut bool,
) -> bool {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return true;
    }

    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => {
            step_speed(params, SPEED_STEP);
            false
        }
        KeyCode::Char('-') | KeyCode::Char('_') | KeyCode::Down => {
            step_speed(params, -SPEED_STEP);
            false
        }
        KeyCode::Char('i') | KeyCode::Char('I') => {
            *show_hud = !*show_hud;
            false
        }
        KeyCode::Char('?') | KeyCode::Char('/') | KeyCode::Char('h') | KeyCode::Char('H') => {
            *show_help = !*show_help;
            false
        }
        _ => false,
    }
}

/// Keyboard speed changes travel the same path as external property updates.
fn step_speed(params: &SharedParams, delta: f32) {
    let mut rejected = None;
    let next = params.update(|p| {
        let value = format!("{:.3}", p.noise.user_speed() + delta);
        match speed_update(&value) {
            Ok(u) => p.apply(&u),
            Err(err) => {
                rejected = Some(err);
                p
            }
        }
    });
    match rejected {
        Some(err) => tracing::warn!("discarding speed step: {err}"),
        None => tracing::debug!(speed = next.noise.speed, "speed changed from keyboard"),
    }
}

fn speed_update(value: &str) -> Result<PropertyUpdate, PropertyError> {
    PropertyUpdate::parse("speed", value)?.ok_or_else(|| PropertyError::InvalidNumber {
        property: "speed".to_string(),
        raw: value.to_string(),
    })
}

struct HudStatus<'a> {
    seed: u64,
    params: &'a ShaderParams,
    resolution: (u32, u32),
    scale: usize,
    updates: Option<u64>,
    fps: f32,
    engine_ms: f32,
    render_ms: f32,
    total_ms: f32,
    renderer: &'static str,
}

fn hud_rows_for_size(size: TermSize, show_hud: bool) -> u16 {
    if !show_hud || size.rows <= 1 {
        return 0;
    }
    (size.rows - 1).min(3)
}

fn hud_rows_for_text(term_rows: u16, show_hud: bool, hud: &str) -> u16 {
    if !show_hud {
        return 0;
    }
    let max_rows = term_rows.saturating_sub(1);
    let wanted = hud.lines().count() as u16;
    wanted.min(max_rows)
}

fn build_wrapped_hud(cols: usize, s: &HudStatus<'_>) -> String {
    let noise = &s.params.noise;
    let colors = &s.params.colors;
    let updates = match s.updates {
        Some(n) => n.to_string(),
        None => "off".to_string(),
    };
    let logical_lines = vec![
        format!(
            "Seed: {} | yOff: {:.2} | Scale: {:.2} | Speed: {:.2} ({:.4}) | BG: {} | Edge: {} | Feed: {}",
            s.seed,
            noise.y_offset,
            noise.scale,
            noise.user_speed(),
            noise.speed,
            colors.background,
            colors.edge,
            updates,
        ),
        format!(
            "{}x{} px | Block: {} | FPS: {:>4.1} | ms(E/R/T): {:>4.1}/{:>4.1}/{:>4.1} | Renderer: {}",
            s.resolution.0,
            s.resolution.1,
            s.scale,
            s.fps,
            s.engine_ms,
            s.render_ms,
            s.total_ms,
            s.renderer,
        ),
        "Keys: +/- speed | i HUD | ?/h help | q quit".to_string(),
    ];

    logical_lines
        .iter()
        .flat_map(|line| hard_wrap_line(line, cols.max(1)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn hard_wrap_line(line: &str, width: usize) -> Vec<String> {
    if line.is_empty() {
        return vec![String::new()];
    }
    let chars: Vec<char> = line.chars().collect();
    chars
        .chunks(width.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn help_popup_text() -> &'static str {
    "Contour Wallpaper\n\
+ / = / up  faster drift\n\
- / down  slower drift\n\
i  show/hide HUD\n\
? or / or h  toggle this help\n\
q or esc  quit\n\
\n\
Edit the --properties file to change\n\
backgroundColor, edgeColor or speed live."
}

/// Doubles the evaluation block size (up to 4x4) when frames run long and halves it
/// again once there is headroom.
struct RuntimeTuning {
    scale: usize,
    adaptive: bool,
    ema_ms: f32,
}

impl RuntimeTuning {
    const MAX_SCALE: usize = 4;

    fn new(adaptive: bool) -> Self {
        Self {
            scale: 1,
            adaptive,
            ema_ms: 0.0,
        }
    }

    /// Returns the new block scale when it changed.
    fn update(&mut self, frame_ms: f32, target_ms: f32) -> Option<usize> {
        if !self.adaptive {
            return None;
        }
        self.ema_ms = if self.ema_ms == 0.0 {
            frame_ms
        } else {
            self.ema_ms * 0.95 + frame_ms * 0.05
        };

        let before = self.scale;
        if self.ema_ms > target_ms * 1.22 {
            self.scale = (self.scale * 2).min(Self::MAX_SCALE);
        } else if self.ema_ms < target_ms * 0.72 && self.scale > 1 {
            self.scale /= 2;
        }
        if self.scale != before {
            // Start the average over at the new cost level.
            self.ema_ms = 0.0;
            Some(self.scale)
        } else {
            None
        }
    }
}
