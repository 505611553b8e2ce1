use std::time::Instant;

/// Pixel size of the render target. Resolution and aspect ratio are only ever
/// replaced together, through [`Viewport::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    width: u32,
    height: u32,
    aspect_ratio: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        let aspect_ratio = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        Self {
            width,
            height,
            aspect_ratio,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// Per-frame read-only inputs of the pixel function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub time: f32,
    pub viewport: Viewport,
}

impl FrameUniforms {
    pub fn new(time: f32, viewport: Viewport) -> Self {
        Self { time, viewport }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.viewport.aspect_ratio()
    }

    /// One-pixel step in noise space. Both axes use the height so the step is
    /// isotropic after the x axis has been aspect-corrected.
    pub fn pixel_offset(&self) -> (f32, f32) {
        let h = self.viewport.height().max(1) as f32;
        (1.0 / h, 1.0 / h)
    }
}

/// Monotonic seconds since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    start: Instant,
}

impl FrameClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn seconds_at(&self, now: Instant) -> f32 {
        now.saturating_duration_since(self.start).as_secs_f32()
    }

    pub fn seconds(&self) -> f32 {
        self.seconds_at(Instant::now())
    }
}

/// Frames per second over windows of at least `window` seconds of [`FrameClock`] time.
#[derive(Debug, Clone, Copy)]
pub struct FrameRate {
    window: f32,
    window_start: Option<f32>,
    frames: u32,
    fps: f32,
}

impl FrameRate {
    pub fn new(window: f32) -> Self {
        Self {
            window,
            window_start: None,
            frames: 0,
            fps: 0.0,
        }
    }

    /// Count a frame finished at clock time `seconds`. Returns the new rate when a
    /// window closes.
    pub fn record(&mut self, seconds: f32) -> Option<f32> {
        let Some(start) = self.window_start else {
            self.window_start = Some(seconds);
            return None;
        };
        self.frames += 1;
        let elapsed = seconds - start;
        if elapsed < self.window || elapsed <= 0.0 {
            return None;
        }
        self.fps = self.frames as f32 / elapsed;
        self.frames = 0;
        self.window_start = Some(seconds);
        Some(self.fps)
    }

    /// Last completed window's rate; 0 until one closes.
    pub fn fps(&self) -> f32 {
        self.fps
    }
}
