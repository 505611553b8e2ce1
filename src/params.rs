use crate::properties::PropertyUpdate;
use std::fmt;
use std::sync::atomic::{fence, AtomicU32, AtomicU64, Ordering};

pub const DEFAULT_SCALE: f32 = 2.0;
pub const DEFAULT_SPEED: f32 = 0.05;
/// User-facing speed values are multiplied by this before reaching the shader.
pub const SPEED_FACTOR: f32 = 0.004;
pub const Y_OFFSET_RANGE: f32 = 100.0;

pub const DEFAULT_BACKGROUND: Rgb8 = Rgb8::from_hex(0x20_20_20);
pub const DEFAULT_EDGE: Rgb8 = Rgb8::from_hex(0x30_30_30);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseParameters {
    /// Spatial frequency multiplier.
    pub scale: f32,
    /// Time-to-phase multiplier, in shader units.
    pub speed: f32,
    /// Vertical offset into the noise plane, fixed for the session.
    pub y_offset: f32,
}

impl NoiseParameters {
    /// Default scale and speed with a vertical offset in `[0, 100)` derived from `seed`.
    pub fn seeded(seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        Self {
            scale: DEFAULT_SCALE,
            speed: DEFAULT_SPEED,
            y_offset: rng.f32() * Y_OFFSET_RANGE,
        }
    }

    /// Speed as the user-facing value the configuration channel speaks.
    pub fn user_speed(&self) -> f32 {
        self.speed / SPEED_FACTOR
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn from_hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xFF) as u8,
            g: ((rgb >> 8) & 0xFF) as u8,
            b: (rgb & 0xFF) as u8,
        }
    }

    pub const fn to_hex(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    pub fn to_unit(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl fmt::Display for Rgb8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorParameters {
    pub background: Rgb8,
    pub edge: Rgb8,
}

impl Default for ColorParameters {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND,
            edge: DEFAULT_EDGE,
        }
    }
}

/// Everything the pixel function reads besides the frame uniforms. Treated as an
/// immutable value; changes produce a new snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaderParams {
    pub noise: NoiseParameters,
    pub colors: ColorParameters,
}

impl ShaderParams {
    pub fn seeded(seed: u64) -> Self {
        Self {
            noise: NoiseParameters::seeded(seed),
            colors: ColorParameters::default(),
        }
    }

    pub fn apply(mut self, update: &PropertyUpdate) -> Self {
        match *update {
            PropertyUpdate::BackgroundColor(c) => self.colors.background = c,
            PropertyUpdate::EdgeColor(c) => self.colors.edge = c,
            PropertyUpdate::Speed(speed) => self.noise.speed = speed,
        }
        self
    }
}

/// Sequence-locked [`ShaderParams`] shared between the frame loop and whoever
/// delivers configuration changes.
///
/// A reader always gets a snapshot written by exactly one `store`: it never mixes
/// fields from two different writes. Odd sequence values mean a write is in progress.
pub struct SharedParams {
    seq: AtomicU64,
    scale: AtomicU32,
    speed: AtomicU32,
    y_offset: AtomicU32,
    background: AtomicU32,
    edge: AtomicU32,
}

impl SharedParams {
    pub fn new(params: ShaderParams) -> Self {
        let shared = Self {
            seq: AtomicU64::new(0),
            scale: AtomicU32::new(0),
            speed: AtomicU32::new(0),
            y_offset: AtomicU32::new(0),
            background: AtomicU32::new(0),
            edge: AtomicU32::new(0),
        };
        shared.write_fields(&params);
        shared
    }

    pub fn store(&self, params: ShaderParams) {
        let _claim = self.begin_write();
        self.write_fields(&params);
    }

    /// Read-modify-write under the write claim, so concurrent edits are not lost.
    /// The claim is released even if `f` panics; the stored value is then unchanged.
    pub fn update(&self, f: impl FnOnce(ShaderParams) -> ShaderParams) -> ShaderParams {
        let _claim = self.begin_write();
        let next = f(self.read_fields());
        self.write_fields(&next);
        next
    }

    /// Publish a batch of updates as a single snapshot.
    pub fn apply_all(&self, updates: &[PropertyUpdate]) -> ShaderParams {
        self.update(|p| updates.iter().fold(p, |acc, u| acc.apply(u)))
    }

    pub fn apply(&self, update: &PropertyUpdate) -> ShaderParams {
        self.update(|p| p.apply(update))
    }

    pub fn load(&self) -> ShaderParams {
        loop {
            let v1 = self.seq.load(Ordering::Acquire);
            if v1 & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let params = self.read_fields();

            fence(Ordering::Acquire);
            let v2 = self.seq.load(Ordering::Relaxed);
            if v1 == v2 {
                return params;
            }
        }
    }

    /// Number of completed writes.
    pub fn version(&self) -> u64 {
        self.seq.load(Ordering::Acquire) / 2
    }

    fn begin_write(&self) -> WriteClaim<'_> {
        loop {
            let cur = self.seq.load(Ordering::Relaxed);
            if cur & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }
            if self
                .seq
                .compare_exchange_weak(cur, cur + 1, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                fence(Ordering::Release);
                return WriteClaim {
                    seq: &self.seq,
                    start: cur,
                };
            }
        }
    }

    fn write_fields(&self, p: &ShaderParams) {
        self.scale.store(p.noise.scale.to_bits(), Ordering::Relaxed);
        self.speed.store(p.noise.speed.to_bits(), Ordering::Relaxed);
        self.y_offset
            .store(p.noise.y_offset.to_bits(), Ordering::Relaxed);
        self.background
            .store(p.colors.background.to_hex(), Ordering::Relaxed);
        self.edge.store(p.colors.edge.to_hex(), Ordering::Relaxed);
    }

    fn read_fields(&self) -> ShaderParams {
        ShaderParams {
            noise: NoiseParameters {
                scale: f32::from_bits(self.scale.load(Ordering::Relaxed)),
                speed: f32::from_bits(self.speed.load(Ordering::Relaxed)),
                y_offset: f32::from_bits(self.y_offset.load(Ordering::Relaxed)),
            },
            colors: ColorParameters {
                background: Rgb8::from_hex(self.background.load(Ordering::Relaxed)),
                edge: Rgb8::from_hex(self.edge.load(Ordering::Relaxed)),
            },
        }
    }
}

/// Odd sequence held by one writer. Dropping it publishes the write, including
/// on unwind, so readers never spin on an abandoned claim.
struct WriteClaim<'a> {
    seq: &'a AtomicU64,
    start: u64,
}

impl Drop for WriteClaim<'_> {
    fn drop(&mut self) {
        self.seq.store(self.start + 2, Ordering::Release);
    }
}
