//! The per-pixel color function: two drifting noise layers, posterized into
//! bands, edge-detected with a 3x3 Laplacian and composited between two colors.

pub mod simplex;

use crate::params::{NoiseParameters, ShaderParams};
use crate::uniforms::FrameUniforms;

/// Quantization divisor; yields `POSTERIZE_STEPS + 1` bands.
pub const POSTERIZE_STEPS: f32 = 7.0;
pub const LEVELS: usize = 8;

/// Two noise layers drifting in opposite directions, mapped from about `[-2, 2]`
/// to about `[0, 1]`. Not clamped.
pub fn sample_noise(coord: (f32, f32), time: f32, noise: &NoiseParameters) -> f32 {
    let drift = time * noise.speed;
    let x = coord.0 * noise.scale;
    let y = coord.1 * noise.scale + noise.y_offset;
    let n1 = simplex::noise2(x + drift, y);
    let n2 = simplex::noise2(x - drift, y);
    (n1 + n2) / 4.0 + 0.5
}

/// Quantize [`sample_noise`] to the nearest of `{0, 1/7, ..., 1}`.
pub fn posterized_noise(coord: (f32, f32), time: f32, noise: &NoiseParameters) -> f32 {
    let n = sample_noise(coord, time, noise);
    (n * POSTERIZE_STEPS + 0.5).floor() / POSTERIZE_STEPS
}

/// Magnitude of the discrete Laplacian of the posterized field around `coord`.
pub fn edge_intensity(
    coord: (f32, f32),
    time: f32,
    pixel_offset: (f32, f32),
    noise: &NoiseParameters,
) -> f32 {
    let (ox, oy) = pixel_offset;
    let (x, y) = coord;
    let center = posterized_noise(coord, time, noise);

    let neighbors = [
        (x, y + oy),
        (x, y - oy),
        (x - ox, y),
        (x + ox, y),
        (x - ox, y + oy),
        (x + ox, y + oy),
        (x - ox, y - oy),
        (x + ox, y - oy),
    ];

    // 8*center - sum(neighbors), accumulated as differences so a flat
    // neighbourhood cancels to exactly zero.
    let laplacian: f32 = neighbors
        .iter()
        .map(|&p| center - posterized_noise(p, time, noise))
        .sum();
    laplacian.abs()
}

pub fn blend_factor(edge: f32) -> f32 {
    edge.clamp(0.0, 1.0)
}

pub fn mix_rgb(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    let it = 1.0 - t;
    [
        a[0] * it + b[0] * t,
        a[1] * it + b[1] * t,
        a[2] * it + b[2] * t,
    ]
}

/// Aspect-corrected noise coordinate for a screen position in `[0, 1]^2`.
pub fn noise_coord(uv: (f32, f32), aspect_ratio: f32) -> (f32, f32) {
    (uv.0 * aspect_ratio, uv.1)
}

/// Linear RGB in `[0, 1]` for screen position `uv`.
pub fn pixel_color(uv: (f32, f32), uniforms: &FrameUniforms, params: &ShaderParams) -> [f32; 3] {
    let coord = noise_coord(uv, uniforms.aspect_ratio());
    let edge = edge_intensity(
        coord,
        uniforms.time,
        uniforms.pixel_offset(),
        &params.noise,
    );
    let t = blend_factor(edge);
    mix_rgb(
        params.colors.background.to_unit(),
        params.colors.edge.to_unit(),
        t,
    )
}

/// Opaque RGBA8, rounding to the nearest channel value.
pub fn to_rgba8(c: [f32; 3]) -> [u8; 4] {
    [
        (c[0].clamp(0.0, 1.0) * 255.0).round() as u8,
        (c[1].clamp(0.0, 1.0) * 255.0).round() as u8,
        (c[2].clamp(0.0, 1.0) * 255.0).round() as u8,
        255,
    ]
}

/// Fragment-center `uv` for pixel `(x, y)` of a `w x h` target whose row 0 is the top.
pub fn pixel_uv(x: usize, y: usize, w: usize, h: usize) -> (f32, f32) {
    let wf = w.max(1) as f32;
    let hf = h.max(1) as f32;
    ((x as f32 + 0.5) / wf, 1.0 - (y as f32 + 0.5) / hf)
}
