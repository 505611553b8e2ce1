use crate::params::ShaderParams;
use crate::shader::{pixel_color, pixel_uv, to_rgba8};
use crate::uniforms::{FrameUniforms, Viewport};
use rayon::prelude::*;

/// CPU frame driver: owns the RGBA target and re-evaluates every pixel per frame.
pub struct ShaderEngine {
    front: Vec<u8>,
    viewport: Viewport,
}

impl ShaderEngine {
    pub fn new() -> Self {
        Self {
            front: Vec::new(),
            viewport: Viewport::default(),
        }
    }

    pub fn resize(&mut self, w: usize, h: usize) {
        self.viewport = Viewport::new(w as u32, h as u32);
        let n = w.saturating_mul(h).saturating_mul(4);
        self.front.resize(n, 0);
        self.front.fill(0);
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn uniforms(&self, time: f32) -> FrameUniforms {
        FrameUniforms::new(time, self.viewport)
    }

    pub fn frame(&self) -> &[u8] {
        &self.front
    }

    /// `scale > 1` evaluates one pixel per `scale x scale` block and fills the block.
    pub fn render(&mut self, time: f32, params: &ShaderParams, scale: usize) -> &[u8] {
        let uniforms = self.uniforms(time);
        render_into(&uniforms, params, scale, &mut self.front);
        &self.front
    }
}

impl Default for ShaderEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a full frame into `out` (`w * h * 4` bytes, row 0 at the top), one
/// parallel task per band of `scale` rows.
pub fn render_into(uniforms: &FrameUniforms, params: &ShaderParams, scale: usize, out: &mut [u8]) {
    let (w, h) = uniforms.viewport.resolution();
    let (w, h) = (w as usize, h as usize);
    if w == 0 || h == 0 {
        return;
    }
    let frame_len = w.saturating_mul(h).saturating_mul(4);
    if out.len() < frame_len {
        return;
    }

    let scale = scale.max(1);
    let row_bytes = w * 4;

    out[..frame_len]
        .par_chunks_mut(row_bytes * scale)
        .enumerate()
        .for_each(|(band, rows)| {
            let y0 = band * scale;
            let band_rows = rows.len() / row_bytes;
            for bx in (0..w).step_by(scale) {
                let uv = pixel_uv(bx, y0, w, h);
                let px = to_rgba8(pixel_color(uv, uniforms, params));
                let x_end = (bx + scale).min(w);
                for row in 0..band_rows {
                    let base = row * row_bytes;
                    for x in bx..x_end {
                        let i = base + x * 4;
                        rows[i..i + 4].copy_from_slice(&px);
                    }
                }
            }
        });
}
