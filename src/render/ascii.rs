use crate::render::{luma_u8, text_frame_begin, text_frame_end, write_fg_rgb, Frame, Renderer};
use std::io::Write;

/// One pixel per cell, drawn as a colored glyph from a luma ramp. For terminals
/// without reliable block glyphs.
pub struct AsciiRenderer {
    last_fg: Option<(u8, u8, u8)>,
}

impl AsciiRenderer {
    pub fn new() -> Self {
        Self { last_fg: None }
    }
}

impl Default for AsciiRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for AsciiRenderer {
    fn name(&self) -> &'static str {
        "ascii"
    }

    fn cell_pixels(&self) -> (usize, usize) {
        (1, 1)
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some((cols, visual_rows, w, _h)) = text_frame_begin(frame, 1, 1, out)? else {
            return Ok(());
        };

        self.last_fg = None;

        // Dark -> bright. The wallpaper palette is usually dim, so the ramp starts
        // with visible glyphs rather than a blank.
        const RAMP: &[u8] = b".:-=+*#%@";

        for y in 0..visual_rows {
            for x in 0..cols {
                let idx = (y * w + x) * 4;
                let r = frame.pixels_rgba[idx];
                let g = frame.pixels_rgba[idx + 1];
                let b = frame.pixels_rgba[idx + 2];

                let l = luma_u8(r, g, b) as usize;
                let ch = RAMP[l * (RAMP.len() - 1) / 255];

                let fg = (r, g, b);
                if self.last_fg != Some(fg) {
                    write_fg_rgb(out, r, g, b)?;
                    self.last_fg = Some(fg);
                }
                out.write_all(&[ch])?;
            }
            out.write_all(b"\r\n")?;
        }

        text_frame_end(frame, cols, visual_rows, out)
    }
}
