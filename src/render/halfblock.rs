use crate::render::{text_frame_begin, text_frame_end, write_bg_rgb, write_fg_rgb, Frame, Renderer};
use std::io::Write;

/// Two vertically stacked pixels per cell: foreground paints the upper half block,
/// background the lower.
pub struct HalfBlockRenderer {
    last_fg: Option<(u8, u8, u8)>,
    last_bg: Option<(u8, u8, u8)>,
}

impl HalfBlockRenderer {
    pub fn new() -> Self {
        Self {
            last_fg: None,
            last_bg: None,
        }
    }
}

impl Default for HalfBlockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for HalfBlockRenderer {
    fn name(&self) -> &'static str {
        "halfblock"
    }

    fn cell_pixels(&self) -> (usize, usize) {
        (1, 2)
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some((cols, visual_rows, w, _h)) = text_frame_begin(frame, 1, 2, out)? else {
            return Ok(());
        };

        // Colors do not carry over between frames: the frame starts with a reset.
        self.last_fg = None;
        self.last_bg = None;

        const HALF_BLOCK: char = '\u{2580}';
        let px = frame.pixels_rgba;

        for row in 0..visual_rows {
            let top_y = row * 2;
            let bot_y = top_y + 1;
            for x in 0..cols {
                let ti = (top_y * w + x) * 4;
                let bi = (bot_y * w + x) * 4;
                let top = (px[ti], px[ti + 1], px[ti + 2]);
                let bot = (px[bi], px[bi + 1], px[bi + 2]);

                if self.last_fg != Some(top) {
                    write_fg_rgb(out, top.0, top.1, top.2)?;
                    self.last_fg = Some(top);
                }
                if self.last_bg != Some(bot) {
                    write_bg_rgb(out, bot.0, bot.1, bot.2)?;
                    self.last_bg = Some(bot);
                }
                write!(out, "{HALF_BLOCK}")?;
            }
            out.write_all(b"\r\n")?;
        }

        text_frame_end(frame, cols, visual_rows, out)
    }
}
