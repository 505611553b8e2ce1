mod ascii;
mod halfblock;

pub use ascii::AsciiRenderer;
pub use halfblock::HalfBlockRenderer;

use std::io::Write;

/// One terminal frame: the RGBA target plus the text drawn around it.
pub struct Frame<'a> {
    pub term_cols: u16,
    pub term_rows: u16,
    pub visual_rows: u16,
    pub pixel_width: usize,
    pub pixel_height: usize,
    pub pixels_rgba: &'a [u8],
    pub hud: &'a str,
    pub hud_rows: u16,
    pub overlay: Option<&'a str>,
    pub sync_updates: bool,
}

pub trait Renderer {
    fn name(&self) -> &'static str;
    /// Pixels per terminal cell, `(columns, rows)`.
    fn cell_pixels(&self) -> (usize, usize);
    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()>;
}

pub(crate) fn luma_u8(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 54 + g as u32 * 183 + b as u32 * 19) >> 8) as u8
}

pub(crate) fn write_fg_rgb(out: &mut dyn Write, r: u8, g: u8, b: u8) -> std::io::Result<()> {
    write!(out, "\x1b[38;2;{};{};{}m", r, g, b)
}

pub(crate) fn write_bg_rgb(out: &mut dyn Write, r: u8, g: u8, b: u8) -> std::io::Result<()> {
    write!(out, "\x1b[48;2;{};{};{}m", r, g, b)
}

/// Validate the frame geometry and start painting. Returns
/// `(cols, visual_rows, pixel_width, pixel_height)`, or `None` when there is nothing
/// to paint.
pub(crate) fn text_frame_begin(
    frame: &Frame<'_>,
    px_per_col: usize,
    px_per_row: usize,
    out: &mut dyn Write,
) -> anyhow::Result<Option<(usize, usize, usize, usize)>> {
    let cols = frame.term_cols as usize;
    let visual_rows = frame.visual_rows as usize;
    let w = frame.pixel_width;
    let h = frame.pixel_height;

    if cols == 0 || visual_rows == 0 || w == 0 || h == 0 {
        return Ok(None);
    }
    if w != cols.saturating_mul(px_per_col) || h != visual_rows.saturating_mul(px_per_row) {
        // Internal mismatch; avoid panics.
        return Ok(None);
    }

    let need = w.saturating_mul(h).saturating_mul(4);
    if frame.pixels_rgba.len() < need {
        if frame.sync_updates {
            out.write_all(b"\x1b[?2026h")?;
        }
        out.write_all(b"\x1b[H\x1b[0m\x1b[2J")?;
        write!(
            out,
            "pixel buffer too small (need {}, got {})",
            need,
            frame.pixels_rgba.len()
        )?;
        if frame.sync_updates {
            out.write_all(b"\x1b[?2026l")?;
        }
        out.flush()?;
        return Ok(None);
    }

    if frame.sync_updates {
        out.write_all(b"\x1b[?2026h")?;
    }
    // Home, reset, then disable autowrap (DECAWM) while painting full-width rows so the
    // last column does not wrap into the next line.
    out.write_all(b"\x1b[H\x1b[0m")?;
    out.write_all(b"\x1b[?7l")?;

    Ok(Some((cols, visual_rows, w, h)))
}

/// HUD, overlay, autowrap restore and flush.
pub(crate) fn text_frame_end(
    frame: &Frame<'_>,
    cols: usize,
    visual_rows: usize,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut hud_lines = frame.hud.lines();
    for i in 0..(frame.hud_rows as usize) {
        write!(out, "\x1b[{};1H\x1b[0m\x1b[2K", visual_rows + i + 1)?;
        if let Some(line) = hud_lines.next() {
            let clipped: String = line.chars().take(cols).collect();
            write!(out, "{clipped}")?;
        }
    }

    if let Some(text) = frame.overlay {
        draw_overlay_popup(out, frame.term_cols, frame.term_rows, text)?;
    }

    out.write_all(b"\x1b[?7h")?;
    if frame.sync_updates {
        out.write_all(b"\x1b[?2026l")?;
    }
    out.flush()?;
    Ok(())
}

pub fn draw_overlay_popup(
    out: &mut dyn Write,
    term_cols: u16,
    term_rows: u16,
    text: &str,
) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }

    let cols = term_cols as usize;
    let rows = term_rows as usize;
    if cols < 8 || rows < 4 {
        return Ok(());
    }

    let max_inner_w = cols.saturating_sub(6).max(1);
    let lines = wrap_chars(text, max_inner_w);
    if lines.is_empty() {
        return Ok(());
    }

    let inner_w = lines
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(1, max_inner_w);
    let box_w = (inner_w + 4).min(cols.saturating_sub(2)).max(4);
    let inner_w = box_w.saturating_sub(4);
    let body_h = lines.len().min(rows.saturating_sub(3).max(1));
    let box_h = (body_h + 2).min(rows.saturating_sub(1)).max(3);

    let start_col = (cols.saturating_sub(box_w)) / 2 + 1;
    let start_row = (rows.saturating_sub(box_h)) / 2 + 1;

    let horiz = "-".repeat(box_w.saturating_sub(2));
    let blank = " ".repeat(inner_w);

    out.write_all(b"\x1b[0m\x1b[38;2;236;242;255m\x1b[48;2;10;14;24m")?;
    write!(out, "\x1b[{};{}H+{}+", start_row, start_col, horiz)?;
    for (i, line) in lines.iter().take(body_h).enumerate() {
        let row = start_row + 1 + i;
        write!(out, "\x1b[{};{}H| {} |", row, start_col, blank)?;
        if i == 0 {
            // Title line.
            write!(
                out,
                "\x1b[{};{}H\x1b[1m{}\x1b[22m",
                row,
                start_col + 2,
                line
            )?;
        } else {
            write!(out, "\x1b[{};{}H{}", row, start_col + 2, line)?;
        }
    }
    write!(out, "\x1b[{};{}H+{}+", start_row + box_h - 1, start_col, horiz)?;
    out.write_all(b"\x1b[0m")?;
    Ok(())
}

fn wrap_chars(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }
        let chars: Vec<char> = raw.chars().collect();
        for chunk in chars.chunks(width.max(1)) {
            lines.push(chunk.iter().collect());
        }
    }
    lines
}
