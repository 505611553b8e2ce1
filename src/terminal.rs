use anyhow::Context;
use crossterm::{
    cursor, queue,
    terminal::{self, ClearType},
};
use std::io::{stdout, Stdout, Write};

/// Synchronized output off, autowrap on, attributes reset: every mode a renderer
/// may leave behind mid-frame.
const RESTORE_MODES: &[u8] = b"\x1b[?2026l\x1b[?7h\x1b[0m";

/// Smallest terminal that still shows a picture.
pub const MIN_COLS: u16 = 4;
pub const MIN_ROWS: u16 = 2;

/// Terminal size in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub cols: u16,
    pub rows: u16,
}

/// Pixel target that fits the picture area of a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureArea {
    pub visual_rows: u16,
    pub width: usize,
    pub height: usize,
}

impl TermSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Rows left for the picture once `hud_rows` are reserved (at least one), and
    /// the pixel size that fills them at `cell_pixels` pixels per cell.
    pub fn picture(self, cell_pixels: (usize, usize), hud_rows: u16) -> PictureArea {
        let visual_rows = self.rows.saturating_sub(hud_rows).max(1);
        PictureArea {
            visual_rows,
            width: (self.cols as usize).saturating_mul(cell_pixels.0),
            height: (visual_rows as usize).saturating_mul(cell_pixels.1),
        }
    }
}

/// Raw mode, alternate screen and hidden cursor while alive.
pub struct TerminalSession {
    _private: (),
}

impl TerminalSession {
    pub fn enter() -> anyhow::Result<Self> {
        terminal::enable_raw_mode().context("enable raw mode")?;
        // Exists before the screen switch so a failure below still leaves raw mode.
        let session = Self { _private: () };

        let mut out = stdout();
        queue!(
            out,
            terminal::EnterAlternateScreen,
            terminal::Clear(ClearType::All),
            cursor::Hide
        )
        .context("prepare alternate screen")?;
        out.flush().context("flush terminal setup")?;

        tracing::debug!("terminal session entered");
        Ok(session)
    }

    pub fn stdout() -> Stdout {
        stdout()
    }

    /// Current size, rejecting terminals below `MIN_COLS` x `MIN_ROWS`.
    pub fn size() -> anyhow::Result<TermSize> {
        let (cols, rows) = terminal::size().context("get terminal size")?;
        if cols < MIN_COLS || rows < MIN_ROWS {
            anyhow::bail!(
                "terminal too small (need at least {MIN_COLS}x{MIN_ROWS}, got {cols}x{rows})"
            );
        }
        Ok(TermSize::new(cols, rows))
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let mut out = stdout();
        let _ = out.write_all(RESTORE_MODES);
        let _ = queue!(out, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = out.flush();
        tracing::debug!("terminal session restored");
    }
}
