//! Named property updates: the configuration channel of the wallpaper.
//!
//! Values arrive as raw strings, the way a wallpaper host hands them over. Colors are
//! three whitespace-separated channels in `[0, 1]`; speed is a single number in user
//! units. Anything that fails to parse is rejected as a whole so the previous value
//! stays in effect.

use crate::params::{Rgb8, SPEED_FACTOR};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyUpdate {
    BackgroundColor(Rgb8),
    EdgeColor(Rgb8),
    /// Already scaled to shader units.
    Speed(f32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    Io(String),
    Parse { line: usize, message: String },
    InvalidNumber { property: String, raw: String },
    ChannelCount { property: String, found: usize },
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Parse { line, message } => write!(f, "parse error at line {line}: {message}"),
            Self::InvalidNumber { property, raw } => {
                write!(f, "{property}: '{raw}' is not a finite number")
            }
            Self::ChannelCount { property, found } => {
                write!(f, "{property}: expected 3 color channels, got {found}")
            }
        }
    }
}

impl std::error::Error for PropertyError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropertyKind {
    Background,
    Edge,
    Speed,
}

fn property_kind(name: &str) -> Option<PropertyKind> {
    let key: String = name
        .trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect();
    match key.as_str() {
        "backgroundcolor" | "background" => Some(PropertyKind::Background),
        "edgecolor" | "edge" | "linescolor" | "lines" => Some(PropertyKind::Edge),
        "speed" => Some(PropertyKind::Speed),
        _ => None,
    }
}

impl PropertyUpdate {
    /// `Ok(None)` for property names this wallpaper does not know about.
    pub fn parse(name: &str, value: &str) -> Result<Option<Self>, PropertyError> {
        let Some(kind) = property_kind(name) else {
            return Ok(None);
        };
        let update = match kind {
            PropertyKind::Background => Self::BackgroundColor(parse_color(name, value)?),
            PropertyKind::Edge => Self::EdgeColor(parse_color(name, value)?),
            PropertyKind::Speed => Self::Speed(parse_speed(name, value)?),
        };
        Ok(Some(update))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BackgroundColor(_) => "backgroundColor",
            Self::EdgeColor(_) => "edgeColor",
            Self::Speed(_) => "speed",
        }
    }
}

/// `"r g b"` with each channel in `[0, 1]`, converted with `ceil(v * 255)`.
pub fn parse_color(property: &str, raw: &str) -> Result<Rgb8, PropertyError> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(PropertyError::ChannelCount {
            property: property.to_string(),
            found: parts.len(),
        });
    }
    let mut channels = [0u8; 3];
    for (dst, part) in channels.iter_mut().zip(&parts) {
        let v = parse_finite(property, part)?;
        *dst = unit_to_channel(v);
    }
    Ok(Rgb8::new(channels[0], channels[1], channels[2]))
}

/// User speed value scaled into shader units.
pub fn parse_speed(property: &str, raw: &str) -> Result<f32, PropertyError> {
    let v = parse_finite(property, raw.trim())?;
    Ok(v as f32 * SPEED_FACTOR)
}

/// Ceiling rounding, saturated to the channel range.
pub fn unit_to_channel(v: f64) -> u8 {
    (v * 255.0).ceil().clamp(0.0, 255.0) as u8
}

fn parse_finite(property: &str, raw: &str) -> Result<f64, PropertyError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(PropertyError::InvalidNumber {
            property: property.to_string(),
            raw: raw.to_string(),
        }),
    }
}

/// Result of reading a block of `name = value` lines. Bad lines are collected in
/// `errors` and do not stop the rest from applying.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBatch {
    pub updates: Vec<PropertyUpdate>,
    pub errors: Vec<PropertyError>,
    pub ignored: Vec<String>,
}

impl PropertyBatch {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.errors.is_empty() && self.ignored.is_empty()
    }
}

pub fn parse_property_lines(text: &str) -> PropertyBatch {
    let mut batch = PropertyBatch::default();
    for (line_idx, raw) in text.lines().enumerate() {
        let line_no = line_idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key_raw, value_raw)) = line.split_once('=') else {
            batch.errors.push(PropertyError::Parse {
                line: line_no,
                message: "expected <name>=<value>".to_string(),
            });
            continue;
        };
        let key = key_raw.trim();
        match PropertyUpdate::parse(key, value_raw.trim()) {
            Ok(Some(update)) => batch.updates.push(update),
            Ok(None) => batch.ignored.push(key.to_string()),
            Err(err) => batch.errors.push(PropertyError::Parse {
                line: line_no,
                message: err.to_string(),
            }),
        }
    }
    batch
}

/// A missing file reads as an empty batch.
pub fn load_property_file(path: &Path) -> Result<PropertyBatch, PropertyError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(parse_property_lines(&text)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(PropertyBatch::default()),
        Err(err) => Err(PropertyError::Io(err.to_string())),
    }
}

/// Log a batch's rejects and unknown names.
pub fn report_batch(source: &str, batch: &PropertyBatch) {
    for err in &batch.errors {
        tracing::warn!(source, "discarding property update: {err}");
    }
    for name in &batch.ignored {
        tracing::debug!(source, property = %name, "ignoring unknown property");
    }
    if !batch.updates.is_empty() {
        tracing::info!(source, count = batch.updates.len(), "applying property updates");
    }
}
