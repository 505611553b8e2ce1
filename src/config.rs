use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "contour-wallpaper",
    version,
    about = "Posterized edge-noise wallpaper rendered in the terminal"
)]
pub struct Config {
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Seed for the session's vertical noise offset. Random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Spatial frequency of the noise field.
    #[arg(long, default_value_t = 2.0)]
    pub scale: f32,

    /// Drift speed in property units (multiplied by 0.004).
    #[arg(long, allow_hyphen_values = true)]
    pub speed: Option<f32>,

    /// Background color as "r g b" channels in [0, 1].
    #[arg(long, value_name = "R G B")]
    pub background: Option<String>,

    /// Edge color as "r g b" channels in [0, 1].
    #[arg(long, value_name = "R G B")]
    pub edge: Option<String>,

    #[arg(long, value_enum, default_value_t = RendererMode::HalfBlock)]
    pub renderer: RendererMode,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub adaptive_quality: bool,

    /// `name = value` property file, applied at startup and re-read when it changes.
    #[arg(long, value_name = "FILE")]
    pub properties: Option<PathBuf>,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    #[value(alias = "ansi", alias = "text")]
    Ascii,
    #[value(name = "half-block", alias = "halfblock", alias = "half_block", alias = "hb")]
    HalfBlock,
}

impl Config {
    /// Command-line overrides in property form, so they go through the same parser
    /// and rejection rules as runtime updates.
    pub fn property_overrides(&self) -> Vec<(&'static str, String)> {
        let mut v = Vec::new();
        if let Some(bg) = &self.background {
            v.push(("backgroundColor", bg.clone()));
        }
        if let Some(edge) = &self.edge {
            v.push(("edgeColor", edge.clone()));
        }
        if let Some(speed) = self.speed {
            v.push(("speed", speed.to_string()));
        }
        v
    }

    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| fastrand::u64(..))
    }
}
