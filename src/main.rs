use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = contour_wallpaper::config::Config::parse();
    if let Some(path) = &cfg.log_file {
        contour_wallpaper::logging::init_file(&cfg.log_level, path)?;
    }

    contour_wallpaper::app::run(cfg)
}
