#[allow(dead_code)]
#[path = "../src/bin/export_video.rs"]
mod export_video;

use clap::Parser;
use contour_wallpaper::engine::ShaderEngine;
use contour_wallpaper::params::ShaderParams;
use std::path::PathBuf;

#[test]
fn parse_args_defaults_are_stable() {
    let args = export_video::Cli::try_parse_from(["export_video"]).expect("parse should succeed");

    assert_eq!(args.out, PathBuf::from("export.mp4"));
    assert_eq!(args.width, 1280);
    assert_eq!(args.height, 720);
    assert_eq!(args.fps, 60);
    assert_eq!(args.duration, 10.0);
    assert_eq!(args.scale, 2.0);
    assert_eq!(args.speed, None);
    assert!(args.still.is_none());
    assert!(args.property_overrides().is_empty());
    export_video::validate_args(&args).expect("defaults are valid");
}

#[test]
fn parse_args_overrides_work() {
    let args = export_video::Cli::try_parse_from([
        "export_video",
        "--out",
        "clips/out.mp4",
        "--width",
        "640",
        "--height",
        "360",
        "--fps",
        "30",
        "--duration",
        "12.5",
        "--seed",
        "99",
        "--speed",
        "25",
        "--background",
        "0 0 0",
        "--edge",
        "1 1 1",
    ])
    .expect("parse should succeed");

    assert_eq!(args.out, PathBuf::from("clips/out.mp4"));
    assert_eq!(args.width, 640);
    assert_eq!(args.height, 360);
    assert_eq!(args.fps, 30);
    assert_eq!(args.duration, 12.5);
    assert_eq!(args.seed, 99);
    assert_eq!(
        args.property_overrides(),
        vec![
            ("backgroundColor", "0 0 0".to_string()),
            ("edgeColor", "1 1 1".to_string()),
            ("speed", "25".to_string()),
        ]
    );
}

#[test]
fn validate_rejects_zero_fps() {
    let args = export_video::Cli::try_parse_from(["export_video", "--fps", "0"])
        .expect("parse should succeed");
    let err = export_video::validate_args(&args).expect_err("fps=0 must fail validation");
    assert!(err.to_string().contains("--fps"));
}

#[test]
fn validate_rejects_empty_frame() {
    let args = export_video::Cli::try_parse_from(["export_video", "--height", "0"])
        .expect("parse should succeed");
    let err = export_video::validate_args(&args).expect_err("height=0 must fail validation");
    assert!(err.to_string().contains("--height"));
}

#[test]
fn validate_rejects_non_positive_duration() {
    let args = export_video::Cli::try_parse_from(["export_video", "--duration", "0"])
        .expect("parse should succeed");
    let err = export_video::validate_args(&args).expect_err("duration=0 must fail validation");
    assert!(err.to_string().contains("--duration"));
}

#[test]
fn validate_rejects_negative_still_time() {
    let args = export_video::Cli::try_parse_from(["export_video", "--time=-1"])
        .expect("parse should succeed");
    let err = export_video::validate_args(&args).expect_err("negative time must fail validation");
    assert!(err.to_string().contains("--time"));
}

#[test]
fn frame_count_is_deterministic() {
    assert_eq!(export_video::compute_frame_count(2.0, 60), 120);
    assert_eq!(export_video::compute_frame_count(2.999, 30), 89);
    assert_eq!(export_video::compute_frame_count(0.01, 60), 1);
    assert_eq!(export_video::compute_frame_count(10.0, 60), 600);
}

#[test]
fn render_frames_writes_raw_rgba() {
    let mut engine = ShaderEngine::new();
    engine.resize(16, 9);
    let mut sink = Vec::new();
    export_video::render_frames(&mut engine, &ShaderParams::seeded(1), 3, 30, &mut sink)
        .expect("render frames");
    assert_eq!(sink.len(), 3 * 16 * 9 * 4);
    assert!(sink.chunks_exact(4).all(|px| px[3] == 255));
}

#[test]
fn still_is_written_as_png() {
    let dir = std::env::temp_dir().join(format!("contour_wallpaper_still_{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("still.png");

    let mut engine = ShaderEngine::new();
    engine.resize(32, 18);
    let params = ShaderParams::seeded(4);
    export_video::write_still(&mut engine, &params, 2.5, &path).expect("write still");

    let img = image::open(&path).expect("decode png").to_rgba8();
    assert_eq!(img.dimensions(), (32, 18));
    assert_eq!(img.as_raw().as_slice(), engine.render(2.5, &params, 1));
}

#[test]
fn validate_rejects_unbounded_duration() {
    for raw in ["inf", "NaN"] {
        let args = export_video::Cli::try_parse_from(["export_video", "--duration", raw])
            .expect("parse should succeed");
        let err = export_video::validate_args(&args).expect_err("duration must be finite");
        assert!(err.to_string().contains("--duration"), "{raw}: {err}");
    }
}
