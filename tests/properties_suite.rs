use contour_wallpaper::app::startup_params;
use contour_wallpaper::params::{Rgb8, ShaderParams, DEFAULT_BACKGROUND, DEFAULT_EDGE, DEFAULT_SPEED};
use contour_wallpaper::properties::{
    load_property_file, parse_color, parse_property_lines, parse_speed, unit_to_channel,
    PropertyError, PropertyUpdate,
};
use std::path::PathBuf;

fn temp_file(name: &str, body: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "contour_wallpaper_props_{}_{}",
        std::process::id(),
        name
    ));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("wallpaper.properties");
    std::fs::write(&path, body).expect("write temp properties");
    path
}

#[test]
fn channels_use_ceiling_rounding() {
    assert_eq!(unit_to_channel(0.0), 0);
    assert_eq!(unit_to_channel(1.0), 255);
    assert_eq!(unit_to_channel(0.5), 128); // 127.5 rounds up
    assert_eq!(unit_to_channel(0.1), 26); // 25.5 rounds up
    assert_eq!(unit_to_channel(0.001), 1);
}

#[test]
fn channels_saturate_out_of_range() {
    assert_eq!(unit_to_channel(-0.3), 0);
    assert_eq!(unit_to_channel(1.7), 255);
}

#[test]
fn parses_three_channel_color() {
    assert_eq!(parse_color("backgroundColor", "0 0.5 1").unwrap(), Rgb8::new(0, 128, 255));
    assert_eq!(
        parse_color("edgeColor", "  1\t0.1   0 ").unwrap(),
        Rgb8::new(255, 26, 0)
    );
}

#[test]
fn rejects_wrong_channel_count() {
    let err = parse_color("edgeColor", "0.1 0.2").unwrap_err();
    assert_eq!(
        err,
        PropertyError::ChannelCount {
            property: "edgeColor".to_string(),
            found: 2
        }
    );
    assert!(matches!(
        parse_color("edgeColor", "0.1 0.2 0.3 0.4"),
        Err(PropertyError::ChannelCount { found: 4, .. })
    ));
    assert!(matches!(
        parse_color("edgeColor", ""),
        Err(PropertyError::ChannelCount { found: 0, .. })
    ));
}

#[test]
fn rejects_unparsable_or_non_finite_channels() {
    assert!(matches!(
        parse_color("backgroundColor", "0.1 red 0.3"),
        Err(PropertyError::InvalidNumber { .. })
    ));
    assert!(matches!(
        parse_color("backgroundColor", "0.1 NaN 0.3"),
        Err(PropertyError::InvalidNumber { .. })
    ));
    assert!(matches!(
        parse_color("backgroundColor", "inf 0 0"),
        Err(PropertyError::InvalidNumber { .. })
    ));
}

#[test]
fn speed_is_scaled_by_factor() {
    assert!((parse_speed("speed", "12.5").unwrap() - 0.05).abs() < 1e-7);
    assert!((parse_speed("speed", " 25 ").unwrap() - 0.1).abs() < 1e-7);
    assert_eq!(parse_speed("speed", "0").unwrap(), 0.0);
    assert!(parse_speed("speed", "fast").is_err());
    assert!(parse_speed("speed", "").is_err());
}

#[test]
fn property_names_and_aliases() {
    let bg = PropertyUpdate::parse("backgroundColor", "1 1 1").unwrap();
    assert_eq!(bg, Some(PropertyUpdate::BackgroundColor(Rgb8::new(255, 255, 255))));
    for name in ["background", "BACKGROUNDCOLOR", "background_color", "background-color"] {
        assert!(
            matches!(
                PropertyUpdate::parse(name, "0 0 0"),
                Ok(Some(PropertyUpdate::BackgroundColor(_)))
            ),
            "{name}"
        );
    }
    for name in ["edgeColor", "edge", "linescolor", "lines"] {
        assert!(
            matches!(
                PropertyUpdate::parse(name, "0 0 0"),
                Ok(Some(PropertyUpdate::EdgeColor(_)))
            ),
            "{name}"
        );
    }
    assert!(matches!(
        PropertyUpdate::parse("Speed", "5"),
        Ok(Some(PropertyUpdate::Speed(_)))
    ));
}

#[test]
fn unknown_properties_are_ignored() {
    assert_eq!(PropertyUpdate::parse("fps", "60").unwrap(), None);
    assert_eq!(PropertyUpdate::parse("schemecolor", "not even a color").unwrap(), None);
}

#[test]
fn update_names_are_canonical() {
    assert_eq!(PropertyUpdate::Speed(0.0).name(), "speed");
    assert_eq!(
        PropertyUpdate::BackgroundColor(DEFAULT_BACKGROUND).name(),
        "backgroundColor"
    );
    assert_eq!(PropertyUpdate::EdgeColor(DEFAULT_EDGE).name(), "edgeColor");
}

#[test]
fn line_parser_keeps_good_lines_around_bad_ones() {
    let text = "
        # wallpaper properties
        backgroundColor = 0 0 0
        edgeColor = 0.5 0.5
        speed = 25
        this line has no separator
        lines = 1 1 1
        unknown = whatever
    ";
    let batch = parse_property_lines(text);
    assert_eq!(
        batch.updates,
        vec![
            PropertyUpdate::BackgroundColor(Rgb8::new(0, 0, 0)),
            PropertyUpdate::Speed(25.0 * 0.004),
            PropertyUpdate::EdgeColor(Rgb8::new(255, 255, 255)),
        ]
    );
    assert_eq!(batch.errors.len(), 2);
    assert!(matches!(batch.errors[0], PropertyError::Parse { line: 4, .. }));
    assert!(matches!(batch.errors[1], PropertyError::Parse { line: 6, .. }));
    assert_eq!(batch.ignored, vec!["unknown".to_string()]);
}

#[test]
fn rejected_update_retains_previous_value() {
    let base = ShaderParams::seeded(1).apply(&PropertyUpdate::EdgeColor(Rgb8::new(1, 2, 3)));
    let batch = parse_property_lines("edgeColor = 0.2 oops 0.3\n");
    assert!(batch.updates.is_empty());
    let next = batch.updates.iter().fold(base, |p, u| p.apply(u));
    assert_eq!(next.colors.edge, Rgb8::new(1, 2, 3));
}

#[test]
fn error_messages_are_readable() {
    let e = PropertyError::Parse {
        line: 3,
        message: "expected <name>=<value>".to_string(),
    };
    assert_eq!(e.to_string(), "parse error at line 3: expected <name>=<value>");
    let e = PropertyError::ChannelCount {
        property: "edgeColor".to_string(),
        found: 1,
    };
    assert_eq!(e.to_string(), "edgeColor: expected 3 color channels, got 1");
}

#[test]
fn missing_file_is_an_empty_batch() {
    let path = std::env::temp_dir().join("contour_wallpaper_definitely_missing.properties");
    let batch = load_property_file(&path).expect("missing file is not an error");
    assert!(batch.is_empty());
}

#[test]
fn startup_layers_file_then_command_line() {
    let path = temp_file(
        "layers",
        "backgroundColor = 1 0 0\nedgeColor = 0 1 0\nspeed = 5\n",
    );
    let overrides = vec![
        ("edgeColor", "0 0 1".to_string()),
        ("speed", "not-a-number".to_string()),
    ];
    let p = startup_params(9, 3.0, Some(path.as_path()), &overrides).expect("startup params");
    assert_eq!(p.noise.scale, 3.0);
    assert_eq!(p.colors.background, Rgb8::new(255, 0, 0));
    // Command line wins over the file.
    assert_eq!(p.colors.edge, Rgb8::new(0, 0, 255));
    // The bad override is discarded, the file value stays.
    assert!((p.noise.speed - 5.0 * 0.004).abs() < 1e-7);
    assert_eq!(p.noise.y_offset, ShaderParams::seeded(9).noise.y_offset);
}

#[test]
fn startup_without_sources_is_seeded_default() {
    let p = startup_params(21, 2.0, None, &[]).expect("startup params");
    assert_eq!(p, ShaderParams::seeded(21));
    assert_eq!(p.noise.speed, DEFAULT_SPEED);
}

#[test]
fn property_feed_publishes_file_changes() {
    use contour_wallpaper::params::SharedParams;
    use contour_wallpaper::property_feed::PropertyFeed;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    let path = temp_file("feed", "speed = 5\n");
    let shared = Arc::new(SharedParams::new(ShaderParams::seeded(3)));
    let feed = PropertyFeed::spawn(path.clone(), Arc::clone(&shared), Duration::from_millis(10))
        .expect("spawn feed");

    // Existing contents are the baseline and are not re-applied.
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(shared.version(), 0);

    std::fs::write(&path, "edgeColor = 1 1 1\nbackgroundColor = 0 0 0\nbogus = 1\n")
        .expect("rewrite properties");
    let deadline = Instant::now() + Duration::from_secs(5);
    while shared.version() == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }

    let p = shared.load();
    assert_eq!(shared.version(), 1, "both colors land in one snapshot");
    assert_eq!(p.colors.edge, Rgb8::new(255, 255, 255));
    assert_eq!(p.colors.background, Rgb8::new(0, 0, 0));
    assert_eq!(p.noise.speed, DEFAULT_SPEED);
    assert_eq!(feed.applied(), 2);
    drop(feed);
}

#[test]
fn command_line_overrides_use_property_names() {
    use clap::Parser;
    use contour_wallpaper::config::Config;

    let cfg = Config::try_parse_from([
        "contour-wallpaper",
        "--speed",
        "-3",
        "--edge",
        "0.1 0.5 1",
    ])
    .expect("parse args");
    let overrides = cfg.property_overrides();
    assert!(overrides.contains(&("speed", "-3".to_string())));
    assert!(overrides.iter().any(|(name, value)| {
        matches!(
            PropertyUpdate::parse(name, value),
            Ok(Some(PropertyUpdate::EdgeColor(c))) if c == Rgb8::new(26, 128, 255)
        )
    }));
    assert!(overrides.iter().all(|(name, _)| *name != "backgroundColor"));
}

#[test]
fn property_feed_sees_same_length_rewrite_with_unchanged_mtime() {
    use contour_wallpaper::params::SharedParams;
    use contour_wallpaper::property_feed::PropertyFeed;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    let path = temp_file("same_len", "speed = 5\n");
    let modified = std::fs::metadata(&path)
        .and_then(|m| m.modified())
        .expect("read mtime");
    let shared = Arc::new(SharedParams::new(ShaderParams::seeded(3)));
    let feed = PropertyFeed::spawn(path.clone(), Arc::clone(&shared), Duration::from_millis(10))
        .expect("spawn feed");
    std::thread::sleep(Duration::from_millis(60));

    // Same byte length, and the mtime is put back so only the contents differ.
    std::fs::write(&path, "speed = 6\n").expect("rewrite properties");
    std::fs::File::options()
        .write(true)
        .open(&path)
        .and_then(|f| f.set_modified(modified))
        .expect("restore mtime");

    let deadline = Instant::now() + Duration::from_secs(5);
    while shared.version() == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(shared.version(), 1, "rewrite was not detected");
    assert!((shared.load().noise.speed - 6.0 * 0.004).abs() < 1e-7);
    drop(feed);
}
