use super::*;

#[test]
fn defaults_resolve_to_local_api() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.source.kind, SourceKind::Api);
    assert_eq!(settings.source.api_base_url.as_str(), "http://localhost:4000/");
    assert_eq!(settings.source.request_timeout, Duration::from_secs(10));
    assert_eq!(settings.listing.options(), ListingOptions::default());
    assert_eq!(settings.listing.breakpoint_px, 768);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.source.kind = Some("api".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        source: SourceOverrides {
            kind: Some(SourceKindArg::Documents),
            log_level: Some("debug".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.source.kind, SourceKind::Documents);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = SourceOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_source_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn listing_overrides_feed_options() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        listing_narrow_page_size: Some(4),
        listing_wide_page_size: Some(12),
        listing_max_visible_pages: Some(7),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let options = Settings::from_raw(raw).expect("valid settings").listing.options();

    assert_eq!(options.page_sizes.narrow, 4);
    assert_eq!(options.page_sizes.wide, 12);
    assert_eq!(options.max_visible_pages, 7);
}

#[test]
fn zero_page_size_is_rejected() {
    let mut raw = RawSettings::default();
    raw.listing.wide_page_size = Some(0);

    let err = Settings::from_raw(raw).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "listing.wide_page_size",
            ..
        }
    ));
}

#[test]
fn unknown_source_kind_is_rejected() {
    let mut raw = RawSettings::default();
    raw.source.kind = Some("ftp".to_string());

    let err = Settings::from_raw(raw).unwrap_err();
    assert!(matches!(err, LoadError::Invalid { key: "source.kind", .. }));
}

#[test]
fn non_http_base_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.source.api_base_url = Some("file:///tmp/blogs".to_string());

    let err = Settings::from_raw(raw).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "source.api_base_url",
            ..
        }
    ));
}

#[test]
fn zero_timeout_is_rejected() {
    let mut raw = RawSettings::default();
    raw.source.request_timeout_seconds = Some(0);

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn default_to_serve_command() {
    let cli = CliArgs::parse_from(["sithai"]);
    assert!(cli.command.is_none());
}

#[test]
fn list_command_parses_filters() {
    let cli = CliArgs::parse_from([
        "sithai",
        "list",
        "--category",
        "c1",
        "--page",
        "-2",
        "--viewport",
        "narrow",
    ]);

    match cli.command {
        Some(Command::List(args)) => {
            assert_eq!(args.category.as_deref(), Some("c1"));
            assert_eq!(args.page, -2);
            assert_eq!(args.viewport, ViewportArg::Narrow);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn config_file_layers_under_environment() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sithai.toml");
    std::fs::write(
        &path,
        "[source]\nkind = \"documents\"\ndocuments_path = \"seed.json\"\n\n[listing]\nexcerpt_chars = 90\n",
    )
    .expect("write config");

    let cli = CliArgs::parse_from([
        "sithai",
        "--config-file",
        path.to_str().expect("utf8 path"),
        "categories",
    ]);
    let settings = load(&cli).expect("settings");

    assert_eq!(settings.source.kind, SourceKind::Documents);
    assert_eq!(settings.source.documents_path, PathBuf::from("seed.json"));
    assert_eq!(settings.listing.excerpt_chars.get(), 90);
}
