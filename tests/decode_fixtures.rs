mod common;

use activity_overlay::{
    decode_activity, decode_activity_as, decode_activity_file, download_filename, format_stats,
    ActivityFormat, DecodeErrorKind, UnitSystem,
};
use common::fixtures::{
    assert_close, fixture_path, read_fixture, EVENING_LOOP_GPX, STEP_M, TEMPO_RUN_TCX,
    WAYPOINTS_ONLY_GPX,
};

#[test]
fn gpx_fixture_sums_segments_without_bridging_gaps() {
    let raw = decode_activity(&read_fixture(EVENING_LOOP_GPX)).expect("decode gpx");

    assert_close(raw.distance_m, 6.0 * STEP_M, 1e-3);
    assert_close(raw.moving_time_s, 12.0, 1e-9);
    assert_close(raw.avg_speed_mps, STEP_M / 2.0, 1e-4);
    assert_close(raw.max_speed_mps, STEP_M / 2.0, 1e-4);
    assert_close(raw.ascent_m, 9.0, 1e-9);
    assert_close(raw.descent_m, 4.0, 1e-9);
    assert_eq!(raw.max_elevation_m, Some(212.0));
    assert_eq!(raw.min_elevation_m, Some(200.0));
    assert_close(raw.avg_elevation_m.expect("avg elevation"), 205.0, 1e-9);
    assert_eq!(raw.route_points.len(), 9);
    assert_eq!(raw.track_name.as_deref(), Some("Evening Loop"));
    assert_eq!(
        raw.track_description.as_deref(),
        Some("Short loop around the park")
    );
}

#[test]
fn gpx_fixture_formats_for_both_unit_systems() {
    let raw = decode_activity_file(fixture_path(EVENING_LOOP_GPX)).expect("decode gpx");

    let metric = format_stats(&raw, UnitSystem::Metric);
    assert_eq!(metric.distance, "0.07 km");
    assert_eq!(metric.moving_time, "00:12");
    assert_eq!(metric.avg_speed, "20.0 km/h");
    assert_eq!(metric.max_speed, "20.0 km/h");
    assert_eq!(metric.avg_pace.as_deref(), Some("3:00 /km"));
    assert_eq!(metric.ascent, "9 m");
    assert_eq!(metric.descent, "4 m");
    assert_eq!(metric.max_elevation.as_deref(), Some("212 m"));
    assert_eq!(metric.avg_elevation.as_deref(), Some("205 m"));
    assert_eq!(metric.route_points.len(), 9);

    let imperial = format_stats(&raw, UnitSystem::Imperial);
    assert_eq!(imperial.distance, "0.04 mi");
    assert_eq!(imperial.avg_speed, "12.4 mph");
    assert_eq!(imperial.ascent, "30 ft");
    assert_eq!(imperial.descent, "13 ft");

    assert_eq!(
        download_filename("IMG_0042", &metric, "png"),
        "evening-loop_0.07km_00-12.png"
    );
}

#[test]
fn tcx_fixture_prefers_lap_totals() {
    let bytes = read_fixture(TEMPO_RUN_TCX);
    assert_eq!(ActivityFormat::detect(&bytes).expect("detect"), ActivityFormat::Tcx);
    let raw = decode_activity(&bytes).expect("decode tcx");

    assert_close(raw.distance_m, 4100.0, 1e-9);
    assert_close(raw.moving_time_s, 1200.0, 1e-9);
    assert_close(raw.avg_speed_mps, 4100.0 / 1200.0, 1e-9);
    assert_close(raw.max_speed_mps, 5.0, 1e-9);
    assert_eq!(raw.route_points.len(), 4);
    assert_close(raw.ascent_m, 5.0, 1e-9);
    assert_close(raw.descent_m, 6.0, 1e-9);
    assert_eq!(raw.track_description.as_deref(), Some("Tempo & strides"));

    let values = format_stats(&raw, UnitSystem::Metric);
    assert_eq!(values.distance, "4.10 km");
    assert_eq!(values.moving_time, "20:00");
    assert_eq!(values.avg_speed, "12.3 km/h");
    assert_eq!(values.max_speed, "18.0 km/h");
    assert_eq!(values.avg_pace.as_deref(), Some("4:53 /km"));
    assert_eq!(values.max_pace.as_deref(), Some("3:20 /km"));
}

#[test]
fn forcing_the_wrong_format_is_malformed() {
    let err = decode_activity_as(ActivityFormat::Tcx, &read_fixture(EVENING_LOOP_GPX))
        .expect_err("gpx as tcx");
    assert!(err.is_malformed());
    assert_eq!(err.format, Some(ActivityFormat::Tcx));
}

#[test]
fn waypoint_only_gpx_has_no_track_data() {
    let err = decode_activity_file(fixture_path(WAYPOINTS_ONLY_GPX)).expect_err("no track");
    assert_eq!(err.kind, DecodeErrorKind::NoTrackData);
    assert_eq!(err.code, "NO_TRACK_DATA");
    assert!(err.path.as_deref().is_some_and(|p| p.ends_with("waypoints_only.gpx")));
    assert!(err.to_string().contains("no_track_data"));
}

#[test]
fn garbage_input_is_rejected_with_a_code() {
    for input in [&b"not xml at all"[..], b"<kml><Document/></kml>", b""] {
        let err = decode_activity(input).expect_err("garbage");
        assert!(err.is_malformed(), "{err}");
        assert!(!err.code.is_empty());
    }
}
