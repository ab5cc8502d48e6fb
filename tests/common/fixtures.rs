use std::path::{Path, PathBuf};

pub const EVENING_LOOP_GPX: &str = "tests/fixtures/evening_loop.gpx";
pub const TEMPO_RUN_TCX: &str = "tests/fixtures/tempo_run.tcx";
pub const WAYPOINTS_ONLY_GPX: &str = "tests/fixtures/waypoints_only.gpx";

/// Distance of a 0.0001 degree step along a meridian.
pub const STEP_M: f64 = 6_371_000.0 * 0.0001 * std::f64::consts::PI / 180.0;

pub fn fixture_path(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(rel)
}

pub fn read_fixture(rel: &str) -> Vec<u8> {
    let path = fixture_path(rel);
    std::fs::read(&path).unwrap_or_else(|err| panic!("read {}: {}", path.display(), err))
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} +/- {tolerance}, got {actual}"
    );
}
