#![cfg(feature = "async")]

mod common;

use activity_overlay::{decode_activity_file, decode_activity_file_async, DecodeErrorKind};
use common::fixtures::{fixture_path, EVENING_LOOP_GPX, TEMPO_RUN_TCX};

#[tokio::test(flavor = "current_thread")]
async fn async_decode_matches_blocking_decode() {
    for rel in [EVENING_LOOP_GPX, TEMPO_RUN_TCX] {
        let path = fixture_path(rel);
        let blocking = decode_activity_file(&path).expect("blocking decode");
        let async_decoded = decode_activity_file_async(&path).await.expect("async decode");
        assert_eq!(blocking, async_decoded);
    }
}

#[tokio::test(flavor = "current_thread")]
async fn async_decode_reports_missing_files() {
    let err = decode_activity_file_async("tests/fixtures/missing.gpx")
        .await
        .expect_err("missing");
    assert_eq!(err.kind, DecodeErrorKind::Io);
}
