//! Activity decoding and stat formatting for photo overlays.
//!
//! Decodes GPX and TCX documents into [`RawStats`], then formats them into
//! the display strings ([`StatValues`]) consumed by `activity-overlay-render`.
//!
//! ```no_run
//! use activity_overlay::{decode_activity_file, format_stats, UnitSystem};
//!
//! let raw = decode_activity_file("ride.gpx")?;
//! let values = format_stats(&raw, UnitSystem::Metric);
//! println!("{} in {}", values.distance, values.moving_time);
//! # Ok::<(), activity_overlay::DecodeError>(())
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod activity;
mod error;
mod format;
mod gpx;
mod stats;
mod tcx;
mod track;
mod xml;

#[cfg(feature = "async")]
pub use activity::decode_activity_file_async;
pub use activity::{decode_activity, decode_activity_as, decode_activity_file, ActivityFormat};
pub use error::{DecodeError, DecodeErrorKind};
pub use format::{
    download_filename, format_distance, format_duration, format_elevation, format_pace,
    format_speed, format_stats, UnitSystem, UnknownUnitSystem,
};
pub use stats::{RawStats, RoutePoint, StatValues};
pub use track::{haversine_m, EARTH_RADIUS_M, MAX_REALISTIC_SPEED_MPS, MOVING_SPEED_THRESHOLD_MPS};
