pub mod config;
pub mod session;
pub mod stats;
pub mod task;
pub mod timer;

use chrono::{DateTime, FixedOffset, Local};

/// Current wall-clock time in the local timezone.
pub(crate) fn local_now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}
