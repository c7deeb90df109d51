//! ## fmt
//!
//! format utilities for log lines

use chrono::{DateTime, Utc};

const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a UTC timestamp as shown in logs
pub fn fmt_utc(time: &DateTime<Utc>) -> String {
    time.format(LOG_TIME_FORMAT).to_string()
}
