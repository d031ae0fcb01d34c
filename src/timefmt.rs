//! Human-readable due-date formatting for views.

use chrono::{DateTime, Duration, Utc};

/// Wire format for due timestamps in forms and the API.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Describe how far away `due` is relative to `now`.
#[must_use]
pub fn due(now: DateTime<Utc>, due: DateTime<Utc>) -> String {
    let d = due - now;
    if d > Duration::zero() && d < Duration::minutes(1) {
        return "due in a moment".to_string();
    }
    // Overdue
    if d > Duration::seconds(-60) && d < Duration::zero() {
        return "due now".to_string();
    } else if d < Duration::zero() {
        return format!("Over due by {}", dur(-d));
    }
    format!("due in {}", dur(d))
}

/// Format a duration as a single coarse unit: seconds, minutes, hours
/// or days.
#[must_use]
pub fn dur(d: Duration) -> String {
    if d < Duration::minutes(1) {
        return format!("{}s", d.num_seconds());
    }
    if d < Duration::hours(1) {
        return format!("{}m", d.num_minutes());
    }
    if d < Duration::days(1) {
        return format!("{}h", d.num_hours());
    }
    format!("{}d", d.num_days())
}

/// Format an optional timestamp with [`TIME_FORMAT`], empty for `None`.
#[must_use]
pub fn date_time_str(tm: Option<DateTime<Utc>>) -> String {
    tm.map_or_else(String::new, |tm| tm.format(TIME_FORMAT).to_string())
}
