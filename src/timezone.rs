//! Conversion of provider timestamps into the server's configured time zone.

use time::{OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem, macros::format_description};
use time_tz::{Offset, TimeZone};

/// How transaction timestamps are shown, e.g. "05 Jan 2025 14:03".
const DISPLAY_FORMAT: &[BorrowedFormatItem] =
    format_description!("[day] [month repr:short] [year] [hour]:[minute]");

/// Get the current UTC offset of a canonical time zone, e.g. "Pacific/Auckland".
///
/// Returns `None` if the name is not a known time zone.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Render `date_time` in the time zone with the given offset.
pub fn format_local(date_time: OffsetDateTime, local_offset: UtcOffset) -> String {
    date_time
        .to_offset(local_offset)
        .format(DISPLAY_FORMAT)
        .unwrap_or_else(|error| {
            tracing::error!("could not format {date_time}: {error}");
            date_time.to_string()
        })
}
