use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::core::feed::Published;

pub const UNKNOWN_DATE: &str = "unknown";

const DISPLAY_FORMAT: &str = "%d.%m.%Y %H:%M";

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M",
    "%a, %d %b %Y %H:%M:%S",
];

/// Renders a publish date as `DD.MM.YYYY HH:MM` in UTC, for structured and
/// reparsed dates alike. Never fails: text that cannot be read as a date is
/// shown as it came from the feed.
pub fn format_published(published: &Published) -> String {
    match published {
        Published::At(timestamp) => timestamp.naive_utc().format(DISPLAY_FORMAT).to_string(),
        Published::Raw(raw) => reparse(raw).map_or_else(
            || raw.clone(),
            |timestamp| timestamp.format(DISPLAY_FORMAT).to_string(),
        ),
        Published::Unknown => UNKNOWN_DATE.to_string(),
    }
}

/// Dates carrying an offset are converted to UTC; dates without one are taken as UTC.
fn reparse(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc2822(raw) {
        return Some(timestamp.naive_utc());
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.naive_utc());
    }
    if let Some(timestamp) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    {
        return Some(timestamp);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn structured_timestamps_use_display_format() {
        let published = Published::At(Utc.with_ymd_and_hms(2026, 3, 5, 7, 4, 0).unwrap());
        assert_eq!(format_published(&published), "05.03.2026 07:04");
    }

    #[test]
    fn raw_dates_are_reparsed_when_possible() {
        let rfc2822 = Published::Raw("Tue, 24 Feb 2026 18:45:00 +0100".to_string());
        assert_eq!(format_published(&rfc2822), "24.02.2026 17:45");

        let rfc3339 = Published::Raw("2026-02-24T18:45:00+01:00".to_string());
        assert_eq!(format_published(&rfc3339), "24.02.2026 17:45");

        let plain = Published::Raw("2026-02-24 08:15:00".to_string());
        assert_eq!(format_published(&plain), "24.02.2026 08:15");

        let date_only = Published::Raw("2026-02-24".to_string());
        assert_eq!(format_published(&date_only), "24.02.2026 00:00");
    }

    #[test]
    fn structured_and_reparsed_dates_agree() {
        let raw = "Tue, 24 Feb 2026 18:45:00 +0100";
        let structured = Published::At(
            DateTime::parse_from_rfc2822(raw)
                .expect("valid date")
                .with_timezone(&Utc),
        );
        assert_eq!(
            format_published(&structured),
            format_published(&Published::Raw(raw.to_string()))
        );
    }

    #[test]
    fn unreadable_dates_degrade_to_raw_text() {
        let raw = Published::Raw("letzte Woche".to_string());
        assert_eq!(format_published(&raw), "letzte Woche");
        assert_eq!(format_published(&Published::Unknown), UNKNOWN_DATE);
    }
}
