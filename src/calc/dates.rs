use chrono::{Days, NaiveDate};

const ISO_FORMAT: &str = "%Y-%m-%d";
const LEGACY_FORMAT: &str = "%m-%d-%Y";

/// Formats a date as `YYYY-MM-DD`.
pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

/// Parses the legacy `MM-DD-YYYY` format used by older itinerary files.
pub fn parse_legacy_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), LEGACY_FORMAT).ok()
}

/// Parses either `YYYY-MM-DD` or `MM-DD-YYYY`.
///
/// The format is picked by the width of the first component: four digits
/// means ISO, anything else is treated as legacy.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let first = raw.split('-').next().unwrap_or_default();
    if first.len() == 4 {
        NaiveDate::parse_from_str(raw, ISO_FORMAT).ok()
    } else {
        parse_legacy_date(raw)
    }
}

/// Normalises an ISO or legacy date string to `YYYY-MM-DD`.
pub fn to_iso_date(raw: &str) -> Option<String> {
    parse_date(raw).map(format_iso_date)
}

/// Adds whole nights to a date, saturating at `NaiveDate::MAX`.
pub fn add_nights(date: NaiveDate, nights: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(nights)))
        .unwrap_or(NaiveDate::MAX)
}
