use crate::calc::dates::format_iso_date;
use crate::calc::{compute_summary, derive_segments, trip_end};
use crate::data::LoadedItinerary;
use crate::error::ItineraryError;
use anyhow::Result;
use chrono::NaiveDate;
use std::path::Path;

pub fn run(file: Option<&Path>, start: Option<&str>) -> Result<()> {
    let path = super::itinerary_path(file)?;
    let mut loaded = super::load_itinerary(&path, super::today())?;
    if let Some(raw) = start {
        let date = parse_start(raw)?;
        loaded.start = date;
        loaded.end = trip_end(loaded.itinerary.stops(), date);
    }
    write_itinerary(&loaded, &mut std::io::stdout())
}

pub(crate) fn parse_start(raw: &str) -> Result<NaiveDate, ItineraryError> {
    crate::calc::parse_date(raw).ok_or_else(|| ItineraryError::InvalidDate(raw.to_string()))
}

pub(crate) fn write_itinerary<W: std::io::Write>(
    loaded: &LoadedItinerary,
    out: &mut W,
) -> Result<()> {
    let stops = loaded.itinerary.stops();
    let segments = derive_segments(stops, loaded.start);
    let summary = compute_summary(stops, loaded.start, loaded.end);

    writeln!(
        out,
        "Itinerary [{} - {}]",
        format_iso_date(loaded.start),
        format_iso_date(loaded.end)
    )?;
    writeln!(out, "---")?;
    writeln!(
        out,
        "  {:<4} {:<20} {:<14} {:<12} {:<7} {}",
        "#", "Location", "Country", "Arrival", "Nights", "Departure"
    )?;
    for (i, seg) in segments.iter().enumerate() {
        writeln!(
            out,
            "  {:<4} {:<20} {:<14} {:<12} {:<7} {}",
            i + 1,
            seg.stop.location,
            seg.stop.country.as_deref().unwrap_or(""),
            format_iso_date(seg.arrival),
            seg.stop.nights,
            format_iso_date(seg.departure)
        )?;
    }
    writeln!(out, "---")?;
    write!(
        out,
        "{} of {} days assigned",
        summary.assigned_days, summary.total_days
    )?;
    if summary.is_overbooked() {
        write!(out, " (overbooked)")?;
    }
    writeln!(out)?;
    Ok(())
}
