use crate::calc::segments::{derive_segments, effective_start};
use crate::data::Stop;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    /// Sum of nights over every stop.
    pub assigned_days: u64,
    /// Whole days in the trip window, never negative.
    pub total_days: u64,
}

impl Summary {
    /// More nights assigned than the trip window holds. Display only.
    pub fn is_overbooked(&self) -> bool {
        self.assigned_days > self.total_days
    }
}

pub fn compute_summary(stops: &[Stop], start: NaiveDate, end: NaiveDate) -> Summary {
    let total_days = end.signed_duration_since(start).num_days().max(0) as u64;
    let assigned_days = stops.iter().map(|s| u64::from(s.nights)).sum();
    Summary {
        assigned_days,
        total_days,
    }
}

/// Departure date of the last stop, or the effective start for an empty trip.
pub fn trip_end(stops: &[Stop], start: NaiveDate) -> NaiveDate {
    derive_segments(stops, start)
        .last()
        .map(|s| s.departure)
        .unwrap_or_else(|| effective_start(stops, start))
}
