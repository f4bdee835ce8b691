use crate::calc::dates::add_nights;
use crate::data::Stop;
use chrono::NaiveDate;

/// A stop annotated with its derived arrival and departure dates.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment<'a> {
    pub stop: &'a Stop,
    pub arrival: NaiveDate,
    pub departure: NaiveDate,
}

/// The date the first segment arrives on. A recorded arrival on the first
/// stop takes precedence over the configured start.
pub fn effective_start(stops: &[Stop], start: NaiveDate) -> NaiveDate {
    stops
        .first()
        .and_then(|s| s.recorded_arrival)
        .unwrap_or(start)
}

/// Walks the stops in order, chaining each departure into the next arrival.
pub fn derive_segments(stops: &[Stop], start: NaiveDate) -> Vec<Segment<'_>> {
    let mut cursor = effective_start(stops, start);
    let mut segments = Vec::with_capacity(stops.len());
    for stop in stops {
        let arrival = cursor;
        let departure = add_nights(arrival, stop.nights.max(1));
        segments.push(Segment {
            stop,
            arrival,
            departure,
        });
        cursor = departure;
    }
    segments
}
