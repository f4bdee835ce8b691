use crate::calc::dates::{format_iso_date, parse_date, to_iso_date};
use crate::calc::segments::Segment;
use crate::calc::summary::trip_end;
use crate::data::itinerary::Itinerary;
use crate::data::persistence::Persistable;
use crate::data::stop::{Coordinates, Stop};
use crate::error::ItineraryError;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Bundled itinerary read at startup.
pub const DEFAULT_ITINERARY_FILE: &str = "itinerary_default.json";
/// Name used when saving the current itinerary.
pub const SAVED_ITINERARY_FILE: &str = "itinerary.json";

/// One flattened stop as it appears in an itinerary file.
///
/// Reading is lenient: wrongly typed fields fall back to their empty value
/// instead of rejecting the whole file.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct StopRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: String,
    #[serde(default, deserialize_with = "lenient_opt_text", skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_date", skip_serializing_if = "Option::is_none")]
    pub arrival_date: Option<String>,
    #[serde(default = "one", deserialize_with = "lenient_nights")]
    pub nights: u32,
    #[serde(default, deserialize_with = "lenient_date", skip_serializing_if = "Option::is_none")]
    pub departure_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_text", skip_serializing_if = "Option::is_none")]
    pub arrival_method: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_text", skip_serializing_if = "Option::is_none")]
    pub journey_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_activities")]
    pub activities: Vec<String>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

fn one() -> u32 {
    1
}

fn positive_whole(f: f64) -> u32 {
    if f.is_finite() && f >= 1.0 {
        f.min(f64::from(u32::MAX)) as u32
    } else {
        1
    }
}

/// Coerces a JSON value to a night count the way a numeric cast would:
/// numbers are truncated, numeric strings parsed, everything else is 1.
pub(crate) fn nights_from_value(v: &Value) -> u32 {
    match v {
        Value::Number(n) => n.as_f64().map(positive_whole).unwrap_or(1),
        Value::String(s) => s.trim().parse::<f64>().map(positive_whole).unwrap_or(1),
        _ => 1,
    }
}

fn text_from_value(v: Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_nights<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(nights_from_value(&Value::deserialize(d)?))
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(text_from_value(Value::deserialize(d)?).unwrap_or_default())
}

fn lenient_opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(text_from_value(Value::deserialize(d)?))
}

/// Dates in either accepted format are rewritten as ISO. Anything else is kept as written.
fn lenient_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(text_from_value(Value::deserialize(d)?).map(|raw| to_iso_date(&raw).unwrap_or(raw)))
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        _ => None,
    })
}

fn lenient_activities<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items.into_iter().filter_map(text_from_value).collect(),
        _ => Vec::new(),
    })
}

impl StopRecord {
    pub fn into_stop(self) -> Stop {
        let coordinates = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Coordinates::new(lat, lng),
            _ => None,
        };
        Stop {
            location: self.location,
            country: self.country,
            nights: self.nights.max(1),
            arrival_method: self.arrival_method,
            journey_time: self.journey_time,
            activities: self.activities,
            coordinates,
            recorded_arrival: self.arrival_date.as_deref().and_then(parse_date),
        }
    }

    /// Flattens a derived segment. Dates written are the derived ones.
    pub fn from_segment(seg: &Segment<'_>) -> Self {
        let stop = seg.stop;
        StopRecord {
            location: stop.location.clone(),
            country: stop.country.clone(),
            arrival_date: Some(format_iso_date(seg.arrival)),
            nights: stop.nights,
            departure_date: Some(format_iso_date(seg.departure)),
            arrival_method: stop.arrival_method.clone(),
            journey_time: stop.journey_time.clone(),
            activities: stop.activities.clone(),
            lat: stop.coordinates.map(|c| c.lat),
            lng: stop.coordinates.map(|c| c.lng),
        }
    }
}

/// An itinerary as read from disk, together with the trip window it implies.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedItinerary {
    pub itinerary: Itinerary,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct ItineraryFile {
    pub records: Vec<StopRecord>,
}

impl Persistable for ItineraryFile {
    fn filename() -> &'static str {
        SAVED_ITINERARY_FILE
    }
    fn is_json() -> bool {
        true
    }
}

impl ItineraryFile {
    pub fn parse(json: &str) -> Result<Self, ItineraryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a file, keeping the failure kind distinguishable.
    pub fn open(path: &Path) -> Result<Self, ItineraryError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn from_segments(segments: &[Segment<'_>]) -> Self {
        ItineraryFile {
            records: segments.iter().map(StopRecord::from_segment).collect(),
        }
    }

    /// Builds the in-memory itinerary. The first record's own arrival date
    /// becomes the start; without one, `fallback_start` is used. The end of
    /// the window is where the last stop departs.
    pub fn into_loaded(self, fallback_start: NaiveDate) -> LoadedItinerary {
        let start = self
            .records
            .first()
            .and_then(|r| r.arrival_date.as_deref())
            .and_then(parse_date)
            .unwrap_or(fallback_start);
        let itinerary =
            Itinerary::from(self.records.into_iter().map(StopRecord::into_stop).collect::<Vec<_>>());
        let end = trip_end(itinerary.stops(), start);
        LoadedItinerary {
            itinerary,
            start,
            end,
        }
    }
}
