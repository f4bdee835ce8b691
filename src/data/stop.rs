use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A validated latitude/longitude pair.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Returns `None` unless both values are finite and inside the valid
    /// latitude/longitude ranges.
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return None;
        }
        Some(Coordinates { lat, lng })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stop {
    pub location: String,
    pub country: Option<String>,
    pub nights: u32,
    pub arrival_method: Option<String>,
    pub journey_time: Option<String>,
    pub activities: Vec<String>,
    pub coordinates: Option<Coordinates>,
    /// Arrival date carried by the record this stop was loaded from.
    /// Only honoured while the stop sits at index 0.
    pub recorded_arrival: Option<NaiveDate>,
}

impl Stop {
    pub fn new(location: &str, nights: u32) -> Self {
        Stop {
            location: location.to_string(),
            country: None,
            nights: nights.max(1),
            arrival_method: None,
            journey_time: None,
            activities: Vec::new(),
            coordinates: None,
            recorded_arrival: None,
        }
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }
}
