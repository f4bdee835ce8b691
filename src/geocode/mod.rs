//! Place-name lookup.
//!
//! Lookups can take seconds, so the planner runs them on a worker thread
//! and polls for the answer between key presses.

pub mod nominatim;

use crate::data::Coordinates;
use crate::error::GeocodeError;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

pub use nominatim::NominatimGeocoder;

pub type GeocodeResult = Result<Coordinates, GeocodeError>;

pub trait Geocoder: Send + Sync {
    /// Resolves a free-text place name to a single coordinate pair.
    /// No match and an unusable match are both errors.
    fn geocode(&self, place: &str) -> GeocodeResult;
}

/// Turns a raw `(lat, lng)` answer into validated coordinates.
pub fn validate(place: &str, lat: f64, lng: f64) -> GeocodeResult {
    Coordinates::new(lat, lng).ok_or_else(|| GeocodeError::Malformed(place.to_string()))
}

/// A lookup running on a worker thread.
pub struct PendingLookup {
    pub query: String,
    rx: Receiver<GeocodeResult>,
}

impl PendingLookup {
    pub fn spawn(geocoder: Arc<dyn Geocoder>, query: &str) -> Self {
        let (tx, rx) = mpsc::channel();
        let owned = query.to_string();
        tracing::debug!(query = %owned, "geocode lookup started");
        thread::spawn(move || {
            let result = geocoder.geocode(&owned);
            // receiver is gone when the lookup was abandoned
            let _ = tx.send(result);
        });
        PendingLookup {
            query: query.to_string(),
            rx,
        }
    }

    /// Non-blocking check. `None` while the worker is still busy.
    pub fn poll(&self) -> Option<GeocodeResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(Err(GeocodeError::NoMatch(self.query.clone())))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::mpsc::Receiver as GateReceiver;

    /// Answers from a fixed table; unknown names have no match.
    #[derive(Default)]
    pub struct FakeGeocoder {
        pub places: HashMap<String, (f64, f64)>,
    }

    impl FakeGeocoder {
        pub fn with(places: &[(&str, f64, f64)]) -> Self {
            FakeGeocoder {
                places: places
                    .iter()
                    .map(|(name, lat, lng)| (name.to_string(), (*lat, *lng)))
                    .collect(),
            }
        }
    }

    impl Geocoder for FakeGeocoder {
        fn geocode(&self, place: &str) -> GeocodeResult {
            match self.places.get(place) {
                Some(&(lat, lng)) => validate(place, lat, lng),
                None => Err(GeocodeError::NoMatch(place.to_string())),
            }
        }
    }

    /// Holds every lookup until the test releases it.
    pub struct GatedGeocoder {
        pub gate: Mutex<GateReceiver<()>>,
        pub answer: (f64, f64),
    }

    impl Geocoder for GatedGeocoder {
        fn geocode(&self, place: &str) -> GeocodeResult {
            if let Ok(gate) = self.gate.lock() {
                let _ = gate.recv();
            }
            validate(place, self.answer.0, self.answer.1)
        }
    }
}
