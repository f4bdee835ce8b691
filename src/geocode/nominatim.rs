use crate::data::app_settings::GeocoderSettings;
use crate::error::GeocodeError;
use crate::geocode::{validate, GeocodeResult, Geocoder};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

/// Client for an OpenStreetMap Nominatim `/search` endpoint.
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

/// The two fields we use from a search hit. Nominatim sends them as strings.
#[derive(Deserialize, Debug)]
struct Place {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(settings: &GeocoderSettings) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;
        Ok(NominatimGeocoder {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url)
    }
}

/// Picks the first hit of a search response body.
fn first_hit(place: &str, hits: &[Place]) -> GeocodeResult {
    let hit = hits
        .first()
        .ok_or_else(|| GeocodeError::NoMatch(place.to_string()))?;
    let lat = hit.lat.trim().parse::<f64>();
    let lng = hit.lon.trim().parse::<f64>();
    match (lat, lng) {
        (Ok(lat), Ok(lng)) => validate(place, lat, lng),
        _ => Err(GeocodeError::Malformed(place.to_string())),
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, place: &str) -> GeocodeResult {
        let response = self
            .client
            .get(self.search_url())
            .header("Accept-Language", "en")
            .query(&[("format", "json"), ("limit", "1"), ("q", place)])
            .send()?
            .error_for_status()?;
        let hits: Vec<Place> = response
            .json()
            .map_err(|_| GeocodeError::Malformed(place.to_string()))?;
        let result = first_hit(place, &hits);
        match &result {
            Ok(c) => tracing::info!(place, lat = c.lat, lng = c.lng, "geocoded"),
            Err(e) => tracing::warn!(place, error = %e, "geocode failed"),
        }
        result
    }
}
