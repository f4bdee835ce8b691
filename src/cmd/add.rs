use crate::data::{AppSettings, LoadedItinerary, Stop};
use crate::geocode::{Geocoder, NominatimGeocoder};
use anyhow::{bail, Result};
use std::path::Path;

pub fn run(file: Option<&Path>, location: &str, nights: u32) -> Result<()> {
    let settings = AppSettings::load()?;
    let geocoder = NominatimGeocoder::new(&settings.geocoder)?;
    let path = super::itinerary_path(file)?;
    let loaded = super::load_itinerary(&path, super::today())?;
    let updated = add_stop(loaded, location, nights, &geocoder)?;
    super::save::write_back(&updated, &path)?;
    let stop = updated.itinerary.stops().last();
    write_added(stop, updated.itinerary.len(), &mut std::io::stdout())
}

/// Looks `location` up and appends it. A failed lookup leaves nothing changed.
pub(crate) fn add_stop(
    loaded: LoadedItinerary,
    location: &str,
    nights: u32,
    geocoder: &dyn Geocoder,
) -> Result<LoadedItinerary> {
    let location = location.trim();
    if location.is_empty() {
        bail!("Location must not be empty.");
    }
    let coords = match geocoder.geocode(location) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(location, error = %e, "add rejected");
            bail!("Could not find valid coordinates for this location.");
        }
    };
    let stop = Stop::new(location, nights).with_coordinates(coords);
    Ok(LoadedItinerary {
        itinerary: loaded.itinerary.add(stop),
        ..loaded
    })
}

pub(crate) fn write_added<W: std::io::Write>(
    stop: Option<&Stop>,
    total: usize,
    out: &mut W,
) -> Result<()> {
    if let Some(stop) = stop {
        let (lat, lng) = stop
            .coordinates
            .map(|c| (c.lat, c.lng))
            .unwrap_or_default();
        writeln!(
            out,
            "Added {} ({} night(s)) at {:.4}, {:.4}",
            stop.location, stop.nights, lat, lng
        )?;
    }
    writeln!(out, "Total: {} stop(s)", total)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Coordinates, Itinerary};
    use crate::geocode::testing::FakeGeocoder;
    use chrono::NaiveDate;

    fn loaded() -> LoadedItinerary {
        let d = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        LoadedItinerary {
            itinerary: Itinerary::from(vec![Stop::new("Paris", 3)]),
            start: d,
            end: d,
        }
    }

    fn geocoder() -> FakeGeocoder {
        FakeGeocoder::with(&[("Vienna", 48.21, 16.37)])
    }

    #[test]
    fn test_add_stop_appends_with_coordinates() {
        let updated = add_stop(loaded(), " Vienna ", 0, &geocoder()).unwrap();
        assert_eq!(updated.itinerary.len(), 2);
        let vienna = &updated.itinerary.stops()[1];
        assert_eq!(vienna.location, "Vienna");
        assert_eq!(vienna.nights, 1);
        assert_eq!(vienna.coordinates, Coordinates::new(48.21, 16.37));
    }

    #[test]
    fn test_add_stop_unknown_place_is_rejected() {
        let err = add_stop(loaded(), "Zzzzxyq", 2, &geocoder()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not find valid coordinates for this location."
        );
    }

    #[test]
    fn test_add_stop_empty_location_is_rejected() {
        assert!(add_stop(loaded(), "   ", 2, &geocoder()).is_err());
    }

    #[test]
    fn test_write_added() {
        let stop = Stop::new("Vienna", 2).with_coordinates(Coordinates::new(48.21, 16.37).unwrap());
        let mut buf = Vec::new();
        write_added(Some(&stop), 4, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("Added Vienna (2 night(s)) at 48.2100, 16.3700"));
        assert!(out.contains("Total: 4 stop(s)"));
    }
}
