use crate::data::{AppSettings, ItineraryFile, Persistable, StopRecord, DEFAULT_ITINERARY_FILE};
use anyhow::Result;
use std::fs;
use std::path::Path;

pub fn run() -> Result<()> {
    let dir = crate::data::persistence::get_data_dir()?;
    fs::create_dir_all(&dir)?;
    run_in_dir(&dir)?;
    println!("Data files initialized successfully.");
    Ok(())
}

/// Writes all default data files into `dir`. Exposed for unit testing.
pub(crate) fn run_in_dir(dir: &Path) -> Result<()> {
    write_config(dir)?;
    write_default_itinerary(dir)?;
    tracing::info!(dir = %dir.display(), "data directory initialized");
    Ok(())
}

fn write_config(dir: &Path) -> Result<()> {
    AppSettings::default().save_to(dir)
}

fn write_default_itinerary(dir: &Path) -> Result<()> {
    let file = ItineraryFile {
        records: default_records(),
    };
    file.write_path(&dir.join(DEFAULT_ITINERARY_FILE))
}

#[allow(clippy::too_many_arguments)]
fn stop(
    location: &str,
    country: &str,
    nights: u32,
    method: Option<&str>,
    journey: Option<&str>,
    activities: &[&str],
    lat: f64,
    lng: f64,
) -> StopRecord {
    StopRecord {
        location: location.to_string(),
        country: Some(country.to_string()),
        nights,
        arrival_method: method.map(str::to_string),
        journey_time: journey.map(str::to_string),
        activities: activities.iter().map(|a| a.to_string()).collect(),
        lat: Some(lat),
        lng: Some(lng),
        ..StopRecord::default()
    }
}

fn default_records() -> Vec<StopRecord> {
    let mut records = vec![
        stop(
            "Paris",
            "France",
            3,
            Some("Flight"),
            None,
            &["Louvre", "Seine river cruise"],
            48.8566,
            2.3522,
        ),
        stop(
            "Berlin",
            "Germany",
            2,
            Some("Train"),
            Some("8h"),
            &["Museum Island"],
            52.5200,
            13.4050,
        ),
        stop(
            "Prague",
            "Czechia",
            3,
            Some("Bus"),
            Some("4h 30m"),
            &["Old Town Square", "Prague Castle"],
            50.0755,
            14.4378,
        ),
        stop(
            "Vienna",
            "Austria",
            2,
            Some("Train"),
            Some("4h"),
            &[],
            48.2082,
            16.3738,
        ),
    ];
    // older exports wrote MM-DD-YYYY
    records[0].arrival_date = Some("05-20-2025".to_string());
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_run_in_dir_creates_all_files() {
        let tmp = TempDir::new().unwrap();
        run_in_dir(tmp.path()).unwrap();
        assert!(tmp.path().join("config.yaml").exists(), "config.yaml missing");
        assert!(
            tmp.path().join(DEFAULT_ITINERARY_FILE).exists(),
            "itinerary_default.json missing"
        );
    }

    #[test]
    fn test_config_yaml_is_parseable_as_settings() {
        let tmp = TempDir::new().unwrap();
        write_config(tmp.path()).unwrap();
        let content = fs::read_to_string(tmp.path().join("config.yaml")).unwrap();
        assert!(content.contains("settings"), "config.yaml missing 'settings' key");
        assert!(content.contains("nights_editor"));
        let settings = AppSettings::load_from(tmp.path()).unwrap();
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn test_default_itinerary_loads() {
        let tmp = TempDir::new().unwrap();
        write_default_itinerary(tmp.path()).unwrap();
        let file = ItineraryFile::open(&tmp.path().join(DEFAULT_ITINERARY_FILE)).unwrap();
        let loaded = file.into_loaded(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        assert_eq!(loaded.itinerary.len(), 4);
        assert_eq!(loaded.start, NaiveDate::from_ymd_opt(2025, 5, 20).unwrap());
        assert_eq!(loaded.end, NaiveDate::from_ymd_opt(2025, 5, 30).unwrap());
        assert!(loaded.itinerary.stops().iter().all(|s| s.coordinates.is_some()));
    }
}
