pub mod add;
pub mod edit;
pub mod init;
pub mod root;
pub mod save;
pub mod show;

use crate::data::{persistence::get_file_path, ItineraryFile, LoadedItinerary, DEFAULT_ITINERARY_FILE};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};

/// The file a command works on: `--file` when given, else the bundled default.
pub(crate) fn itinerary_path(file: Option<&Path>) -> Result<PathBuf> {
    match file {
        Some(p) => Ok(p.to_path_buf()),
        None => get_file_path(DEFAULT_ITINERARY_FILE),
    }
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Reads an itinerary file. Without a recorded first arrival the trip starts on `fallback_start`.
pub(crate) fn load_itinerary(path: &Path, fallback_start: NaiveDate) -> Result<LoadedItinerary> {
    let file = ItineraryFile::open(path)
        .with_context(|| format!("failed to load itinerary from {}", path.display()))?;
    let loaded = file.into_loaded(fallback_start);
    tracing::info!(
        path = %path.display(),
        stops = loaded.itinerary.len(),
        start = %loaded.start,
        "itinerary loaded"
    );
    Ok(loaded)
}
