use crate::calc::derive_segments;
use crate::data::{persistence::get_file_path, ItineraryFile, LoadedItinerary, Persistable, SAVED_ITINERARY_FILE};
use anyhow::Result;
use std::path::Path;

pub fn run(file: Option<&Path>, out: Option<&Path>) -> Result<()> {
    let path = super::itinerary_path(file)?;
    let loaded = super::load_itinerary(&path, super::today())?;
    let target = match out {
        Some(p) => p.to_path_buf(),
        None => get_file_path(SAVED_ITINERARY_FILE)?,
    };
    let count = save_itinerary(&loaded, &target)?;
    println!("Saved {} stop(s) to {}", count, target.display());
    Ok(())
}

/// Writes `loaded` with every stop's derived dates filled in. Returns the stop count.
pub(crate) fn save_itinerary(loaded: &LoadedItinerary, target: &Path) -> Result<usize> {
    let segments = derive_segments(loaded.itinerary.stops(), loaded.start);
    let file = ItineraryFile::from_segments(&segments);
    file.write_path(target)?;
    tracing::info!(path = %target.display(), stops = segments.len(), "itinerary saved");
    Ok(segments.len())
}

/// Saves back over the file an itinerary was read from.
pub(crate) fn write_back(loaded: &LoadedItinerary, path: &Path) -> Result<()> {
    save_itinerary(loaded, path)?;
    Ok(())
}
