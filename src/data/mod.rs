pub mod app_settings;
pub mod itinerary;
pub mod itinerary_file;
pub mod persistence;
pub mod stop;

pub use app_settings::{AppSettings, NightsEditor, ViewOptions};
pub use itinerary::{parse_nights, Itinerary};
pub use itinerary_file::{
    ItineraryFile, LoadedItinerary, StopRecord, DEFAULT_ITINERARY_FILE, SAVED_ITINERARY_FILE,
};
pub use persistence::Persistable;
pub use stop::{Coordinates, Stop};
