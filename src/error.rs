use thiserror::Error;

#[derive(Debug, Error)]
pub enum ItineraryError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid itinerary file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid date '{0}' (expected YYYY-MM-DD or MM-DD-YYYY)")]
    InvalidDate(String),
    #[error("no stop #{index} (itinerary has {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("no match for '{0}'")]
    NoMatch(String),
    #[error("malformed coordinates for '{0}'")]
    Malformed(String),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}
