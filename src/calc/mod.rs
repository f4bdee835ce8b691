pub mod dates;
pub mod markers;
pub mod segments;
pub mod summary;

pub use dates::parse_date;
pub use segments::derive_segments;
pub use summary::{compute_summary, trip_end};
