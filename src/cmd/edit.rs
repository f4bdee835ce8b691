use crate::data::{Itinerary, LoadedItinerary};
use crate::error::ItineraryError;
use anyhow::Result;
use clap::ValueEnum;
use std::path::Path;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// One change to a stored itinerary. Indices are 1-based, as printed by `show`.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Nights { index: usize, value: String },
    Move { index: usize, direction: Direction },
    Remove { index: usize },
}

impl Edit {
    fn index(&self) -> usize {
        match self {
            Edit::Nights { index, .. } | Edit::Move { index, .. } | Edit::Remove { index } => {
                *index
            }
        }
    }
}

pub fn run(file: Option<&Path>, edit: Edit) -> Result<()> {
    let path = super::itinerary_path(file)?;
    let loaded = super::load_itinerary(&path, super::today())?;
    let updated = LoadedItinerary {
        itinerary: apply(&loaded.itinerary, &edit)?,
        ..loaded
    };
    super::save::write_back(&updated, &path)?;
    tracing::info!(?edit, path = %path.display(), "itinerary edited");
    write_edit(&edit, &updated.itinerary, &mut std::io::stdout())
}

/// Applies `edit`, rejecting indices outside `1..=len`.
pub(crate) fn apply(itinerary: &Itinerary, edit: &Edit) -> Result<Itinerary, ItineraryError> {
    let index = edit.index();
    if index == 0 || index > itinerary.len() {
        return Err(ItineraryError::IndexOutOfRange {
            index,
            len: itinerary.len(),
        });
    }
    let i = index - 1;
    Ok(match edit {
        Edit::Nights { value, .. } => itinerary.set_nights(i, value),
        Edit::Move {
            direction: Direction::Up,
            ..
        } => itinerary.move_up(i),
        Edit::Move {
            direction: Direction::Down,
            ..
        } => itinerary.move_down(i),
        Edit::Remove { .. } => itinerary.remove(i),
    })
}

pub(crate) fn write_edit<W: std::io::Write>(
    edit: &Edit,
    itinerary: &Itinerary,
    out: &mut W,
) -> Result<()> {
    match edit {
        Edit::Nights { index, .. } => {
            if let Some(stop) = itinerary.get(index - 1) {
                writeln!(out, "Stop #{} ({}) now {} night(s)", index, stop.location, stop.nights)?;
            }
        }
        Edit::Move { .. } => {
            writeln!(out, "Order:")?;
            for (i, stop) in itinerary.stops().iter().enumerate() {
                writeln!(out, "  {:<4} {}", i + 1, stop.location)?;
            }
        }
        Edit::Remove { index } => {
            writeln!(out, "Removed stop #{}", index)?;
        }
    }
    writeln!(out, "Total: {} stop(s), {} night(s)", itinerary.len(), itinerary.total_nights())?;
    Ok(())
}
