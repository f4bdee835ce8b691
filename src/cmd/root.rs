use crate::data::{persistence::get_data_dir, AppSettings, DEFAULT_ITINERARY_FILE};
use crate::geocode::{Geocoder, NominatimGeocoder};
use crate::ui::planner_view::{run_app, App};
use crate::ui::{restore_terminal, setup_terminal};
use anyhow::Result;
use std::sync::Arc;

pub fn run() -> Result<()> {
    let settings = AppSettings::load()?;
    let data_dir = get_data_dir()?;
    let geocoder: Arc<dyn Geocoder> = Arc::new(NominatimGeocoder::new(&settings.geocoder)?);

    let today = super::today();
    let path = data_dir.join(DEFAULT_ITINERARY_FILE);
    let mut app = match super::load_itinerary(&path, today) {
        Ok(loaded) => App::new(loaded, settings.view.clone(), geocoder, data_dir),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "initial load failed");
            App::with_load_error(
                format!("Failed to load {DEFAULT_ITINERARY_FILE}"),
                today,
                settings.view.clone(),
                geocoder,
                data_dir,
            )
        }
    };

    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::event::DisableMouseCapture
        );
        original_hook(info);
    }));

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app);
    restore_terminal(&mut terminal)?;
    drop(app);
    tracing::info!("planner closed");

    result
}
