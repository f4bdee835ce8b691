use crate::calc::dates::{format_iso_date, parse_date};
use crate::calc::{compute_summary, derive_segments};
use crate::data::{
    parse_nights, Coordinates, Itinerary, ItineraryFile, LoadedItinerary, NightsEditor,
    Persistable, Stop, ViewOptions,
};
use crate::geocode::{Geocoder, PendingLookup};
use crate::ui::map_view::MapView;
use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::{
    self, Event as CEvent, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io::Stdout;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration as StdDuration;

const HEADER_BG: Color = Color::Rgb(51, 173, 255);
const INVALID_DATE: &str = "Invalid date, use YYYY-MM-DD";
const GEOCODE_FAILED: &str = "Could not find valid coordinates for this location.";
const INVALID_FILE: &str = "Invalid JSON file.";

#[derive(PartialEq, Debug, Clone, Copy)]
enum Mode {
    Normal,
    EditNights,
    AddLocation,
    AddNights,
    Upload,
    EditStart,
    EditEnd,
}

/// An add waiting on its coordinate lookup.
struct PendingAdd {
    lookup: PendingLookup,
    location: String,
    nights: u32,
}

pub struct App {
    itinerary: Itinerary,
    start_date: NaiveDate,
    end_date: NaiveDate,
    options: ViewOptions,
    /// Path layer visibility, toggled with `t` when the path is enabled.
    path_visible: bool,
    geocoder: Arc<dyn Geocoder>,
    pending: Option<PendingAdd>,
    /// Set when the bundled itinerary could not be read. Cleared by an upload.
    load_error: Option<String>,
    mode: Mode,
    input_buffer: String,
    /// Location typed in the first step of the add form.
    new_location: String,
    list_cursor: usize,
    table_state: TableState,
    /// Transient message (text, color). Cleared on next keypress.
    status: Option<(String, Color)>,
    data_dir: PathBuf,
    map: MapView,
    /// Where the map was last drawn, for mouse hit-testing.
    map_area: Option<Rect>,
}

impl App {
    pub fn new(
        loaded: LoadedItinerary,
        options: ViewOptions,
        geocoder: Arc<dyn Geocoder>,
        data_dir: PathBuf,
    ) -> Self {
        App {
            itinerary: loaded.itinerary,
            start_date: loaded.start,
            end_date: loaded.end,
            options,
            path_visible: true,
            geocoder,
            pending: None,
            load_error: None,
            mode: Mode::Normal,
            input_buffer: String::new(),
            new_location: String::new(),
            list_cursor: 0,
            table_state: TableState::default(),
            status: None,
            data_dir,
            map: MapView::new(),
            map_area: None,
        }
    }

    /// An empty planner showing `message` in place of the itinerary.
    pub fn with_load_error(
        message: String,
        today: NaiveDate,
        options: ViewOptions,
        geocoder: Arc<dyn Geocoder>,
        data_dir: PathBuf,
    ) -> Self {
        let loaded = LoadedItinerary {
            itinerary: Itinerary::default(),
            start: today,
            end: today,
        };
        let mut app = App::new(loaded, options, geocoder, data_dir);
        app.load_error = Some(message);
        app
    }

    fn path_enabled(&self) -> bool {
        self.options.show_map && self.options.show_path
    }

    fn is_adding(&self) -> bool {
        self.pending.is_some()
    }

    fn select(&mut self, index: usize) {
        if index < self.itinerary.len() {
            self.list_cursor = index;
        }
    }

    fn clamp_cursor(&mut self) {
        if self.list_cursor >= self.itinerary.len() {
            self.list_cursor = self.itinerary.len().saturating_sub(1);
        }
    }

    fn map_points(&self) -> Vec<(usize, Coordinates)> {
        self.itinerary
            .stops()
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.coordinates.map(|c| (i, c)))
            .collect()
    }

    // ── Actions ───────────────────────────────────────────────────────────────

    fn save(&mut self) {
        let segments = derive_segments(self.itinerary.stops(), self.start_date);
        let file = ItineraryFile::from_segments(&segments);
        match file.save_to(&self.data_dir) {
            Ok(path) => {
                tracing::info!(path = %path.display(), stops = segments.len(), "itinerary saved");
                self.status = Some((format!("Saved to {}", path.display()), Color::Green));
            }
            Err(e) => {
                tracing::warn!(error = %e, "save failed");
                self.status = Some((format!("Save failed: {e}"), Color::Red));
            }
        }
    }

    /// Replaces the itinerary with the file at `path`. On failure the current
    /// itinerary is kept.
    fn upload(&mut self, path: &Path) {
        match ItineraryFile::open(path) {
            Ok(file) => {
                let loaded = file.into_loaded(self.start_date);
                tracing::info!(
                    path = %path.display(),
                    stops = loaded.itinerary.len(),
                    "itinerary uploaded"
                );
                self.itinerary = loaded.itinerary;
                self.start_date = loaded.start;
                self.end_date = loaded.end;
                self.load_error = None;
                self.list_cursor = 0;
                self.status = Some((
                    format!("Loaded {} stop(s) from {}", self.itinerary.len(), path.display()),
                    Color::Green,
                ));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "upload rejected");
                self.status = Some((INVALID_FILE.to_string(), Color::Red));
            }
        }
    }

    fn start_add(&mut self, location: String, nights: u32) {
        let lookup = PendingLookup::spawn(Arc::clone(&self.geocoder), &location);
        self.status = Some((format!("Adding {location}..."), Color::Yellow));
        self.pending = Some(PendingAdd {
            lookup,
            location,
            nights,
        });
    }

    /// Collects a finished lookup, if any. Called once per event-loop turn.
    pub fn tick(&mut self) {
        let result = match &self.pending {
            Some(p) => match p.lookup.poll() {
                Some(r) => r,
                None => return,
            },
            None => return,
        };
        let Some(pending) = self.pending.take() else {
            return;
        };
        match result {
            Ok(coords) => {
                let stop = Stop::new(&pending.location, pending.nights).with_coordinates(coords);
                self.itinerary = self.itinerary.add(stop);
                tracing::info!(location = %pending.location, "stop added");
                self.status = Some((format!("Added {}", pending.location), Color::Green));
            }
            Err(e) => {
                tracing::warn!(location = %pending.location, error = %e, "add rejected");
                self.status = Some((GEOCODE_FAILED.to_string(), Color::Red));
            }
        }
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    /// Returns true if the app should quit.
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        if self.mode != Mode::Normal {
            self.handle_input_key(code);
            return false;
        }

        self.status = None;

        if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        if self.load_error.is_some() {
            match code {
                KeyCode::Char('q') | KeyCode::Esc => return true,
                KeyCode::Char('o') if self.options.allow_upload => self.begin_input(Mode::Upload, String::new()),
                _ => {}
            }
            return false;
        }

        let shift = modifiers.contains(KeyModifiers::SHIFT);
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up if shift => self.move_selected_up(),
            KeyCode::Down if shift => self.move_selected_down(),
            KeyCode::Char('K') => self.move_selected_up(),
            KeyCode::Char('J') => self.move_selected_down(),
            KeyCode::Up | KeyCode::Char('k') => {
                self.list_cursor = self.list_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.list_cursor + 1 < self.itinerary.len() {
                    self.list_cursor += 1;
                }
            }
            KeyCode::Delete | KeyCode::Char('x') => {
                if self.list_cursor < self.itinerary.len() {
                    self.itinerary = self.itinerary.remove(self.list_cursor);
                    self.clamp_cursor();
                }
            }
            KeyCode::Char('e') | KeyCode::Enter
                if self.options.nights_editor == NightsEditor::Text =>
            {
                if let Some(stop) = self.itinerary.get(self.list_cursor) {
                    let current = stop.nights.to_string();
                    self.begin_input(Mode::EditNights, current);
                }
            }
            KeyCode::Char('+') | KeyCode::Char('=')
                if self.options.nights_editor == NightsEditor::Stepper =>
            {
                if let Some(stop) = self.itinerary.get(self.list_cursor) {
                    let next = stop.nights.saturating_add(1).to_string();
                    self.itinerary = self.itinerary.set_nights(self.list_cursor, &next);
                }
            }
            KeyCode::Char('-') if self.options.nights_editor == NightsEditor::Stepper => {
                if let Some(stop) = self.itinerary.get(self.list_cursor) {
                    let next = stop.nights.saturating_sub(1).to_string();
                    self.itinerary = self.itinerary.set_nights(self.list_cursor, &next);
                }
            }
            KeyCode::Char('a') => {
                if self.is_adding() {
                    self.status = Some(("Adding... please wait".to_string(), Color::Yellow));
                } else {
                    self.new_location.clear();
                    self.begin_input(Mode::AddLocation, String::new());
                }
            }
            KeyCode::Char('S') => {
                let current = format_iso_date(self.start_date);
                self.begin_input(Mode::EditStart, current);
            }
            KeyCode::Char('E') => {
                let current = format_iso_date(self.end_date);
                self.begin_input(Mode::EditEnd, current);
            }
            KeyCode::Char('s') => self.save(),
            KeyCode::Char('o') if self.options.allow_upload => {
                self.begin_input(Mode::Upload, String::new());
            }
            KeyCode::Char('t') if self.path_enabled() => {
                self.path_visible = !self.path_visible;
            }
            _ => {}
        }
        false
    }

    fn begin_input(&mut self, mode: Mode, initial: String) {
        self.input_buffer = initial;
        self.mode = mode;
    }

    fn end_input(&mut self) {
        self.input_buffer.clear();
        self.mode = Mode::Normal;
    }

    fn move_selected_up(&mut self) {
        if self.list_cursor > 0 && self.list_cursor < self.itinerary.len() {
            self.itinerary = self.itinerary.move_up(self.list_cursor);
            self.list_cursor -= 1;
        }
    }

    fn move_selected_down(&mut self) {
        if self.list_cursor + 1 < self.itinerary.len() {
            self.itinerary = self.itinerary.move_down(self.list_cursor);
            self.list_cursor += 1;
        }
    }

    fn handle_input_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.new_location.clear();
                self.end_input();
            }
            KeyCode::Backspace => {
                self.status = None;
                self.input_buffer.pop();
            }
            KeyCode::Char(c) => {
                self.status = None;
                self.input_buffer.push(c);
            }
            KeyCode::Enter => self.commit_input(),
            _ => {}
        }
    }

    fn commit_input(&mut self) {
        match self.mode {
            Mode::Normal => {}
            Mode::EditNights => {
                self.itinerary = self.itinerary.set_nights(self.list_cursor, &self.input_buffer);
                self.end_input();
            }
            Mode::AddLocation => {
                let location = self.input_buffer.trim().to_string();
                if location.is_empty() {
                    return;
                }
                self.new_location = location;
                self.begin_input(Mode::AddNights, String::new());
            }
            Mode::AddNights => {
                if self.input_buffer.trim().is_empty() {
                    return;
                }
                let nights = parse_nights(&self.input_buffer);
                let location = std::mem::take(&mut self.new_location);
                self.end_input();
                self.start_add(location, nights);
            }
            Mode::Upload => {
                let raw = self.input_buffer.trim().to_string();
                self.end_input();
                if !raw.is_empty() {
                    self.upload(Path::new(&raw));
                }
            }
            Mode::EditStart | Mode::EditEnd => match parse_date(&self.input_buffer) {
                Some(date) => {
                    if self.mode == Mode::EditStart {
                        self.start_date = date;
                    } else {
                        self.end_date = date;
                    }
                    self.end_input();
                }
                None => {
                    self.status = Some((INVALID_DATE.to_string(), Color::Red));
                }
            },
        }
    }

    /// A left click on a map marker selects that stop's row.
    pub fn handle_mouse(&mut self, kind: MouseEventKind, column: u16, row: u16) {
        if kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let Some(area) = self.map_area else {
            return;
        };
        if let Some(index) = self.map.marker_at(area, column, row) {
            tracing::debug!(index, "marker clicked");
            self.select(index);
        }
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    pub fn render(&mut self, f: &mut Frame) {
        let size = f.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(10)])
            .split(size);

        self.render_header(f, chunks[0]);

        if let Some(message) = &self.load_error {
            let mut lines = vec![
                Line::from(""),
                Line::from(Span::styled(
                    message.clone(),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
            ];
            if self.mode == Mode::Upload {
                lines.push(Line::from(format!("Itinerary file: {}_", self.input_buffer)));
            } else if self.options.allow_upload {
                lines.push(Line::from(Span::styled(
                    "o=upload itinerary file  q=quit",
                    Style::default().fg(Color::DarkGray),
                )));
            } else {
                lines.push(Line::from(Span::styled(
                    "q=quit",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            if let Some((msg, color)) = &self.status {
                lines.push(Line::from(Span::styled(msg.clone(), Style::default().fg(*color))));
            }
            let p = Paragraph::new(lines)
                .alignment(ratatui::layout::Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(p, chunks[1]);
            self.map_area = None;
            return;
        }

        let body = if self.options.show_map {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(chunks[1])
        } else {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(100)])
                .split(chunks[1])
        };

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(6),    // stop table
                Constraint::Length(7), // detail for the selected stop
                Constraint::Length(4), // add form / help / status
            ])
            .split(body[0]);

        self.render_table(f, left[0]);
        self.render_detail(f, left[1]);
        self.render_footer(f, left[2]);

        if self.options.show_map {
            let points = self.map_points();
            let show_path = self.path_enabled() && self.path_visible;
            self.map.update(&points, show_path);
            let area = body[1];
            self.map_area = Some(area);
            let selected = (!self.itinerary.is_empty()).then_some(self.list_cursor);
            self.map.render(f, area, selected, " Map ");
        } else {
            self.map.teardown();
            self.map_area = None;
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let summary = compute_summary(self.itinerary.stops(), self.start_date, self.end_date);
        let summary_style = if summary.is_overbooked() {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };

        let field = |label: &str, mode: Mode, date: NaiveDate| -> Span<'static> {
            if self.mode == mode {
                Span::styled(
                    format!("{label}: {}_", self.input_buffer),
                    Style::default().fg(Color::Yellow),
                )
            } else {
                Span::raw(format!("{label}: {}", format_iso_date(date)))
            }
        };

        let mut spans = vec![
            field("Start", Mode::EditStart, self.start_date),
            Span::raw("   "),
            field("End", Mode::EditEnd, self.end_date),
            Span::raw("   "),
            Span::styled(
                format!(
                    "{} of {} days assigned",
                    summary.assigned_days, summary.total_days
                ),
                summary_style,
            ),
        ];
        if self.is_adding() {
            spans.push(Span::styled("   Adding...", Style::default().fg(Color::Yellow)));
        }

        let p = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(
                    " Itinerary Planner ",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
        );
        f.render_widget(p, area);
    }

    fn render_table(&mut self, f: &mut Frame, area: Rect) {
        if self.itinerary.is_empty() {
            let p = Paragraph::new("No itinerary data loaded.")
                .alignment(ratatui::layout::Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(" Stops "));
            f.render_widget(p, area);
            return;
        }

        let segments = derive_segments(self.itinerary.stops(), self.start_date);
        let header_style = Style::default()
            .fg(Color::White)
            .bg(HEADER_BG)
            .add_modifier(Modifier::BOLD);
        let header = Row::new(
            ["#", "Location", "Country", "Arrival", "Nights", "Departure"]
                .into_iter()
                .map(|h| Cell::from(h).style(header_style)),
        );

        let rows: Vec<Row> = segments
            .iter()
            .enumerate()
            .map(|(i, seg)| {
                let nights = if i == self.list_cursor && self.mode == Mode::EditNights {
                    Cell::from(format!("{}_", self.input_buffer))
                        .style(Style::default().fg(Color::Yellow))
                } else if self.options.nights_editor == NightsEditor::Stepper {
                    Cell::from(format!("- {} +", seg.stop.nights))
                } else {
                    Cell::from(seg.stop.nights.to_string())
                };
                Row::new(vec![
                    Cell::from(format!("{}", i + 1)),
                    Cell::from(seg.stop.location.clone()),
                    Cell::from(seg.stop.country.clone().unwrap_or_default()),
                    Cell::from(format_iso_date(seg.arrival)),
                    nights,
                    Cell::from(format_iso_date(seg.departure)),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(3),
                Constraint::Min(12),
                Constraint::Length(12),
                Constraint::Length(11),
                Constraint::Length(7),
                Constraint::Length(11),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(" Stops "))
        .row_highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );

        self.table_state.select(Some(self.list_cursor));
        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn render_detail(&self, f: &mut Frame, area: Rect) {
        let lines = match self.itinerary.get(self.list_cursor) {
            Some(stop) => detail_lines(stop),
            None => vec![],
        };
        let p = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(" Details "));
        f.render_widget(p, area);
    }

    fn render_footer(&self, f: &mut Frame, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        match self.mode {
            Mode::AddLocation => {
                lines.push(Line::from(Span::styled(
                    "── Enter a New Location ──",
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(format!("Location: {}_", self.input_buffer)));
            }
            Mode::AddNights => {
                lines.push(Line::from(Span::styled(
                    "── Enter a New Location ──",
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(format!(
                    "Location: {}   # Nights: {}_",
                    self.new_location, self.input_buffer
                )));
            }
            Mode::Upload => {
                lines.push(Line::from(format!("Itinerary file: {}_", self.input_buffer)));
            }
            _ => {
                lines.push(Line::from(Span::styled(
                    help_text(&self.options, self.path_visible),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
        if let Some((msg, color)) = &self.status {
            lines.push(Line::from(Span::styled(msg.clone(), Style::default().fg(*color))));
        }
        let p = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::NONE));
        f.render_widget(p, area);
    }
}

fn or_dash(value: &Option<String>) -> String {
    match value.as_deref() {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "—".to_string(),
    }
}

fn detail_lines(stop: &Stop) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![Line::from(vec![
        Span::styled("Transport: ", bold),
        Span::raw(or_dash(&stop.arrival_method)),
        Span::raw("    "),
        Span::styled("Transport Time: ", bold),
        Span::raw(or_dash(&stop.journey_time)),
    ])];
    lines.push(Line::from(Span::styled("Activities:", bold)));
    for act in &stop.activities {
        lines.push(Line::from(format!("  • {act}")));
    }
    lines
}

/// Key hints for the enabled feature set.
pub(crate) fn help_text(options: &ViewOptions, path_visible: bool) -> String {
    let mut parts = vec!["↑↓=select", "K/J=move", "x=delete", "a=add"];
    match options.nights_editor {
        NightsEditor::Text => parts.push("e=nights"),
        NightsEditor::Stepper => parts.push("+/-=nights"),
    }
    parts.push("S/E=start/end");
    parts.push("s=save");
    if options.allow_upload {
        parts.push("o=upload");
    }
    if options.show_map && options.show_path {
        parts.push(if path_visible { "t=hide path" } else { "t=show path" });
    }
    parts.push("q=quit");
    parts.join("  ")
}

// ── App event loop ────────────────────────────────────────────────────────────

pub fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|f| app.render(f))?;
        if event::poll(StdDuration::from_millis(16))? {
            match event::read()? {
                CEvent::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key(key.code, key.modifiers) {
                        break;
                    }
                }
                CEvent::Mouse(mouse) => app.handle_mouse(mouse.kind, mouse.column, mouse.row),
                _ => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::testing::{FakeGeocoder, GatedGeocoder};
    use ratatui::backend::TestBackend;
    use std::sync::Mutex;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn c(lat: f64, lng: f64) -> Coordinates {
        Coordinates::new(lat, lng).unwrap()
    }

    fn loaded() -> LoadedItinerary {
        let itinerary = Itinerary::from(vec![
            Stop::new("Paris", 3).with_coordinates(c(48.85, 2.35)),
            Stop::new("Berlin", 2).with_coordinates(c(52.52, 13.40)),
            Stop::new("Prague", 4),
        ]);
        LoadedItinerary {
            itinerary,
            start: d(2025, 5, 20),
            end: d(2025, 5, 29),
        }
    }

    fn geocoder() -> Arc<dyn Geocoder> {
        Arc::new(FakeGeocoder::with(&[("Vienna", 48.21, 16.37)]))
    }

    fn make_app(options: ViewOptions) -> App {
        App::new(loaded(), options, geocoder(), PathBuf::from("/tmp/itin-test"))
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(code, KeyModifiers::empty())
    }

    fn type_str(app: &mut App, s: &str) {
        for ch in s.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    fn names(app: &App) -> Vec<String> {
        app.itinerary.stops().iter().map(|s| s.location.clone()).collect()
    }

    fn wait_for_add(app: &mut App) {
        while app.is_adding() {
            app.tick();
            std::thread::yield_now();
        }
    }

    fn render_to_string(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    // ── navigation and mutation ───────────────────────────────────────────────

    #[test]
    fn test_arrow_keys_move_cursor_within_bounds() {
        let mut app = make_app(ViewOptions::default());
        press(&mut app, KeyCode::Up);
        assert_eq!(app.list_cursor, 0);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.list_cursor, 2);
    }

    #[test]
    fn test_shift_j_moves_stop_down_and_follows() {
        let mut app = make_app(ViewOptions::default());
        press(&mut app, KeyCode::Char('J'));
        assert_eq!(names(&app), vec!["Berlin", "Paris", "Prague"]);
        assert_eq!(app.list_cursor, 1);
    }

    #[test]
    fn test_shift_up_at_top_is_noop() {
        let mut app = make_app(ViewOptions::default());
        app.handle_key(KeyCode::Up, KeyModifiers::SHIFT);
        assert_eq!(names(&app), vec!["Paris", "Berlin", "Prague"]);
        app.list_cursor = 2;
        app.handle_key(KeyCode::Up, KeyModifiers::SHIFT);
        assert_eq!(names(&app), vec!["Paris", "Prague", "Berlin"]);
        assert_eq!(app.list_cursor, 1);
    }

    #[test]
    fn test_delete_removes_selected_and_clamps_cursor() {
        let mut app = make_app(ViewOptions::default());
        app.list_cursor = 2;
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(names(&app), vec!["Paris", "Berlin"]);
        assert_eq!(app.list_cursor, 1);
    }

    #[test]
    fn test_text_editor_sets_nights() {
        let mut app = make_app(ViewOptions::default());
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.mode, Mode::EditNights);
        assert_eq!(app.input_buffer, "3");
        press(&mut app, KeyCode::Backspace);
        type_str(&mut app, "-3");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.itinerary.stops()[0].nights, 1);
    }

    #[test]
    fn test_text_editor_esc_discards() {
        let mut app = make_app(ViewOptions::default());
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "9");
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.itinerary.stops()[0].nights, 3);
    }

    #[test]
    fn test_stepper_keys_adjust_nights() {
        let options = ViewOptions {
            nights_editor: NightsEditor::Stepper,
            ..ViewOptions::default()
        };
        let mut app = make_app(options);
        app.list_cursor = 1;
        press(&mut app, KeyCode::Char('+'));
        assert_eq!(app.itinerary.stops()[1].nights, 3);
        for _ in 0..5 {
            press(&mut app, KeyCode::Char('-'));
        }
        assert_eq!(app.itinerary.stops()[1].nights, 1);
        // text editing is not available in stepper mode
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn test_q_and_ctrl_c_quit() {
        let mut app = make_app(ViewOptions::default());
        assert!(press(&mut app, KeyCode::Char('q')));
        assert!(app.handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL));
    }

    // ── dates ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_edit_start_date_accepts_legacy_format() {
        let mut app = make_app(ViewOptions::default());
        press(&mut app, KeyCode::Char('S'));
        app.input_buffer.clear();
        type_str(&mut app, "06-01-2025");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.start_date, d(2025, 6, 1));
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn test_edit_end_date_rejects_garbage() {
        let mut app = make_app(ViewOptions::default());
        press(&mut app, KeyCode::Char('E'));
        app.input_buffer.clear();
        type_str(&mut app, "soon");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.mode, Mode::EditEnd);
        assert_eq!(app.input_buffer, "soon");
        assert_eq!(app.status, Some((INVALID_DATE.to_string(), Color::Red)));
        assert!(INVALID_DATE.is_ascii());
        assert_eq!(app.end_date, d(2025, 5, 29));
        // backspace edits the typed date and clears the error
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.input_buffer, "soo");
        assert!(app.status.is_none());
    }

    // ── adding stops ──────────────────────────────────────────────────────────

    #[test]
    fn test_add_resolves_and_appends() {
        let mut app = make_app(ViewOptions::default());
        press(&mut app, KeyCode::Char('a'));
        type_str(&mut app, "  Vienna ");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.mode, Mode::AddNights);
        assert_eq!(app.new_location, "Vienna");
        type_str(&mut app, "2");
        press(&mut app, KeyCode::Enter);
        wait_for_add(&mut app);
        assert_eq!(app.itinerary.len(), 4);
        let vienna = &app.itinerary.stops()[3];
        assert_eq!(vienna.location, "Vienna");
        assert_eq!(vienna.nights, 2);
        assert_eq!(vienna.coordinates, Some(c(48.21, 16.37)));
    }

    #[test]
    fn test_add_without_match_is_rejected() {
        let mut app = make_app(ViewOptions::default());
        press(&mut app, KeyCode::Char('a'));
        type_str(&mut app, "Zzzzxyq");
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "1");
        press(&mut app, KeyCode::Enter);
        wait_for_add(&mut app);
        assert_eq!(app.itinerary.len(), 3);
        let (msg, color) = app.status.clone().unwrap();
        assert_eq!(msg, GEOCODE_FAILED);
        assert_eq!(color, Color::Red);
    }

    #[test]
    fn test_add_requires_location_and_nights() {
        let mut app = make_app(ViewOptions::default());
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.mode, Mode::AddLocation);
        type_str(&mut app, "Vienna");
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.mode, Mode::AddNights);
        assert!(!app.is_adding());
    }

    #[test]
    fn test_add_disabled_while_lookup_pending() {
        let (release, gate) = mpsc::channel();
        let gated: Arc<dyn Geocoder> = Arc::new(GatedGeocoder {
            gate: Mutex::new(gate),
            answer: (45.0, 9.0),
        });
        let mut app = App::new(loaded(), ViewOptions::default(), gated, PathBuf::from("/tmp"));
        press(&mut app, KeyCode::Char('a'));
        type_str(&mut app, "Milan");
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "2");
        press(&mut app, KeyCode::Enter);
        assert!(app.is_adding());

        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.mode, Mode::Normal);

        // other edits are still allowed
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.itinerary.len(), 2);

        release.send(()).unwrap();
        wait_for_add(&mut app);
        assert_eq!(names(&app), vec!["Berlin", "Prague", "Milan"]);
    }

    // ── save / upload ─────────────────────────────────────────────────────────

    #[test]
    fn test_save_writes_derived_itinerary() {
        let tmp = TempDir::new().unwrap();
        let mut app = App::new(
            loaded(),
            ViewOptions::default(),
            geocoder(),
            tmp.path().to_path_buf(),
        );
        press(&mut app, KeyCode::Char('s'));
        let path = tmp.path().join(crate::data::SAVED_ITINERARY_FILE);
        let file = ItineraryFile::open(&path).unwrap();
        assert_eq!(file.records.len(), 3);
        assert_eq!(file.records[1].arrival_date.as_deref(), Some("2025-05-23"));
        assert_eq!(app.status.as_ref().unwrap().1, Color::Green);
    }

    #[test]
    fn test_upload_replaces_itinerary() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("trip.json");
        std::fs::write(
            &path,
            r#"[{"location": "Lisbon", "arrival_date": "07-01-2025", "nights": 4},
                {"location": "Porto", "nights": "2"}]"#,
        )
        .unwrap();
        let mut app = make_app(ViewOptions::default());
        app.list_cursor = 2;
        press(&mut app, KeyCode::Char('o'));
        type_str(&mut app, path.to_str().unwrap());
        press(&mut app, KeyCode::Enter);
        assert_eq!(names(&app), vec!["Lisbon", "Porto"]);
        assert_eq!(app.start_date, d(2025, 7, 1));
        assert_eq!(app.end_date, d(2025, 7, 7));
        assert_eq!(app.list_cursor, 0);
    }

    #[test]
    fn test_invalid_upload_keeps_itinerary() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "{{{").unwrap();
        let mut app = make_app(ViewOptions::default());
        press(&mut app, KeyCode::Char('o'));
        type_str(&mut app, path.to_str().unwrap());
        press(&mut app, KeyCode::Enter);
        assert_eq!(names(&app), vec!["Paris", "Berlin", "Prague"]);
        assert_eq!(app.status.as_ref().unwrap().0, INVALID_FILE);
    }

    #[test]
    fn test_upload_disabled_by_option() {
        let options = ViewOptions {
            allow_upload: false,
            ..ViewOptions::default()
        };
        let mut app = make_app(options);
        press(&mut app, KeyCode::Char('o'));
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn test_load_error_cleared_by_upload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ok.json");
        std::fs::write(&path, r#"[{"location": "Oslo", "nights": 2}]"#).unwrap();
        let mut app = App::with_load_error(
            "Failed to load itinerary_default.json".to_string(),
            d(2025, 1, 1),
            ViewOptions::default(),
            geocoder(),
            tmp.path().to_path_buf(),
        );
        // editing keys are ignored while the error is shown
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.mode, Mode::Normal);
        press(&mut app, KeyCode::Char('o'));
        type_str(&mut app, path.to_str().unwrap());
        press(&mut app, KeyCode::Enter);
        assert!(app.load_error.is_none());
        assert_eq!(names(&app), vec!["Oslo"]);
        assert_eq!(app.start_date, d(2025, 1, 1));
        assert_eq!(app.end_date, d(2025, 1, 3));
    }

    // ── map ───────────────────────────────────────────────────────────────────

    #[test]
    fn test_t_toggles_path_only_when_enabled() {
        let mut app = make_app(ViewOptions::default());
        press(&mut app, KeyCode::Char('t'));
        assert!(!app.path_visible);
        let options = ViewOptions {
            show_path: false,
            ..ViewOptions::default()
        };
        let mut app = make_app(options);
        press(&mut app, KeyCode::Char('t'));
        assert!(app.path_visible);
    }

    #[test]
    fn test_render_feeds_map_with_located_stops() {
        let mut app = make_app(ViewOptions::default());
        render_to_string(&mut app, 140, 40);
        assert_eq!(app.map.markers().len(), 2);
        assert!(app.map.path().is_some());
        press(&mut app, KeyCode::Char('t'));
        render_to_string(&mut app, 140, 40);
        assert!(app.map.path().is_none());
    }

    #[test]
    fn test_marker_click_selects_row() {
        let mut app = make_app(ViewOptions::default());
        render_to_string(&mut app, 140, 40);
        let area = app.map_area.unwrap();
        let inner = Block::default().borders(Borders::ALL).inner(area);
        let vp = app.map.handle().unwrap().viewport;
        let berlin = app.map.markers().iter().find(|m| m.index == 1).unwrap().clone();
        let col = inner.x
            + ((berlin.lng - vp.west) / (vp.east - vp.west) * f64::from(inner.width)).floor()
                as u16;
        let row = inner.y
            + ((vp.north - berlin.lat) / (vp.north - vp.south) * f64::from(inner.height)).floor()
                as u16;
        app.handle_mouse(MouseEventKind::Down(MouseButton::Left), col, row);
        assert_eq!(app.list_cursor, 1);
    }

    #[test]
    fn test_hidden_map_releases_resources() {
        let options = ViewOptions {
            show_map: false,
            ..ViewOptions::default()
        };
        let mut app = make_app(options);
        render_to_string(&mut app, 100, 30);
        assert!(app.map.handle().is_none());
        assert!(app.map_area.is_none());
    }

    // ── rendering ─────────────────────────────────────────────────────────────

    #[test]
    fn test_render_shows_summary_and_dates() {
        let mut app = make_app(ViewOptions::default());
        let screen = render_to_string(&mut app, 140, 40);
        assert!(screen.contains("9 of 9 days assigned"));
        assert!(screen.contains("2025-05-23"));
        assert!(screen.contains("Prague"));
    }

    #[test]
    fn test_render_load_error_screen() {
        let mut app = App::with_load_error(
            "Failed to load itinerary_default.json".to_string(),
            d(2025, 1, 1),
            ViewOptions::default(),
            geocoder(),
            PathBuf::from("/tmp"),
        );
        let screen = render_to_string(&mut app, 100, 20);
        assert!(screen.contains("Failed to load itinerary_default.json"));
        assert!(!screen.contains("Stops"));
    }

    #[test]
    fn test_help_text_reflects_options() {
        let text = help_text(&ViewOptions::default(), true);
        assert!(text.contains("e=nights"));
        assert!(text.contains("o=upload"));
        assert!(text.contains("t=hide path"));
        let stepper = ViewOptions {
            nights_editor: NightsEditor::Stepper,
            allow_upload: false,
            show_map: false,
            ..ViewOptions::default()
        };
        let text = help_text(&stepper, true);
        assert!(text.contains("+/-=nights"));
        assert!(!text.contains("upload"));
        assert!(!text.contains("path"));
    }

    #[test]
    fn test_detail_lines_use_dash_for_missing() {
        let mut stop = Stop::new("Paris", 3);
        stop.activities = vec!["Louvre".to_string()];
        let lines = detail_lines(&stop);
        let first: String = lines[0].spans.iter().map(|s| s.content.to_string()).collect();
        assert!(first.contains("Transport: —"));
        assert_eq!(lines.len(), 3);
    }
}
