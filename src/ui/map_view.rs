use crate::calc::markers::place_markers;
use crate::data::Coordinates;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols,
    text::Span,
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Map, MapResolution},
        Block, Borders,
    },
    Frame,
};

/// Minimum padding around the fitted points, in degrees.
const PADDING_DEG: f64 = 2.0;
/// Smallest extent the viewport shrinks to on either axis.
const MIN_SPAN_DEG: f64 = 6.0;

const MARKER_COLOR: Color = Color::Rgb(25, 118, 210);
const PATH_COLOR: Color = Color::Rgb(51, 173, 255);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl Viewport {
    pub fn world() -> Self {
        Viewport {
            west: -180.0,
            east: 180.0,
            south: -90.0,
            north: 90.0,
        }
    }

    /// Bounding box of `points` grown by a margin and clamped to the globe.
    pub fn fit(points: &[Coordinates]) -> Self {
        if points.is_empty() {
            return Self::world();
        }
        let mut west = f64::MAX;
        let mut east = f64::MIN;
        let mut south = f64::MAX;
        let mut north = f64::MIN;
        for p in points {
            west = west.min(p.lng);
            east = east.max(p.lng);
            south = south.min(p.lat);
            north = north.max(p.lat);
        }
        let (west, east) = pad_axis(west, east);
        let (south, north) = pad_axis(south, north);
        Viewport {
            west: west.max(-180.0),
            east: east.min(180.0),
            south: south.max(-90.0),
            north: north.min(90.0),
        }
    }

    fn width(&self) -> f64 {
        self.east - self.west
    }

    fn height(&self) -> f64 {
        self.north - self.south
    }
}

fn pad_axis(lo: f64, hi: f64) -> (f64, f64) {
    let pad = ((hi - lo) * 0.1).max(PADDING_DEG);
    let (mut lo, mut hi) = (lo - pad, hi + pad);
    if hi - lo < MIN_SPAN_DEG {
        let mid = (lo + hi) / 2.0;
        lo = mid - MIN_SPAN_DEG / 2.0;
        hi = mid + MIN_SPAN_DEG / 2.0;
    }
    (lo, hi)
}

/// The drawn map itself. Created the first time there is something to show.
#[derive(Debug, Clone, Copy)]
pub struct MapHandle {
    pub viewport: Viewport,
    pub resolution: MapResolution,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerHandle {
    /// Segment position this marker stands for.
    pub index: usize,
    pub lat: f64,
    pub lng: f64,
    pub label: String,
}

/// Connecting line through the segments in travel order, as (lng, lat).
#[derive(Debug, Clone, PartialEq)]
pub struct PathLayer {
    pub points: Vec<(f64, f64)>,
}

/// Owns every map resource. Markers and the path are rebuilt from scratch
/// whenever their inputs change; `teardown` (also run on drop) releases all
/// of them.
#[derive(Default)]
pub struct MapView {
    handle: Option<MapHandle>,
    markers: Vec<MarkerHandle>,
    path: Option<PathLayer>,
    points: Vec<(usize, Coordinates)>,
    show_path: bool,
    generation: u64,
}

impl MapView {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn handle(&self) -> Option<&MapHandle> {
        self.handle.as_ref()
    }

    #[cfg(test)]
    pub fn markers(&self) -> &[MarkerHandle] {
        &self.markers
    }

    #[cfg(test)]
    pub fn path(&self) -> Option<&PathLayer> {
        self.path.as_ref()
    }

    /// Feeds the current points and path toggle. Does nothing when neither
    /// changed since the last call.
    pub fn update(&mut self, points: &[(usize, Coordinates)], show_path: bool) {
        let points_changed = self.points != points;
        let path_changed = self.show_path != show_path;
        if !points_changed && !path_changed {
            return;
        }
        self.show_path = show_path;
        if points_changed {
            self.points = points.to_vec();
            self.replace_markers();
        }
        self.replace_path();
        self.generation += 1;
        tracing::debug!(
            generation = self.generation,
            markers = self.markers.len(),
            path = self.path.is_some(),
            "map view updated"
        );
    }

    fn replace_markers(&mut self) {
        self.markers.clear();
        if self.points.is_empty() {
            return;
        }
        let coords: Vec<Coordinates> = self.points.iter().map(|(_, c)| *c).collect();
        let viewport = Viewport::fit(&coords);
        match self.handle.as_mut() {
            Some(handle) => handle.viewport = viewport,
            None => {
                self.handle = Some(MapHandle {
                    viewport,
                    resolution: MapResolution::High,
                })
            }
        }
        self.markers = place_markers(&self.points)
            .into_iter()
            .map(|m| MarkerHandle {
                index: m.index,
                lat: m.lat,
                lng: m.lng,
                label: (m.index + 1).to_string(),
            })
            .collect();
    }

    fn replace_path(&mut self) {
        self.path = None;
        if self.show_path && self.points.len() > 1 {
            self.path = Some(PathLayer {
                points: self.points.iter().map(|(_, c)| (c.lng, c.lat)).collect(),
            });
        }
    }

    /// Drops the map handle, every marker and the path.
    pub fn teardown(&mut self) {
        if self.handle.is_none() && self.markers.is_empty() && self.path.is_none() {
            return;
        }
        tracing::debug!(generation = self.generation, "map view torn down");
        self.handle = None;
        self.markers.clear();
        self.path = None;
        self.points.clear();
    }

    fn inner(area: Rect) -> Rect {
        Block::default().borders(Borders::ALL).inner(area)
    }

    /// Which segment's marker, if any, sits under a terminal cell.
    pub fn marker_at(&self, area: Rect, column: u16, row: u16) -> Option<usize> {
        let handle = self.handle.as_ref()?;
        let inner = Self::inner(area);
        if inner.width == 0 || inner.height == 0 {
            return None;
        }
        if column < inner.x
            || column >= inner.x + inner.width
            || row < inner.y
            || row >= inner.y + inner.height
        {
            return None;
        }
        let vp = handle.viewport;
        let cell_w = vp.width() / f64::from(inner.width);
        let cell_h = vp.height() / f64::from(inner.height);
        let lng = vp.west + (f64::from(column - inner.x) + 0.5) * cell_w;
        let lat = vp.north - (f64::from(row - inner.y) + 0.5) * cell_h;

        self.markers
            .iter()
            .filter_map(|m| {
                // labels are printed starting at the marker position
                let label_w = cell_w * m.label.len() as f64;
                if lng < m.lng - cell_w || lng > m.lng + label_w {
                    return None;
                }
                let dy = (m.lat - lat).abs() / cell_h;
                if dy > 1.0 {
                    return None;
                }
                Some((m.index, dy + (m.lng - lng).abs() / cell_w))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    pub fn render(&self, f: &mut Frame, area: Rect, selected: Option<usize>, title: &str) {
        let block = Block::default().borders(Borders::ALL).title(title.to_string());
        let handle = match self.handle {
            Some(h) => h,
            None => {
                let canvas = Canvas::default()
                    .block(block)
                    .marker(symbols::Marker::Braille)
                    .x_bounds([-180.0, 180.0])
                    .y_bounds([-90.0, 90.0])
                    .paint(|ctx| {
                        ctx.draw(&Map {
                            color: Color::DarkGray,
                            resolution: MapResolution::Low,
                        });
                    });
                f.render_widget(canvas, area);
                return;
            }
        };

        let vp = handle.viewport;
        let canvas = Canvas::default()
            .block(block)
            .marker(symbols::Marker::Braille)
            .x_bounds([vp.west, vp.east])
            .y_bounds([vp.south, vp.north])
            .paint(|ctx| {
                ctx.draw(&Map {
                    color: Color::DarkGray,
                    resolution: handle.resolution,
                });
                ctx.layer();
                if let Some(path) = &self.path {
                    for pair in path.points.windows(2) {
                        ctx.draw(&CanvasLine::new(
                            pair[0].0, pair[0].1, pair[1].0, pair[1].1, PATH_COLOR,
                        ));
                    }
                    ctx.layer();
                }
                for m in &self.markers {
                    let style = if Some(m.index) == selected {
                        Style::default()
                            .fg(Color::Black)
                            .bg(Color::Yellow)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                            .fg(Color::White)
                            .bg(MARKER_COLOR)
                            .add_modifier(Modifier::BOLD)
                    };
                    ctx.print(m.lng, m.lat, Span::styled(m.label.clone(), style));
                }
            });
        f.render_widget(canvas, area);
    }
}

impl Drop for MapView {
    fn drop(&mut self) {
        self.teardown();
    }
}
