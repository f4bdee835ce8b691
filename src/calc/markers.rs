use crate::data::Coordinates;
use std::collections::HashMap;
use std::f64::consts::PI;

/// Precision (in degrees) used to decide that two points share a location.
const GROUP_PRECISION: f64 = 1e5;
/// Radius of the circle co-located markers are spread over, in degrees.
pub const FAN_OUT_RADIUS: f64 = 0.01;

/// A marker ready to draw. `index` is the segment position it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedMarker {
    pub index: usize,
    pub lat: f64,
    pub lng: f64,
}

fn group_key(c: &Coordinates) -> (i64, i64) {
    (
        (c.lat * GROUP_PRECISION).round() as i64,
        (c.lng * GROUP_PRECISION).round() as i64,
    )
}

/// Places one marker per point. Points that round to the same location are
/// spread evenly around a small circle so each stays individually clickable.
/// Groups are emitted in first-seen order.
pub fn place_markers(points: &[(usize, Coordinates)]) -> Vec<PlacedMarker> {
    let mut order: Vec<(i64, i64)> = Vec::new();
    let mut groups: HashMap<(i64, i64), Vec<(usize, Coordinates)>> = HashMap::new();
    for &(index, c) in points {
        let key = group_key(&c);
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push((index, c));
    }

    let mut placed = Vec::with_capacity(points.len());
    for key in order {
        let group = &groups[&key];
        let n = group.len();
        for (i, &(index, c)) in group.iter().enumerate() {
            let (mut lat, mut lng) = (c.lat, c.lng);
            if n > 1 {
                let angle = 2.0 * PI * i as f64 / n as f64;
                lat += angle.sin() * FAN_OUT_RADIUS;
                lng += angle.cos() * FAN_OUT_RADIUS;
            }
            placed.push(PlacedMarker { index, lat, lng });
        }
    }
    placed
}
