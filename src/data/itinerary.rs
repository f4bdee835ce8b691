use crate::data::stop::Stop;

/// Parses a nights value leniently: optional leading whitespace and sign,
/// then digits up to the first non-digit. Anything that does not produce a
/// positive number becomes 1.
pub fn parse_nights(raw: &str) -> u32 {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits: &str = {
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        &digits[..end]
    };
    if negative || digits.is_empty() {
        return 1;
    }
    let value = digits.parse::<u64>().unwrap_or(u64::MAX);
    value.clamp(1, u64::from(u32::MAX)) as u32
}

/// The ordered list of stops. Every operation returns a new itinerary and
/// leaves `self` untouched; out-of-range indices yield an unchanged copy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Itinerary {
    stops: Vec<Stop>,
}

impl From<Vec<Stop>> for Itinerary {
    fn from(stops: Vec<Stop>) -> Self {
        let stops = stops
            .into_iter()
            .map(|mut s| {
                s.nights = s.nights.max(1);
                s
            })
            .collect();
        Itinerary { stops }
    }
}

impl Itinerary {
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn get(&self, index: usize) -> Option<&Stop> {
        self.stops.get(index)
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn total_nights(&self) -> u64 {
        self.stops.iter().map(|s| u64::from(s.nights)).sum()
    }

    pub fn set_nights(&self, index: usize, raw: &str) -> Itinerary {
        let mut next = self.clone();
        if let Some(stop) = next.stops.get_mut(index) {
            stop.nights = parse_nights(raw);
        }
        next
    }

    pub fn move_up(&self, index: usize) -> Itinerary {
        let mut next = self.clone();
        if index > 0 && index < next.stops.len() {
            next.stops.swap(index - 1, index);
        }
        next
    }

    pub fn move_down(&self, index: usize) -> Itinerary {
        let mut next = self.clone();
        if index + 1 < next.stops.len() {
            next.stops.swap(index, index + 1);
        }
        next
    }

    pub fn remove(&self, index: usize) -> Itinerary {
        let mut next = self.clone();
        if index < next.stops.len() {
            next.stops.remove(index);
        }
        next
    }

    /// Appends a stop. Callers resolve coordinates before adding; a failed
    /// lookup must not reach this point.
    pub fn add(&self, mut stop: Stop) -> Itinerary {
        stop.nights = stop.nights.max(1);
        let mut next = self.clone();
        next.stops.push(stop);
        next
    }
}
