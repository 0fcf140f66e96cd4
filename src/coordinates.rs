use lazy_static::lazy_static;
use regex::Regex;

pub const CATALONIA_CENTROID_LAT: f64 = 41.5;
pub const CATALONIA_CENTROID_LNG: f64 = 1.5;

/// Where incidents without coordinates are pinned on the map.
pub const CATALONIA_CENTER_LAT: f64 = 41.5912;
pub const CATALONIA_CENTER_LNG: f64 = 1.5209;

lazy_static! {
    static ref LEADING_FLOAT: Regex =
        Regex::new(r"^\s*[-+]?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?").unwrap();
    pub(crate) static ref PAIR_SEPARATOR: Regex = Regex::new(r"[,;\s]+").unwrap();
}

/// Tight bounds used to tell latitude from longitude.
pub fn is_catalonia_lat_lng(lat: f64, lng: f64) -> bool {
    (40.5..=42.8).contains(&lat) && (0.15..=3.35).contains(&lng)
}

/// Looser bounds every published coordinate must satisfy.
pub fn within_catalonia_box(lat: f64, lng: f64) -> bool {
    (40.0..=43.0).contains(&lat) && (-1.0..=4.0).contains(&lng)
}

/// Decides which number of a raw pair is the latitude. Returns `(lat, lng)`.
pub fn disambiguate_order(first: f64, second: f64) -> (f64, f64) {
    if is_catalonia_lat_lng(first, second) {
        return (first, second);
    }

    if is_catalonia_lat_lng(second, first) {
        return (second, first);
    }

    let as_lat_lng =
        (first - CATALONIA_CENTROID_LAT).abs() + (second - CATALONIA_CENTROID_LNG).abs();
    let as_lng_lat =
        (second - CATALONIA_CENTROID_LAT).abs() + (first - CATALONIA_CENTROID_LNG).abs();

    tracing::debug!(
        first,
        second,
        "coordinates outside Catalonia, choosing order closest to the centroid"
    );

    if as_lat_lng < as_lng_lat {
        (first, second)
    } else {
        (second, first)
    }
}

/// Order disambiguation followed by the final box check. `None` means the pair is discarded.
pub fn resolve_pair(first: f64, second: f64, raw: &str) -> Option<(f64, f64)> {
    if !first.is_finite() || !second.is_finite() {
        return None;
    }

    let (lat, lng) = disambiguate_order(first, second);

    if within_catalonia_box(lat, lng) {
        Some((lat, lng))
    } else {
        tracing::warn!(lat, lng, raw, "discarding coordinates outside Catalonia");
        None
    }
}

/// Reads the number at the start of `input`, ignoring whatever follows it.
pub fn parse_leading_float(input: &str) -> Option<f64> {
    LEADING_FLOAT
        .find(input)
        .and_then(|m| m.as_str().trim().parse::<f64>().ok())
}

/// First two numbers of raw coordinate text, separated by commas, semicolons or whitespace.
pub fn split_coordinate_text(text: &str) -> Option<(f64, f64)> {
    let mut parts = PAIR_SEPARATOR.split(text.trim()).filter(|x| !x.is_empty());

    let first = parse_leading_float(parts.next()?)?;
    let second = parse_leading_float(parts.next()?)?;

    Some((first, second))
}

/// Full treatment of a raw coordinate string found in a feed.
pub fn resolve_coordinate_text(text: &str) -> Option<(f64, f64)> {
    let (first, second) = split_coordinate_text(text)?;
    resolve_pair(first, second, text)
}

pub fn plausible_lat_lng(first: f64, second: f64) -> bool {
    (-90.0..=90.0).contains(&first) && (-180.0..=180.0).contains(&second)
}
