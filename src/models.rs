// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use chrono::{DateTime, FixedOffset};
use std::fmt;

use crate::coordinates::{CATALONIA_CENTER_LAT, CATALONIA_CENTER_LNG};

/// Which authority feed a document came from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Rss,
    Gml,
    Datex2,
}

impl FeedKind {
    pub fn source(&self) -> Source {
        match self {
            FeedKind::Rss => Source::SctRss,
            FeedKind::Gml => Source::SctGml,
            FeedKind::Datex2 => Source::Dgt,
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::Rss => write!(f, "rss"),
            FeedKind::Gml => write!(f, "gml"),
            FeedKind::Datex2 => write!(f, "datex2"),
        }
    }
}

/// Raw XML as returned by one of the feed endpoints. Consumed once by the matching parser.
#[derive(Clone, Debug)]
pub struct RawFeedDocument {
    pub kind: FeedKind,
    pub body: String,
}

impl RawFeedDocument {
    pub fn new(kind: FeedKind, body: impl Into<String>) -> Self {
        RawFeedDocument {
            kind,
            body: body.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Maintenance,
    Accident,
    Closure,
    Congestion,
    Weather,
    Other,
}

impl Category {
    pub fn icon(&self) -> &'static str {
        match self {
            Category::Maintenance => "🔧",
            Category::Accident => "🚨",
            Category::Closure => "🚧",
            Category::Congestion => "🚗",
            Category::Weather => "❄️",
            Category::Other => "⚠️",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Maintenance => "maintenance",
            Category::Accident => "accident",
            Category::Closure => "closure",
            Category::Congestion => "congestion",
            Category::Weather => "weather",
            Category::Other => "other",
        }
    }

    pub fn parse(name: &str) -> Option<Category> {
        match name.trim().to_lowercase().as_str() {
            "maintenance" => Some(Category::Maintenance),
            "accident" => Some(Category::Accident),
            "closure" => Some(Category::Closure),
            "congestion" => Some(Category::Congestion),
            "weather" => Some(Category::Weather),
            "other" => Some(Category::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Source {
    #[serde(rename = "SCT_RSS")]
    SctRss,
    #[serde(rename = "SCT_GML")]
    SctGml,
    #[serde(rename = "DGT")]
    Dgt,
}

impl Source {
    /// Lower wins when two sources report the same road section.
    pub fn priority(&self) -> u8 {
        match self {
            Source::SctRss => 1,
            Source::SctGml => 2,
            Source::Dgt => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::SctRss => "SCT_RSS",
            Source::SctGml => "SCT_GML",
            Source::Dgt => "DGT",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity from 1 (informative) to 5 (road closed).
pub type Level = u8;

pub fn level_color(level: Level) -> &'static str {
    match level {
        0 | 1 => "#28a745",
        2 => "#ffc107",
        3 => "#fd7e14",
        4 => "#dc3545",
        _ => "#000000",
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncidentLocation {
    pub road_number: Option<String>,
    pub road: Option<String>,
    pub town: Option<String>,
    pub comarca: Option<String>,
    pub province: Option<String>,
    pub region: Option<String>,
    pub direction: Option<String>,
    pub pk_start: Option<f64>,
    pub pk_end: Option<f64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub has_coordinates: bool,
    #[serde(rename = "cap_a")]
    pub cap_a: Option<String>,
    pub specific_location: Option<String>,
    pub data_inici: Option<String>,
    pub data_fi: Option<String>,
    pub hora_inici: Option<String>,
    pub hora_fi: Option<String>,
    pub fase: Option<String>,
    pub data_fase: Option<String>,
    pub location_type: Option<String>,
    /// `Some(true)` when the point came from geocoding, `Some(false)` for a fallback placement.
    pub geocoded: Option<bool>,
    pub description: String,
    pub display_text: String,
}

impl IncidentLocation {
    /// Sets both coordinates, or clears both when either is missing.
    pub fn set_coordinates(&mut self, point: Option<(f64, f64)>) {
        match point {
            Some((lat, lng)) => {
                self.lat = Some(lat);
                self.lng = Some(lng);
                self.has_coordinates = true;
            }
            None => {
                self.lat = None;
                self.lng = None;
                self.has_coordinates = false;
            }
        }
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.has_coordinates, self.lat, self.lng) {
            (true, Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// Road reference used for display and deduplication.
    pub fn road_ref(&self) -> Option<&str> {
        non_empty(self.road_number.as_deref()).or_else(|| non_empty(self.road.as_deref()))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub level: Level,
    pub icon: String,
    pub color: String,
    pub location: IncidentLocation,
    pub source: Source,
    pub reason: String,
    pub observations: String,
    pub active: bool,
    /// The feed's own severity indicator (`nivell`), when it carries one.
    pub feed_level: Option<i32>,
    pub feed_category: Option<String>,
    pub pub_date: Option<String>,
    pub published: Option<DateTime<FixedOffset>>,
}

impl Incident {
    /// Builds an incident whose icon and color follow from `category` and `level`.
    pub fn new(
        id: String,
        title: String,
        description: String,
        category: Category,
        level: Level,
        location: IncidentLocation,
        source: Source,
    ) -> Self {
        Incident {
            id,
            title,
            description,
            category,
            level,
            icon: category.icon().to_string(),
            color: level_color(level).to_string(),
            location,
            source,
            reason: String::new(),
            observations: String::new(),
            active: true,
            feed_level: None,
            feed_category: None,
            pub_date: None,
            published: None,
        }
    }

    /// Where a map should place this incident. Accidents without coordinates still get a pin
    /// at the centre of Catalonia.
    pub fn display_position(&self) -> Option<(f64, f64)> {
        match self.location.coordinates() {
            Some(point) => Some(point),
            None if self.category == Category::Accident => {
                Some((CATALONIA_CENTER_LAT, CATALONIA_CENTER_LNG))
            }
            None => None,
        }
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|x| !x.trim().is_empty())
}

pub(crate) fn non_empty_owned(value: Option<String>) -> Option<String> {
    value.filter(|x| !x.trim().is_empty())
}
