//! Parser for the SCT RSS incident feed.
//!
//! Two item layouts show up in the wild: plain RSS items carrying `roadNumber`/`roadName`/
//! `direction` tags, and the GENCAT layout where everything is packed into the description as
//! `ROAD | MUNICIPALITY | DIRECTION | Punt km. START-END | DETAIL`.

use chrono::{DateTime, FixedOffset};
use lazy_static::lazy_static;
use regex::Regex;

use crate::coordinates::{parse_leading_float, resolve_pair};
use crate::errors::FeedError;
use crate::models::{Category, FeedKind, Incident, IncidentLocation, Level, Source};
use crate::xml_reader::{XmlElement, elements_named, parse_document};

const DESCRIPTION_SEPARATOR: &str = " | ";

// first match wins, in this order
const TITLE_RULES: &[(&[&str], Category, Level)] = &[
    (&["obres", "manteniment", "reparaci"], Category::Maintenance, 2),
    (&["accident", "col·lisió"], Category::Accident, 4),
    (&["tall", "tancat"], Category::Closure, 5),
    (&["manifestaci", "retenci"], Category::Congestion, 3),
    (&["neu", "meteorol"], Category::Weather, 4),
];

lazy_static! {
    static ref PK_RANGE: Regex = Regex::new(r"Punt km\. (.+)").unwrap();
    static ref COORDINATE_HINT: Regex = Regex::new(r"(\d+\.\d+),\s*(\d+\.\d+)").unwrap();
}

/// Category and level for a piece of free text, `None` when no keyword list matches.
pub fn categorize_text(text: &str) -> Option<(Category, Level)> {
    let lower = text.to_lowercase();

    TITLE_RULES
        .iter()
        .find(|(keywords, _, _)| keywords.iter().any(|keyword| lower.contains(keyword)))
        .map(|(_, category, level)| (*category, *level))
}

/// Reads `Punt km. 545-544.2` into `(545.0, 544.2)`. A single marker gives the same start and end.
pub fn parse_pk_range(text: &str) -> Option<(f64, f64)> {
    let captures = PK_RANGE.captures(text)?;
    let range = captures.get(1)?.as_str();

    let mut parts = range.split('-');
    let start = parts.next().and_then(parse_leading_float)?;
    let end = parts
        .next()
        .and_then(parse_leading_float)
        .filter(|x| *x != 0.0)
        .unwrap_or(start);

    Some((start, end))
}

/// Optional `lat,lng` pair embedded in a description, after order and range checks.
pub fn coordinate_hint(text: &str) -> Option<(f64, f64)> {
    let captures = COORDINATE_HINT.captures(text)?;
    let first = captures.get(1)?.as_str().parse::<f64>().ok()?;
    let second = captures.get(2)?.as_str().parse::<f64>().ok()?;

    resolve_pair(first, second, captures.get(0)?.as_str())
}

/// The fields packed in a GENCAT description.
#[derive(Clone, Debug, PartialEq)]
pub struct PipeDescription {
    pub road_ref: String,
    pub municipality: String,
    pub direction: String,
    pub pk_range: String,
    pub specific_location: Option<String>,
}

pub fn split_description(description: &str) -> Option<PipeDescription> {
    let parts: Vec<&str> = description
        .split(DESCRIPTION_SEPARATOR)
        .map(str::trim)
        .collect();

    if parts.len() < 4 {
        return None;
    }

    Some(PipeDescription {
        road_ref: parts[0].to_string(),
        municipality: parts[1].to_string(),
        direction: parts[2].to_string(),
        pk_range: parts[3].to_string(),
        specific_location: parts
            .get(4)
            .map(|x| x.to_string())
            .filter(|x| !x.is_empty()),
    })
}

fn empty_to_none(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn location_from_description(description: &str) -> Option<IncidentLocation> {
    let parts = match split_description(description) {
        Some(parts) => parts,
        None => {
            tracing::warn!(description, "invalid SCT RSS description format");
            return None;
        }
    };

    let (pk_start, pk_end) = match parse_pk_range(&parts.pk_range) {
        Some((start, end)) => (Some(start), Some(end)),
        None => (None, None),
    };

    let summary = format!(
        "{} - {} ({})",
        parts.road_ref, parts.municipality, parts.pk_range
    );

    Some(IncidentLocation {
        road_number: empty_to_none(&parts.road_ref),
        town: empty_to_none(&parts.municipality),
        direction: empty_to_none(&parts.direction),
        pk_start,
        pk_end,
        specific_location: parts.specific_location,
        description: summary.clone(),
        display_text: summary,
        ..Default::default()
    })
}

fn location_from_tags<E: XmlElement>(item: E) -> IncidentLocation {
    let road_number = item.child_text("roadNumber");
    let road = item.child_text("roadName");
    let town = item.child_text("townName");

    let road_label = road_number
        .as_deref()
        .or(road.as_deref())
        .unwrap_or("Unknown");

    let summary = match &town {
        Some(town) => format!("{} - {}", road_label, town),
        None => road_label.to_string(),
    };

    IncidentLocation {
        road_number,
        road,
        town,
        direction: item.child_text("direction"),
        description: summary.clone(),
        display_text: summary,
        ..Default::default()
    }
}

fn observations(location: &IncidentLocation) -> String {
    let mut parts: Vec<String> = vec![];

    if let Some(detail) = &location.specific_location {
        parts.push(detail.clone());
    }

    if let Some(direction) = &location.direction {
        parts.push(format!("Direcció: {}", direction));
    }

    parts.join(" | ")
}

/// Builds the incident for one `<item>`, `None` when a required element is missing or the
/// description cannot be read.
pub fn parse_rss_item<E: XmlElement>(item: E, index: usize) -> Option<Incident> {
    let (title, description, link, pub_date, feed_category) = match (
        item.child_text("title"),
        item.child_text("description"),
        item.child_text("link"),
        item.child_text("pubDate"),
        item.child_text("category"),
    ) {
        (Some(title), Some(description), Some(link), Some(pub_date), Some(category)) => {
            (title, description, link, pub_date, category)
        }
        _ => {
            tracing::warn!(index, "skipping SCT RSS item with missing fields");
            return None;
        }
    };

    let flat_layout =
        item.find_descendant("roadNumber").is_some() || item.find_descendant("roadName").is_some();

    let mut location = if flat_layout {
        location_from_tags(item)
    } else {
        location_from_description(&description)?
    };

    location.set_coordinates(coordinate_hint(&description));

    let (category, level) = categorize_text(&title)
        .or_else(|| categorize_text(&feed_category))
        .unwrap_or((Category::Other, 1));

    let id = item.child_text("guid").unwrap_or(link);
    let observations = observations(&location);

    let mut incident = Incident::new(
        id,
        title,
        description,
        category,
        level,
        location,
        Source::SctRss,
    );

    incident.reason = feed_category.clone();
    incident.observations = observations;
    incident.feed_category = Some(feed_category);
    incident.published = DateTime::<FixedOffset>::parse_from_rfc2822(&pub_date).ok();
    incident.pub_date = Some(pub_date);

    Some(incident)
}

pub fn parse_rss_feed(text: &str) -> Result<Vec<Incident>, FeedError> {
    let document = parse_document(FeedKind::Rss, text)?;
    let items = elements_named(&document, "item");

    let incidents = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| parse_rss_item(item, index))
        .collect::<Vec<Incident>>();

    tracing::info!(count = incidents.len(), "parsed SCT RSS incidents");

    Ok(incidents)
}
