use std::cmp::Ordering;

use crate::models::{Category, Incident, IncidentLocation, Source};

/// Catalan label for DATEX2 direction names. Anything else is shown as it came.
pub fn direction_label(direction: &str) -> &str {
    match direction {
        "northBound" => "Sentit nord",
        "southBound" => "Sentit sud",
        "eastBound" => "Sentit est",
        "westBound" => "Sentit oest",
        "bothWays" => "Ambdós sentits",
        "clockwise" => "Sentit horari",
        "counterclockwise" => "Sentit antihorari",
        other => other,
    }
}

pub fn source_label(source: Source) -> &'static str {
    match source {
        Source::SctRss => "SCT (Servei Català de Trànsit - RSS)",
        Source::SctGml => "SCT (Servei Català de Trànsit - GML)",
        Source::Dgt => "DGT (Dirección General de Tráfico)",
    }
}

/// Authority name without the feed, for narrow table columns.
pub fn source_short_label(source: Source) -> &'static str {
    match source {
        Source::SctRss | Source::SctGml => "SCT",
        Source::Dgt => "DGT",
    }
}

pub fn geocoding_note(location: &IncidentLocation) -> Option<&'static str> {
    match location.geocoded {
        Some(true) => Some("Ubicació geocodificada (des d'OSM)"),
        Some(false) => Some("Ubicació aproximada (sense coordenades exactes)"),
        None => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// `all` or a category name.
    pub fn parse(value: &str) -> Option<CategoryFilter> {
        if value.trim().eq_ignore_ascii_case("all") {
            Some(CategoryFilter::All)
        } else {
            Category::parse(value).map(CategoryFilter::Only)
        }
    }

    pub fn matches(&self, incident: &Incident) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => incident.category == *category,
        }
    }

    pub fn apply<'a>(&self, incidents: &'a [Incident]) -> Vec<&'a Incident> {
        incidents.iter().filter(|x| self.matches(x)).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    Level,
    Road,
    Pk,
    Source,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

fn road_sort_value(incident: &Incident) -> String {
    incident
        .location
        .road_ref()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

fn compare(key: SortKey, a: &Incident, b: &Incident) -> Ordering {
    match key {
        SortKey::Level => a.level.cmp(&b.level),
        SortKey::Road => road_sort_value(a).cmp(&road_sort_value(b)),
        SortKey::Pk => a
            .location
            .pk_start
            .unwrap_or(0.0)
            .total_cmp(&b.location.pk_start.unwrap_or(0.0)),
        SortKey::Source => source_short_label(a.source).cmp(source_short_label(b.source)),
    }
}

/// Stable, so incidents that compare equal keep their current order.
pub fn sort_incidents(incidents: &mut [Incident], key: SortKey, direction: SortDirection) {
    incidents.sort_by(|a, b| {
        let ordering = compare(key, a, b);
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

pub fn pk_label(location: &IncidentLocation) -> String {
    match (location.pk_start, location.pk_end) {
        (Some(start), Some(end)) if start != end => format!("{}-{}", start, end),
        (Some(start), _) => start.to_string(),
        _ => "-".to_string(),
    }
}

/// One line of the incident table: level, road, place, pk, direction, title, source.
pub fn table_row(incident: &Incident) -> [String; 7] {
    let location = &incident.location;

    let place = location
        .town
        .clone()
        .or_else(|| location.comarca.clone())
        .unwrap_or_else(|| location.display_text.clone());

    [
        incident.level.to_string(),
        location.road_ref().unwrap_or("-").to_string(),
        place,
        pk_label(location),
        direction_label(location.direction.as_deref().unwrap_or("Unknown")).to_string(),
        incident.title.clone(),
        source_short_label(incident.source).to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(id: &str, level: u8, road: &str, pk: f64, source: Source) -> Incident {
        let location = IncidentLocation {
            road_number: Some(road.to_string()),
            pk_start: Some(pk),
            pk_end: Some(pk),
            ..Default::default()
        };
        Incident::new(
            id.to_string(),
            format!("incident {}", id),
            String::new(),
            Category::Other,
            level,
            location,
            source,
        )
    }

    fn ids(incidents: &[Incident]) -> Vec<&str> {
        incidents.iter().map(|x| x.id.as_str()).collect()
    }

    #[test]
    fn directions_are_translated() {
        assert_eq!(direction_label("northBound"), "Sentit nord");
        assert_eq!(direction_label("westBound"), "Sentit oest");
        assert_eq!(direction_label("Girona"), "Girona");
    }

    #[test]
    fn sorts_by_each_key() {
        let mut incidents = vec![
            incident("a", 3, "C-58", 12.0, Source::SctRss),
            incident("b", 5, "AP-7", 100.0, Source::Dgt),
            incident("c", 1, "b-23", 2.5, Source::SctGml),
        ];

        sort_incidents(&mut incidents, SortKey::Level, SortDirection::Descending);
        assert_eq!(ids(&incidents), vec!["b", "a", "c"]);

        sort_incidents(&mut incidents, SortKey::Road, SortDirection::Ascending);
        assert_eq!(ids(&incidents), vec!["b", "c", "a"]);

        sort_incidents(&mut incidents, SortKey::Pk, SortDirection::Ascending);
        assert_eq!(ids(&incidents), vec!["c", "a", "b"]);

        sort_incidents(&mut incidents, SortKey::Source, SortDirection::Ascending);
        assert_eq!(ids(&incidents), vec!["b", "c", "a"]);
    }

    #[test]
    fn filter_by_category() {
        let mut accident = incident("x", 4, "C-16", 1.0, Source::SctRss);
        accident.category = Category::Accident;
        let incidents = vec![accident, incident("y", 1, "C-16", 1.0, Source::SctRss)];

        assert_eq!(CategoryFilter::All.apply(&incidents).len(), 2);

        let only = CategoryFilter::parse("accident").unwrap().apply(&incidents);
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].id, "x");

        assert_eq!(CategoryFilter::parse("ALL"), Some(CategoryFilter::All));
        assert_eq!(CategoryFilter::parse("traffic"), None);
    }

    #[test]
    fn table_row_uses_labels() {
        let mut record = incident("r", 2, "AP-7", 100.0, Source::SctGml);
        record.location.pk_end = Some(102.0);
        record.location.town = Some("Girona".to_string());
        record.location.direction = Some("southBound".to_string());

        let row = table_row(&record);
        assert_eq!(row[0], "2");
        assert_eq!(row[1], "AP-7");
        assert_eq!(row[2], "Girona");
        assert_eq!(row[3], "100-102");
        assert_eq!(row[4], "Sentit sud");
        assert_eq!(row[6], "SCT");
    }

    #[test]
    fn geocoding_note_follows_flag() {
        let mut location = IncidentLocation::default();
        assert_eq!(geocoding_note(&location), None);

        location.geocoded = Some(true);
        assert_eq!(geocoding_note(&location), Some("Ubicació geocodificada (des d'OSM)"));

        location.geocoded = Some(false);
        assert_eq!(
            geocoding_note(&location),
            Some("Ubicació aproximada (sense coordenades exactes)")
        );
    }

    #[test]
    fn source_labels_name_the_feed() {
        assert_eq!(source_label(Source::SctRss), "SCT (Servei Català de Trànsit - RSS)");
        assert_eq!(source_label(Source::Dgt), "DGT (Dirección General de Tráfico)");
        assert_eq!(source_short_label(Source::SctGml), "SCT");
    }
}
