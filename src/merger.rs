use ahash::AHashMap;

use crate::models::{Incident, IncidentLocation};

const UNKNOWN: &str = "unknown";

/// Kilometre markers of 0 count as missing, same as an absent one.
fn pk_key(pk: Option<f64>) -> String {
    match pk {
        Some(value) if value != 0.0 && value.is_finite() => value.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// `<road>-<pkStart>-<pkEnd>` with `unknown` standing in for anything missing. Records without
/// any road or kilometre data therefore all land in the same group.
pub fn dedup_key(location: &IncidentLocation) -> String {
    format!(
        "{}-{}-{}",
        location.road_ref().unwrap_or(UNKNOWN),
        pk_key(location.pk_start),
        pk_key(location.pk_end)
    )
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|x| x.trim().is_empty())
}

fn backfill_field(target: &mut Option<String>, donor: &Option<String>) {
    if is_blank(target) && !is_blank(donor) {
        *target = donor.clone();
    }
}

/// Copies town, comarca and cap_a from `loser` wherever `winner` has nothing.
pub fn backfill(winner: &mut Incident, loser: &Incident) {
    backfill_field(&mut winner.location.town, &loser.location.town);
    backfill_field(&mut winner.location.comarca, &loser.location.comarca);
    backfill_field(&mut winner.location.cap_a, &loser.location.cap_a);
}

fn resolve_group(key: &str, mut group: Vec<Incident>) -> Option<Incident> {
    // equal priorities fall back to id so the winner does not depend on arrival order
    group.sort_by(|a, b| {
        a.source
            .priority()
            .cmp(&b.source.priority())
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut records = group.into_iter();
    let mut winner = records.next()?;

    for loser in records {
        tracing::debug!(
            key,
            kept = %winner.source,
            discarded = %loser.source,
            "merging duplicate incident"
        );
        backfill(&mut winner, &loser);
    }

    Some(winner)
}

/// Collapses incidents describing the same road section into one record per section.
pub fn merge_incidents(incidents: Vec<Incident>) -> Vec<Incident> {
    let input_len = incidents.len();

    let mut key_order: Vec<String> = vec![];
    let mut groups: AHashMap<String, Vec<Incident>> = AHashMap::new();

    for incident in incidents {
        let key = dedup_key(&incident.location);

        match groups.get_mut(&key) {
            Some(group) => group.push(incident),
            None => {
                key_order.push(key.clone());
                groups.insert(key, vec![incident]);
            }
        }
    }

    let merged = key_order
        .into_iter()
        .filter_map(|key| {
            let group = groups.remove(&key)?;
            resolve_group(&key, group)
        })
        .collect::<Vec<Incident>>();

    tracing::info!(
        input = input_len,
        merged = merged.len(),
        "combined incidents by road and kilometre range"
    );

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Source};

    fn incident(source: Source, road: Option<&str>, pk: Option<(f64, f64)>) -> Incident {
        let location = IncidentLocation {
            road_number: road.map(|x| x.to_string()),
            pk_start: pk.map(|x| x.0),
            pk_end: pk.map(|x| x.1),
            ..Default::default()
        };

        Incident::new(
            format!("{}-id", source),
            "title".to_string(),
            "description".to_string(),
            Category::Maintenance,
            2,
            location,
            source,
        )
    }

    #[test]
    fn rss_wins_and_keeps_its_town() {
        let mut rss = incident(Source::SctRss, Some("C-58"), Some((10.0, 12.0)));
        rss.location.town = Some("Terrassa".to_string());

        let mut gml = incident(Source::SctGml, Some("C-58"), Some((10.0, 12.0)));
        gml.location.comarca = Some("Vallès Occidental".to_string());
        gml.location.cap_a = Some("Manresa".to_string());

        let merged = merge_incidents(vec![gml, rss]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, Source::SctRss);
        assert_eq!(merged[0].location.town.as_deref(), Some("Terrassa"));
        assert_eq!(merged[0].location.comarca.as_deref(), Some("Vallès Occidental"));
        assert_eq!(merged[0].location.cap_a.as_deref(), Some("Manresa"));
    }

    #[test]
    fn backfill_never_overwrites() {
        let mut rss = incident(Source::SctRss, Some("C-58"), Some((10.0, 12.0)));
        rss.location.town = Some("Terrassa".to_string());
        rss.location.cap_a = Some(" ".to_string());

        let mut gml = incident(Source::SctGml, Some("C-58"), Some((10.0, 12.0)));
        gml.location.town = Some("Sabadell".to_string());
        gml.location.cap_a = Some("Manresa".to_string());

        let merged = merge_incidents(vec![rss, gml]);
        assert_eq!(merged[0].location.town.as_deref(), Some("Terrassa"));
        assert_eq!(merged[0].location.cap_a.as_deref(), Some("Manresa"));
    }

    #[test]
    fn merge_is_order_independent() {
        let mut rss = incident(Source::SctRss, Some("AP-7"), Some((100.0, 102.0)));
        rss.location.cap_a = Some("França".to_string());

        let mut gml = incident(Source::SctGml, Some("AP-7"), Some((100.0, 102.0)));
        gml.location.town = Some("Girona".to_string());
        gml.location.comarca = Some("Gironès".to_string());

        let forward = merge_incidents(vec![rss.clone(), gml.clone()]);
        let backward = merge_incidents(vec![gml, rss]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn same_source_ties_break_on_id() {
        let mut nord = incident(Source::SctGml, Some("C-16"), Some((120.0, 125.0)));
        nord.id = "GML-nord".to_string();
        nord.location.cap_a = Some("Puigcerdà".to_string());

        let mut sud = incident(Source::SctGml, Some("C-16"), Some((120.0, 125.0)));
        sud.id = "GML-sud".to_string();
        sud.location.cap_a = Some("Berga".to_string());
        sud.location.town = Some("Cercs".to_string());

        let forward = merge_incidents(vec![nord.clone(), sud.clone()]);
        let backward = merge_incidents(vec![sud, nord]);
        assert_eq!(forward, backward);
        assert_eq!(forward[0].id, "GML-nord");
        assert_eq!(forward[0].location.cap_a.as_deref(), Some("Puigcerdà"));
        assert_eq!(forward[0].location.town.as_deref(), Some("Cercs"));
    }

    #[test]
    fn different_sections_are_kept_apart() {
        let merged = merge_incidents(vec![
            incident(Source::SctRss, Some("C-58"), Some((10.0, 12.0))),
            incident(Source::SctGml, Some("C-58"), Some((12.0, 14.0))),
            incident(Source::SctGml, Some("C-16"), Some((10.0, 12.0))),
        ]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn missing_data_collapses_into_unknown_group() {
        let merged = merge_incidents(vec![
            incident(Source::SctGml, None, None),
            incident(Source::SctRss, None, Some((0.0, 0.0))),
            incident(Source::Dgt, None, None),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, Source::SctRss);
        assert_eq!(dedup_key(&merged[0].location), "unknown-unknown-unknown");
    }

    #[test]
    fn key_falls_back_to_road_name() {
        let location = IncidentLocation {
            road_number: Some(String::new()),
            road: Some("Ronda de Dalt".to_string()),
            pk_start: Some(3.5),
            ..Default::default()
        };
        assert_eq!(dedup_key(&location), "Ronda de Dalt-3.5-unknown");
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(merge_incidents(vec![]).is_empty());
    }
}
