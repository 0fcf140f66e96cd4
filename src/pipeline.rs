use crate::dgt_datex2::parse_dgt_feed;
use crate::errors::FeedError;
use crate::fetch::{FeedEndpoints, fetch_all};
use crate::merger::merge_incidents;
use crate::models::{FeedKind, Incident, RawFeedDocument};
use crate::sct_gml::parse_gml_feed;
use crate::sct_rss::parse_rss_feed;

pub fn parse_document_by_kind(document: &RawFeedDocument) -> Result<Vec<Incident>, FeedError> {
    match document.kind {
        FeedKind::Rss => parse_rss_feed(&document.body),
        FeedKind::Gml => parse_gml_feed(&document.body),
        FeedKind::Datex2 => parse_dgt_feed(&document.body),
    }
}

/// Merged incidents from every feed that could be read, plus what went wrong with the rest.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    pub incidents: Vec<Incident>,
    pub failures: Vec<FeedError>,
}

impl PipelineOutcome {
    pub fn status_message(&self) -> String {
        if self.incidents.is_empty() {
            "No s'han trobat incidents de trànsit actius".to_string()
        } else {
            format!("S'han carregat {} incidents", self.incidents.len())
        }
    }

    pub fn failed_kinds(&self) -> Vec<FeedKind> {
        self.failures.iter().filter_map(|x| x.kind()).collect()
    }
}

/// Parses each document with the parser for its feed and merges the results. Holds no state
/// between calls.
pub fn process_documents(documents: &[RawFeedDocument]) -> PipelineOutcome {
    let mut outcome = PipelineOutcome::default();
    let mut parsed: Vec<Incident> = vec![];

    for document in documents {
        match parse_document_by_kind(document) {
            Ok(incidents) => parsed.extend(incidents),
            Err(err) => {
                tracing::warn!(kind = %document.kind, "feed could not be parsed: {}", err);
                outcome.failures.push(err);
            }
        }
    }

    outcome.incidents = merge_incidents(parsed);
    outcome
}

/// Downloads all configured feeds and runs them through [`process_documents`].
pub async fn load_traffic_incidents(
    client: &reqwest::Client,
    endpoints: &FeedEndpoints,
) -> PipelineOutcome {
    let fetched = fetch_all(client, endpoints).await;

    let mut outcome = process_documents(&fetched.documents);

    let mut failures = fetched.failures;
    failures.append(&mut outcome.failures);
    outcome.failures = failures;

    tracing::info!(
        incidents = outcome.incidents.len(),
        failed_feeds = outcome.failures.len(),
        "{}",
        outcome.status_message()
    );

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchOptions;
    use crate::models::{Category, Source};

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
<item>
  <title>Obres a l'AP-7</title>
  <description>AP-7 | Girona | northBound | Punt km. 100-102 | Sortida 8</description>
  <link>https://transit.gencat.cat/1</link>
  <pubDate>Mon, 15 Jan 2024 10:30:00 +0100</pubDate>
  <category>Obres</category>
</item>
</channel></rss>"#;

    const GML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs" xmlns:gml="http://www.opengis.net/gml" xmlns:cite="http://www.opengeospatial.net/cite">
<gml:featureMember><cite:mct2_v_afectacions_data>
  <cite:identificador>G-1</cite:identificador>
  <cite:carretera>AP-7</cite:carretera>
  <cite:pk_inici>100</cite:pk_inici>
  <cite:pk_fi>102</cite:pk_fi>
  <cite:descripcio>Obres de manteniment</cite:descripcio>
  <cite:comarca>Gironès</cite:comarca>
  <cite:cap_a>França</cite:cap_a>
  <cite:geom><gml:Point><gml:coordinates>2.82,41.98</gml:coordinates></gml:Point></cite:geom>
</cite:mct2_v_afectacions_data></gml:featureMember>
<gml:featureMember><cite:mct2_v_afectacions_data>
  <cite:identificador>G-2</cite:identificador>
  <cite:carretera>C-16</cite:carretera>
  <cite:pk_inici>120</cite:pk_inici>
  <cite:pk_fi>125</cite:pk_fi>
  <cite:causa>Neu</cite:causa>
  <cite:descripcio>Calçada tallada</cite:descripcio>
</cite:mct2_v_afectacions_data></gml:featureMember>
</wfs:FeatureCollection>"#;

    #[test]
    fn feeds_are_parsed_and_merged() {
        let documents = vec![
            RawFeedDocument::new(FeedKind::Gml, GML),
            RawFeedDocument::new(FeedKind::Rss, RSS),
        ];

        let outcome = process_documents(&documents);
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.incidents.len(), 2);

        let works = &outcome.incidents[0];
        assert_eq!(works.source, Source::SctRss);
        assert_eq!(works.category, Category::Maintenance);
        assert_eq!(works.location.town.as_deref(), Some("Girona"));
        assert_eq!(works.location.comarca.as_deref(), Some("Gironès"));
        assert_eq!(works.location.cap_a.as_deref(), Some("França"));

        let closure = &outcome.incidents[1];
        assert_eq!(closure.id, "G-2");
        assert_eq!(closure.category, Category::Closure);

        assert_eq!(outcome.status_message(), "S'han carregat 2 incidents");
    }

    #[test]
    fn broken_feed_does_not_block_the_others() {
        let documents = vec![
            RawFeedDocument::new(FeedKind::Rss, "<rss><channel>"),
            RawFeedDocument::new(FeedKind::Gml, GML),
        ];

        let outcome = process_documents(&documents);
        assert_eq!(outcome.failed_kinds(), vec![FeedKind::Rss]);
        assert_eq!(outcome.incidents.len(), 2);
        assert!(outcome.incidents.iter().all(|x| x.source == Source::SctGml));
    }

    #[test]
    fn processing_is_repeatable() {
        let documents = vec![
            RawFeedDocument::new(FeedKind::Rss, RSS),
            RawFeedDocument::new(FeedKind::Gml, GML),
        ];

        let first = process_documents(&documents);
        let second = process_documents(&documents);
        assert_eq!(first.incidents, second.incidents);
    }

    #[test]
    fn empty_result_message() {
        let outcome = process_documents(&[]);
        assert_eq!(
            outcome.status_message(),
            "No s'han trobat incidents de trànsit actius"
        );
    }

    #[tokio::test]
    async fn offline_load_reports_every_feed() {
        let client = FetchOptions::default().build_client().unwrap();
        let endpoints = FeedEndpoints {
            rss_url: "http://127.0.0.1:9/rss.xml".to_string(),
            gml_url: "http://127.0.0.1:9/gml.xml".to_string(),
            dgt_url: Some("http://127.0.0.1:9/dgt.xml".to_string()),
        };

        let outcome = load_traffic_incidents(&client, &endpoints).await;
        assert!(outcome.incidents.is_empty());
        assert_eq!(
            outcome.failed_kinds(),
            vec![FeedKind::Rss, FeedKind::Gml, FeedKind::Datex2]
        );
    }
}
