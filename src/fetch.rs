use std::time::Duration;

use crate::errors::FeedError;
use crate::models::{FeedKind, RawFeedDocument};

pub const DEFAULT_RSS_URL: &str = "http://www.gencat.cat/transit/opendata/incidenciesRSS.xml";
pub const DEFAULT_GML_URL: &str = "https://www.gencat.cat/transit/opendata/incidenciesGML.xml";
pub const DEFAULT_DGT_URL: &str =
    "https://infocar.dgt.es/datex2/sct/SituationPublication/all/content.xml";

pub const RSS_URL_VAR: &str = "SCT_RSS_URL";
pub const GML_URL_VAR: &str = "SCT_GML_URL";
pub const DGT_URL_VAR: &str = "DGT_DATEX2_URL";

/// Where each feed is downloaded from. `dgt_url` is optional; without it only the SCT feeds
/// are loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEndpoints {
    pub rss_url: String,
    pub gml_url: String,
    pub dgt_url: Option<String>,
}

impl Default for FeedEndpoints {
    fn default() -> Self {
        FeedEndpoints {
            rss_url: DEFAULT_RSS_URL.to_string(),
            gml_url: DEFAULT_GML_URL.to_string(),
            dgt_url: Some(DEFAULT_DGT_URL.to_string()),
        }
    }
}

impl FeedEndpoints {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds endpoints from a variable lookup. An empty `DGT_DATEX2_URL` turns the DGT feed off.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = FeedEndpoints::default();

        let dgt_url = match lookup(DGT_URL_VAR) {
            Some(url) if url.trim().is_empty() => None,
            Some(url) => Some(url),
            None => defaults.dgt_url,
        };

        FeedEndpoints {
            rss_url: lookup(RSS_URL_VAR).unwrap_or(defaults.rss_url),
            gml_url: lookup(GML_URL_VAR).unwrap_or(defaults.gml_url),
            dgt_url,
        }
    }

    pub fn without_dgt(mut self) -> Self {
        self.dgt_url = None;
        self
    }
}

#[derive(Clone, Debug)]
pub struct FetchOptions {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            user_agent: "Incidencies Romani".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl FetchOptions {
    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::ClientBuilder::new()
            .use_rustls_tls()
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout)
            .connect_timeout(Duration::from_secs(10))
            .deflate(true)
            .gzip(true)
            .brotli(true)
            .build()
    }
}

pub async fn fetch_feed(
    client: &reqwest::Client,
    kind: FeedKind,
    url: &str,
) -> Result<RawFeedDocument, FeedError> {
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/xml, text/xml, */*")
        .send()
        .await
        .map_err(|source| FeedError::Http {
            kind,
            url: url.to_string(),
            source,
        })?;

    let status = response.status();

    if !status.is_success() {
        return Err(FeedError::Status {
            kind,
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|source| FeedError::Http {
        kind,
        url: url.to_string(),
        source,
    })?;

    tracing::info!(%kind, url, bytes = body.len(), "downloaded feed");

    Ok(RawFeedDocument::new(kind, body))
}

#[derive(Debug, Default)]
pub struct FetchResults {
    pub documents: Vec<RawFeedDocument>,
    pub failures: Vec<FeedError>,
}

impl FetchResults {
    fn record(&mut self, result: Result<RawFeedDocument, FeedError>) {
        match result {
            Ok(document) => self.documents.push(document),
            Err(err) => {
                tracing::warn!(kind = ?err.kind(), "feed download failed: {}", err);
                self.failures.push(err);
            }
        }
    }
}

/// Downloads every configured feed at the same time. A feed that fails is reported in
/// `failures` and never affects the others.
pub async fn fetch_all(client: &reqwest::Client, endpoints: &FeedEndpoints) -> FetchResults {
    let dgt = async {
        match &endpoints.dgt_url {
            Some(url) => Some(fetch_feed(client, FeedKind::Datex2, url).await),
            None => None,
        }
    };

    let (rss, gml, dgt) = futures::join!(
        fetch_feed(client, FeedKind::Rss, &endpoints.rss_url),
        fetch_feed(client, FeedKind::Gml, &endpoints.gml_url),
        dgt
    );

    let mut results = FetchResults::default();

    results.record(rss);
    results.record(gml);

    if let Some(dgt) = dgt {
        results.record(dgt);
    }

    results
}
