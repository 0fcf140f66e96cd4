use crate::models::FeedKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("{kind} feed is not well-formed XML: {source}")]
    Xml {
        kind: FeedKind,
        #[source]
        source: roxmltree::Error,
    },
    #[error("request for {kind} feed at '{url}' failed: {source}")]
    Http {
        kind: FeedKind,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{kind} feed at '{url}' returned HTTP {status}")]
    Status {
        kind: FeedKind,
        url: String,
        status: u16,
    },
    #[error("could not geocode road '{road}': {message}")]
    Geocode { road: String, message: String },
}

impl FeedError {
    pub fn kind(&self) -> Option<FeedKind> {
        match self {
            FeedError::Xml { kind, .. }
            | FeedError::Http { kind, .. }
            | FeedError::Status { kind, .. } => Some(*kind),
            FeedError::Geocode { .. } => None,
        }
    }
}
