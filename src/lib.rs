// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]
#![allow(async_fn_in_trait)]

#[macro_use]
extern crate serde;

pub mod classifier;
pub mod coordinates;
pub mod dgt_datex2;
pub mod errors;
pub mod fetch;
pub mod geocode;
pub mod merger;
pub mod models;
pub mod pipeline;
pub mod presentation;
pub mod sct_gml;
pub mod sct_rss;
pub mod xml_reader;

pub use errors::FeedError;
pub use models::{Category, FeedKind, Incident, IncidentLocation, RawFeedDocument, Source};
pub use pipeline::{PipelineOutcome, load_traffic_incidents, process_documents};
