// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use anyhow::Context;
use clap::{Parser, ValueEnum};
use itertools::Itertools;
use std::path::PathBuf;
use std::time::Duration;

use incidencies::fetch::{FeedEndpoints, FetchOptions};
use incidencies::geocode::{OverpassGeocoder, geocode_missing};
use incidencies::models::{FeedKind, Incident, RawFeedDocument};
use incidencies::pipeline::{PipelineOutcome, load_traffic_incidents, process_documents};
use incidencies::presentation::{
    CategoryFilter, SortDirection, SortKey, geocoding_note, sort_incidents, source_label,
    table_row,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Catalan road incident feeds", long_about = None)]
struct Args {
    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Download the live feeds and print the merged incidents
    Fetch {
        /// Skip the DGT DATEX2 feed
        #[arg(long)]
        no_dgt: bool,
        #[arg(long)]
        rss_url: Option<String>,
        #[arg(long)]
        gml_url: Option<String>,
        #[arg(long)]
        dgt_url: Option<String>,
        /// Request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run feed files from disk through the same pipeline
    Parse {
        #[arg(long)]
        rss: Option<PathBuf>,
        #[arg(long)]
        gml: Option<PathBuf>,
        #[arg(long)]
        dgt: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Look up coordinates for incidents that only have a road number
    #[arg(long)]
    geocode: bool,
    /// `all` or one of maintenance, accident, closure, congestion, weather, other
    #[arg(long, default_value = "all", value_parser = parse_category_filter)]
    category: CategoryFilter,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
    #[arg(long, value_enum)]
    sort: Option<SortColumn>,
    #[arg(long)]
    descending: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortColumn {
    Level,
    Road,
    Pk,
    Source,
}

impl From<SortColumn> for SortKey {
    fn from(column: SortColumn) -> Self {
        match column {
            SortColumn::Level => SortKey::Level,
            SortColumn::Road => SortKey::Road,
            SortColumn::Pk => SortKey::Pk,
            SortColumn::Source => SortKey::Source,
        }
    }
}

fn parse_category_filter(value: &str) -> Result<CategoryFilter, String> {
    CategoryFilter::parse(value).ok_or_else(|| format!("unknown category '{}'", value))
}

fn read_documents(
    rss: Option<PathBuf>,
    gml: Option<PathBuf>,
    dgt: Option<PathBuf>,
) -> anyhow::Result<Vec<RawFeedDocument>> {
    let mut documents = vec![];

    for (kind, path) in [
        (FeedKind::Rss, rss),
        (FeedKind::Gml, gml),
        (FeedKind::Datex2, dgt),
    ] {
        if let Some(path) = path {
            let body = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {} feed from {}", kind, path.display()))?;
            documents.push(RawFeedDocument::new(kind, body));
        }
    }

    if documents.is_empty() {
        anyhow::bail!("pass at least one of --rss, --gml or --dgt");
    }

    Ok(documents)
}

fn print_table(incidents: &[&Incident]) {
    let header = [
        "LEVEL",
        "ROAD REF",
        "LOCATION",
        "PK",
        "DIRECTION",
        "DESCRIPTION",
        "SOURCE",
        "NOTE",
    ];

    println!("{}", header.iter().join("\t"));

    for incident in incidents {
        println!(
            "{} {}\t{}",
            incident.icon,
            table_row(incident).iter().join("\t"),
            geocoding_note(&incident.location).unwrap_or("")
        );
    }

    let sources = incidents
        .iter()
        .map(|x| x.source)
        .unique()
        .sorted_by_key(|x| x.priority())
        .map(source_label)
        .join(", ");

    if !sources.is_empty() {
        println!("Fonts: {}", sources);
    }
}

async fn finish(
    mut outcome: PipelineOutcome,
    output: OutputArgs,
    client: &reqwest::Client,
) -> anyhow::Result<()> {
    for failure in &outcome.failures {
        eprintln!("warning: {}", failure);
    }

    if output.geocode {
        let geocoder = OverpassGeocoder::new(client.clone());
        let count = geocode_missing(&geocoder, &mut outcome.incidents).await;
        tracing::info!(count, "geocoded incidents without coordinates");
    }

    if let Some(column) = output.sort {
        let direction = if output.descending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        sort_incidents(&mut outcome.incidents, column.into(), direction);
    }

    let shown = output.category.apply(&outcome.incidents);

    match output.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&shown)?),
        OutputFormat::Table => print_table(&shown),
    }

    eprintln!("{}", outcome.status_message());

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    match args.cmd {
        Command::Fetch {
            no_dgt,
            rss_url,
            gml_url,
            dgt_url,
            timeout,
            output,
        } => {
            let mut endpoints = FeedEndpoints::from_env();

            if let Some(url) = rss_url {
                endpoints.rss_url = url;
            }
            if let Some(url) = gml_url {
                endpoints.gml_url = url;
            }
            if let Some(url) = dgt_url {
                endpoints.dgt_url = Some(url);
            }
            if no_dgt {
                endpoints = endpoints.without_dgt();
            }

            let client = FetchOptions {
                timeout: Duration::from_secs(timeout),
                ..Default::default()
            }
            .build_client()?;

            let outcome = load_traffic_incidents(&client, &endpoints).await;
            finish(outcome, output, &client).await
        }
        Command::Parse {
            rss,
            gml,
            dgt,
            output,
        } => {
            let documents = read_documents(rss, gml, dgt)?;
            let outcome = process_documents(&documents);

            let client = FetchOptions::default().build_client()?;
            finish(outcome, output, &client).await
        }
    }
}
