use crate::coordinates::{CATALONIA_CENTER_LAT, CATALONIA_CENTER_LNG, within_catalonia_box};
use crate::errors::FeedError;
use crate::models::{Category, Incident};

pub const OVERPASS_SERVERS: [&str; 3] = [
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://overpass.openstreetmap.fr/api/interpreter",
];

/// Search radius around the centre of Catalonia, in metres.
pub const SEARCH_RADIUS_M: u32 = 50000;

#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
pub struct OverpassElement {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub center: Option<OverpassCenter>,
}

#[derive(Debug, Deserialize)]
pub struct OverpassCenter {
    pub lat: f64,
    pub lon: f64,
}

impl OverpassResponse {
    /// Centre of the first way, or the element's own point for nodes.
    pub fn first_position(&self) -> Option<(f64, f64)> {
        let element = self.elements.first()?;

        match &element.center {
            Some(center) => Some((center.lat, center.lon)),
            None => Some((element.lat?, element.lon?)),
        }
    }
}

pub fn overpass_query(road_ref: &str) -> String {
    format!(
        "[out:json][timeout:20];\nway[\"highway\"][\"ref\"=\"{}\"](around:{},{},{});\nout center;",
        road_ref.replace('"', "\\\""),
        SEARCH_RADIUS_M,
        CATALONIA_CENTER_LAT,
        CATALONIA_CENTER_LNG
    )
}

pub trait RoadGeocoder {
    /// Point for a road reference. `Ok(None)` when the road is unknown.
    async fn locate(&self, road_ref: &str) -> Result<Option<(f64, f64)>, FeedError>;
}

pub struct OverpassGeocoder {
    client: reqwest::Client,
    servers: Vec<String>,
}

impl OverpassGeocoder {
    pub fn new(client: reqwest::Client) -> Self {
        OverpassGeocoder {
            client,
            servers: OVERPASS_SERVERS.iter().map(|x| x.to_string()).collect(),
        }
    }

    pub fn with_servers(client: reqwest::Client, servers: Vec<String>) -> Self {
        OverpassGeocoder { client, servers }
    }

    async fn query_server(&self, server: &str, query: &str) -> Result<OverpassResponse, String> {
        let response = self
            .client
            .post(server)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status().as_u16()));
        }

        let body = response.text().await.map_err(|e| e.to_string())?;
        serde_json::from_str::<OverpassResponse>(&body).map_err(|e| e.to_string())
    }
}

impl RoadGeocoder for OverpassGeocoder {
    /// Tries each server in turn and stops at the first one that knows the road.
    async fn locate(&self, road_ref: &str) -> Result<Option<(f64, f64)>, FeedError> {
        let query = overpass_query(road_ref);

        let mut answered = false;
        let mut last_error = String::from("no Overpass servers configured");

        for server in &self.servers {
            match self.query_server(server, &query).await {
                Ok(response) => {
                    answered = true;
                    if let Some(point) = response.first_position() {
                        tracing::debug!(road_ref, server = server.as_str(), "geocoded road");
                        return Ok(Some(point));
                    }
                }
                Err(message) => {
                    tracing::warn!(
                        road_ref,
                        server = server.as_str(),
                        "Overpass server failed: {}",
                        message
                    );
                    last_error = message;
                }
            }
        }

        if answered {
            Ok(None)
        } else {
            Err(FeedError::Geocode {
                road: road_ref.to_string(),
                message: last_error,
            })
        }
    }
}

fn place_at_center(incident: &mut Incident) {
    incident
        .location
        .set_coordinates(Some((CATALONIA_CENTER_LAT, CATALONIA_CENTER_LNG)));
    incident.location.geocoded = Some(false);
}

/// Fills in coordinates for incidents that only carry a road number. Accidents that still have
/// no position afterwards are pinned to the centre of Catalonia. Returns how many incidents
/// were geocoded.
pub async fn geocode_missing<G: RoadGeocoder>(
    geocoder: &G,
    incidents: &mut [Incident],
) -> usize {
    let mut geocoded = 0;

    for incident in incidents.iter_mut() {
        if incident.location.has_coordinates {
            continue;
        }

        let road_number = match incident
            .location
            .road_number
            .as_deref()
            .map(str::trim)
            .filter(|x| !x.is_empty())
        {
            Some(road_number) => road_number.to_string(),
            None => continue,
        };

        let point = match geocoder.locate(&road_number).await {
            Ok(point) => point.filter(|(lat, lng)| within_catalonia_box(*lat, *lng)),
            Err(err) => {
                tracing::warn!(id = incident.id.as_str(), "{}", err);
                None
            }
        };

        match point {
            Some(point) => {
                incident.location.set_coordinates(Some(point));
                incident.location.geocoded = Some(true);
                geocoded += 1;
            }
            None if incident.category == Category::Accident => {
                tracing::debug!(
                    id = incident.id.as_str(),
                    "placing accident at Catalonia centre"
                );
                place_at_center(incident);
            }
            None => {}
        }
    }

    geocoded
}
