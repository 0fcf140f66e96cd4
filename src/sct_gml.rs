use lazy_static::lazy_static;
use regex::Regex;

use crate::classifier::{ClassifierInput, classify};
use crate::coordinates::{
    PAIR_SEPARATOR, parse_leading_float, plausible_lat_lng, resolve_coordinate_text,
};
use crate::errors::FeedError;
use crate::models::{FeedKind, Incident, IncidentLocation, Source, non_empty_owned};
use crate::xml_reader::{XmlElement, elements_named, parse_document};

pub const FEATURE_MEMBER_TAG: &str = "featureMember";
pub const DATA_BLOCK_TAG: &str = "mct2_v_afectacions_data";

/// Element paths known to hold coordinates, most specific GML layouts last.
const COORDINATE_SELECTORS: &[&[&str]] = &[
    &["coordinates"],
    &["pos"],
    &["Point", "coordinates"],
    &["MultiPoint", "pointMember", "Point", "coordinates"],
    &["geometryProperty", "Point", "coordinates"],
    &["boundedBy", "Box", "coordinates"],
    &["boundedBy", "Envelope", "coordinates"],
    &["geom", "Point", "coordinates"],
];

const COORDINATE_NAME_HINTS: &[&str] = &["coord", "pos", "point", "geom", "location", "position"];

const COORDINATE_ATTRIBUTES: &[&str] =
    &["coordinates", "pos", "lat", "lon", "longitude", "latitude"];

lazy_static! {
    static ref NUMBER_TOKEN: Regex = Regex::new(r"-?\d+\.?\d+").unwrap();
    static ref FRAGMENT_PATTERNS: [Regex; 3] = [
        Regex::new(r"(-?\d+\.?\d*)\s*[,;]\s*(-?\d+\.?\d*)").unwrap(),
        Regex::new(r"(-?\d+\.?\d*)\s+(-?\d+\.?\d*)").unwrap(),
        Regex::new(r"(\d{1,3}\.\d{1,10})\s*,\s*(\d{1,3}\.\d{1,10})").unwrap(),
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinateStrategy {
    KnownElement,
    NamedElementScan,
    FragmentPattern,
    Attribute,
}

/// The named fields of one GML feature.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GmlFeatureFields {
    pub identificador: Option<String>,
    pub carretera: Option<String>,
    pub pk_inici: f64,
    pub pk_fi: f64,
    pub causa: Option<String>,
    pub descripcio: Option<String>,
    pub descripcio_tipus: Option<String>,
    pub sentit: Option<String>,
    pub cap_a: Option<String>,
    pub nivell: i32,
    pub municipi: Option<String>,
    pub comarca: Option<String>,
    pub provincia: Option<String>,
    pub regio: Option<String>,
    pub demarcacio: Option<String>,
    pub data_inici: Option<String>,
    pub data_fi: Option<String>,
    pub hora_inici: Option<String>,
    pub hora_fi: Option<String>,
    pub fase: Option<String>,
    pub data_fase: Option<String>,
}

impl GmlFeatureFields {
    pub fn extract<E: XmlElement>(data: E) -> Self {
        let pk_inici = data
            .child_text("pk_inici")
            .and_then(|x| parse_leading_float(&x))
            .unwrap_or(0.0);

        let pk_fi = match data.child_text("pk_fi") {
            Some(text) => parse_leading_float(&text).unwrap_or(0.0),
            None => pk_inici,
        };

        let nivell = data
            .child_text("nivell")
            .and_then(|x| parse_leading_float(&x))
            .map(|x| x.trunc() as i32)
            .unwrap_or(1);

        GmlFeatureFields {
            identificador: data.child_text("identificador"),
            carretera: data.child_text("carretera"),
            pk_inici,
            pk_fi,
            causa: data.child_text("causa"),
            descripcio: data.child_text("descripcio"),
            descripcio_tipus: data.child_text("descripcio_tipus"),
            sentit: data.child_text("sentit"),
            cap_a: data.child_text("cap_a"),
            nivell,
            municipi: data.child_text("municipi"),
            comarca: data.child_text("comarca"),
            provincia: data.child_text("provincia"),
            regio: data.child_text("regio"),
            demarcacio: data.child_text("demarcacio"),
            data_inici: data.child_text("data_inici"),
            data_fi: data.child_text("data_fi"),
            hora_inici: data.child_text("hora_inici"),
            hora_fi: data.child_text("hora_fi"),
            fase: data.child_text("fase"),
            data_fase: data.child_text("data_fase"),
        }
    }

    fn classifier_input(&self) -> ClassifierInput<'_> {
        ClassifierInput {
            causa: self.causa.as_deref(),
            descripcio: self.descripcio.as_deref(),
            descripcio_tipus: self.descripcio_tipus.as_deref(),
            cap_a: self.cap_a.as_deref(),
            nivell: self.nivell,
        }
    }
}

fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

fn from_known_elements<E: XmlElement>(scope: E) -> Option<String> {
    COORDINATE_SELECTORS.iter().find_map(|path| {
        scope
            .select_path(path)
            .map(|x| x.text_content().trim().to_string())
            .filter(|x| !x.is_empty())
    })
}

fn name_hints_coordinates(name: &str) -> bool {
    let name = name.to_lowercase();
    COORDINATE_NAME_HINTS.iter().any(|hint| name.contains(hint))
}

fn from_named_element_scan<E: XmlElement>(scope: E) -> Option<String> {
    for element in scope.element_descendants() {
        let hinted = name_hints_coordinates(element.local_name())
            || element
                .attribute_names()
                .into_iter()
                .any(name_hints_coordinates);

        if !hinted {
            continue;
        }

        let text = element.text_content().trim().to_string();

        if text.is_empty()
            || !has_digit(&text)
            || !(text.contains(',') || text.contains(' ') || text.contains(';'))
        {
            continue;
        }

        let numbers: Vec<f64> = NUMBER_TOKEN
            .find_iter(&text)
            .filter_map(|m| m.as_str().parse::<f64>().ok())
            .take(2)
            .collect();

        if numbers.len() >= 2 && plausible_lat_lng(numbers[0], numbers[1]) {
            return Some(text);
        }
    }

    None
}

fn from_fragment_patterns(fragment: &str) -> Option<String> {
    for pattern in FRAGMENT_PATTERNS.iter() {
        for found in pattern.find_iter(fragment) {
            let parts: Vec<Option<f64>> = PAIR_SEPARATOR
                .split(found.as_str())
                .filter(|x| !x.is_empty())
                .map(parse_leading_float)
                .collect();

            if parts.len() < 2 || parts.iter().any(|x| x.is_none()) {
                continue;
            }

            if let (Some(first), Some(second)) = (parts[0], parts[1]) {
                if plausible_lat_lng(first, second) {
                    return Some(found.as_str().to_string());
                }
            }
        }
    }

    None
}

fn from_attributes<E: XmlElement>(scope: E) -> Option<String> {
    for element in scope.element_descendants() {
        for attribute in COORDINATE_ATTRIBUTES {
            if let Some(value) = element.attribute_value(attribute) {
                if has_digit(value) && (value.contains(',') || value.contains(' ')) {
                    return Some(value.to_string());
                }
            }
        }
    }

    None
}

/// Raw coordinate text of a feature, with the strategy that found it.
pub fn find_coordinate_text<E: XmlElement>(scope: E) -> Option<(CoordinateStrategy, String)> {
    if let Some(text) = from_known_elements(scope) {
        return Some((CoordinateStrategy::KnownElement, text));
    }

    if let Some(text) = from_named_element_scan(scope) {
        return Some((CoordinateStrategy::NamedElementScan, text));
    }

    if let Some(text) = from_fragment_patterns(scope.outer_xml()) {
        return Some((CoordinateStrategy::FragmentPattern, text));
    }

    from_attributes(scope).map(|text| (CoordinateStrategy::Attribute, text))
}

/// Resolved `(lat, lng)` of a feature, `None` when nothing usable was found.
pub fn extract_coordinates<E: XmlElement>(scope: E) -> Option<(f64, f64)> {
    let (strategy, text) = find_coordinate_text(scope)?;

    tracing::debug!(?strategy, text = text.as_str(), "found GML coordinate text");

    resolve_coordinate_text(&text)
}

fn build_location(fields: &GmlFeatureFields, point: Option<(f64, f64)>) -> IncidentLocation {
    let road_label = fields.carretera.as_deref().unwrap_or("Unknown");
    let description = format!("{} - PK {}-{}", road_label, fields.pk_inici, fields.pk_fi);
    let display_text = format!(
        "{} ({})",
        description,
        fields.sentit.as_deref().unwrap_or("")
    );

    let comarca = non_empty_owned(fields.comarca.clone())
        .or_else(|| non_empty_owned(fields.regio.clone()))
        .or_else(|| non_empty_owned(fields.demarcacio.clone()));

    let mut location = IncidentLocation {
        road_number: fields.carretera.clone(),
        town: fields.municipi.clone(),
        comarca,
        province: fields.provincia.clone(),
        region: fields.regio.clone().or_else(|| fields.demarcacio.clone()),
        direction: fields.sentit.clone(),
        pk_start: Some(fields.pk_inici),
        pk_end: Some(fields.pk_fi),
        cap_a: fields.cap_a.clone(),
        data_inici: fields.data_inici.clone(),
        data_fi: fields.data_fi.clone(),
        hora_inici: fields.hora_inici.clone(),
        hora_fi: fields.hora_fi.clone(),
        fase: fields.fase.clone(),
        data_fase: fields.data_fase.clone(),
        description,
        display_text,
        ..Default::default()
    };

    location.set_coordinates(point);
    location
}

/// Builds the incident for one `featureMember`, `None` when it has no data block.
pub fn parse_gml_feature<E: XmlElement>(member: E, index: usize) -> Option<Incident> {
    let data = member.find_descendant(DATA_BLOCK_TAG)?;
    let fields = GmlFeatureFields::extract(data);

    let point = extract_coordinates(member);
    let location = build_location(&fields, point);

    let classification = classify(&fields.classifier_input());

    let title = format!(
        "{} - {}",
        fields.descripcio.as_deref().unwrap_or("Incident"),
        fields.carretera.as_deref().unwrap_or("Unknown")
    );

    let description = format!(
        "{} ({})",
        fields.descripcio.as_deref().unwrap_or("Sense descripció"),
        fields.descripcio_tipus.as_deref().unwrap_or("Sense tipus")
    );

    let id = fields
        .identificador
        .clone()
        .unwrap_or_else(|| format!("{}-{}", Source::SctGml, index));

    let mut incident = Incident::new(
        id,
        title,
        description,
        classification.category,
        classification.level,
        location,
        Source::SctGml,
    );

    incident.reason = classification.reason;
    incident.observations = classification.observations;
    incident.feed_level = Some(fields.nivell);

    Some(incident)
}

/// One incident per `featureMember` of the SCT GML feed.
pub fn parse_gml_feed(text: &str) -> Result<Vec<Incident>, FeedError> {
    let document = parse_document(FeedKind::Gml, text)?;
    let members = elements_named(&document, FEATURE_MEMBER_TAG);

    let mut incidents = Vec::with_capacity(members.len());

    for (index, member) in members.into_iter().enumerate() {
        match parse_gml_feature(member, index) {
            Some(incident) => incidents.push(incident),
            None => tracing::warn!(index, "skipping GML feature without incident data"),
        }
    }

    tracing::info!(count = incidents.len(), "parsed SCT GML incidents");

    Ok(incidents)
}
