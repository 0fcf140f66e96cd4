use crate::coordinates::within_catalonia_box;
use crate::errors::FeedError;
use crate::models::{Category, FeedKind, Incident, IncidentLocation, Level, Source, non_empty};
use crate::xml_reader::{XmlElement, elements_named, parse_document};

pub const SITUATION_RECORD_TAG: &str = "situationRecord";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordType {
    MaintenanceWorks,
    AbnormalTraffic,
    Accident,
    Obstruction,
    PoorRoadInfrastructure,
    NetworkManagement,
    PoorEnvironmentConditions,
    SignSetting,
    RoadsideAssistance,
    Activities,
    Unknown(String),
}

impl RecordType {
    /// `_0:MaintenanceWorks` and `MaintenanceWorks` both map to the same type.
    pub fn from_xsi_type(raw: &str) -> RecordType {
        let name = raw.rsplit(':').next().unwrap_or(raw).trim();

        match name {
            "MaintenanceWorks" => RecordType::MaintenanceWorks,
            "AbnormalTraffic" => RecordType::AbnormalTraffic,
            "Accident" => RecordType::Accident,
            "Obstruction" => RecordType::Obstruction,
            "PoorRoadInfrastructure" => RecordType::PoorRoadInfrastructure,
            "NetworkManagement" => RecordType::NetworkManagement,
            "PoorEnvironmentConditions" => RecordType::PoorEnvironmentConditions,
            "SignSetting" => RecordType::SignSetting,
            "RoadsideAssistance" => RecordType::RoadsideAssistance,
            "Activities" => RecordType::Activities,
            other => RecordType::Unknown(other.to_string()),
        }
    }
}

/// What a record type contributes to the incident.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordDetails {
    pub category: Category,
    pub level: Level,
    pub title: String,
    pub description: String,
    pub icon: &'static str,
}

impl RecordDetails {
    fn new(
        category: Category,
        level: Level,
        title: &str,
        description: String,
        icon: &'static str,
    ) -> Self {
        RecordDetails {
            category,
            level,
            title: title.to_string(),
            description,
            icon,
        }
    }
}

/// `base` followed by ` Tipus: <value>.` when the record carries `tag`.
fn with_type_detail<E: XmlElement>(record: E, base: &str, tag: &str) -> String {
    match record.child_text(tag) {
        Some(value) => format!("{} Tipus: {}.", base, value),
        None => base.to_string(),
    }
}

fn abnormal_traffic_description<E: XmlElement>(record: E) -> String {
    let text = match record.child_text("abnormalTrafficType").as_deref() {
        Some("stopAndGo") => "Trànsit molt dens amb parades i arrencades.",
        Some("queuingTraffic") => "Cua de vehicles significativa.",
        Some("slowTraffic") => "Trànsit lent.",
        _ => "Circulació anormal detectada.",
    };
    text.to_string()
}

fn poor_infrastructure_description<E: XmlElement>(record: E) -> String {
    let mut text = String::from("Infraestructura de carretera en mal estat.");
    if record.find_descendant("malfunctioningTrafficControls").is_some() {
        text.push_str(" Controls de trànsit defectuosos.");
    }
    text
}

fn sign_setting_description<E: XmlElement>(record: E) -> String {
    let base = "Informació de senyalització variable.";
    match record.child_text("message") {
        Some(message) => format!("{} Missatge: {}", base, message),
        None => base.to_string(),
    }
}

pub fn environment_condition_text(condition: &str) -> String {
    let text = match condition {
        "badWeather" => "Mal temps que afecta la circulació.",
        "blizzard" => "Tempesta de neu intensa.",
        "damagingHail" => "Calamarsa danyina.",
        "denseFog" => "Boira densa que redueix la visibilitat.",
        "extremeCold" => "Fred extrem que afecta les condicions de circulació.",
        "extremeHeat" => "Calor extrema que afecta les condicions de circulació.",
        "flooding" => "Inundacions que afecten la carretera.",
        "gales" => "Vent fort (galerna) que afecta la circulació.",
        "heavyRain" => "Pluja intensa.",
        "heavySnowfall" => "Nevada intensa.",
        "snowfall" => "Nevada en curs.",
        "lowVisibility" => "Baixa visibilitat per condicions meteorològiques.",
        "precipitation" => "Precipitació que afecta la circulació.",
        "severeFrost" => "Gelada severa.",
        "smoke" => "Fum que redueix la visibilitat.",
        "strongWinds" => "Vent fort que afecta la circulació.",
        other => return format!("Condició ambiental adversa: {}.", other),
    };
    text.to_string()
}

fn obstruction_details<E: XmlElement>(record: E) -> RecordDetails {
    if let Some(animals) = record.child_text("animalPresenceTypeOfObstruction") {
        return RecordDetails::new(
            Category::Accident,
            3,
            "Obstrucció per animals",
            format!("Presència d'animals a la carretera: {}", animals),
            "🦌",
        );
    }

    if let Some(environmental) = record.child_text("environmentalObstructionType") {
        return RecordDetails::new(
            Category::Closure,
            3,
            "Obstrucció ambiental",
            format!("Obstrucció per causes ambientals: {}", environmental),
            "🌊",
        );
    }

    if let Some(equipment) = record.child_text("equipmentDamageType") {
        return RecordDetails::new(
            Category::Maintenance,
            3,
            "Equipament danyat",
            format!("Equipament danyat: {}", equipment),
            "⚙️",
        );
    }

    if let Some(vehicle) = record.child_text("vehicleObstructionType") {
        return RecordDetails::new(
            Category::Accident,
            3,
            "Obstrucció per vehicle",
            format!("Obstrucció causada per vehicle: {}", vehicle),
            "🚧",
        );
    }

    RecordDetails::new(
        Category::Closure,
        3,
        "Obstrucció de carretera",
        "Obstrucció general de la carretera".to_string(),
        "🚧",
    )
}

pub fn record_details<E: XmlElement>(record_type: &RecordType, record: E) -> RecordDetails {
    match record_type {
        RecordType::MaintenanceWorks => RecordDetails::new(
            Category::Maintenance,
            2,
            "Obres de manteniment",
            with_type_detail(record, "Obres de manteniment en curs.", "roadworksTypeOfWork"),
            "🔧",
        ),
        RecordType::AbnormalTraffic => RecordDetails::new(
            Category::Congestion,
            3,
            "Trànsit anormal",
            abnormal_traffic_description(record),
            "🚗",
        ),
        RecordType::Accident => RecordDetails::new(
            Category::Accident,
            4,
            "Accident",
            with_type_detail(record, "Accident de trànsit.", "accidentType"),
            "🚨",
        ),
        RecordType::Obstruction => obstruction_details(record),
        RecordType::PoorRoadInfrastructure => RecordDetails::new(
            Category::Maintenance,
            2,
            "Infraestructura danyada",
            poor_infrastructure_description(record),
            "⚠️",
        ),
        RecordType::NetworkManagement => RecordDetails::new(
            Category::Closure,
            5,
            "Gestió de xarxa",
            with_type_detail(
                record,
                "Gestió de la xarxa de carreteres activa.",
                "networkManagementType",
            ),
            "🔄",
        ),
        RecordType::PoorEnvironmentConditions => RecordDetails::new(
            Category::Weather,
            5,
            "Condicions ambientals adverses",
            record
                .child_text("poorEnvironmentType")
                .map(|condition| environment_condition_text(&condition))
                .unwrap_or_else(|| "Condicions ambientals adverses detectades.".to_string()),
            "🌤️",
        ),
        RecordType::SignSetting => RecordDetails::new(
            Category::Other,
            1,
            "Senyalització",
            sign_setting_description(record),
            "📋",
        ),
        RecordType::RoadsideAssistance => RecordDetails::new(
            Category::Other,
            1,
            "Assistència en carretera",
            with_type_detail(
                record,
                "Servei d'assistència en carretera disponible.",
                "roadsideAssistanceType",
            ),
            "🚐",
        ),
        RecordType::Activities => RecordDetails::new(
            Category::Other,
            1,
            "Activitats",
            with_type_detail(
                record,
                "Activitats que afecten el trànsit.",
                "activityType",
            ),
            "👷",
        ),
        RecordType::Unknown(name) => RecordDetails {
            category: Category::Other,
            level: 1,
            title: format!("Incident: {}", name),
            description: "Tipus d'incident no identificat".to_string(),
            icon: "⚠️",
        },
    }
}

/// Explicit latitude/longitude pair. Unlike the SCT feeds there is no order to guess, but the
/// point still has to fall inside Catalonia.
fn point_coordinates<E: XmlElement>(record: E) -> Option<(f64, f64)> {
    let point = record.find_descendant("pointCoordinates")?;

    let lat = point.child_text("latitude")?.parse::<f64>().ok()?;
    let lng = point.child_text("longitude")?.parse::<f64>().ok()?;

    if within_catalonia_box(lat, lng) {
        Some((lat, lng))
    } else {
        tracing::warn!(lat, lng, "discarding DGT coordinates outside Catalonia");
        None
    }
}

/// Location for one record. Records without usable coordinates get a `location_type` and a
/// descriptive `display_text` from whichever reference they do carry.
pub fn extract_location<E: XmlElement>(record: E) -> IncidentLocation {
    let mut location = IncidentLocation::default();

    if let Some(point) = point_coordinates(record) {
        location.set_coordinates(Some(point));
        location.location_type = Some("PointByCoordinates".to_string());
    } else {
        // later matches take precedence, so the most specific description ends up last
        if let Some(reference) = record.find_descendant("referencePoint") {
            location.road_number = reference.child_text("roadNumber");
            location.pk_start = reference
                .child_text("referencePointDistance")
                .and_then(|x| x.parse::<f64>().ok());
            location.location_type = Some("ReferencePoint".to_string());
            location.description = format!(
                "PK {} - Carretera {}",
                location
                    .pk_start
                    .map(|x| x.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                location.road_number.as_deref().unwrap_or("unknown")
            );
        }

        if let Some(alert_c) = record.find_descendant("alertCPoint") {
            location.location_type = Some("AlertCPoint".to_string());
            location.description = format!(
                "Referència AlertC: {}",
                alert_c
                    .child_text("alertCLocation")
                    .unwrap_or_else(|| "unknown".to_string())
            );
        }

        if record.find_descendant("tpegPointLocation").is_some() {
            location.location_type = Some("TPEGPointLocation".to_string());
            location.description = "Localització TPEG (sense coordenades disponibles)".to_string();
        }

        let linear = ["referencePointLinear", "alertCLinear", "tpegLinearLocation"]
            .iter()
            .any(|tag| record.find_descendant(tag).is_some());
        if linear {
            location.location_type = Some("Linear".to_string());
            location.description =
                "Secció lineal de carretera (sense coordenades disponibles)".to_string();
        }

        let area = ["alertCArea", "tpegAreaLocation"]
            .iter()
            .any(|tag| record.find_descendant(tag).is_some());
        if area {
            location.location_type = Some("Area".to_string());
            location.description = "Àrea geogràfica (sense coordenades disponibles)".to_string();
        }
    }

    location.road = record
        .select_path(&["roadName", "value"])
        .map(|x| x.text_content().trim().to_string())
        .filter(|x| !x.is_empty());

    if location.road_number.is_none() {
        location.road_number = record.child_text("roadNumber");
    }

    location.town = record
        .select_path(&["townName", "value"])
        .map(|x| x.text_content().trim().to_string())
        .filter(|x| !x.is_empty());

    location.direction = record.child_text("directionBound");

    location.display_text = display_text(&location);
    location
}

fn display_text(location: &IncidentLocation) -> String {
    if let Some(description) = non_empty(Some(location.description.as_str())) {
        return description.to_string();
    }

    let road = format!(
        "{} {}",
        location.road_number.as_deref().unwrap_or(""),
        location.road.as_deref().unwrap_or("")
    );
    let road = road.trim();

    match (&location.location_type, location.has_coordinates) {
        (Some(location_type), false) if !road.is_empty() => {
            format!("{}: {}", location_type, road)
        }
        (_, true) if !road.is_empty() => road.to_string(),
        _ if location.has_coordinates => String::new(),
        _ => "Localització sense coordenades".to_string(),
    }
}

fn is_active<E: XmlElement>(record: E) -> bool {
    record
        .select_path(&["validity", "validityStatus"])
        .map(|x| x.text_content().trim() == "active")
        .unwrap_or(false)
}

/// Builds the incident for one `situationRecord`, `None` when the record is not active.
pub fn parse_situation_record<E: XmlElement>(record: E, index: usize) -> Option<Incident> {
    if !is_active(record) {
        return None;
    }

    let record_type = RecordType::from_xsi_type(record.attribute_value("type").unwrap_or(""));
    let details = record_details(&record_type, record);
    let location = extract_location(record);

    let id = record
        .ancestor_named("situation")
        .and_then(|situation| non_empty(situation.attribute_value("id")).map(|x| x.to_string()))
        .unwrap_or_else(|| format!("{}-{}", Source::Dgt, index));

    let observations = location
        .direction
        .as_ref()
        .map(|direction| format!("Direcció: {}", direction))
        .unwrap_or_default();

    let mut incident = Incident::new(
        id,
        details.title,
        details.description.clone(),
        details.category,
        details.level,
        location,
        Source::Dgt,
    );

    incident.icon = details.icon.to_string();
    incident.reason = details.description;
    incident.observations = observations;

    Some(incident)
}

/// Active situation records of a DGT DATEX II publication, one incident each.
pub fn parse_dgt_feed(text: &str) -> Result<Vec<Incident>, FeedError> {
    let document = parse_document(FeedKind::Datex2, text)?;
    let records = elements_named(&document, SITUATION_RECORD_TAG);
    let total = records.len();

    let incidents = records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| parse_situation_record(record, index))
        .collect::<Vec<Incident>>();

    tracing::info!(
        records = total,
        active = incidents.len(),
        "parsed DGT DATEX2 incidents"
    );

    Ok(incidents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publication(situations: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<d2LogicalModel xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:_0="http://datex2.eu/schema/1_0/1_0">
  <payloadPublication xsi:type="_0:SituationPublication">{}</payloadPublication>
</d2LogicalModel>"#,
            situations
        )
    }

    fn record(xsi_type: &str, status: &str, body: &str) -> String {
        format!(
            r#"<situationRecord xsi:type="{}"><validity><validityStatus>{}</validityStatus></validity>{}</situationRecord>"#,
            xsi_type, status, body
        )
    }

    #[test]
    fn active_accident_with_coordinates() {
        let xml = publication(&format!(
            r#"<situation id="DGT-SIT-1">{}</situation>"#,
            record(
                "_0:Accident",
                "active",
                "<accidentType>collision</accidentType>\
                 <groupOfLocations><pointByCoordinates><pointCoordinates>\
                 <latitude>41.38</latitude><longitude>2.17</longitude>\
                 </pointCoordinates></pointByCoordinates></groupOfLocations>\
                 <roadNumber>B-10</roadNumber><directionBound>positive</directionBound>"
            )
        ));

        let incidents = parse_dgt_feed(&xml).unwrap();
        assert_eq!(incidents.len(), 1);

        let incident = &incidents[0];
        assert_eq!(incident.id, "DGT-SIT-1");
        assert_eq!(incident.source, Source::Dgt);
        assert_eq!(incident.category, Category::Accident);
        assert_eq!(incident.level, 4);
        assert_eq!(incident.title, "Accident");
        assert_eq!(incident.description, "Accident de trànsit. Tipus: collision.");
        assert_eq!(incident.observations, "Direcció: positive");
        assert_eq!(incident.location.coordinates(), Some((41.38, 2.17)));
        assert_eq!(
            incident.location.location_type.as_deref(),
            Some("PointByCoordinates")
        );
        assert_eq!(incident.location.road_number.as_deref(), Some("B-10"));
        assert_eq!(incident.location.display_text, "B-10");
    }

    #[test]
    fn inactive_records_are_dropped() {
        let xml = publication(&format!(
            "<situation id=\"a\">{}</situation><situation id=\"b\">{}</situation>",
            record("_0:MaintenanceWorks", "suspended", ""),
            record("_0:MaintenanceWorks", "active", "")
        ));

        let incidents = parse_dgt_feed(&xml).unwrap();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].id, "b");
        assert_eq!(incidents[0].category, Category::Maintenance);
        assert_eq!(incidents[0].level, 2);
    }

    #[test]
    fn record_without_situation_gets_index_id() {
        let xml = publication(&format!(
            "{}{}",
            record("_0:SignSetting", "active", "<message>Precaució</message>"),
            record("_0:Activities", "active", "")
        ));

        let incidents = parse_dgt_feed(&xml).unwrap();
        assert_eq!(incidents[0].id, "DGT-0");
        assert_eq!(incidents[1].id, "DGT-1");
        assert_eq!(
            incidents[0].description,
            "Informació de senyalització variable. Missatge: Precaució"
        );
        assert_eq!(incidents[1].category, Category::Other);
    }

    #[test]
    fn obstruction_subtypes() {
        let xml = publication(&format!(
            "{}{}{}",
            record(
                "_0:Obstruction",
                "active",
                "<animalPresenceTypeOfObstruction>herdOfAnimals</animalPresenceTypeOfObstruction>"
            ),
            record(
                "_0:Obstruction",
                "active",
                "<equipmentDamageType>damagedGantry</equipmentDamageType>"
            ),
            record("_0:Obstruction", "active", "")
        ));

        let incidents = parse_dgt_feed(&xml).unwrap();
        let categories: Vec<Category> = incidents.iter().map(|x| x.category).collect();
        assert_eq!(
            categories,
            vec![Category::Accident, Category::Maintenance, Category::Closure]
        );
        assert!(incidents.iter().all(|x| x.level == 3));
        assert_eq!(incidents[2].title, "Obstrucció de carretera");
    }

    #[test]
    fn environment_conditions_are_translated() {
        let xml = publication(&record(
            "_0:PoorEnvironmentConditions",
            "active",
            "<poorEnvironmentType>denseFog</poorEnvironmentType>",
        ));

        let incidents = parse_dgt_feed(&xml).unwrap();
        assert_eq!(incidents[0].category, Category::Weather);
        assert_eq!(incidents[0].level, 5);
        assert_eq!(
            incidents[0].description,
            "Boira densa que redueix la visibilitat."
        );
        assert_eq!(
            environment_condition_text("sandstorm"),
            "Condició ambiental adversa: sandstorm."
        );
    }

    #[test]
    fn reference_point_without_coordinates() {
        let xml = publication(&record(
            "_0:NetworkManagement",
            "active",
            "<referencePoint><roadNumber>A-2</roadNumber>\
             <referencePointDistance>512</referencePointDistance></referencePoint>\
             <networkManagementType>roadClosed</networkManagementType>",
        ));

        let incident = &parse_dgt_feed(&xml).unwrap()[0];
        assert_eq!(incident.category, Category::Closure);
        assert_eq!(incident.level, 5);
        assert!(!incident.location.has_coordinates);
        assert_eq!(incident.location.pk_start, Some(512.0));
        assert_eq!(incident.location.road_number.as_deref(), Some("A-2"));
        assert_eq!(incident.location.display_text, "PK 512 - Carretera A-2");
    }

    #[test]
    fn coordinates_outside_catalonia_are_discarded() {
        let xml = publication(&record(
            "_0:AbnormalTraffic",
            "active",
            "<abnormalTrafficType>queuingTraffic</abnormalTrafficType>\
             <pointCoordinates><latitude>40.41</latitude><longitude>-3.70</longitude></pointCoordinates>",
        ));

        let incident = &parse_dgt_feed(&xml).unwrap()[0];
        assert_eq!(incident.category, Category::Congestion);
        assert_eq!(incident.description, "Cua de vehicles significativa.");
        assert!(!incident.location.has_coordinates);
        assert_eq!(incident.location.display_text, "Localització sense coordenades");
    }

    #[test]
    fn unknown_type_is_other() {
        assert_eq!(
            RecordType::from_xsi_type("_0:Conditions"),
            RecordType::Unknown("Conditions".to_string())
        );
        assert_eq!(RecordType::from_xsi_type("Accident"), RecordType::Accident);
    }
}
