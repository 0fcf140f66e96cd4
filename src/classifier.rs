use crate::models::{Category, Level};

const CLOSURE_KEYWORDS: &[&str] = &[
    "tallada",
    "tallat",
    "tancat",
    "tancada",
    "cortada",
    "cortat",
    "calçada tallada",
    "via tallada",
    "carretera tallada",
    "desviament",
    "desvi",
    "pas alternatiu",
    "passe alternatiu",
];

/// Chains being mandatory does not mean the road is closed.
const CHAINS_ONLY_PHRASE: &str = "obligatori cadenes";

const WEATHER_KEYWORDS: &[&str] = &[
    "neu",
    "neu/gel",
    "gel",
    "meteorologia",
    "meterologia",
    "cadenes",
    "obligatori cadenes",
    "cadena",
    "inundacions",
    "inundació",
    "aiguades",
    "tempesta",
    "vent",
    "pluja intensa",
];

const ACCIDENT_KEYWORDS: &[&str] = &[
    "accident",
    "col·lisió",
    "xoc",
    "abocament",
    "vehicle accidentat",
    "cotxe accidentat",
    "sinistre",
    "incident",
    "emergència",
];

const CONGESTION_KEYWORDS: &[&str] = &[
    "retenció",
    "retencions",
    "retenci",
    "congestió",
    "densitat",
    "circulació intensa",
    "circulació amb retencions",
    "trànsit dens",
    "trànsit intens",
    "engarrot",
];

const MAINTENANCE_KEYWORDS: &[&str] = &[
    "obres",
    "treballs",
    "manteniment",
    "reparació",
    "construcció",
    "millora",
    "neteja",
    "reforçament",
    "reasfaltat",
    "asfalt",
    "ferm",
    "jardineria",
    "senyalització",
    "barrera",
    "mur",
    "talús",
    "rotonda",
    "pont",
    "túnel",
    "canalització",
    "instal·lació",
    "sondejos",
    "electric",
];

/// Feed severity from which an otherwise unclassified record is treated as critical.
const HIGH_FEED_LEVEL: i32 = 4;

/// The text fields of a GML record the classifier looks at.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClassifierInput<'a> {
    pub causa: Option<&'a str>,
    pub descripcio: Option<&'a str>,
    pub descripcio_tipus: Option<&'a str>,
    pub cap_a: Option<&'a str>,
    pub nivell: i32,
}

impl<'a> ClassifierInput<'a> {
    fn search_text(&self) -> String {
        [self.causa, self.descripcio, self.descripcio_tipus, self.cap_a]
            .into_iter()
            .flatten()
            .map(|x| x.to_lowercase())
            .collect::<Vec<String>>()
            .join(" ")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub category: Category,
    pub level: Level,
    pub reason: String,
    pub observations: String,
}

/// One rule of the classifier, in priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Detector {
    RoadClosure,
    Weather,
    Accident,
    Congestion,
    Maintenance,
    HighFeedLevel,
}

pub const DETECTORS_BY_PRIORITY: [Detector; 6] = [
    Detector::RoadClosure,
    Detector::Weather,
    Detector::Accident,
    Detector::Congestion,
    Detector::Maintenance,
    Detector::HighFeedLevel,
];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

pub fn has_closure_keyword(text: &str) -> bool {
    contains_any(text, CLOSURE_KEYWORDS)
}

pub fn detect_road_closure(text: &str) -> bool {
    if text.contains(CHAINS_ONLY_PHRASE) {
        return has_closure_keyword(&text.replace(CHAINS_ONLY_PHRASE, " "));
    }

    has_closure_keyword(text)
}

pub fn detect_weather(text: &str) -> bool {
    contains_any(text, WEATHER_KEYWORDS)
}

pub fn detect_accident(text: &str) -> bool {
    contains_any(text, ACCIDENT_KEYWORDS)
}

pub fn detect_congestion(text: &str) -> bool {
    contains_any(text, CONGESTION_KEYWORDS)
}

pub fn detect_maintenance(text: &str) -> bool {
    contains_any(text, MAINTENANCE_KEYWORDS)
}

pub fn detect_high_feed_level(nivell: i32) -> bool {
    nivell >= HIGH_FEED_LEVEL
}

impl Detector {
    pub fn matches(&self, text: &str, nivell: i32) -> bool {
        match self {
            Detector::RoadClosure => detect_road_closure(text),
            Detector::Weather => detect_weather(text),
            Detector::Accident => detect_accident(text),
            Detector::Congestion => detect_congestion(text),
            Detector::Maintenance => detect_maintenance(text),
            Detector::HighFeedLevel => detect_high_feed_level(nivell),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Detector::RoadClosure => Category::Closure,
            Detector::Weather => Category::Weather,
            Detector::Accident => Category::Accident,
            Detector::Congestion => Category::Congestion,
            Detector::Maintenance => Category::Maintenance,
            Detector::HighFeedLevel => Category::Other,
        }
    }

    pub fn level(&self, text: &str) -> Level {
        match self {
            Detector::RoadClosure => 5,
            // snow or flooding that closed the road
            Detector::Weather if has_closure_keyword(text) => 5,
            Detector::Weather => 4,
            Detector::Accident => 4,
            Detector::Congestion => 3,
            Detector::Maintenance => 2,
            Detector::HighFeedLevel => 5,
        }
    }

    pub fn reason(&self, input: &ClassifierInput) -> String {
        match self {
            Detector::RoadClosure => closure_reason(input),
            Detector::Weather => weather_reason(input),
            Detector::Accident => accident_reason(input),
            Detector::Congestion => congestion_reason(input),
            Detector::Maintenance => maintenance_reason(input),
            Detector::HighFeedLevel => high_level_reason(input),
        }
    }
}

fn present<'a>(value: Option<&'a str>) -> Option<&'a str> {
    value.map(str::trim).filter(|x| !x.is_empty())
}

/// `causa (descripcio)` when both exist, else the best single field, else `fallback`.
fn compose_reason(input: &ClassifierInput, fallback: &str) -> String {
    let causa = present(input.causa);
    let detail = present(input.descripcio).or_else(|| present(input.descripcio_tipus));

    match (causa, detail) {
        (Some(causa), Some(detail)) => format!("{} ({})", causa, detail),
        (Some(causa), None) => causa.to_string(),
        (None, Some(detail)) => detail.to_string(),
        (None, None) => fallback.to_string(),
    }
}

fn closure_reason(input: &ClassifierInput) -> String {
    compose_reason(input, "Carretera tallada")
}

fn weather_reason(input: &ClassifierInput) -> String {
    compose_reason(input, "Condicions meteorològiques adverses")
}

fn accident_reason(input: &ClassifierInput) -> String {
    compose_reason(input, "Accident de trànsit")
}

fn congestion_reason(input: &ClassifierInput) -> String {
    compose_reason(input, "Retencions")
}

fn maintenance_reason(input: &ClassifierInput) -> String {
    compose_reason(input, "Obres de manteniment")
}

fn high_level_reason(input: &ClassifierInput) -> String {
    compose_reason(input, &format!("Incidència de nivell {}", input.nivell))
}

/// `descripcio | Direcció: <cap_a> | Tipus: <descripcio_tipus>`, skipping empty parts.
pub fn extract_observations(input: &ClassifierInput) -> String {
    let mut parts: Vec<String> = vec![];

    if let Some(descripcio) = present(input.descripcio) {
        parts.push(descripcio.to_string());
    }

    if let Some(cap_a) = present(input.cap_a) {
        parts.push(format!("Direcció: {}", cap_a));
    }

    if let Some(tipus) = present(input.descripcio_tipus) {
        parts.push(format!("Tipus: {}", tipus));
    }

    parts.join(" | ")
}

/// First detector that fires decides the category. Keywords match as substrings of the
/// lower-cased fields.
pub fn classify(input: &ClassifierInput) -> Classification {
    let text = input.search_text();
    let observations = extract_observations(input);

    for detector in DETECTORS_BY_PRIORITY {
        if detector.matches(&text, input.nivell) {
            return Classification {
                category: detector.category(),
                level: detector.level(&text),
                reason: detector.reason(input),
                observations,
            };
        }
    }

    Classification {
        category: Category::Other,
        level: 1,
        reason: compose_reason(input, "Incidència"),
        observations,
    }
}
