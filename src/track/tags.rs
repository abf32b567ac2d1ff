// Typed extraction of the tags recognised on track features

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix used by authored documents for every recognised key, e.g. `rt:width`
pub const KEY_PREFIX: &str = "rt:";

pub const KEY_KIND: &str = "kind";
pub const KEY_WIDTH: &str = "width";
pub const KEY_HEIGHT: &str = "height";
pub const KEY_CAMBER: &str = "camber";
pub const KEY_SECTOR: &str = "sector";
pub const KEY_DRS: &str = "drs";
pub const KEY_PIT_STOP: &str = "pit-stop";
pub const KEY_STARTING_GRID: &str = "starting-grid";
pub const KEY_RACEWAY: &str = "raceway";

const RECOGNISED_KEYS: [&str; 9] = [
    KEY_KIND,
    KEY_WIDTH,
    KEY_HEIGHT,
    KEY_CAMBER,
    KEY_SECTOR,
    KEY_DRS,
    KEY_PIT_STOP,
    KEY_STARTING_GRID,
    KEY_RACEWAY,
];

const TRUEISH: [&str; 2] = ["true", "yes"];
const FALSY: [&str; 2] = ["false", "no"];

/// Loosely typed value kept for properties the assembler does not interpret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Structured(Value),
}

impl PropertyValue {
    /// Infer a value from its string encoding
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        if let Some(n) = parse_number(trimmed) {
            PropertyValue::Number(n)
        } else if TRUEISH.contains(&trimmed) {
            PropertyValue::Bool(true)
        } else if FALSY.contains(&trimmed) {
            PropertyValue::Bool(false)
        } else if trimmed.starts_with('[') || trimmed.starts_with('{') {
            serde_json::from_str(trimmed)
                .map(PropertyValue::Structured)
                .unwrap_or_else(|_| PropertyValue::Text(s.to_string()))
        } else {
            PropertyValue::Text(s.to_string())
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => PropertyValue::parse(s),
            Value::Number(n) => n
                .as_f64()
                .map(PropertyValue::Number)
                .unwrap_or_else(|| PropertyValue::Text(n.to_string())),
            Value::Bool(b) => PropertyValue::Bool(*b),
            other => PropertyValue::Structured(other.clone()),
        }
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Kind of a line feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Track,
    Pit,
}

impl EntityKind {
    /// Track centerlines are loops, pit lanes are not
    pub fn is_closed(&self) -> bool {
        matches!(self, EntityKind::Track)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Track => write!(f, "track"),
            EntityKind::Pit => write!(f, "pit"),
        }
    }
}

/// Value of the `kind` key of a line feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LineKind {
    Track,
    Pit,
    /// Grid slots, one coordinate per slot in grid order
    StartingGrid,
    /// Pit boxes, one coordinate per box
    PitStop,
}

impl LineKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "track" => Some(LineKind::Track),
            "pit" => Some(LineKind::Pit),
            "starting-grid" => Some(LineKind::StartingGrid),
            "pit-stop" => Some(LineKind::PitStop),
            _ => None,
        }
    }

    /// The entity built from a line of this kind, if it has a centerline
    pub fn entity(&self) -> Option<EntityKind> {
        match self {
            LineKind::Track => Some(EntityKind::Track),
            LineKind::Pit => Some(EntityKind::Pit),
            LineKind::StartingGrid | LineKind::PitStop => None,
        }
    }
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineKind::Track => write!(f, "track"),
            LineKind::Pit => write!(f, "pit"),
            LineKind::StartingGrid => write!(f, "starting-grid"),
            LineKind::PitStop => write!(f, "pit-stop"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DrsRole {
    Detect,
    Start,
    Finish,
}

impl DrsRole {
    pub const ALL: [DrsRole; 3] = [DrsRole::Detect, DrsRole::Start, DrsRole::Finish];

    fn parse(s: &str) -> Option<Self> {
        match s {
            "detect" => Some(DrsRole::Detect),
            "start" => Some(DrsRole::Start),
            "finish" => Some(DrsRole::Finish),
            _ => None,
        }
    }
}

/// Role of a pit-stop or starting-grid marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MarkerRole {
    Start,
    Finish,
}

impl MarkerRole {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "start" => Some(MarkerRole::Start),
            "finish" => Some(MarkerRole::Finish),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RacewayRole {
    Start,
    Finish,
    StartFinish,
}

impl RacewayRole {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "start" => Some(RacewayRole::Start),
            "finish" => Some(RacewayRole::Finish),
            "start-finish" => Some(RacewayRole::StartFinish),
            _ => None,
        }
    }

    /// Whether this marker identifies the start/finish line
    pub fn marks_finish_line(&self) -> bool {
        matches!(self, RacewayRole::Finish | RacewayRole::StartFinish)
    }
}

/// A tag attached to a point of a centerline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackTag {
    /// Width override in meters
    Width(f64),
    /// Height override in meters
    Height(f64),
    Camber(f64),
    Sector(String),
    Drs(DrsRole),
    PitStop(MarkerRole),
    StartingGrid(MarkerRole),
    Raceway(RacewayRole),
}

/// Line-wide default of width, height or camber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LineValue {
    Uniform(f64),
    /// One entry per centerline index, `None` entries hold the previous value
    PerIndex(Vec<Option<f64>>),
}

impl LineValue {
    /// Value used before any index-specific entry is seen
    pub fn initial(&self) -> Option<f64> {
        match self {
            LineValue::Uniform(v) => Some(*v),
            LineValue::PerIndex(values) => values.iter().flatten().next().copied(),
        }
    }

    /// Explicit entry at `index`, if any
    pub fn at(&self, index: usize) -> Option<f64> {
        match self {
            LineValue::Uniform(_) => None,
            LineValue::PerIndex(values) => values.get(index).copied().flatten(),
        }
    }
}

/// A recognised key whose value could not be interpreted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MalformedTag {
    pub key: String,
    pub value: String,
}

/// Typed view over the properties of a line feature
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineProperties {
    pub kind: Option<LineKind>,
    pub width: Option<LineValue>,
    pub height: Option<LineValue>,
    pub camber: Option<LineValue>,
    /// Properties not interpreted by the assembler
    pub extra: BTreeMap<String, PropertyValue>,
}

/// Typed view over the properties of a point feature
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointTags {
    pub tags: Vec<TrackTag>,
    pub extra: BTreeMap<String, PropertyValue>,
}

/// Look a recognised key up, preferring the prefixed spelling
fn lookup<'a>(properties: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a Value> {
    properties
        .get(&format!("{KEY_PREFIX}{key}"))
        .or_else(|| properties.get(key))
}

/// Whether `key` is the spelling [`lookup`] reads. A bare key shadowed by its prefixed
/// spelling is not consumed and stays an extra property.
fn is_consumed(properties: &serde_json::Map<String, Value>, key: &str) -> bool {
    match key.strip_prefix(KEY_PREFIX) {
        Some(bare) => RECOGNISED_KEYS.contains(&bare),
        None => {
            RECOGNISED_KEYS.contains(&key)
                && !properties.contains_key(&format!("{KEY_PREFIX}{key}"))
        }
    }
}

fn extra_properties(properties: &serde_json::Map<String, Value>) -> BTreeMap<String, PropertyValue> {
    properties
        .iter()
        .filter(|(k, _)| !is_consumed(properties, k))
        .map(|(k, v)| (k.clone(), PropertyValue::from_json(v)))
        .collect()
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s.trim()),
        _ => None,
    }
}

fn as_line_value(value: &Value) -> Option<LineValue> {
    let array = match value {
        Value::Array(items) => Some(items.clone()),
        Value::String(s) if s.trim_start().starts_with('[') => {
            match serde_json::from_str::<Value>(s.trim()) {
                Ok(Value::Array(items)) => Some(items),
                _ => return None,
            }
        }
        _ => None,
    };

    match array {
        Some(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in &items {
                match item {
                    Value::Null => values.push(None),
                    other => values.push(Some(as_number(other)?)),
                }
            }
            Some(LineValue::PerIndex(values))
        }
        None => as_number(value).map(LineValue::Uniform),
    }
}

struct Extractor<'a> {
    properties: &'a serde_json::Map<String, Value>,
    malformed: Vec<MalformedTag>,
}

impl<'a> Extractor<'a> {
    fn new(properties: &'a serde_json::Map<String, Value>) -> Self {
        Self {
            properties,
            malformed: Vec::new(),
        }
    }

    /// Extract `key` with `parse`, recording a malformed tag when the key is present but
    /// its value does not parse
    fn extract<T>(&mut self, key: &str, parse: impl FnOnce(&Value) -> Option<T>) -> Option<T> {
        let raw = lookup(self.properties, key)?;
        let parsed = parse(raw);
        if parsed.is_none() {
            self.malformed.push(MalformedTag {
                key: key.to_string(),
                value: describe(raw),
            });
        }
        parsed
    }

    fn role<T>(&mut self, key: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
        self.extract(key, |v| as_text(v).as_deref().and_then(parse))
    }
}

/// Extract the typed properties of a line feature
pub fn line_properties(
    properties: &serde_json::Map<String, Value>,
) -> (LineProperties, Vec<MalformedTag>) {
    let mut ex = Extractor::new(properties);
    let kind = ex.role(KEY_KIND, LineKind::parse);
    let width = ex.extract(KEY_WIDTH, as_line_value);
    let height = ex.extract(KEY_HEIGHT, as_line_value);
    let camber = ex.extract(KEY_CAMBER, as_line_value);

    let line = LineProperties {
        kind,
        width,
        height,
        camber,
        extra: extra_properties(properties),
    };
    (line, ex.malformed)
}

/// Peek at the kind of a line feature without recording anything
pub fn line_kind(properties: &serde_json::Map<String, Value>) -> Option<LineKind> {
    lookup(properties, KEY_KIND)
        .and_then(as_text)
        .as_deref()
        .and_then(LineKind::parse)
}

/// Extract the tags of a point feature, in a fixed key order
pub fn point_tags(properties: &serde_json::Map<String, Value>) -> (PointTags, Vec<MalformedTag>) {
    let mut ex = Extractor::new(properties);
    let mut tags = Vec::new();

    if let Some(v) = ex.extract(KEY_WIDTH, as_number) {
        tags.push(TrackTag::Width(v));
    }
    if let Some(v) = ex.extract(KEY_HEIGHT, as_number) {
        tags.push(TrackTag::Height(v));
    }
    if let Some(v) = ex.extract(KEY_CAMBER, as_number) {
        tags.push(TrackTag::Camber(v));
    }
    if let Some(id) = ex.extract(KEY_SECTOR, |v| as_text(v).filter(|s| !s.is_empty())) {
        tags.push(TrackTag::Sector(id));
    }
    if let Some(role) = ex.role(KEY_DRS, DrsRole::parse) {
        tags.push(TrackTag::Drs(role));
    }
    if let Some(role) = ex.role(KEY_PIT_STOP, MarkerRole::parse) {
        tags.push(TrackTag::PitStop(role));
    }
    if let Some(role) = ex.role(KEY_STARTING_GRID, MarkerRole::parse) {
        tags.push(TrackTag::StartingGrid(role));
    }
    if let Some(role) = ex.role(KEY_RACEWAY, RacewayRole::parse) {
        tags.push(TrackTag::Raceway(role));
    }

    let point = PointTags {
        tags,
        extra: extra_properties(properties),
    };
    (point, ex.malformed)
}
