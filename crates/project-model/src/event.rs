//! Event records: the unit of work of a render batch.
//!
//! An event is either a scheduled talk (positive integer id, arbitrary extra
//! metadata used as script placeholders) or one of the reserved jobs
//! `pause`, `outro`, `bgloop`, which only carry an id and a title.
//! Events are constructed once per run and never mutated afterwards.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::project::ModelError;

/// Fixed, schedule-independent jobs rendered from their own project file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReservedJob {
    Pause,
    Outro,
    Bgloop,
}

impl ReservedJob {
    pub const ALL: [ReservedJob; 3] = [ReservedJob::Pause, ReservedJob::Outro, ReservedJob::Bgloop];

    /// The token used as event id, file stem and composition name.
    pub fn token(self) -> &'static str {
        match self {
            ReservedJob::Pause => "pause",
            ReservedJob::Outro => "outro",
            ReservedJob::Bgloop => "bgloop",
        }
    }

    /// Title given to the synthesized event.
    pub fn default_title(self) -> &'static str {
        match self {
            ReservedJob::Pause => "Pause Loop",
            ReservedJob::Outro => "Outro",
            ReservedJob::Bgloop => "Background Loop",
        }
    }

    /// Project file name this job renders from.
    pub fn project_asset(self) -> String {
        format!("{}.aep", self.token())
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|job| job.token() == token)
    }
}

impl fmt::Display for ReservedJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Event identifier. Determines the output file stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventId {
    /// Scheduled talk, always > 0.
    Talk(u64),
    Reserved(ReservedJob),
}

impl EventId {
    pub fn reserved_job(self) -> Option<ReservedJob> {
        match self {
            EventId::Reserved(job) => Some(job),
            EventId::Talk(_) => None,
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Talk(n) => write!(f, "{n}"),
            EventId::Reserved(job) => f.write_str(job.token()),
        }
    }
}

impl FromStr for EventId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(job) = ReservedJob::from_token(trimmed) {
            return Ok(EventId::Reserved(job));
        }
        match trimmed.parse::<u64>() {
            Ok(0) | Err(_) => Err(ModelError::InvalidId {
                value: s.to_string(),
            }),
            Ok(n) => Ok(EventId::Talk(n)),
        }
    }
}

impl Serialize for EventId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EventId::Talk(n) => serializer.serialize_u64(*n),
            EventId::Reserved(job) => serializer.serialize_str(job.token()),
        }
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u64),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Number(0) => Err(serde::de::Error::custom("event id must be positive")),
            RawId::Number(n) => Ok(EventId::Talk(n)),
            RawId::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// A single event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,

    pub title: String,

    /// Remaining metadata (`subtitle`, `persons`, `personnames`, `room`, ...)
    /// in source order.
    #[serde(flatten)]
    pub fields: IndexMap<String, Value>,
}

impl Event {
    pub fn new(id: EventId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            fields: IndexMap::new(),
        }
    }

    /// Synthesized event for a reserved job.
    pub fn reserved(job: ReservedJob) -> Self {
        Self::new(EventId::Reserved(job), job.default_title())
    }

    /// Placeholder talk used to preview the intro without a schedule.
    pub fn placeholder() -> Self {
        Self::new(EventId::Talk(1), "Eröffnungsveranstaltung")
            .with_field("subtitle", "Easterhegg 2018")
            .with_field("persons", Value::from(vec!["watz"]))
            .with_field("personnames", "watz")
            .with_field("room", "Heisenberg 1")
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn reserved_job(&self) -> Option<ReservedJob> {
        self.id.reserved_job()
    }

    pub fn room(&self) -> Option<&str> {
        self.fields.get("room").and_then(Value::as_str)
    }

    /// `#<id>: <title>`, used as the prefix of progress lines.
    pub fn describe(&self) -> String {
        format!("#{}: {}", self.id, self.title)
    }

    /// Text value of a field as it should appear in a generated script.
    /// `id` and `title` are fields too.
    pub fn field_text(&self, key: &str) -> Option<String> {
        match key {
            "id" => Some(self.id.to_string()),
            "title" => Some(self.title.clone()),
            _ => self.fields.get(key).map(value_text),
        }
    }

    /// All field names in natural order: `id`, `title`, then metadata.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        ["id", "title"]
            .into_iter()
            .chain(self.fields.keys().map(String::as_str))
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Parse a JSON array of event records and check id uniqueness.
pub fn parse_events(json: &str) -> Result<Vec<Event>, ModelError> {
    let events: Vec<Event> = serde_json::from_str(json).map_err(|e| ModelError::ParseError {
        path: None,
        source: e,
    })?;
    ensure_unique_ids(&events)?;
    Ok(events)
}

/// Load event records from a JSON file produced by the schedule tooling.
pub fn load_events(path: &Path) -> Result<Vec<Event>, ModelError> {
    let content = std::fs::read_to_string(path).map_err(|e| ModelError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_events(&content).map_err(|err| match err {
        ModelError::ParseError { source, .. } => ModelError::ParseError {
            path: Some(path.to_path_buf()),
            source,
        },
        other => other,
    })
}

/// Two events must never share an id within one run.
pub fn ensure_unique_ids(events: &[Event]) -> Result<(), ModelError> {
    let mut seen = HashSet::with_capacity(events.len());
    for event in events {
        if !seen.insert(event.id) {
            return Err(ModelError::DuplicateId { id: event.id });
        }
    }
    Ok(())
}
