use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::event::{decode_event, encode_event, ConnectionEvent, EventData};
use super::maps::{as_object, get_field, get_optional_string, get_string};
use super::registry::EventTypeRegistry;
use crate::error_handling::types::CodecError;

/// One complete scan record for a single target.
///
/// `log` keeps the protocol steps in the order they were attempted.
#[derive(Debug, Clone, PartialEq)]
pub struct Grab {
    pub host: String,
    pub domain: Option<String>,
    pub time: DateTime<Utc>,
    pub log: Vec<ConnectionEvent>,
}

impl Grab {
    pub fn new(host: impl Into<String>, domain: Option<String>, time: DateTime<Utc>) -> Self {
        Self {
            host: host.into(),
            domain: domain.filter(|d| !d.is_empty()),
            time,
            log: Vec::new(),
        }
    }

    pub fn push_event(&mut self, event: ConnectionEvent) {
        self.log.push(event);
    }

    pub fn push(&mut self, data: impl EventData) {
        self.log.push(ConnectionEvent::new(data));
    }

    pub fn to_json(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(&encode_grab(self)?)?)
    }

    pub fn from_json(s: &str, registry: &EventTypeRegistry) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_str(s)?;
        decode_grab(&value, registry)
    }
}

/// RFC3339 in UTC with a `Z` suffix; fractional seconds only when non-zero.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_time(value: &str) -> Result<DateTime<Utc>, CodecError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CodecError::BadTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

pub fn encode_grab(grab: &Grab) -> Result<Value, CodecError> {
    let mut m = Map::new();
    m.insert("host".to_string(), Value::String(grab.host.clone()));
    if let Some(domain) = grab.domain.as_deref().filter(|d| !d.is_empty()) {
        m.insert("domain".to_string(), Value::String(domain.to_string()));
    }
    m.insert("time".to_string(), Value::String(format_time(&grab.time)));
    let log = grab
        .log
        .iter()
        .map(encode_event)
        .collect::<Result<Vec<_>, _>>()?;
    m.insert("log".to_string(), Value::Array(log));
    Ok(Value::Object(m))
}

pub fn decode_grab(value: &Value, registry: &EventTypeRegistry) -> Result<Grab, CodecError> {
    let m = as_object(value, "grab")?;
    let host = get_string(m, "host")?;
    let domain = get_optional_string(m, "domain")?.filter(|d| !d.is_empty());
    let time = parse_time(&get_string(m, "time")?)?;

    let log = match get_field(m, "log")? {
        Value::Null => Vec::new(),
        Value::Array(events) => events
            .iter()
            .map(|e| decode_event(e, registry))
            .collect::<Result<Vec<_>, _>>()?,
        _ => {
            return Err(CodecError::FieldTypeMismatch {
                field: "log".to_string(),
                expected: "array",
            })
        }
    };

    Ok(Grab {
        host,
        domain,
        time,
        log,
    })
}
