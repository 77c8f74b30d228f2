//! Polymorphic connection events.
//!
//! A [`ConnectionEvent`] is a self-describing tagged union: on the wire it is
//! `{"type": <tag>, "data": <payload>, "error": <message>}`. The tag is always
//! derived from the payload, and decoding resolves it through an
//! [`EventTypeRegistry`] before the payload body is interpreted.

use std::any::Any;
use std::fmt;

use serde_json::{Map, Value};

use super::maps::{as_object, get_field, get_optional_string, get_string};
use super::registry::EventTypeRegistry;
use crate::error_handling::types::CodecError;

/// Capability every protocol-specific payload provides.
///
/// Implementors are plain value types. `decode` fills `self` in place, which
/// lets the registry hand out an empty instance that is then populated from
/// the wire.
pub trait EventData: fmt::Debug + Send + Sync + 'static {
    /// Wire tag of this payload kind. Must match the name it is registered under.
    fn event_type(&self) -> &'static str;

    fn encode(&self) -> Result<Value, CodecError>;

    fn decode(&mut self, value: &Value) -> Result<(), CodecError>;

    fn as_any(&self) -> &dyn Any;

    fn clone_box(&self) -> Box<dyn EventData>;

    /// Structural equality against another payload of any kind.
    fn eq_data(&self, other: &dyn EventData) -> bool;
}

impl Clone for Box<dyn EventData> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl PartialEq for dyn EventData {
    fn eq(&self, other: &Self) -> bool {
        self.eq_data(other)
    }
}

/// Implements the bookkeeping half of [`EventData`] for a `Clone + PartialEq` payload.
macro_rules! event_data_common {
    () => {
        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn clone_box(&self) -> Box<dyn $crate::encoding::event::EventData> {
            Box::new(self.clone())
        }

        fn eq_data(&self, other: &dyn $crate::encoding::event::EventData) -> bool {
            other
                .as_any()
                .downcast_ref::<Self>()
                .is_some_and(|o| o == self)
        }
    };
}
pub(crate) use event_data_common;

/// Error captured while performing one protocol step.
///
/// Only the message survives serialization, so equality is by message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventError {
    message: String,
}

impl EventError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn from_error(err: &dyn std::error::Error) -> Self {
        Self::new(err.to_string())
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EventError {}

impl From<std::io::Error> for EventError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// One protocol step attempted against a target.
///
/// `data` carries whatever was captured, `error` is set when the step failed.
/// Both may be meaningful at once, e.g. a handshake that failed after the
/// server hello was already recorded.
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    pub data: Box<dyn EventData>,
    pub error: Option<EventError>,
}

impl PartialEq for ConnectionEvent {
    fn eq(&self, other: &Self) -> bool {
        *self.data == *other.data && self.error == other.error
    }
}

impl ConnectionEvent {
    pub fn new(data: impl EventData) -> Self {
        Self {
            data: Box::new(data),
            error: None,
        }
    }

    pub fn with_error(data: impl EventData, error: Option<EventError>) -> Self {
        Self {
            data: Box::new(data),
            error,
        }
    }

    pub fn failed(data: impl EventData, error: EventError) -> Self {
        Self::with_error(data, Some(error))
    }

    pub fn event_type(&self) -> &'static str {
        self.data.event_type()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Downcasts the payload to a concrete type.
    pub fn data_as<T: EventData>(&self) -> Option<&T> {
        self.data.as_any().downcast_ref::<T>()
    }
}

pub fn encode_event(event: &ConnectionEvent) -> Result<Value, CodecError> {
    let mut m = Map::new();
    m.insert(
        "type".to_string(),
        Value::String(event.event_type().to_string()),
    );
    m.insert("data".to_string(), event.data.encode()?);
    if let Some(ref err) = event.error {
        m.insert("error".to_string(), Value::String(err.message().to_string()));
    }
    Ok(Value::Object(m))
}

/// Decodes one event, resolving its `type` tag before touching `data`.
pub fn decode_event(
    value: &Value,
    registry: &EventTypeRegistry,
) -> Result<ConnectionEvent, CodecError> {
    let m = as_object(value, "event")?;
    let type_name = get_string(m, "type")?;
    let event_type = registry.lookup(&type_name)?;

    let mut data = event_type.empty_instance();
    data.decode(get_field(m, "data")?)?;

    let error = get_optional_string(m, "error")?.map(EventError::new);
    Ok(ConnectionEvent { data, error })
}
