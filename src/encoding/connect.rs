use serde_json::Value;

use super::event::{event_data_common, EventData};
use super::registry::EventType;
use crate::error_handling::types::CodecError;

pub const CONNECT_EVENT_NAME: &str = "connect";

pub const CONNECT_EVENT_TYPE: EventType = EventType::new(CONNECT_EVENT_NAME, new_connect_event);

/// Marker payload for a TCP connection attempt. Success or failure lives in
/// the surrounding event's `error`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectEvent;

fn new_connect_event() -> Box<dyn EventData> {
    Box::new(ConnectEvent)
}

impl EventData for ConnectEvent {
    fn event_type(&self) -> &'static str {
        CONNECT_EVENT_NAME
    }

    fn encode(&self) -> Result<Value, CodecError> {
        Ok(Value::Null)
    }

    fn decode(&mut self, _value: &Value) -> Result<(), CodecError> {
        Ok(())
    }

    event_data_common!();
}
