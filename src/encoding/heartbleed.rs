use serde_json::{json, Value};

use super::event::{event_data_common, EventData};
use super::maps::{as_object, get_bool};
use super::registry::EventType;
use crate::error_handling::types::CodecError;

pub const HEARTBLEED_EVENT_NAME: &str = "heartbleed";

pub const HEARTBLEED_EVENT_TYPE: EventType =
    EventType::new(HEARTBLEED_EVENT_NAME, new_heartbleed_log);

/// Outcome of a heartbeat probe sent after a completed handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbleedLog {
    pub heartbeat_enabled: bool,
    pub vulnerable: bool,
}

fn new_heartbleed_log() -> Box<dyn EventData> {
    Box::new(HeartbleedLog::default())
}

impl EventData for HeartbleedLog {
    fn event_type(&self) -> &'static str {
        HEARTBLEED_EVENT_NAME
    }

    fn encode(&self) -> Result<Value, CodecError> {
        Ok(json!({
            "heartbeat_enabled": self.heartbeat_enabled,
            "vulnerable": self.vulnerable,
        }))
    }

    fn decode(&mut self, value: &Value) -> Result<(), CodecError> {
        let m = as_object(value, "data")?;
        self.heartbeat_enabled = get_bool(m, "heartbeat_enabled")?;
        self.vulnerable = get_bool(m, "vulnerable")?;
        Ok(())
    }

    event_data_common!();
}
