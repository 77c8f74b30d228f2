//! Event model and wire codecs.
//!
//! Components:
//! - `registry`: maps event tags to payload factories.
//! - `event`: the `EventData` capability and the tagged `ConnectionEvent`.
//! - `grab`: the per-target `Grab` record and its JSON form.
//! - `maps`: typed field extraction used by every payload decoder.
//! - `connect`, `tls`, `heartbleed`: the built-in payloads.

pub mod connect;
pub mod event;
pub mod grab;
pub mod heartbleed;
pub mod maps;
pub mod registry;
pub mod tls;


pub use connect::ConnectEvent;
pub use event::{decode_event, encode_event, ConnectionEvent, EventData, EventError};
pub use grab::{decode_grab, encode_grab, Grab};
pub use heartbleed::HeartbleedLog;
pub use registry::{EventType, EventTypeRegistry};
pub use tls::ServerHandshake;
