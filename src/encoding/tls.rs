//! TLS handshake summary payload (`"tls_handshake"`).
//!
//! Holds what the server sent during a standard handshake. Each of the four
//! stages is optional: a `None` stage means the handshake never got that far.
//! On the wire the stages live under `server_hello`, `server_certificates`,
//! `server_key_exchange` and `server_finished`; every byte blob is base64.

use serde_json::{Map, Value};

use super::event::{event_data_common, EventData};
use super::maps::{
    as_object, encode_bytes, get_bool, get_bytes, get_bytes_list, get_optional_bool,
    get_optional_object, get_optional_string, get_string_array, get_u16, get_u8, JsonMap,
};
use super::registry::EventType;
use crate::error_handling::types::CodecError;

pub const TLS_HANDSHAKE_EVENT_NAME: &str = "tls_handshake";

pub const TLS_HANDSHAKE_EVENT_TYPE: EventType =
    EventType::new(TLS_HANDSHAKE_EVENT_NAME, new_server_handshake);

pub const VERSION_SSL30: u16 = 0x0300;
pub const VERSION_TLS10: u16 = 0x0301;
pub const VERSION_TLS11: u16 = 0x0302;
pub const VERSION_TLS12: u16 = 0x0303;

pub const TLS_RSA_WITH_AES_128_CBC_SHA: u16 = 0x002f;
pub const TLS_RSA_WITH_AES_256_CBC_SHA: u16 = 0x0035;
pub const TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA: u16 = 0xc00a;
pub const TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256: u16 = 0xc02f;

const HELLO: &str = "server_hello";
const CERTIFICATES: &str = "server_certificates";
const KEY_EXCHANGE: &str = "server_key_exchange";
const FINISHED: &str = "server_finished";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerHello {
    pub version: u16,
    pub random: Vec<u8>,
    pub session_id: Vec<u8>,
    pub cipher_suite: u16,
    pub compression_method: u8,
    pub ocsp_stapling: bool,
    pub ticket_supported: bool,
    pub heartbeat_supported: bool,
    pub secure_renegotiation: bool,
}

impl ServerHello {
    pub fn new(version: u16, cipher_suite: u16) -> Self {
        Self {
            version,
            cipher_suite,
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    pub fn with_random(mut self, random: impl Into<Vec<u8>>) -> Self {
        self.random = random.into();
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<Vec<u8>>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_ocsp_stapling(mut self) -> Self {
        self.ocsp_stapling = true;
        self
    }

    pub fn with_ticket_support(mut self) -> Self {
        self.ticket_supported = true;
        self
    }

    pub fn with_heartbeat(mut self) -> Self {
        self.heartbeat_supported = true;
        self
    }

    fn encode(&self) -> Value {
        let mut m = Map::new();
        m.insert("version".into(), self.version.into());
        m.insert("random".into(), encode_bytes(&self.random));
        m.insert("session_id".into(), encode_bytes(&self.session_id));
        m.insert("cipher_suite".into(), self.cipher_suite.into());
        m.insert("compression_method".into(), self.compression_method.into());
        m.insert("ocsp_stapling".into(), self.ocsp_stapling.into());
        m.insert("ticket_supported".into(), self.ticket_supported.into());
        m.insert("heartbeat_supported".into(), self.heartbeat_supported.into());
        m.insert("secure_renegotiation".into(), self.secure_renegotiation.into());
        Value::Object(m)
    }

    fn decode(m: &JsonMap) -> Result<Self, CodecError> {
        Ok(Self {
            version: get_u16(m, "version")?,
            random: get_bytes(m, "random")?,
            session_id: get_bytes(m, "session_id")?,
            cipher_suite: get_u16(m, "cipher_suite")?,
            compression_method: get_u8(m, "compression_method")?,
            ocsp_stapling: get_bool(m, "ocsp_stapling")?,
            ticket_supported: get_bool(m, "ticket_supported")?,
            heartbeat_supported: get_bool(m, "heartbeat_supported")?,
            // older records predate this flag
            secure_renegotiation: get_optional_bool(m, "secure_renegotiation")?
                .unwrap_or(false),
        })
    }
}

/// The certificate chain presented by the server and how it validated.
///
/// `valid == false` always comes with a non-empty `validation_error`; use
/// [`ServerCertificates::invalid`] to build such a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCertificates {
    pub certificates: Vec<Vec<u8>>,
    pub valid: bool,
    pub validation_error: Option<String>,
    pub common_name: Option<String>,
    pub alt_names: Option<Vec<String>>,
    pub issuer: Option<String>,
}

impl Default for ServerCertificates {
    fn default() -> Self {
        Self {
            certificates: Vec::new(),
            valid: true,
            validation_error: None,
            common_name: None,
            alt_names: None,
            issuer: None,
        }
    }
}

impl ServerCertificates {
    pub fn valid(certificates: Vec<Vec<u8>>) -> Self {
        Self {
            certificates,
            valid: true,
            ..Default::default()
        }
    }

    pub fn invalid(certificates: Vec<Vec<u8>>, validation_error: impl Into<String>) -> Self {
        let mut validation_error = validation_error.into();
        if validation_error.is_empty() {
            validation_error = "certificate validation failed".to_string();
        }
        Self {
            certificates,
            valid: false,
            validation_error: Some(validation_error),
            ..Default::default()
        }
    }

    fn check_validation_error(&self) -> Result<(), CodecError> {
        let has_reason = self
            .validation_error
            .as_deref()
            .is_some_and(|e| !e.is_empty());
        if !self.valid && !has_reason {
            return Err(CodecError::InvalidValue {
                field: "validation_error".to_string(),
                reason: "invalid certificates must carry a validation error".to_string(),
            });
        }
        Ok(())
    }

    fn encode(&self) -> Result<Value, CodecError> {
        self.check_validation_error()?;
        let mut m = Map::new();
        m.insert(
            "certificates".into(),
            Value::Array(self.certificates.iter().map(|c| encode_bytes(c)).collect()),
        );
        m.insert("is_valid".into(), self.valid.into());
        m.insert("validation_error".into(), self.validation_error.clone().into());
        m.insert("common_name".into(), self.common_name.clone().into());
        m.insert("alt_names".into(), self.alt_names.clone().into());
        m.insert("issuer".into(), self.issuer.clone().into());
        Ok(Value::Object(m))
    }

    fn decode(m: &JsonMap) -> Result<Self, CodecError> {
        let certs = Self {
            certificates: get_bytes_list(m, "certificates")?,
            valid: get_bool(m, "is_valid")?,
            validation_error: get_optional_string(m, "validation_error")?,
            common_name: get_optional_string(m, "common_name")?,
            alt_names: get_string_array(m, "alt_names")?,
            issuer: get_optional_string(m, "issuer")?,
        };
        certs.check_validation_error()?;
        Ok(certs)
    }
}

/// Raw key material from the server key exchange message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerKeyExchange {
    pub key: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerFinished {
    pub verify_data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerHandshake {
    pub server_hello: Option<ServerHello>,
    pub server_certificates: Option<ServerCertificates>,
    pub server_key_exchange: Option<ServerKeyExchange>,
    pub server_finished: Option<ServerFinished>,
}

fn new_server_handshake() -> Box<dyn EventData> {
    Box::new(ServerHandshake::default())
}

impl ServerHandshake {
    /// True once the server's finished message was recorded.
    pub fn is_complete(&self) -> bool {
        self.server_finished.is_some()
    }
}

fn stage<T>(stage: Option<T>) -> Value
where
    T: Into<Value>,
{
    stage.map_or(Value::Null, Into::into)
}

impl EventData for ServerHandshake {
    fn event_type(&self) -> &'static str {
        TLS_HANDSHAKE_EVENT_NAME
    }

    fn encode(&self) -> Result<Value, CodecError> {
        let mut m = Map::new();
        m.insert(HELLO.into(), stage(self.server_hello.as_ref().map(ServerHello::encode)));
        let certificates = self
            .server_certificates
            .as_ref()
            .map(ServerCertificates::encode)
            .transpose()?;
        m.insert(CERTIFICATES.into(), stage(certificates));
        m.insert(
            KEY_EXCHANGE.into(),
            stage(self.server_key_exchange.as_ref().map(|kx| {
                Value::Object(Map::from_iter([(
                    "key".to_string(),
                    encode_bytes(&kx.key),
                )]))
            })),
        );
        m.insert(
            FINISHED.into(),
            stage(self.server_finished.as_ref().map(|f| {
                Value::Object(Map::from_iter([(
                    "verify_data".to_string(),
                    encode_bytes(&f.verify_data),
                )]))
            })),
        );
        Ok(Value::Object(m))
    }

    fn decode(&mut self, value: &Value) -> Result<(), CodecError> {
        let m = as_object(value, "data")?;
        self.server_hello = get_optional_object(m, HELLO)?
            .map(ServerHello::decode)
            .transpose()?;
        self.server_certificates = get_optional_object(m, CERTIFICATES)?
            .map(ServerCertificates::decode)
            .transpose()?;
        self.server_key_exchange = get_optional_object(m, KEY_EXCHANGE)?
            .map(|kx| get_bytes(kx, "key").map(|key| ServerKeyExchange { key }))
            .transpose()?;
        self.server_finished = get_optional_object(m, FINISHED)?
            .map(|f| get_bytes(f, "verify_data").map(|verify_data| ServerFinished { verify_data }))
            .transpose()?;
        Ok(())
    }

    event_data_common!();
}
