use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    NotInRange(String),
    BadLogLevel(String),
    BadPort(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
            ConfigError::BadLogLevel(e) => write!(f, "Unknown log level: {}", e),
            ConfigError::BadPort(e) => write!(f, "Port error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Raised while populating an [`EventTypeRegistry`](crate::encoding::registry::EventTypeRegistry).
///
/// A duplicate name means two payload variants claim the same wire tag. A name
/// mismatch means a descriptor's payload would encode under another tag. Both
/// are startup-time programming errors; hosts are expected to abort
/// initialization on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateTypeName(String),
    NameMismatch { registered: String, reported: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateTypeName(name) => write!(f, "Duplicate type name {}", name),
            RegistryError::NameMismatch {
                registered,
                reported,
            } => write!(
                f,
                "Event type registered as {} but its payload reports {}",
                registered, reported
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Failures while converting between in-memory records and their wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    UnknownEventType(String),
    FieldNotFound(String),
    FieldTypeMismatch {
        field: String,
        expected: &'static str,
    },
    InvalidBase64 {
        field: String,
        reason: String,
    },
    InvalidValue {
        field: String,
        reason: String,
    },
    BadTimestamp {
        value: String,
        reason: String,
    },
    Json(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::UnknownEventType(name) => write!(f, "Unknown event type {}", name),
            CodecError::FieldNotFound(field) => write!(f, "Field not found: {}", field),
            CodecError::FieldTypeMismatch { field, expected } => {
                write!(f, "Field type mismatch: {} (expected {})", field, expected)
            }
            CodecError::InvalidBase64 { field, reason } => {
                write!(f, "Invalid base64 in {}: {}", field, reason)
            }
            CodecError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for {}: {}", field, reason)
            }
            CodecError::BadTimestamp { value, reason } => {
                write!(f, "Bad timestamp {:?}: {}", value, reason)
            }
            CodecError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Json(err.to_string())
    }
}

#[derive(Debug)]
pub enum ProcessingError {
    NoWorkers,
    Io(std::io::Error),
    Decode(String),
    Encode(String),
    Codec(CodecError),
    WorkerFailed { worker: usize, reason: String },
    SinkFailed(String),
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingError::NoWorkers => write!(f, "At least one worker is required"),
            ProcessingError::Io(e) => write!(f, "IO error: {}", e),
            ProcessingError::Decode(e) => write!(f, "Decode error: {}", e),
            ProcessingError::Encode(e) => write!(f, "Encode error: {}", e),
            ProcessingError::Codec(e) => write!(f, "Codec error: {}", e),
            ProcessingError::WorkerFailed { worker, reason } => {
                write!(f, "Worker {} failed: {}", worker, reason)
            }
            ProcessingError::SinkFailed(e) => write!(f, "Output task failed: {}", e),
        }
    }
}

impl std::error::Error for ProcessingError {}

impl From<std::io::Error> for ProcessingError {
    fn from(err: std::io::Error) -> Self {
        ProcessingError::Io(err)
    }
}

impl From<CodecError> for ProcessingError {
    fn from(err: CodecError) -> Self {
        ProcessingError::Codec(err)
    }
}
