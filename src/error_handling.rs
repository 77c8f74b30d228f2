pub mod types;

pub use types::{CodecError, ConfigError, ProcessingError, RegistryError};
