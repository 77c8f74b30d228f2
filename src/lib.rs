pub mod configuration;
pub use configuration::{CliArgs, Config};

pub mod encoding;
pub use encoding::{ConnectionEvent, EventTypeRegistry, Grab};

pub mod error_handling;

pub mod processing;
pub use processing::process;

pub mod scanner;
pub use scanner::{GrabWorker, ScanTarget};
