pub mod grab_worker;
pub mod target;

pub use grab_worker::{GrabWorker, HandshakeFuture, HandshakeOutcome, Handshaker};
pub use target::ScanTarget;
