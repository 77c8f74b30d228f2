//! Concurrent processing of scan input.
//!
//! - `types`: the `Decoder`, `Encoder` and `Worker` seams.
//! - `pipeline`: the bounded worker pool driving them.
//! - `json_lines`: file/stdin adapters for targets and grabs.

pub mod json_lines;
pub mod pipeline;
pub mod types;

pub use json_lines::{GrabDecoder, GrabEncoder, TargetDecoder};
pub use pipeline::{process, PipelineState, ProcessStats, QUEUE_FACTOR};
pub use types::{worker_fn, Decoder, Encoder, FnWorker, IterDecoder, VecEncoder, Worker};
