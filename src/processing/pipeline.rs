//! # Processing Pipeline
//!
//! Fans items from a [`Decoder`] out to a bounded pool of [`Worker`]s and fans
//! their results back into a single [`Encoder`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  input queue   ┌──────────┐  output queue  ┌──────────┐
//! │ Decoder  │───(bounded)───▶│ worker 0 │───(bounded)───▶│ Encoder  │
//! │ (blocking│                │ worker 1 │                │ (single  │
//! │  task)   │                │   ...    │                │  task)   │
//! └──────────┘                └──────────┘                └──────────┘
//! ```
//!
//! Both queues hold `workers * QUEUE_FACTOR` items. A full input queue blocks
//! the read loop, so a slow pool throttles how fast targets are read.
//!
//! ## Shutdown
//!
//! 1. input ends: the input sender is dropped, workers see the queue close
//! 2. every worker task is joined, so every result has been queued
//! 3. the last output sender is dropped and the encoder task is joined
//!
//! Closing the output queue before step 2 completes would lose results;
//! returning before step 3 would lose the tail of the output.
//!
//! Results reach the encoder in completion order, not input order.

use std::sync::Arc;

use log::{debug, error, trace, warn};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::types::{Decoder, Encoder, Worker};
use crate::error_handling::types::ProcessingError;

/// Queue capacity per worker for both the input and the output queue.
pub const QUEUE_FACTOR: usize = 4;

/// Lifecycle of one [`process`] call. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    /// Reading input and feeding workers.
    Running,
    /// Input closed, waiting for workers to finish in-flight items.
    Draining,
    /// Workers done, waiting for the encoder to write the remaining results.
    Flushing,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessStats {
    /// Items taken from the decoder.
    pub read: u64,
    /// Results the encoder accepted.
    pub written: u64,
    /// Results the encoder rejected.
    pub encode_failures: u64,
}

struct Lifecycle {
    state: PipelineState,
}

impl Lifecycle {
    fn new() -> Self {
        debug!("pipeline: {:?}", PipelineState::Running);
        Self {
            state: PipelineState::Running,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(next > self.state, "pipeline cannot go from {:?} to {:?}", self.state, next);
        debug!("pipeline: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

struct SinkReport {
    written: u64,
    failures: u64,
    first_error: Option<ProcessingError>,
}

/// Runs every item from `decoder` through one of `workers` handlers and
/// writes each result to `encoder` exactly once.
///
/// `make_worker` is called once per worker index, before any input is read.
/// Both the decoder and the encoder run on blocking threads since they
/// usually read from or write to files, stdin and stdout. Only the workers run
/// on the async runtime, so a slow source never stalls them.
///
/// # Errors
///
/// The pipeline always drains before returning, even on error. Reported in
/// this order of precedence:
/// - [`ProcessingError::NoWorkers`] if `workers == 0` (nothing is read)
/// - [`ProcessingError::SinkFailed`] if the encoder task panicked
/// - [`ProcessingError::WorkerFailed`] if a worker task panicked
/// - the decoder's error, if reading stopped on one (a decoder panic is
///   reported as [`ProcessingError::Decode`])
/// - the first encoder error
pub async fn process<D, E, W, M>(
    decoder: D,
    encoder: E,
    workers: usize,
    mut make_worker: M,
) -> Result<ProcessStats, ProcessingError>
where
    D: Decoder + Send + 'static,
    D::Item: Send + 'static,
    W: Worker<D::Item>,
    E: Encoder<Item = W::Output>,
    M: FnMut(usize) -> W,
{
    if workers == 0 {
        return Err(ProcessingError::NoWorkers);
    }

    let capacity = workers * QUEUE_FACTOR;
    let (input_tx, input_rx) = mpsc::channel::<D::Item>(capacity);
    let (output_tx, output_rx) = mpsc::channel::<W::Output>(capacity);
    let input_rx = Arc::new(Mutex::new(input_rx));

    let mut lifecycle = Lifecycle::new();
    let sink = tokio::task::spawn_blocking(move || drain_output(encoder, output_rx));

    let pool: Vec<JoinHandle<u64>> = (0..workers)
        .map(|index| {
            let worker = make_worker(index);
            tokio::spawn(run_worker(
                index,
                worker,
                Arc::clone(&input_rx),
                output_tx.clone(),
            ))
        })
        .collect();
    drop(input_rx);
    debug!("pipeline: started {} worker(s), queue capacity {}", workers, capacity);

    // The source owns the only input sender; it is dropped when reading ends.
    let source = tokio::task::spawn_blocking(move || read_input(decoder, input_tx));
    let (read, decode_error) = match source.await {
        Ok(report) => report,
        Err(e) => {
            error!("pipeline: input task failed: {}", e);
            (0, Some(ProcessingError::Decode(format!("input task failed: {}", e))))
        }
    };
    lifecycle.advance(PipelineState::Draining);

    let mut worker_failure = None;
    for (index, handle) in pool.into_iter().enumerate() {
        match handle.await {
            Ok(handled) => trace!("pipeline: worker {} handled {} item(s)", index, handled),
            Err(e) => {
                error!("pipeline: worker {} failed: {}", index, e);
                worker_failure.get_or_insert(ProcessingError::WorkerFailed {
                    worker: index,
                    reason: e.to_string(),
                });
            }
        }
    }

    drop(output_tx);
    lifecycle.advance(PipelineState::Flushing);

    let report = sink
        .await
        .map_err(|e| ProcessingError::SinkFailed(e.to_string()));
    lifecycle.advance(PipelineState::Done);
    let report = report?;

    let stats = ProcessStats {
        read,
        written: report.written,
        encode_failures: report.failures,
    };
    debug!(
        "pipeline: read={} written={} encode_failures={}",
        stats.read, stats.written, stats.encode_failures
    );

    if let Some(e) = worker_failure.or(decode_error).or(report.first_error) {
        return Err(e);
    }
    Ok(stats)
}

fn read_input<D: Decoder>(
    mut decoder: D,
    input: Sender<D::Item>,
) -> (u64, Option<ProcessingError>) {
    let mut read = 0u64;
    loop {
        match decoder.decode_next() {
            Ok(Some(item)) => {
                if input.blocking_send(item).is_err() {
                    warn!("pipeline: every worker has exited, stopping input");
                    return (read, None);
                }
                read += 1;
            }
            Ok(None) => return (read, None),
            Err(e) => {
                error!("pipeline: input failed after {} item(s): {}", read, e);
                return (read, Some(e));
            }
        }
    }
}

async fn run_worker<I, W>(
    index: usize,
    mut worker: W,
    input: Arc<Mutex<Receiver<I>>>,
    output: Sender<W::Output>,
) -> u64
where
    I: Send + 'static,
    W: Worker<I>,
{
    trace!("worker {} started", index);
    let mut handled = 0u64;
    loop {
        let item = {
            let mut rx = input.lock().await;
            rx.recv().await
        };
        let Some(item) = item else {
            break;
        };

        let result = worker.handle(item).await;
        handled += 1;
        if output.send(result).await.is_err() {
            error!("worker {}: output queue closed, result dropped", index);
            break;
        }
    }
    trace!("worker {} finished", index);
    handled
}

fn drain_output<E: Encoder>(mut encoder: E, mut output: Receiver<E::Item>) -> SinkReport {
    let mut report = SinkReport {
        written: 0,
        failures: 0,
        first_error: None,
    };
    while let Some(result) = output.blocking_recv() {
        match encoder.encode(result) {
            Ok(()) => report.written += 1,
            Err(e) => {
                error!("pipeline: failed to encode result: {}", e);
                report.failures += 1;
                report.first_error.get_or_insert(e);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::types::{worker_fn, IterDecoder, VecEncoder};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;
    use tokio_test::assert_ok;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    async fn run_doubling(inputs: Vec<u64>, workers: usize) -> (ProcessStats, Vec<u64>) {
        let (encoder, results) = VecEncoder::with_handle();
        let stats = process(IterDecoder::new(inputs), encoder, workers, |_| {
            worker_fn(|x: u64| async move { x * 2 })
        })
        .await
        .expect("pipeline run");
        let mut out = results.lock().unwrap().clone();
        out.sort_unstable();
        (stats, out)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn doubles_every_input_exactly_once() {
        init_logger();
        let expected: Vec<u64> = (0..100).map(|x| x * 2).collect();
        for _ in 0..25 {
            let (stats, out) = run_doubling((0..100).collect(), 4).await;
            assert_eq!(out, expected);
            assert_eq!(stats.read, 100);
            assert_eq!(stats.written, 100);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn result_count_matches_input_for_any_pool_size() {
        for workers in [1, 2, 3, 8, 17] {
            for len in [0u64, 1, 5, 100, 257] {
                let (stats, out) = run_doubling((0..len).collect(), workers).await;
                assert_eq!(out.len() as u64, len, "workers={} len={}", workers, len);
                assert_eq!(stats.written, len);
                let distinct: HashSet<_> = out.iter().collect();
                assert_eq!(distinct.len() as u64, len);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn handler_errors_are_carried_as_data() {
        let (encoder, results) = VecEncoder::with_handle();
        let stats = process(IterDecoder::new(0..50u32), encoder, 3, |_| {
            worker_fn(|x: u32| async move {
                let error = (x % 2 == 1).then(|| format!("odd input {}", x));
                (x, error)
            })
        })
        .await;
        assert_ok!(stats);

        let results = results.lock().unwrap();
        assert_eq!(results.len(), 50);
        let seen: HashSet<u32> = results.iter().map(|(x, _)| *x).collect();
        assert_eq!(seen.len(), 50);
        for (x, error) in results.iter() {
            assert_eq!(error.is_some(), x % 2 == 1, "input {}", x);
        }
    }

    #[tokio::test]
    async fn make_worker_runs_once_per_index() {
        let mut built = Vec::new();
        let (encoder, results) = VecEncoder::with_handle();
        process(IterDecoder::new(0..10usize), encoder, 5, |index| {
            built.push(index);
            worker_fn(move |x: usize| async move { (index, x) })
        })
        .await
        .unwrap();

        assert_eq!(built, vec![0, 1, 2, 3, 4]);
        let results = results.lock().unwrap();
        assert_eq!(results.len(), 10);
        assert!(results.iter().all(|(index, _)| *index < 5));
    }

    #[tokio::test]
    async fn zero_workers_is_rejected() {
        let (encoder, _) = VecEncoder::<u8>::with_handle();
        let res = process(IterDecoder::new(0..3u8), encoder, 0, |_| {
            worker_fn(|x: u8| async move { x })
        })
        .await;
        assert!(matches!(res, Err(ProcessingError::NoWorkers)));
    }

    struct FailingDecoder {
        next: u32,
        fail_at: u32,
    }

    impl Decoder for FailingDecoder {
        type Item = u32;

        fn decode_next(&mut self) -> Result<Option<u32>, ProcessingError> {
            if self.next == self.fail_at {
                return Err(ProcessingError::Decode("truncated input".to_string()));
            }
            self.next += 1;
            Ok(Some(self.next - 1))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn decode_error_still_drains_in_flight_work() {
        let (encoder, results) = VecEncoder::with_handle();
        let res = process(
            FailingDecoder {
                next: 0,
                fail_at: 30,
            },
            encoder,
            4,
            |_| {
                worker_fn(|x: u32| async move {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    x
                })
            },
        )
        .await;

        assert!(matches!(res, Err(ProcessingError::Decode(_))));
        let mut results = results.lock().unwrap().clone();
        results.sort_unstable();
        assert_eq!(results, (0..30).collect::<Vec<_>>());
    }

    struct PickyEncoder {
        accepted: Arc<std::sync::Mutex<Vec<u32>>>,
    }

    impl Encoder for PickyEncoder {
        type Item = u32;

        fn encode(&mut self, item: u32) -> Result<(), ProcessingError> {
            if item % 10 == 0 {
                return Err(ProcessingError::Encode(format!("cannot write {}", item)));
            }
            self.accepted.lock().unwrap().push(item);
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn encode_failures_do_not_stop_the_sink() {
        let accepted = Arc::new(std::sync::Mutex::new(Vec::new()));
        let encoder = PickyEncoder {
            accepted: Arc::clone(&accepted),
        };
        let res = process(IterDecoder::new(0..100u32), encoder, 4, |_| {
            worker_fn(|x: u32| async move { x })
        })
        .await;

        assert!(matches!(res, Err(ProcessingError::Encode(_))));
        assert_eq!(accepted.lock().unwrap().len(), 90);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn worker_panic_is_reported_not_swallowed() {
        let (encoder, results) = VecEncoder::with_handle();
        let run = process(IterDecoder::new(0..40u32), encoder, 2, |_| {
            worker_fn(|x: u32| async move {
                if x == 7 {
                    panic!("handler bug");
                }
                x
            })
        });

        let res = tokio::time::timeout(Duration::from_secs(10), run)
            .await
            .expect("pipeline must not hang when a worker dies");
        assert!(matches!(res, Err(ProcessingError::WorkerFailed { .. })));
        // only the item being handled is lost; the surviving worker drains the rest
        let results = results.lock().unwrap();
        assert_eq!(results.len(), 39);
        assert!(!results.contains(&7));
    }

    /// Hands out the next item only once a worker has finished the previous one.
    struct LockstepDecoder {
        next: u32,
        total: u32,
        progress: std::sync::mpsc::Receiver<u32>,
    }

    impl Decoder for LockstepDecoder {
        type Item = u32;

        fn decode_next(&mut self) -> Result<Option<u32>, ProcessingError> {
            if self.next == self.total {
                return Ok(None);
            }
            if self.next > 0 {
                self.progress
                    .recv_timeout(Duration::from_millis(500))
                    .map_err(|_| ProcessingError::Decode("no worker made progress".to_string()))?;
            }
            self.next += 1;
            Ok(Some(self.next - 1))
        }
    }

    #[tokio::test]
    async fn blocking_source_does_not_starve_workers() {
        let (progress_tx, progress_rx) = std::sync::mpsc::channel();
        let decoder = LockstepDecoder {
            next: 0,
            total: 10,
            progress: progress_rx,
        };
        let (encoder, results) = VecEncoder::with_handle();

        let stats = process(decoder, encoder, 2, |_| {
            let progress = progress_tx.clone();
            worker_fn(move |x: u32| {
                let progress = progress.clone();
                async move {
                    let _ = progress.send(x);
                    x
                }
            })
        })
        .await
        .unwrap();

        assert_eq!(stats.read, 10);
        let mut results = results.lock().unwrap().clone();
        results.sort_unstable();
        assert_eq!(results, (0..10).collect::<Vec<_>>());
    }

    struct CountingDecoder {
        calls: Arc<AtomicUsize>,
        remaining: usize,
    }

    impl Decoder for CountingDecoder {
        type Item = usize;

        fn decode_next(&mut self) -> Result<Option<usize>, ProcessingError> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(self.calls.fetch_add(1, Ordering::SeqCst)))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_workers_throttle_input() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Semaphore::new(0));
        let (encoder, results) = VecEncoder::with_handle();

        let decoder = CountingDecoder {
            calls: Arc::clone(&calls),
            remaining: 200,
        };
        let worker_gate = Arc::clone(&gate);
        let run = tokio::spawn(process(decoder, encoder, 1, move |_| {
            let gate = Arc::clone(&worker_gate);
            worker_fn(move |x: usize| {
                let gate = Arc::clone(&gate);
                async move {
                    let _permit = gate.acquire().await.expect("gate open");
                    x
                }
            })
        }));

        tokio::time::sleep(Duration::from_millis(100)).await;
        // one item held by the worker, QUEUE_FACTOR queued, one blocked in send
        assert!(calls.load(Ordering::SeqCst) <= 2 + QUEUE_FACTOR);

        gate.add_permits(1);
        let stats = run.await.unwrap().unwrap();
        assert_eq!(stats.written, 200);
        assert_eq!(results.lock().unwrap().len(), 200);
    }
}
