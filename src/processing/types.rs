use std::future::Future;

use crate::error_handling::types::ProcessingError;

/// Source of input items for [`process`](super::pipeline::process).
///
/// `Ok(None)` signals normal end of input. Any error stops the read loop;
/// work already handed to the workers still completes.
pub trait Decoder {
    type Item;

    fn decode_next(&mut self) -> Result<Option<Self::Item>, ProcessingError>;
}

/// Sink for results. Called once per result, in the order results arrive.
pub trait Encoder: Send + 'static {
    type Item: Send + 'static;

    fn encode(&mut self, item: Self::Item) -> Result<(), ProcessingError>;
}

/// Per-worker handler. One instance is built per worker, so it may own
/// resources (sockets, buffers) that must not be shared.
pub trait Worker<I>: Send + 'static {
    type Output: Send + 'static;

    fn handle(&mut self, item: I) -> impl Future<Output = Self::Output> + Send;
}

/// Adapts an async closure into a [`Worker`]. See [`worker_fn`].
#[derive(Debug, Clone, Copy)]
pub struct FnWorker<F> {
    f: F,
}

pub fn worker_fn<F>(f: F) -> FnWorker<F> {
    FnWorker { f }
}

impl<I, O, F, Fut> Worker<I> for FnWorker<F>
where
    F: FnMut(I) -> Fut + Send + 'static,
    Fut: Future<Output = O> + Send,
    O: Send + 'static,
{
    type Output = O;

    fn handle(&mut self, item: I) -> impl Future<Output = O> + Send {
        (self.f)(item)
    }
}

/// Decoder over any iterator; never fails.
#[derive(Debug)]
pub struct IterDecoder<T> {
    inner: T,
}

impl<T: Iterator> IterDecoder<T> {
    pub fn new(inner: impl IntoIterator<IntoIter = T>) -> Self {
        Self {
            inner: inner.into_iter(),
        }
    }
}

impl<T: Iterator> Decoder for IterDecoder<T> {
    type Item = T::Item;

    fn decode_next(&mut self) -> Result<Option<T::Item>, ProcessingError> {
        Ok(self.inner.next())
    }
}

/// Encoder that keeps every result in memory.
#[derive(Debug)]
pub struct VecEncoder<T> {
    items: std::sync::Arc<std::sync::Mutex<Vec<T>>>,
}

impl<T> VecEncoder<T> {
    /// Returns the encoder and a handle to read the collected items afterwards.
    pub fn with_handle() -> (Self, std::sync::Arc<std::sync::Mutex<Vec<T>>>) {
        let items = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        (
            Self {
                items: std::sync::Arc::clone(&items),
            },
            items,
        )
    }
}

impl<T: Send + 'static> Encoder for VecEncoder<T> {
    type Item = T;

    fn encode(&mut self, item: T) -> Result<(), ProcessingError> {
        self.items
            .lock()
            .map_err(|e| ProcessingError::Encode(e.to_string()))?
            .push(item);
        Ok(())
    }
}
