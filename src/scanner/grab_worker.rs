//! Per-target grab handler.
//!
//! A [`GrabWorker`] connects to one target, records the attempt, and when a
//! [`Handshaker`] is configured hands the socket over for the TLS exchange.
//! Protocol failures never abort a grab: they are stored as the `error` of
//! the event for the step that failed, and the grab is still emitted.
//!
//! The TLS implementation lives outside this crate. It plugs in through
//! [`Handshaker`] and reports back a [`HandshakeOutcome`] summary.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, trace};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::target::ScanTarget;
use crate::encoding::connect::ConnectEvent;
use crate::encoding::event::{ConnectionEvent, EventError};
use crate::encoding::grab::Grab;
use crate::encoding::heartbleed::HeartbleedLog;
use crate::encoding::tls::ServerHandshake;
use crate::processing::types::Worker;

pub type HandshakeFuture<'a> = Pin<Box<dyn Future<Output = HandshakeOutcome> + Send + 'a>>;

/// What a handshake attempt produced. `log` holds every stage the server got
/// through, even when `error` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandshakeOutcome {
    pub log: ServerHandshake,
    pub error: Option<EventError>,
    pub heartbleed: Option<HeartbleedLog>,
}

/// Performs a TLS handshake over an established connection.
///
/// Implementations own any per-attempt timeout.
pub trait Handshaker: Send + Sync {
    fn handshake<'a>(&'a self, stream: TcpStream, server_name: &'a str) -> HandshakeFuture<'a>;
}

pub struct GrabWorker {
    index: usize,
    port: u16,
    connect_timeout: Duration,
    handshaker: Option<Arc<dyn Handshaker>>,
}

impl GrabWorker {
    pub fn new(index: usize, port: u16, connect_timeout: Duration) -> Self {
        Self {
            index,
            port,
            connect_timeout,
            handshaker: None,
        }
    }

    pub fn with_handshaker(mut self, handshaker: Arc<dyn Handshaker>) -> Self {
        self.handshaker = Some(handshaker);
        self
    }

    /// Scans one target and returns its grab. Never fails; see the module docs.
    pub async fn grab(&mut self, target: ScanTarget) -> Grab {
        debug!("[worker {}] grabbing {}:{}", self.index, target, self.port);
        let mut grab = Grab::new(target.host.clone(), target.domain.clone(), Utc::now());

        let stream = match self.connect(&target).await {
            Ok(stream) => {
                grab.push(ConnectEvent);
                stream
            }
            Err(e) => {
                trace!("[worker {}] {} connect failed: {}", self.index, target, e);
                grab.push_event(ConnectionEvent::failed(ConnectEvent, e));
                return grab;
            }
        };

        if let Some(handshaker) = &self.handshaker {
            let outcome = handshaker.handshake(stream, target.server_name()).await;
            if let Some(ref e) = outcome.error {
                trace!("[worker {}] {} handshake failed: {}", self.index, target, e);
            }
            grab.push_event(ConnectionEvent::with_error(outcome.log, outcome.error));
            if let Some(heartbleed) = outcome.heartbleed {
                grab.push(heartbleed);
            }
        }

        grab
    }

    async fn connect(&self, target: &ScanTarget) -> Result<TcpStream, EventError> {
        match timeout(
            self.connect_timeout,
            TcpStream::connect((target.host.as_str(), self.port)),
        )
        .await
        {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(EventError::from(e)),
            Err(_) => Err(EventError::new(format!(
                "connect timed out after {:?}",
                self.connect_timeout
            ))),
        }
    }
}

impl Worker<ScanTarget> for GrabWorker {
    type Output = Grab;

    fn handle(&mut self, target: ScanTarget) -> impl Future<Output = Grab> + Send {
        self.grab(target)
    }
}
