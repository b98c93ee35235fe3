//!
//! This module defines the transport seam the proxy publishes through.
//!
//! Establishing the broker session (TLS, token authentication, reconnects) is the host's job;
//! the proxy only needs something that accepts a publish and later reports its outcome.
//!
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

/// A connected publish/subscribe session.
///
/// Implementations must be safe to share between concurrent callers.
pub trait Transport: Send + Sync {
    /// Submit a publish without waiting for the broker.
    ///
    /// The returned token settles once the broker acknowledged (or rejected) the publish.
    fn publish(&self, topic: &str, qos: QoS, retain: bool, payload: Bytes) -> PublishToken;
}

/// Deferred outcome of a single publish.
#[derive(Debug)]
pub struct PublishToken {
    outcome: oneshot::Receiver<Result<(), ClientError>>,
}

/// Settles the [`PublishToken`] it was created with.
#[derive(Debug)]
pub struct PublishCompleter {
    tx: oneshot::Sender<Result<(), ClientError>>,
}

impl PublishToken {
    pub fn pending() -> (PublishCompleter, PublishToken) {
        let (tx, rx) = oneshot::channel();
        (PublishCompleter { tx }, PublishToken { outcome: rx })
    }

    pub fn ready(result: Result<(), ClientError>) -> Self {
        let (completer, token) = PublishToken::pending();
        completer.complete(result);
        token
    }

    /// Wait for the broker's verdict.
    ///
    /// # Errors
    /// Raise ClientError::ConnectionReset if the transport dropped the publish without settling it.
    pub async fn wait(self) -> Result<(), ClientError> {
        match self.outcome.await {
            Ok(result) => result,
            Err(_) => Err(ClientError::ConnectionReset),
        }
    }
}

impl PublishCompleter {
    pub fn complete(self, result: Result<(), ClientError>) {
        // The receiving token may already be gone.
        let _ = self.tx.send(result);
    }
}

/// A publish as observed by the receiving end of a [`ChannelTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub topic: String,
    pub qos: QoS,
    pub retain: bool,
    pub payload: Bytes,
}

/// In-process transport that hands every publish to a bounded channel.
///
/// A publish is acknowledged as soon as it is queued.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<Publication>,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Publication>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ChannelTransport { tx }, rx)
    }
}

impl Transport for ChannelTransport {
    fn publish(&self, topic: &str, qos: QoS, retain: bool, payload: Bytes) -> PublishToken {
        let publication = Publication {
            topic: topic.to_owned(),
            qos,
            retain,
            payload,
        };
        let result = match self.tx.try_send(publication) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(p)) => Err(ClientError::Publish(format!(
                "Outbound queue is full, dropped publish to `{}`",
                p.topic
            ))),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(ClientError::ConnectionReset),
        };
        PublishToken::ready(result)
    }
}
