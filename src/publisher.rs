//!
//! This module defines the outbound proxy that addresses a single connected client.
//!
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

use crate::codec;
use crate::connection::{PublishToken, QoS, Transport};
use crate::error::ClientError;
use crate::message::{Command, ControlMessage, DataMessage, MessageId};
use crate::topic::TopicPurpose;

/// Upper bound of publishes whose acknowledgment is watched concurrently.
pub const DEFAULT_MAX_OUTSTANDING: usize = 1024;

/// Messages go out at-most-once and are never retained by the broker.
const PUBLISH_QOS: QoS = QoS::AtMostOnce;
const PUBLISH_RETAIN: bool = false;

/// A submitted publish whose outcome the caller chose to observe.
#[derive(Debug)]
pub struct Delivery {
    pub message_id: MessageId,
    pub token: PublishToken,
}

/// Watches publish acknowledgments in detached tasks, solely to log their outcome.
#[derive(Debug, Clone)]
struct Confirmations {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl Confirmations {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.min(Semaphore::MAX_PERMITS);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    fn outstanding(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    fn watch(&self, message_id: MessageId, topic: String, token: PublishToken) {
        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(
                    message_id = %message_id,
                    topic = %topic,
                    outstanding = self.capacity,
                    "Too many unacknowledged publishes, outcome will not be observed"
                );
                return;
            }
        };

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(
                    message_id = %message_id,
                    topic = %topic,
                    "No async runtime available, outcome will not be observed"
                );
                return;
            }
        };

        handle.spawn(async move {
            let _permit = permit;
            match token.wait().await {
                Ok(()) => {
                    tracing::debug!(message_id = %message_id, topic = %topic, "Publish acknowledged")
                }
                Err(e) => {
                    tracing::error!(message_id = %message_id, topic = %topic, error = %e, "Publish failed")
                }
            }
        });
    }
}

/// Outbound proxy bound to one client.
///
/// The proxy keeps no per-call state: it is safe to share between concurrent callers as long as
/// the transport is.
pub struct ReceptorProxy {
    client_id: String,
    transport: Arc<dyn Transport>,
    confirmations: Confirmations,
}

impl ReceptorProxy {
    pub fn new(client_id: &str, transport: Arc<dyn Transport>) -> Self {
        ReceptorProxy {
            client_id: client_id.to_owned(),
            transport,
            confirmations: Confirmations::new(DEFAULT_MAX_OUTSTANDING),
        }
    }

    /// Cap the number of fire-and-forget publishes whose outcome is logged at once.
    ///
    /// Caps above `Semaphore::MAX_PERMITS` are clamped to it.
    pub fn with_max_outstanding(mut self, max_outstanding: usize) -> Self {
        self.confirmations = Confirmations::new(max_outstanding);
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Number of fire-and-forget publishes still waiting for the broker.
    pub fn outstanding(&self) -> usize {
        self.confirmations.outstanding()
    }

    /// Deliver `payload` with `directive` to the client and return the message's correlation id.
    ///
    /// The id is returned once the publish has been submitted; a later publish failure is only
    /// logged. `directive` is not validated here.
    ///
    /// # Errors
    /// Raise ClientError::MessageId or ClientError::Serialization when the envelope cannot be
    /// built. Nothing is published in that case.
    pub fn send_message(
        &self,
        account: &str,
        recipient: &str,
        directive: &str,
        metadata: Value,
        payload: Value,
    ) -> Result<MessageId, ClientError> {
        let delivery = self.send_message_tracked(account, recipient, directive, metadata, payload)?;
        let topic = TopicPurpose::DataOutgoing.topic(&self.client_id);
        self.confirmations
            .watch(delivery.message_id, topic, delivery.token);
        Ok(delivery.message_id)
    }

    /// Like [`send_message`](Self::send_message), but hands the publish outcome to the caller.
    pub fn send_message_tracked(
        &self,
        account: &str,
        recipient: &str,
        directive: &str,
        metadata: Value,
        payload: Value,
    ) -> Result<Delivery, ClientError> {
        let message = DataMessage::new(directive, metadata, payload)?;
        tracing::debug!(
            message_id = %message.message_id,
            client_id = %self.client_id,
            account = %account,
            recipient = %recipient,
            directive = %directive,
            "Sending data message to connected client"
        );
        let token = self.publish(TopicPurpose::DataOutgoing, &message)?;
        Ok(Delivery {
            message_id: message.message_id,
            token,
        })
    }

    /// Ask the client to answer with a pong.
    ///
    /// A failed publish is logged and never reported here.
    pub fn ping(&self, account: &str, recipient: &str) -> Result<(), ClientError> {
        self.fire_command(account, recipient, Command::Ping)
    }

    /// Ask the client to terminate its session.
    ///
    /// A failed publish is logged and never reported here.
    pub fn close(&self, account: &str, recipient: &str) -> Result<(), ClientError> {
        self.fire_command(account, recipient, Command::Disconnect)
    }

    /// Publish `command` on the control topic and hand the outcome to the caller.
    pub fn send_command(&self, command: Command) -> Result<Delivery, ClientError> {
        let message = ControlMessage::new(command)?;
        tracing::debug!(
            message_id = %message.message_id,
            client_id = %self.client_id,
            command = %command,
            "Sending control message to connected client"
        );
        let token = self.publish(TopicPurpose::ControlOutgoing, &message)?;
        Ok(Delivery {
            message_id: message.message_id,
            token,
        })
    }

    fn fire_command(
        &self,
        account: &str,
        recipient: &str,
        command: Command,
    ) -> Result<(), ClientError> {
        tracing::debug!(
            client_id = %self.client_id,
            account = %account,
            recipient = %recipient,
            command = %command,
            "Dispatching control command"
        );
        let delivery = self.send_command(command)?;
        let topic = TopicPurpose::ControlOutgoing.topic(&self.client_id);
        self.confirmations
            .watch(delivery.message_id, topic, delivery.token);
        Ok(())
    }

    fn publish<T: Serialize>(
        &self,
        purpose: TopicPurpose,
        message: &T,
    ) -> Result<PublishToken, ClientError> {
        let payload: Bytes = codec::encode(message)?;
        let topic = purpose.topic(&self.client_id);
        tracing::trace!(topic = %topic, bytes = payload.len(), "Publishing");
        Ok(self
            .transport
            .publish(&topic, PUBLISH_QOS, PUBLISH_RETAIN, payload))
    }
}
