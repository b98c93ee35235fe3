//! This crate provides the outbound half of the cloud connector: it publishes control and data
//! messages to individually addressed clients over an MQTT-style publish/subscribe transport.
//!
//! A [`publisher::ReceptorProxy`] is bound to one client and a connected [`connection::Transport`].
//! Every send mints a fresh [`message::MessageId`] that is returned to the caller before the
//! broker acknowledges the publish.
pub mod codec;
pub mod connection;
pub mod error;
pub mod logging;
pub mod message;
pub mod publisher;
pub mod settings;
pub mod topic;
