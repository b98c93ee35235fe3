//!
//! Envelopes travel as JSON documents; the wire payload is exactly the serialized envelope.
//!
use bytes::{Buf, Bytes};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ClientError;

pub fn encode<T: Serialize>(message: &T) -> Result<Bytes, ClientError> {
    let buf = serde_json::to_vec(message)?;
    Ok(Bytes::from(buf))
}

pub fn decode<T: DeserializeOwned>(payload: &Bytes) -> Result<T, ClientError> {
    serde_json::from_reader(payload.clone().reader()).map_err(|e| {
        ClientError::InvalidFrame(format!("Payload is not a valid envelope: {}", e))
    })
}
