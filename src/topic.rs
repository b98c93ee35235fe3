//!
//! Topic addressing for outbound messages.
//!
//! Topics are derived from a client identifier by substituting it into a fixed template. The
//! template strings are shared with the device-side client and must not change.
//!

const CLIENT_ID_PLACEHOLDER: &str = "{client_id}";

pub const CONTROL_MESSAGE_OUTGOING_TOPIC: &str = "redhat/insights/{client_id}/control/in";

pub const DATA_MESSAGE_OUTGOING_TOPIC: &str = "redhat/insights/{client_id}/data/in";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicPurpose {
    ControlOutgoing,
    DataOutgoing,
}

impl TopicPurpose {
    pub fn template(&self) -> &'static str {
        match self {
            TopicPurpose::ControlOutgoing => CONTROL_MESSAGE_OUTGOING_TOPIC,
            TopicPurpose::DataOutgoing => DATA_MESSAGE_OUTGOING_TOPIC,
        }
    }

    /// Resolve the topic this purpose uses for `client_id`.
    pub fn topic(&self, client_id: &str) -> String {
        self.template().replacen(CLIENT_ID_PLACEHOLDER, client_id, 1)
    }
}

pub fn control_outgoing(client_id: &str) -> String {
    TopicPurpose::ControlOutgoing.topic(client_id)
}

pub fn data_outgoing(client_id: &str) -> String {
    TopicPurpose::DataOutgoing.topic(client_id)
}
