use serde::{Deserialize, Serialize};

use crate::api::models::Message;

/// Envelope pushed over `/ws/agent/{id}` and `/ws/widget/{id}`, keyed by `type`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    NewCustomerMessage {
        conversation_id: i64,
        #[serde(default)]
        message: Option<Message>,
        #[serde(default)]
        customer_name: Option<String>,
        #[serde(default)]
        profile_image: Option<String>,
    },
    AgentReplySent {
        conversation_id: i64,
        #[serde(default)]
        message: Option<Message>,
    },
    ConversationUpdated {
        conversation_id: i64,
    },
    AgentReply {
        message: Message,
    },
}

impl PushEvent {
    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn conversation_id(&self) -> Option<i64> {
        match self {
            PushEvent::NewCustomerMessage { conversation_id, .. }
            | PushEvent::AgentReplySent { conversation_id, .. }
            | PushEvent::ConversationUpdated { conversation_id } => Some(*conversation_id),
            PushEvent::AgentReply { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PushEvent::NewCustomerMessage { .. } => "new_customer_message",
            PushEvent::AgentReplySent { .. } => "agent_reply_sent",
            PushEvent::ConversationUpdated { .. } => "conversation_updated",
            PushEvent::AgentReply { .. } => "agent_reply",
        }
    }
}
