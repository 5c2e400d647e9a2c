use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    Customer,
    Agent,
    Bot,
    System,
}

impl SenderType {
    /// Fallback display name used when the backend sends no `sender_name`.
    pub fn default_name(self) -> &'static str {
        match self {
            SenderType::Customer => "Customer",
            SenderType::Agent => "Agent",
            SenderType::Bot => "AI",
            SenderType::System => "System",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub content: String,
    pub sender_type: SenderType,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub sender_id: Option<i64>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

/// One row of `GET /conversations`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConversationSummary {
    pub id: i64,
    #[serde(default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub profile_name: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConversationDetail {
    pub id: i64,
    #[serde(default)]
    pub customer_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Customer {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

impl Customer {
    /// Splits the comma-separated tag string, dropping blanks.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Shape shared by `/auth/me` and each row of `/users`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Agent {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: String,
    #[serde(default)]
    pub is_active: bool,
}

impl Agent {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.email)
    }
}

/// Body returned by the connect/end conversation actions.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ActionResult {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AiReply {
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct WidgetHistory {
    #[serde(default)]
    pub exists: bool,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct ReplyRequest<'a> {
    pub conversation_id: i64,
    pub message: &'a str,
}

#[derive(Debug, Serialize)]
pub struct WidgetMessageRequest<'a> {
    pub customer_external_id: &'a str,
    pub customer_name: &'a str,
    pub content: &'a str,
}
