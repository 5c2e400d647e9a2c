use log::debug;
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::api::error::{ApiError, Result};
use crate::api::models::{
    ActionResult, Agent, AiReply, ConversationDetail, ConversationSummary, Customer, Message,
    ReplyRequest, WidgetHistory, WidgetMessageRequest,
};

/// REST client for the support backend. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_http(HttpClient::new(), base_url)
    }

    pub fn with_http(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_auth(req: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(t) => req.header("Authorization", format!("Bearer {}", t)),
            None => req,
        }
    }

    /// Builds the push channel URL for `path`, swapping the http scheme for ws.
    pub fn push_url(&self, path: &str) -> Result<Url> {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            format!("ws://{}", self.base_url)
        };
        Ok(Url::parse(&format!("{}{}", ws_base, path))?)
    }

    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            let detail = body
                .get("detail")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            return Err(ApiError::Status { status: status.as_u16(), detail });
        }
        Ok(resp)
    }

    async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let resp = Self::check(resp).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T> {
        debug!("[api] GET {}", path);
        let req = Self::with_auth(self.http.get(self.endpoint(path)), token);
        Self::read_json(req.send().await?).await
    }

    pub async fn me(&self, token: &str) -> Result<Agent> {
        self.get_json("/auth/me", Some(token)).await
    }

    /// Lists conversations, optionally filtered by channel. `"all"` means no filter.
    pub async fn conversations(&self, token: &str, channel: Option<&str>) -> Result<Vec<ConversationSummary>> {
        let mut req = Self::with_auth(self.http.get(self.endpoint("/conversations")), Some(token));
        if let Some(ch) = channel.filter(|c| !c.is_empty() && *c != "all") {
            req = req.query(&[("channel", ch)]);
        }
        debug!("[api] GET /conversations channel={:?}", channel);
        Self::read_json(req.send().await?).await
    }

    pub async fn conversation(&self, token: &str, id: i64) -> Result<ConversationDetail> {
        self.get_json(&format!("/conversations/{}", id), Some(token)).await
    }

    pub async fn delete_conversation(&self, token: &str, id: i64) -> Result<()> {
        let path = format!("/conversations/{}", id);
        debug!("[api] DELETE {}", path);
        let req = Self::with_auth(self.http.delete(self.endpoint(&path)), Some(token));
        Self::check(req.send().await?).await?;
        Ok(())
    }

    pub async fn messages(&self, token: &str, conversation_id: i64) -> Result<Vec<Message>> {
        self.get_json(&format!("/conversations/{}/messages", conversation_id), Some(token))
            .await
    }

    pub async fn connect_conversation(&self, token: &str, id: i64) -> Result<ActionResult> {
        self.post_action(&format!("/conversations/{}/connect", id), token).await
    }

    pub async fn end_conversation(&self, token: &str, id: i64) -> Result<ActionResult> {
        self.post_action(&format!("/conversations/{}/end", id), token).await
    }

    async fn post_action(&self, path: &str, token: &str) -> Result<ActionResult> {
        debug!("[api] POST {}", path);
        let req = Self::with_auth(self.http.post(self.endpoint(path)), Some(token));
        let resp = Self::check(req.send().await?).await?;
        // Some deployments answer these with an empty body.
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Ok(ActionResult::default());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn customer(&self, token: &str, id: i64) -> Result<Customer> {
        self.get_json(&format!("/customers/{}", id), Some(token)).await
    }

    pub async fn update_customer_memo(&self, token: &str, id: i64, memo: &str) -> Result<()> {
        let path = format!("/customers/{}", id);
        debug!("[api] PATCH {}", path);
        let body = serde_json::json!({ "memo": memo });
        let req = Self::with_auth(self.http.patch(self.endpoint(&path)), Some(token)).json(&body);
        Self::check(req.send().await?).await?;
        Ok(())
    }

    pub async fn reply(&self, token: &str, conversation_id: i64, message: &str) -> Result<Value> {
        debug!("[api] POST /api/reply conversation={}", conversation_id);
        let body = ReplyRequest { conversation_id, message };
        let req = Self::with_auth(self.http.post(self.endpoint("/api/reply")), Some(token)).json(&body);
        Self::read_json(req.send().await?).await
    }

    pub async fn ai_chat(&self, token: &str, message: &str) -> Result<AiReply> {
        debug!("[api] POST /api/ai/chat");
        let body = serde_json::json!({ "message": message });
        let req = Self::with_auth(self.http.post(self.endpoint("/api/ai/chat")), Some(token)).json(&body);
        Self::read_json(req.send().await?).await
    }

    pub async fn widget_conversation(&self, customer_id: &str) -> Result<WidgetHistory> {
        self.get_json(&format!("/widget/conversation/{}", customer_id), None).await
    }

    pub async fn widget_message(&self, customer_id: &str, customer_name: &str, content: &str) -> Result<Value> {
        debug!("[api] POST /widget/message customer={}", customer_id);
        let body = WidgetMessageRequest {
            customer_external_id: customer_id,
            customer_name,
            content,
        };
        let req = self.http.post(self.endpoint("/widget/message")).json(&body);
        Self::read_json(req.send().await?).await
    }

    pub async fn users(&self, token: &str) -> Result<Vec<Agent>> {
        self.get_json("/users", Some(token)).await
    }
}
