//! Single-conversation panel that relays the agent's text to the AI endpoint.

use log::{info, warn};
use std::rc::Rc;

use crate::api::ApiClient;
use crate::api::models::SenderType;
use crate::storage::LocalStore;
use crate::surfaces::{Bubble, OnDrop};

const FALLBACK_REPLY: &str = "Sorry, I could not generate an answer.";
const ERROR_REPLY: &str = "Sorry, a temporary error occurred. Please try again shortly.";

pub trait AiChatView {
    fn append_bubble(&self, bubble: &Bubble);
    fn set_typing(&self, visible: bool);
    fn clear_input(&self);
    fn set_send_enabled(&self, enabled: bool);
    fn alert(&self, message: &str);
    fn redirect_to_login(&self);
}

pub struct AiChatPanel<V: AiChatView> {
    api: ApiClient,
    store: Rc<LocalStore>,
    view: V,
}

impl<V: AiChatView> AiChatPanel<V> {
    pub fn new(api: ApiClient, store: Rc<LocalStore>, view: V) -> Self {
        Self { api, store, view }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub async fn send(&self, input: &str) {
        let text = input.trim();
        if text.is_empty() {
            return;
        }
        let Some(token) = self.store.token() else {
            self.view.alert("Please sign in first.");
            self.view.redirect_to_login();
            return;
        };

        self.view.append_bubble(&Bubble::new(SenderType::Agent, text).now());
        self.view.clear_input();
        self.view.set_send_enabled(false);
        let _enable = OnDrop::new(|| self.view.set_send_enabled(true));

        self.view.set_typing(true);
        let result = self.api.ai_chat(&token, text).await;
        self.view.set_typing(false);

        match result {
            Ok(reply) => {
                let answer = reply
                    .response
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| FALLBACK_REPLY.to_string());
                self.view.append_bubble(&Bubble::new(SenderType::Bot, answer).now());
            }
            Err(e) => {
                warn!("[ai-chat] request failed: {}", e);
                self.view.append_bubble(&Bubble::new(SenderType::System, ERROR_REPLY).now());
            }
        }
        info!("[ai-chat] exchange finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surfaces::testing::{Call, Recorder, signed_in_store};
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn panel(server: &MockServer, store: LocalStore) -> AiChatPanel<Recorder> {
        AiChatPanel::new(ApiClient::new(&server.uri()), Rc::new(store), Recorder::new())
    }

    #[tokio::test]
    async fn renders_outgoing_bubble_before_reply_arrives() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ai/chat"))
            .and(body_json(serde_json::json!({"message": "refund?"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": "Within 7 days."}))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        let panel = panel(&server, signed_in_store());

        tokio::join!(panel.send("  refund?  "), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let bubbles = panel.view().bubbles();
            assert_eq!(bubbles.len(), 1);
            assert_eq!(bubbles[0].text, "refund?");
            assert!(panel.view().has(&Call::SendEnabled(false)));
            assert!(panel.view().has(&Call::Typing(true)));
        });

        let bubbles = panel.view().bubbles();
        assert_eq!(bubbles.len(), 2);
        assert_eq!(bubbles[1].sender, SenderType::Bot);
        assert_eq!(bubbles[1].text, "Within 7 days.");
        assert_eq!(panel.view().last(), Some(Call::SendEnabled(true)));
    }

    #[tokio::test]
    async fn missing_response_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ai/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        let panel = panel(&server, signed_in_store());
        panel.send("hello").await;
        assert_eq!(panel.view().bubbles()[1].text, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn failure_renders_system_bubble_and_reenables() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ai/chat"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let panel = panel(&server, signed_in_store());
        panel.send("hello").await;

        let bubbles = panel.view().bubbles();
        assert_eq!(bubbles.len(), 2);
        assert_eq!(bubbles[1].sender, SenderType::System);
        assert!(panel.view().has(&Call::Typing(false)));
        assert_eq!(panel.view().last(), Some(Call::SendEnabled(true)));
    }

    #[tokio::test]
    async fn no_token_redirects_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ai/chat"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let panel = panel(&server, LocalStore::open_in_memory().unwrap());
        panel.send("hello").await;
        assert!(panel.view().has(&Call::Login));
        assert!(panel.view().bubbles().is_empty());
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let server = MockServer::start().await;
        let panel = panel(&server, signed_in_store());
        panel.send("   \n").await;
        assert!(panel.view().calls().is_empty());
    }
}
