//! Floating chat for anonymous visitors. The only identity is a visitor id kept in
//! the local store; it keys both the push channel and every REST call.

use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::models::SenderType;
use crate::api::{ApiClient, PushEvent};
use crate::app::AppConfig;
use crate::push::{EventSink, PushChannel, ReconnectPolicy};
use crate::storage::{LocalStore, VISITOR_ID_KEY};
use crate::surfaces::{Bubble, OnDrop};

const AI_INFO: &str = "AI auto-reply is enabled.\n\n\
Simple questions are answered by the AI right away; \
anything more involved is picked up by an agent.\n\n\
Use the chat button to send us a message.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitorId(String);

impl VisitorId {
    /// Returns the stored visitor id, generating and persisting one on first use.
    pub fn load_or_create(store: &LocalStore) -> Self {
        if let Some(existing) = store.read(VISITOR_ID_KEY) {
            return Self(existing);
        }
        let id = format!("w_{}", Uuid::new_v4().simple());
        if let Err(e) = store.set(VISITOR_ID_KEY, &id) {
            warn!("[widget] could not persist visitor id: {}", e);
        }
        info!("[widget] new visitor {}", id);
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub trait WidgetView {
    fn set_window_open(&self, open: bool);
    fn append_bubble(&self, bubble: &Bubble);
    fn clear_input(&self);
    fn set_input_enabled(&self, enabled: bool);
    fn set_send_enabled(&self, enabled: bool);
    fn alert(&self, message: &str);
}

#[derive(Debug, Clone)]
pub struct WidgetSettings {
    pub reconnect: ReconnectPolicy,
    pub customer_name: String,
}

impl From<&AppConfig> for WidgetSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            reconnect: cfg.widget_reconnect(),
            customer_name: cfg.widget_customer_name.clone(),
        }
    }
}

pub struct Widget<V: WidgetView> {
    api: ApiClient,
    visitor: VisitorId,
    view: V,
    settings: WidgetSettings,
    history_loaded: Cell<bool>,
    push: RefCell<PushChannel>,
    events_tx: EventSink,
    events_rx: RefCell<Option<mpsc::UnboundedReceiver<PushEvent>>>,
}

impl<V: WidgetView> Widget<V> {
    pub fn new(api: ApiClient, store: &LocalStore, view: V, settings: WidgetSettings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            api,
            visitor: VisitorId::load_or_create(store),
            view,
            settings,
            history_loaded: Cell::new(false),
            push: RefCell::new(PushChannel::new("widget")),
            events_tx,
            events_rx: RefCell::new(Some(events_rx)),
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn visitor_id(&self) -> &str {
        self.visitor.as_str()
    }

    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<PushEvent>> {
        self.events_rx.borrow_mut().take()
    }

    /// Opens the visitor push channel. Must run inside the tokio runtime context.
    pub fn start_push(&self) {
        match self.api.push_url(&format!("/ws/widget/{}", self.visitor.as_str())) {
            Ok(url) => self
                .push
                .borrow_mut()
                .connect(url, self.settings.reconnect, self.events_tx.clone()),
            Err(e) => warn!("[widget] bad push url: {}", e),
        }
    }

    /// Shows the chat window. History is replayed once, before input is accepted.
    pub async fn open(&self) {
        self.view.set_window_open(true);
        if self.history_loaded.get() {
            return;
        }
        self.view.set_input_enabled(false);
        self.replay_history().await;
        self.history_loaded.set(true);
        self.view.set_input_enabled(true);
    }

    pub fn close(&self) {
        self.view.set_window_open(false);
    }

    pub fn show_ai_info(&self) {
        self.view.alert(AI_INFO);
    }

    async fn replay_history(&self) {
        match self.api.widget_conversation(self.visitor.as_str()).await {
            Ok(history) if history.exists => {
                debug!("[widget] replaying {} messages", history.messages.len());
                for msg in &history.messages {
                    let sender = if msg.sender_type == SenderType::Customer {
                        SenderType::Customer
                    } else {
                        SenderType::Agent
                    };
                    self.view.append_bubble(&Bubble::new(sender, msg.content.clone()));
                }
            }
            Ok(_) => debug!("[widget] no previous conversation"),
            Err(e) => warn!("[widget] failed to load previous messages: {}", e),
        }
    }

    pub async fn send(&self, input: &str) {
        let text = input.trim();
        if text.is_empty() {
            return;
        }
        self.view.append_bubble(&Bubble::new(SenderType::Customer, text));
        self.view.clear_input();
        self.view.set_send_enabled(false);
        let _enable = OnDrop::new(|| self.view.set_send_enabled(true));

        match self
            .api
            .widget_message(self.visitor.as_str(), &self.settings.customer_name, text)
            .await
        {
            Ok(_) => debug!("[widget] message delivered"),
            Err(e) => {
                warn!("[widget] send failed: {}", e);
                self.view
                    .append_bubble(&Bubble::new(SenderType::System, "Failed to send the message."));
            }
        }
    }

    pub fn handle_event(&self, event: PushEvent) {
        match event {
            PushEvent::AgentReply { message } => {
                self.view.append_bubble(&Bubble::new(SenderType::Agent, message.content));
            }
            other => debug!("[widget] ignoring {}", other.kind()),
        }
    }
}
