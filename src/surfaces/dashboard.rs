//! Agent dashboard: conversation list, message pane, customer panel and the
//! notification centre, kept live by the agent push channel.
//!
//! Push events are treated as invalidation signals. The list is always refetched
//! wholesale, and so is the pane of the selected conversation, except for bubbles
//! carried inline by the event. Every selection bumps a generation counter, and a
//! fetch whose generation is no longer current is dropped instead of rendered.

use log::{debug, error, info, warn};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::mpsc;

use crate::api::models::{Agent, ConversationSummary, Customer, Message, SenderType};
use crate::api::{ApiClient, ApiError, PushEvent};
use crate::app::AppConfig;
use crate::notify::{Notification, NotificationQueue};
use crate::push::{EventSink, PushChannel, ReconnectPolicy};
use crate::storage::LocalStore;
use crate::surfaces::{Avatar, Bubble, OnDrop, channel_icon, channel_label};
use crate::utils::preview;

const EMPTY_LIST: &str = "No conversations yet.";
const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationRow {
    pub id: i64,
    pub title: String,
    pub subtitle: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListEntry {
    Placeholder(String),
    Row(ConversationRow),
}

/// Customer panel contents. Missing values are rendered as `-`.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerCard {
    pub customer_id: i64,
    pub name: String,
    pub platform: String,
    pub external_id: String,
    pub phone: String,
    pub gender: String,
    pub age: String,
    pub tags: Vec<String>,
    pub memo: String,
    pub avatar: Avatar,
}

impl From<&Customer> for CustomerCard {
    fn from(c: &Customer) -> Self {
        let dash = |v: &Option<String>| {
            v.as_deref().filter(|s| !s.is_empty()).unwrap_or("-").to_string()
        };
        let name = c
            .name
            .as_deref()
            .or(c.external_id.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or("Customer")
            .to_string();
        let avatar = match c.profile_image.as_deref() {
            Some(src) if !src.is_empty() => Avatar::Image(src.to_string()),
            _ => Avatar::Text("👤".into()),
        };
        Self {
            customer_id: c.id,
            name,
            platform: channel_label(c.platform.as_deref()),
            external_id: dash(&c.external_id),
            phone: dash(&c.phone),
            gender: dash(&c.gender),
            age: dash(&c.age),
            tags: c.tag_list(),
            memo: c.memo.clone().unwrap_or_default(),
            avatar,
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait DashboardView {
    fn show_agent(&self, name: &str, role_label: &str);
    fn show_users(&self, users: &[Agent]);
    fn show_conversations(&self, entries: &[ListEntry]);
    fn mark_active(&self, conversation_id: Option<i64>);
    fn clear_messages(&self);
    fn append_message(&self, bubble: &Bubble);
    fn clear_draft(&self);
    fn set_send_enabled(&self, enabled: bool);
    fn show_customer(&self, card: &CustomerCard);
    fn hide_customer(&self);
    fn show_notifications(&self, items: &[Notification], unread: usize);
    fn set_notification_panel(&self, open: bool);
    fn desktop_notify(&self, notification: &Notification);
    fn alert(&self, message: &str);
    async fn confirm(&self, prompt: &str) -> bool;
    fn redirect_to_login(&self);
}

#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub reconnect: ReconnectPolicy,
    pub notification_limit: Option<usize>,
    pub desktop_notifications: bool,
}

impl From<&AppConfig> for DashboardSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            reconnect: cfg.dashboard_reconnect(),
            notification_limit: cfg.notification_limit,
            desktop_notifications: cfg.desktop_notifications,
        }
    }
}

#[derive(Default)]
struct State {
    channel: Option<String>,
    current: Option<i64>,
    rows: Vec<ConversationSummary>,
    customer_id: Option<i64>,
    notifications: NotificationQueue,
    panel_open: bool,
    me: Option<Agent>,
}

pub struct Dashboard<V: DashboardView> {
    api: ApiClient,
    store: Rc<LocalStore>,
    view: V,
    settings: DashboardSettings,
    state: RefCell<State>,
    generation: Cell<u64>,
    signed_out: Cell<bool>,
    push: RefCell<PushChannel>,
    events_tx: EventSink,
    events_rx: RefCell<Option<mpsc::UnboundedReceiver<PushEvent>>>,
}

impl<V: DashboardView> Dashboard<V> {
    pub fn new(api: ApiClient, store: Rc<LocalStore>, view: V, settings: DashboardSettings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let state = State {
            notifications: NotificationQueue::new(settings.notification_limit),
            ..State::default()
        };
        Self {
            api,
            store,
            view,
            settings,
            state: RefCell::new(state),
            generation: Cell::new(0),
            signed_out: Cell::new(false),
            push: RefCell::new(PushChannel::new("agent")),
            events_tx,
            events_rx: RefCell::new(Some(events_rx)),
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Hands the push event stream to the caller, which feeds it to [`Self::handle_event`].
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<PushEvent>> {
        self.events_rx.borrow_mut().take()
    }

    pub fn current_conversation(&self) -> Option<i64> {
        self.state.borrow().current
    }

    pub fn channel(&self) -> Option<String> {
        self.state.borrow().channel.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state.borrow().notifications.snapshot()
    }

    pub fn unread_count(&self) -> usize {
        self.state.borrow().notifications.unread_count()
    }

    /// `None` once signed out; the login redirect happens at most once per dashboard.
    fn require_token(&self) -> Option<String> {
        if self.signed_out.get() {
            return None;
        }
        let token = self.store.token();
        if token.is_none() {
            warn!("[dashboard] no stored token, redirecting to login");
            self.logout();
        }
        token
    }

    pub fn is_signed_out(&self) -> bool {
        self.signed_out.get()
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.get() != generation
    }

    fn next_generation(&self) -> u64 {
        let next = self.generation.get() + 1;
        self.generation.set(next);
        next
    }

    /// Logs the failure and signs out when the backend rejected the credential.
    fn report(&self, context: &str, err: &ApiError) {
        warn!("[dashboard] {} failed: {}", context, err);
        if matches!(err, ApiError::Unauthorized) {
            self.logout();
        }
    }

    fn own_agent_id(&self) -> Option<i64> {
        self.store.agent_id().and_then(|id| id.parse().ok())
    }

    /// Verifies the session and brings the dashboard up. Returns `false` when the
    /// user was sent back to login.
    pub async fn init(&self) -> bool {
        let Some(token) = self.require_token() else {
            return false;
        };
        let me = match self.api.me(&token).await {
            Ok(me) => me,
            Err(e) => {
                warn!("[dashboard] session check failed: {}", e);
                self.logout();
                return false;
            }
        };
        info!("[dashboard] signed in as {} ({})", me.display_name(), me.role);
        let role_label = if me.is_admin() { "Admin" } else { "Agent" };
        self.view.show_agent(me.display_name(), role_label);
        let is_admin = me.is_admin();
        self.state.borrow_mut().me = Some(me);

        self.start_push();
        self.load_conversations().await;
        if is_admin {
            self.load_users().await;
        }
        true
    }

    /// Opens the agent push channel. Must run inside the tokio runtime context.
    pub fn start_push(&self) {
        let Some(agent_id) = self.store.agent_id() else {
            error!("[dashboard] no agent id stored, push channel not started");
            return;
        };
        match self.api.push_url(&format!("/ws/agent/{}", agent_id)) {
            Ok(url) => self
                .push
                .borrow_mut()
                .connect(url, self.settings.reconnect, self.events_tx.clone()),
            Err(e) => error!("[dashboard] bad push url: {}", e),
        }
    }

    pub fn logout(&self) {
        if self.signed_out.replace(true) {
            return;
        }
        if let Err(e) = self.store.clear_credentials() {
            warn!("[dashboard] failed to clear credentials: {}", e);
        }
        self.push.borrow_mut().disconnect();
        self.view.redirect_to_login();
    }

    pub async fn load_users(&self) {
        let Some(token) = self.require_token() else { return };
        match self.api.users(&token).await {
            Ok(users) => self.view.show_users(&users),
            Err(e) => self.report("loading users", &e),
        }
    }

    pub async fn load_conversations(&self) {
        let Some(token) = self.require_token() else { return };
        let channel = self.channel();
        match self.api.conversations(&token, channel.as_deref()).await {
            Ok(rows) => {
                debug!("[dashboard] {} conversations", rows.len());
                self.state.borrow_mut().rows = rows;
                self.render_list();
            }
            Err(e) => self.report("loading conversations", &e),
        }
    }

    fn render_list(&self) {
        let state = self.state.borrow();
        let entries: Vec<ListEntry> = if state.rows.is_empty() {
            vec![ListEntry::Placeholder(EMPTY_LIST.to_string())]
        } else {
            state
                .rows
                .iter()
                .map(|conv| {
                    let channel = conv.channel_type.as_deref();
                    let name = conv
                        .profile_name
                        .clone()
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| format!("Guest #{}", conv.id));
                    let last = conv.last_message.as_deref().unwrap_or("No messages");
                    ListEntry::Row(ConversationRow {
                        id: conv.id,
                        title: format!("{} {}", channel_icon(channel), name),
                        subtitle: format!("[{}] {}", channel_label(channel), last),
                        active: state.current == Some(conv.id),
                    })
                })
                .collect()
        };
        drop(state);
        self.view.show_conversations(&entries);
    }

    pub async fn switch_channel(&self, channel: &str) {
        {
            let mut state = self.state.borrow_mut();
            state.channel = Some(channel.to_string()).filter(|c| c != "all");
            state.current = None;
            state.customer_id = None;
        }
        self.next_generation();
        self.view.clear_messages();
        self.view.hide_customer();
        self.load_conversations().await;
    }

    pub async fn select_conversation(&self, id: i64) {
        let generation = self.next_generation();
        {
            let mut state = self.state.borrow_mut();
            state.current = Some(id);
            state.customer_id = None;
        }
        self.view.mark_active(Some(id));
        self.view.clear_draft();
        self.view.hide_customer();

        if !self.render_messages(id, generation).await {
            return;
        }
        self.load_customer(id, generation).await;
    }

    /// Replaces the pane with a fresh fetch. Returns `false` if nothing was rendered.
    async fn render_messages(&self, id: i64, generation: u64) -> bool {
        let Some(token) = self.require_token() else { return false };
        let result = self.api.messages(&token, id).await;
        if self.is_stale(generation) {
            debug!("[dashboard] dropping stale messages for conversation {}", id);
            return false;
        }
        self.view.clear_messages();
        match result {
            Ok(messages) => {
                for msg in &messages {
                    self.view.append_message(&Bubble::from_message(msg));
                }
                true
            }
            Err(e) => {
                self.report("loading messages", &e);
                false
            }
        }
    }

    async fn load_customer(&self, conversation_id: i64, generation: u64) {
        let Some(token) = self.require_token() else { return };
        let detail = match self.api.conversation(&token, conversation_id).await {
            Ok(d) => d,
            Err(e) => {
                self.report("loading conversation detail", &e);
                return;
            }
        };
        let Some(customer_id) = detail.customer_id else {
            debug!("[dashboard] conversation {} has no customer", conversation_id);
            return;
        };
        let customer = self.api.customer(&token, customer_id).await;
        if self.is_stale(generation) {
            return;
        }
        match customer {
            Ok(customer) => {
                self.state.borrow_mut().customer_id = Some(customer.id);
                self.view.show_customer(&CustomerCard::from(&customer));
            }
            Err(e) => {
                self.report("loading customer", &e);
                self.view.hide_customer();
            }
        }
    }

    pub async fn delete_conversation(&self, id: i64) {
        if !self.view.confirm("Delete this conversation?").await {
            return;
        }
        let Some(token) = self.require_token() else { return };
        if let Err(e) = self.api.delete_conversation(&token, id).await {
            self.report("deleting conversation", &e);
            self.view.alert("Failed to delete the conversation.");
            return;
        }
        info!("[dashboard] deleted conversation {}", id);

        let was_active = self.current_conversation() == Some(id);
        if was_active {
            {
                let mut state = self.state.borrow_mut();
                state.current = None;
                state.customer_id = None;
            }
            self.next_generation();
            self.view.clear_messages();
            self.view.hide_customer();
        }
        self.load_conversations().await;
    }

    pub async fn send_message(&self, input: &str) {
        let text = input.trim();
        if text.is_empty() {
            return;
        }
        let Some(conversation_id) = self.current_conversation() else {
            self.view.alert("Select a conversation first.");
            return;
        };
        let Some(token) = self.require_token() else { return };

        let my_name = self.state.borrow().me.as_ref().map(|m| m.display_name().to_string());
        self.view.append_message(
            &Bubble::new(SenderType::Agent, text).named(my_name.as_deref()).now(),
        );
        self.view.clear_draft();
        self.view.set_send_enabled(false);
        let _enable = OnDrop::new(|| self.view.set_send_enabled(true));

        match self.api.reply(&token, conversation_id, text).await {
            Ok(_) => {
                debug!("[dashboard] reply sent to {}", conversation_id);
                self.load_conversations().await;
            }
            Err(e) => {
                self.report("sending reply", &e);
                let note = format!("Failed to send message: {}", e.user_message());
                self.view.append_message(&Bubble::new(SenderType::System, note).named(Some("System")).now());
            }
        }
    }

    pub async fn connect_conversation(&self) {
        let Some(id) = self.current_conversation() else {
            self.view.alert("Select a conversation first.");
            return;
        };
        let Some(token) = self.require_token() else { return };
        match self.api.connect_conversation(&token, id).await {
            Ok(result) => {
                let text = result
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Consultation connected.".to_string());
                self.append_system(&text);
                self.load_conversations().await;
                self.view.alert("Consultation connected.");
            }
            Err(e) => {
                self.report("connecting consultation", &e);
                self.view.alert("Failed to connect the consultation.");
            }
        }
    }

    pub async fn end_conversation(&self) {
        let Some(id) = self.current_conversation() else {
            self.view.alert("Select a conversation first.");
            return;
        };
        if !self.view.confirm("End this consultation?").await {
            return;
        }
        let Some(token) = self.require_token() else { return };
        match self.api.end_conversation(&token, id).await {
            Ok(_) => {
                self.append_system("Consultation ended. Thank you!");
                self.load_conversations().await;
                self.view.alert("Consultation ended.");
            }
            Err(e) => {
                self.report("ending consultation", &e);
                self.view.alert("Failed to end the consultation.");
            }
        }
    }

    fn append_system(&self, text: &str) {
        self.view.append_message(&Bubble::new(SenderType::System, text).named(Some("System")).now());
    }

    pub async fn save_memo(&self, memo: &str) {
        let Some(customer_id) = self.state.borrow().customer_id else {
            self.view.alert("Customer information is not available.");
            return;
        };
        let Some(token) = self.require_token() else { return };
        match self.api.update_customer_memo(&token, customer_id, memo.trim()).await {
            Ok(()) => self.view.alert("Memo saved."),
            Err(e) => {
                self.report("saving memo", &e);
                self.view.alert("Failed to save the memo.");
            }
        }
    }

    pub async fn handle_event(&self, event: PushEvent) {
        debug!("[dashboard] push event {}", event.kind());
        let current = self.current_conversation();
        match event {
            PushEvent::NewCustomerMessage { conversation_id, message, customer_name, profile_image } => {
                let name = customer_name.filter(|n| !n.is_empty()).unwrap_or_else(|| "Customer".into());
                if current == Some(conversation_id) {
                    if let Some(msg) = message {
                        let bubble = Bubble::new(SenderType::Customer, msg.content)
                            .named(Some(name.as_str()))
                            .with_image(profile_image.as_deref())
                            .at(msg.created_at.as_deref());
                        self.view.append_message(&bubble);
                    }
                } else {
                    let body = message
                        .map(|m| m.content)
                        .filter(|c| !c.is_empty())
                        .unwrap_or_else(|| "New message arrived".into());
                    self.notify(format!("{}: new message", name), preview(&body, PREVIEW_CHARS), conversation_id);
                }
            }
            PushEvent::AgentReplySent { conversation_id, message } => {
                if current == Some(conversation_id) {
                    match message {
                        Some(msg) if msg.sender_type == SenderType::Agent && !self.is_own(&msg) => {
                            self.view.append_message(&Bubble::from_message(&msg));
                        }
                        Some(msg) if msg.sender_type == SenderType::Agent => {
                            debug!("[dashboard] skipping own reply echo")
                        }
                        Some(msg) => debug!("[dashboard] skipping reply from {:?} sender", msg.sender_type),
                        None => {}
                    }
                } else {
                    let (who, body) = match message {
                        Some(m) => (
                            m.sender_name.filter(|n| !n.is_empty()).unwrap_or_else(|| "Agent".into()),
                            m.content,
                        ),
                        None => ("Agent".into(), String::new()),
                    };
                    self.notify(format!("{} replied", who), preview(&body, PREVIEW_CHARS), conversation_id);
                }
            }
            PushEvent::ConversationUpdated { conversation_id } => {
                if current == Some(conversation_id) {
                    self.render_messages(conversation_id, self.generation.get()).await;
                } else {
                    self.notify(
                        "Conversation updated".into(),
                        format!("Conversation #{} was updated", conversation_id),
                        conversation_id,
                    );
                }
            }
            PushEvent::AgentReply { .. } => {
                debug!("[dashboard] ignoring widget-only event");
                return;
            }
        }
        if self.signed_out.get() {
            return;
        }
        self.load_conversations().await;
    }

    fn is_own(&self, msg: &Message) -> bool {
        msg.sender_id.is_some() && msg.sender_id == self.own_agent_id()
    }

    fn notify(&self, title: String, body: String, conversation_id: i64) {
        let notification = self
            .state
            .borrow_mut()
            .notifications
            .push(title, body, Some(conversation_id))
            .clone();
        info!("[dashboard] notification: {}", notification.title);
        self.render_notifications();
        if self.settings.desktop_notifications {
            self.view.desktop_notify(&notification);
        }
    }

    fn render_notifications(&self) {
        let (items, unread) = {
            let state = self.state.borrow();
            (state.notifications.snapshot(), state.notifications.unread_count())
        };
        self.view.show_notifications(&items, unread);
    }

    /// Opening the panel marks every record read.
    pub fn toggle_notification_panel(&self) {
        let open = !self.state.borrow().panel_open;
        if open {
            self.open_notification_panel();
        } else {
            self.close_notification_panel();
        }
    }

    pub fn open_notification_panel(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.panel_open = true;
            state.notifications.mark_all_read();
        }
        self.view.set_notification_panel(true);
        self.render_notifications();
    }

    pub fn close_notification_panel(&self) {
        self.state.borrow_mut().panel_open = false;
        self.view.set_notification_panel(false);
    }

    /// Jumps to the conversation a notification points at, through the normal selection path.
    pub async fn activate_notification(&self, notification_id: i64) {
        let target = self
            .state
            .borrow()
            .notifications
            .get(notification_id)
            .and_then(|n| n.conversation_id);
        let Some(conversation_id) = target else { return };
        self.close_notification_panel();
        self.select_conversation(conversation_id).await;
    }

    pub async fn clear_notifications(&self) {
        if !self.view.confirm("Delete all notifications?").await {
            return;
        }
        self.state.borrow_mut().notifications.clear();
        self.render_notifications();
    }
}
