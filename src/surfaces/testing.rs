use std::cell::{Cell, RefCell};

use crate::api::models::Agent;
use crate::notify::Notification;
use crate::storage::LocalStore;
use crate::surfaces::Bubble;
use crate::surfaces::ai_chat::AiChatView;
use crate::surfaces::dashboard::{CustomerCard, DashboardView, ListEntry};
use crate::surfaces::widget::WidgetView;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Bubble(Bubble),
    Typing(bool),
    ClearInput,
    SendEnabled(bool),
    InputEnabled(bool),
    WindowOpen(bool),
    Alert(String),
    Confirm(String),
    Login,
    Agent(String, String),
    Users(usize),
    Conversations(Vec<ListEntry>),
    Active(Option<i64>),
    ClearMessages,
    ClearDraft,
    Customer(CustomerCard),
    HideCustomer,
    Notifications { total: usize, unread: usize },
    Panel(bool),
    Desktop(String),
}

/// View double that records every call in order.
pub struct Recorder {
    calls: RefCell<Vec<Call>>,
    confirm_answer: Cell<bool>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::answering(true)
    }

    pub fn answering(confirm: bool) -> Self {
        Self { calls: RefCell::new(Vec::new()), confirm_answer: Cell::new(confirm) }
    }

    pub fn set_confirm(&self, answer: bool) {
        self.confirm_answer.set(answer);
    }

    fn push(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn bubbles(&self) -> Vec<Bubble> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Bubble(b) => Some(b.clone()),
                _ => None,
            })
            .collect()
    }

    /// Bubbles rendered since the message pane was last cleared.
    pub fn pane(&self) -> Vec<Bubble> {
        let calls = self.calls.borrow();
        let start = calls
            .iter()
            .rposition(|c| *c == Call::ClearMessages)
            .map_or(0, |i| i + 1);
        calls[start..]
            .iter()
            .filter_map(|c| match c {
                Call::Bubble(b) => Some(b.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Alert(a) => Some(a.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_conversations(&self) -> Option<Vec<ListEntry>> {
        self.calls.borrow().iter().rev().find_map(|c| match c {
            Call::Conversations(entries) => Some(entries.clone()),
            _ => None,
        })
    }

    pub fn has(&self, call: &Call) -> bool {
        self.calls.borrow().iter().any(|c| c == call)
    }

    pub fn last(&self) -> Option<Call> {
        self.calls.borrow().last().cloned()
    }
}

/// Store pre-loaded with an agent session.
pub fn signed_in_store() -> LocalStore {
    let store = LocalStore::open_in_memory().unwrap();
    store.save_credentials("tok", 7, "agent").unwrap();
    store
}

impl AiChatView for Recorder {
    fn append_bubble(&self, bubble: &Bubble) {
        self.push(Call::Bubble(bubble.clone()));
    }
    fn set_typing(&self, visible: bool) {
        self.push(Call::Typing(visible));
    }
    fn clear_input(&self) {
        self.push(Call::ClearInput);
    }
    fn set_send_enabled(&self, enabled: bool) {
        self.push(Call::SendEnabled(enabled));
    }
    fn alert(&self, message: &str) {
        self.push(Call::Alert(message.to_string()));
    }
    fn redirect_to_login(&self) {
        self.push(Call::Login);
    }
}

impl WidgetView for Recorder {
    fn set_window_open(&self, open: bool) {
        self.push(Call::WindowOpen(open));
    }
    fn append_bubble(&self, bubble: &Bubble) {
        self.push(Call::Bubble(bubble.clone()));
    }
    fn clear_input(&self) {
        self.push(Call::ClearInput);
    }
    fn set_input_enabled(&self, enabled: bool) {
        self.push(Call::InputEnabled(enabled));
    }
    fn set_send_enabled(&self, enabled: bool) {
        self.push(Call::SendEnabled(enabled));
    }
    fn alert(&self, message: &str) {
        self.push(Call::Alert(message.to_string()));
    }
}

impl DashboardView for Recorder {
    fn show_agent(&self, name: &str, role_label: &str) {
        self.push(Call::Agent(name.to_string(), role_label.to_string()));
    }
    fn show_users(&self, users: &[Agent]) {
        self.push(Call::Users(users.len()));
    }
    fn show_conversations(&self, entries: &[ListEntry]) {
        self.push(Call::Conversations(entries.to_vec()));
    }
    fn mark_active(&self, conversation_id: Option<i64>) {
        self.push(Call::Active(conversation_id));
    }
    fn clear_messages(&self) {
        self.push(Call::ClearMessages);
    }
    fn append_message(&self, bubble: &Bubble) {
        self.push(Call::Bubble(bubble.clone()));
    }
    fn clear_draft(&self) {
        self.push(Call::ClearDraft);
    }
    fn set_send_enabled(&self, enabled: bool) {
        self.push(Call::SendEnabled(enabled));
    }
    fn show_customer(&self, card: &CustomerCard) {
        self.push(Call::Customer(card.clone()));
    }
    fn hide_customer(&self) {
        self.push(Call::HideCustomer);
    }
    fn show_notifications(&self, items: &[Notification], unread: usize) {
        self.push(Call::Notifications { total: items.len(), unread });
    }
    fn set_notification_panel(&self, open: bool) {
        self.push(Call::Panel(open));
    }
    fn desktop_notify(&self, notification: &Notification) {
        self.push(Call::Desktop(notification.title.clone()));
    }
    fn alert(&self, message: &str) {
        self.push(Call::Alert(message.to_string()));
    }
    async fn confirm(&self, prompt: &str) -> bool {
        self.push(Call::Confirm(prompt.to_string()));
        self.confirm_answer.get()
    }
    fn redirect_to_login(&self) {
        self.push(Call::Login);
    }
}
