//! Controllers for the three client surfaces. Each owns its state and talks to a
//! view trait, so the same logic drives the GTK windows and the recording views
//! used in tests.

pub mod ai_chat;
pub mod dashboard;
pub mod widget;

#[cfg(test)]
pub(crate) mod testing;

use crate::api::models::{Message, SenderType};
use crate::utils::format_clock;

#[derive(Debug, Clone, PartialEq)]
pub enum Avatar {
    Image(String),
    Text(String),
}

/// One rendered chat bubble.
#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub sender: SenderType,
    pub text: String,
    pub sender_name: Option<String>,
    pub avatar: Avatar,
    pub time: Option<String>,
}

impl Bubble {
    pub fn new(sender: SenderType, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            sender_name: None,
            avatar: avatar_for(sender, None),
            time: None,
        }
    }

    pub fn named(mut self, name: Option<&str>) -> Self {
        self.sender_name = name.filter(|n| !n.is_empty()).map(str::to_string);
        if !matches!(self.avatar, Avatar::Image(_)) {
            self.avatar = avatar_for(self.sender, self.sender_name.as_deref());
        }
        self
    }

    pub fn with_image(mut self, image: Option<&str>) -> Self {
        if let Some(src) = image.filter(|s| !s.is_empty()) {
            self.avatar = Avatar::Image(src.to_string());
        }
        self
    }

    pub fn at(mut self, timestamp: Option<&str>) -> Self {
        self.time = timestamp.and_then(format_clock);
        self
    }

    /// Bubble stamped with the current local time.
    pub fn now(mut self) -> Self {
        self.time = Some(chrono::Local::now().format("%H:%M").to_string());
        self
    }

    pub fn from_message(msg: &Message) -> Self {
        let name = msg
            .sender_name
            .as_deref()
            .unwrap_or(msg.sender_type.default_name());
        Bubble::new(msg.sender_type, msg.content.clone())
            .named(Some(name))
            .with_image(msg.profile_image.as_deref())
            .at(msg.created_at.as_deref())
    }
}

/// Runs the closure when dropped, including when the owning future is cancelled.
pub(crate) struct OnDrop<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> OnDrop<F> {
    pub(crate) fn new(f: F) -> Self {
        Self(Some(f))
    }
}

impl<F: FnOnce()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

fn avatar_for(sender: SenderType, name: Option<&str>) -> Avatar {
    if let Some(first) = name.and_then(|n| n.chars().next()) {
        return Avatar::Text(first.to_uppercase().collect());
    }
    let text = match sender {
        SenderType::Customer => "C",
        SenderType::Agent => "A",
        SenderType::Bot => "🤖",
        SenderType::System => "?",
    };
    Avatar::Text(text.to_string())
}

pub fn channel_icon(channel: Option<&str>) -> &'static str {
    match channel.unwrap_or_default() {
        "instagram" => "📷",
        "facebook" => "📘",
        "widget" => "🌐",
        _ => "💬",
    }
}

pub fn channel_label(channel: Option<&str>) -> String {
    match channel.unwrap_or_default() {
        "kakao" => "KakaoTalk".into(),
        "instagram" => "Instagram".into(),
        "facebook" => "Facebook".into(),
        "widget" => "Web widget".into(),
        "email" => "Email".into(),
        other => other.to_string(),
    }
}
