use chrono::{DateTime, Utc};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Generation time in milliseconds, bumped to stay unique within a queue.
    pub id: i64,
    pub title: String,
    pub body: String,
    pub conversation_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

/// In-memory, newest-first notification history for one dashboard session.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    items: VecDeque<Notification>,
    limit: Option<usize>,
    last_id: i64,
}

impl NotificationQueue {
    pub fn new(limit: Option<usize>) -> Self {
        Self { items: VecDeque::new(), limit, last_id: 0 }
    }

    pub fn push(&mut self, title: String, body: String, conversation_id: Option<i64>) -> &Notification {
        self.push_at(Utc::now(), title, body, conversation_id)
    }

    pub fn push_at(
        &mut self,
        now: DateTime<Utc>,
        title: String,
        body: String,
        conversation_id: Option<i64>,
    ) -> &Notification {
        let id = now.timestamp_millis().max(self.last_id + 1);
        self.last_id = id;
        self.items.push_front(Notification {
            id,
            title,
            body,
            conversation_id,
            timestamp: now,
            read: false,
        });
        if let Some(limit) = self.limit {
            self.items.truncate(limit.max(1));
        }
        &self.items[0]
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    pub fn mark_all_read(&mut self) {
        for n in self.items.iter_mut() {
            n.read = true;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, id: i64) -> Option<&Notification> {
        self.items.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.items.iter().cloned().collect()
    }
}
