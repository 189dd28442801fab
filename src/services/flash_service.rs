use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MAX_PENDING_PER_USER: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

/// One-shot messages kept for a user until their next read.
#[derive(Debug, Clone, Default)]
pub struct FlashStore {
    messages: Arc<Mutex<HashMap<Uuid, Vec<FlashMessage>>>>,
}

impl FlashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, user_id: Uuid, level: FlashLevel, message: impl Into<String>) {
        let mut messages = self.messages.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let pending = messages.entry(user_id).or_default();

        if pending.len() >= MAX_PENDING_PER_USER {
            pending.remove(0);
        }
        pending.push(FlashMessage {
            level,
            message: message.into(),
        });
    }

    pub fn success(&self, user_id: Uuid, message: impl Into<String>) {
        self.push(user_id, FlashLevel::Success, message);
    }

    pub fn error(&self, user_id: Uuid, message: impl Into<String>) {
        self.push(user_id, FlashLevel::Error, message);
    }

    /// Return and clear everything pending for `user_id`.
    pub fn take(&self, user_id: Uuid) -> Vec<FlashMessage> {
        let mut messages = self.messages.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        messages.remove(&user_id).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_take_drains_messages() {
        let store = FlashStore::new();
        let user = Uuid::new_v4();

        store.success(user, "Payment approved");
        store.error(user, "Payment already reviewed");

        let taken = store.take(user);
        assert_eq!(
            taken,
            vec![
                FlashMessage { level: FlashLevel::Success, message: "Payment approved".into() },
                FlashMessage { level: FlashLevel::Error, message: "Payment already reviewed".into() },
            ]
        );
        assert!(store.take(user).is_empty());
    }

    #[test]
    fn test_messages_are_per_user_and_bounded() {
        let store = FlashStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        for i in 0..(MAX_PENDING_PER_USER + 5) {
            store.push(a, FlashLevel::Info, format!("msg {}", i));
        }
        store.success(b, "hello");

        let taken = store.take(a);
        assert_eq!(taken.len(), MAX_PENDING_PER_USER);
        assert_eq!(taken[0].message, "msg 5");
        assert_eq!(store.take(b).len(), 1);
    }
}
