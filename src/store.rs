//! Client-side chat cache
//!
//! In-memory read replica of server chat state, plus tentative local
//! messages awaiting confirmation. All writes go through the entry points
//! here; consumers subscribe to [`StoreEvent`]s instead of polling. Reads
//! hand out clones, so a reader never observes a half-applied write.

use crate::models::{Chat, ChatMessage, ChatPage, MessageStatus};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub enum StoreEvent {
    ChatUpserted { chat_id: String },
    MessageAppended { chat_id: String, message_id: String },
    MessageUpdated { chat_id: String, message_id: String },
}

#[derive(Default)]
struct Inner {
    chats: HashMap<String, Chat>,
    messages: HashMap<String, Vec<ChatMessage>>,
}

pub struct ChatStore {
    inner: RwLock<Inner>,
    events: broadcast::Sender<StoreEvent>,
}

impl ChatStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: RwLock::new(Inner::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    // ========================================================================
    // Chats
    // ========================================================================

    pub fn upsert_chat(&self, chat: Chat) {
        let chat_id = chat.id.clone();
        self.inner.write().chats.insert(chat_id.clone(), chat);
        self.emit(StoreEvent::ChatUpserted { chat_id });
    }

    pub fn merge_page(&self, page: &ChatPage) {
        for chat in &page.items {
            self.upsert_chat(chat.clone());
        }
    }

    pub fn chat(&self, chat_id: &str) -> Option<Chat> {
        self.inner.read().chats.get(chat_id).cloned()
    }

    pub fn chats(&self) -> Vec<Chat> {
        self.inner.read().chats.values().cloned().collect()
    }

    /// Zeroes the viewer-facing unseen tallies for a chat.
    pub fn mark_seen(&self, chat_id: &str) -> bool {
        let updated = {
            let mut inner = self.inner.write();
            match inner.chats.get_mut(chat_id) {
                Some(chat) => {
                    for tally in &mut chat.unseen_message_counts {
                        tally.count = 0;
                    }
                    true
                }
                None => false,
            }
        };
        if updated {
            self.emit(StoreEvent::ChatUpserted { chat_id: chat_id.to_string() });
        }
        updated
    }

    // ========================================================================
    // Messages
    // ========================================================================

    pub fn messages(&self, chat_id: &str) -> Vec<ChatMessage> {
        self.inner
            .read()
            .messages
            .get(chat_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Single indivisible append. A message whose id is already present is
    /// ignored, so replayed socket frames cannot duplicate entries.
    pub fn append_message(&self, message: ChatMessage) -> bool {
        let chat_id = message.chat_id.clone();
        let message_id = message.id.clone();
        {
            let mut inner = self.inner.write();
            let list = inner.messages.entry(chat_id.clone()).or_default();
            if list.iter().any(|m| m.id == message_id) {
                return false;
            }
            list.push(message);
        }
        self.emit(StoreEvent::MessageAppended { chat_id, message_id });
        true
    }

    pub fn update_status(
        &self,
        chat_id: &str,
        message_id: &str,
        status: MessageStatus,
    ) -> bool {
        let updated = {
            let mut inner = self.inner.write();
            inner
                .messages
                .get_mut(chat_id)
                .and_then(|list| list.iter_mut().find(|m| m.id == message_id))
                .map(|m| m.status = status)
                .is_some()
        };
        if updated {
            self.emit(StoreEvent::MessageUpdated {
                chat_id: chat_id.to_string(),
                message_id: message_id.to_string(),
            });
        }
        updated
    }

    /// Replaces a tentative local entry with the server-confirmed message,
    /// matched by its correlation id rather than overwritten blindly. The
    /// entry keeps its position in the list.
    pub fn reconcile(&self, chat_id: &str, local_id: &str, confirmed: ChatMessage) -> bool {
        let confirmed_id = confirmed.id.clone();
        let replaced = {
            let mut inner = self.inner.write();
            match inner.messages.get_mut(chat_id) {
                Some(list) => match list.iter().position(|m| m.id == local_id) {
                    Some(idx) => {
                        list[idx] = confirmed;
                        true
                    }
                    None => false,
                },
                None => false,
            }
        };
        if replaced {
            self.emit(StoreEvent::MessageUpdated {
                chat_id: chat_id.to_string(),
                message_id: confirmed_id,
            });
        }
        replaced
    }
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new()
    }
}
