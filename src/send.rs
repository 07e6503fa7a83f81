//! Optimistic send pipeline
//!
//! A submitted message is appended to the chat cache with PENDING status
//! before anything touches the network, so it is visible immediately. The
//! server ack flips it to SENT; an error leaves a FAILED entry in place for
//! user-initiated retry. Nothing retries automatically.

use crate::error::{Error, Result};
use crate::models::{ChatMessage, ChatType, FileRef, MessageStatus, MessageType};
use crate::network::{ChatApi, OutgoingMessage};
use crate::store::ChatStore;
use std::sync::Arc;

/// Prefix namespacing client-generated ids so they cannot collide with
/// server-assigned ones.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Group name used when a chat is created implicitly by the first send.
pub const DEFAULT_GROUP_NAME: &str = "untitled";

pub fn local_message_id() -> String {
    format!("{}{}", LOCAL_ID_PREFIX, uuid::Uuid::new_v4())
}

pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

/// Where a message goes: an existing chat, or recipients the viewer has no
/// chat with yet (the chat is created server-side before the send).
#[derive(Debug, Clone)]
pub enum SendTarget {
    Chat(String),
    Users(Vec<String>),
}

#[derive(Debug, Clone)]
pub enum OutgoingContent {
    Text(String),
    Image(FileRef),
    Document(FileRef),
}

pub struct Outbox {
    api: Arc<dyn ChatApi>,
    store: Arc<ChatStore>,
    sender_id: String,
}

impl Outbox {
    pub fn new(api: Arc<dyn ChatApi>, store: Arc<ChatStore>, sender_id: impl Into<String>) -> Self {
        Self {
            api,
            store,
            sender_id: sender_id.into(),
        }
    }

    /// Sends one message. Returns the server-confirmed message; on a send
    /// failure the pending entry is left FAILED in the store and the error
    /// is returned.
    pub async fn send(&self, target: SendTarget, content: OutgoingContent) -> Result<ChatMessage> {
        let chat_id = self.resolve_chat(target).await?;

        let local = self.build_local(&chat_id, &content);
        self.store.append_message(local.clone());

        self.deliver(local).await
    }

    /// Re-submits a FAILED message, re-entering PENDING.
    pub async fn retry(&self, chat_id: &str, message_id: &str) -> Result<ChatMessage> {
        let message = self
            .store
            .messages(chat_id)
            .into_iter()
            .find(|m| m.id == message_id && m.status == MessageStatus::Failed)
            .ok_or_else(|| {
                Error::SendFailed(format!("no failed message {} in chat {}", message_id, chat_id))
            })?;

        self.store
            .update_status(chat_id, message_id, MessageStatus::Pending);
        self.deliver(message).await
    }

    /// First message to a new set of recipients creates the chat first; if
    /// that fails, no message is ever queued.
    async fn resolve_chat(&self, target: SendTarget) -> Result<String> {
        match target {
            SendTarget::Chat(id) => Ok(id),
            SendTarget::Users(recipients) => {
                let chat_type = if recipients.len() > 1 {
                    ChatType::Group
                } else {
                    ChatType::Private
                };
                let group_name =
                    matches!(chat_type, ChatType::Group).then_some(DEFAULT_GROUP_NAME);

                let chat = self
                    .api
                    .create_chat(&recipients, chat_type, group_name)
                    .await
                    .map_err(|e| Error::ChatCreation(e.to_string()))?;

                self.store.upsert_chat(chat.clone());
                Ok(chat.id)
            }
        }
    }

    fn build_local(&self, chat_id: &str, content: &OutgoingContent) -> ChatMessage {
        let id = local_message_id();
        let now = chrono::Utc::now().timestamp_millis();
        match content {
            OutgoingContent::Text(text) => {
                ChatMessage::text(id, chat_id, &self.sender_id, text.clone(), now)
            }
            OutgoingContent::Image(file) => ChatMessage::attachment(
                id,
                chat_id,
                &self.sender_id,
                MessageType::Image,
                file.clone(),
                now,
            ),
            OutgoingContent::Document(file) => ChatMessage::attachment(
                id,
                chat_id,
                &self.sender_id,
                MessageType::File,
                file.clone(),
                now,
            ),
        }
    }

    async fn deliver(&self, local: ChatMessage) -> Result<ChatMessage> {
        let outgoing = OutgoingMessage {
            chat_id: local.chat_id.clone(),
            sender_id: local.sender_id.clone(),
            message_type: local.message_type,
            text: local.text.clone(),
            file: local.file.clone(),
        };

        match self.api.send_message(&outgoing).await {
            Ok(mut confirmed) => {
                confirmed.status = MessageStatus::Sent;
                self.store
                    .reconcile(&local.chat_id, &local.id, confirmed.clone());
                Ok(confirmed)
            }
            Err(e) => {
                log::warn!("send to chat {} failed: {}", local.chat_id, e);
                self.store
                    .update_status(&local.chat_id, &local.id, MessageStatus::Failed);
                Err(Error::SendFailed(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chat, ChatPage};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    #[derive(Default)]
    struct FakeApi {
        fail_send: AtomicBool,
        fail_create: AtomicBool,
        next_id: AtomicU32,
        created: Mutex<Vec<(Vec<String>, ChatType, Option<String>)>>,
        sent: Mutex<Vec<OutgoingMessage>>,
    }

    #[async_trait::async_trait]
    impl ChatApi for FakeApi {
        async fn list_chats(&self, page: u32, page_size: u32, _: Option<&str>) -> Result<ChatPage> {
            Ok(ChatPage {
                items: vec![],
                page,
                page_size,
                total: 0,
            })
        }

        async fn get_chat(&self, chat_id: &str) -> Result<Chat> {
            Err(Error::UnknownChat(chat_id.to_string()))
        }

        async fn create_chat(
            &self,
            user_ids: &[String],
            chat_type: ChatType,
            group_name: Option<&str>,
        ) -> Result<Chat> {
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(Error::Api {
                    status: 500,
                    message: "boom".into(),
                });
            }
            self.created.lock().push((
                user_ids.to_vec(),
                chat_type,
                group_name.map(String::from),
            ));
            Ok(Chat {
                id: "c-new".into(),
                chat_type,
                group: None,
                users: vec![],
                blocks: vec![],
                mutes: vec![],
                unseen_message_counts: vec![],
            })
        }

        async fn send_message(&self, outgoing: &OutgoingMessage) -> Result<ChatMessage> {
            if self.fail_send.load(Ordering::SeqCst) {
                return Err(Error::Http("connection reset".into()));
            }
            self.sent.lock().push(outgoing.clone());

            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            let mut confirmed = ChatMessage {
                id: format!("srv-{}", n),
                chat_id: outgoing.chat_id.clone(),
                sender_id: outgoing.sender_id.clone(),
                message_type: outgoing.message_type,
                text: outgoing.text.clone(),
                file: outgoing.file.clone(),
                file_url: None,
                status: MessageStatus::Sent,
                created_at: 1_700_000_000_000,
            };
            if confirmed.file.is_some() {
                confirmed.file_url = Some(format!("https://cdn.test/f{}", n));
            }
            Ok(confirmed)
        }
    }

    fn outbox(api: Arc<FakeApi>) -> (Outbox, Arc<ChatStore>) {
        let store = Arc::new(ChatStore::new());
        let outbox = Outbox::new(api, store.clone(), "u1");
        (outbox, store)
    }

    #[tokio::test]
    async fn test_text_send_transitions_to_sent() {
        let api = Arc::new(FakeApi::default());
        let (outbox, store) = outbox(api.clone());

        let confirmed = outbox
            .send(SendTarget::Chat("c1".into()), OutgoingContent::Text("hello".into()))
            .await
            .unwrap();

        assert_eq!(confirmed.status, MessageStatus::Sent);
        assert!(!is_local_id(&confirmed.id));

        let messages = store.messages("c1");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, confirmed.id);
        assert_eq!(messages[0].text.as_deref(), Some("hello"));
        assert_eq!(messages[0].chat_id, "c1");
        assert_eq!(api.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_send_keeps_the_optimistic_entry() {
        let api = Arc::new(FakeApi::default());
        api.fail_send.store(true, Ordering::SeqCst);
        let (outbox, store) = outbox(api);

        let err = outbox
            .send(SendTarget::Chat("c1".into()), OutgoingContent::Text("hi".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SendFailed(_)));

        // The optimistic entry survives the failure, FAILED in place.
        let messages = store.messages("c1");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].status, MessageStatus::Failed);
        assert!(is_local_id(&messages[0].id));
        assert!(messages[0].content_is_consistent());
    }

    #[tokio::test]
    async fn test_retry_resends_a_failed_message() {
        let api = Arc::new(FakeApi::default());
        api.fail_send.store(true, Ordering::SeqCst);
        let (outbox, store) = outbox(api.clone());

        outbox
            .send(SendTarget::Chat("c1".into()), OutgoingContent::Text("hi".into()))
            .await
            .unwrap_err();
        let local_id = store.messages("c1")[0].id.clone();

        api.fail_send.store(false, Ordering::SeqCst);
        let confirmed = outbox.retry("c1", &local_id).await.unwrap();

        let messages = store.messages("c1");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, confirmed.id);
        assert_eq!(messages[0].status, MessageStatus::Sent);

        // A message that never failed is not retryable.
        assert!(outbox.retry("c1", &confirmed.id).await.is_err());
    }

    #[tokio::test]
    async fn test_first_send_to_recipients_creates_a_group_chat() {
        let api = Arc::new(FakeApi::default());
        let (outbox, store) = outbox(api.clone());

        let confirmed = outbox
            .send(
                SendTarget::Users(vec!["u2".into(), "u3".into()]),
                OutgoingContent::Text("hello both".into()),
            )
            .await
            .unwrap();

        let created = api.created.lock();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].1, ChatType::Group);
        assert_eq!(created[0].2.as_deref(), Some(DEFAULT_GROUP_NAME));

        assert_eq!(confirmed.chat_id, "c-new");
        assert!(store.chat("c-new").is_some());
        assert_eq!(store.messages("c-new").len(), 1);
    }

    #[tokio::test]
    async fn test_single_recipient_creates_a_private_chat() {
        let api = Arc::new(FakeApi::default());
        let (outbox, _) = outbox(api.clone());

        outbox
            .send(
                SendTarget::Users(vec!["u2".into()]),
                OutgoingContent::Text("hello".into()),
            )
            .await
            .unwrap();

        let created = api.created.lock();
        assert_eq!(created[0].1, ChatType::Private);
        assert_eq!(created[0].2, None);
    }

    #[tokio::test]
    async fn test_chat_creation_failure_queues_nothing() {
        let api = Arc::new(FakeApi::default());
        api.fail_create.store(true, Ordering::SeqCst);
        let (outbox, store) = outbox(api.clone());

        let err = outbox
            .send(
                SendTarget::Users(vec!["u2".into(), "u3".into()]),
                OutgoingContent::Text("hello".into()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ChatCreation(_)));
        assert!(store.chats().is_empty());
        assert!(store.messages("c-new").is_empty());
        assert_eq!(api.sent.lock().len(), 0);
    }

    #[tokio::test]
    async fn test_attachment_send_carries_the_file() {
        let api = Arc::new(FakeApi::default());
        let (outbox, store) = outbox(api);

        let file = FileRef {
            uri: "file:///picked/cv.pdf".into(),
            mime_type: "application/pdf".into(),
            name: "cv.pdf".into(),
        };
        let confirmed = outbox
            .send(SendTarget::Chat("c1".into()), OutgoingContent::Document(file))
            .await
            .unwrap();

        assert_eq!(confirmed.message_type, MessageType::File);
        assert!(confirmed.file_url.is_some());

        let stored = &store.messages("c1")[0];
        assert_eq!(stored.file.as_ref().unwrap().name, "cv.pdf");
        assert!(stored.content_is_consistent());
    }
}
