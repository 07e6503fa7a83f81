//! WorkTalk Core Library
//!
//! Shared chat library embedded by the WorkTalk front-ends.
//! Provides: models, networking, the chat cache, and messaging pipelines.

pub mod error;
pub mod gating;
pub mod grouping;
pub mod models;
pub mod network;
pub mod picker;
pub mod resolve;
pub mod send;
pub mod store;

use parking_lot::RwLock;
use std::sync::Arc;

pub use error::*;
pub use gating::*;
pub use grouping::*;
pub use models::*;
pub use network::*;
pub use picker::*;
pub use resolve::*;
pub use send::*;
pub use store::*;

/// Main client instance
pub struct ChatClient {
    config: ClientConfig,
    api: Arc<ApiClient>,
    ws: RwLock<Option<WebSocketClient>>,
    store: Arc<ChatStore>,
    outbox: Outbox,
}

impl ChatClient {
    /// Create a new client for the signed-in user.
    pub fn new(config: ClientConfig, user_id: &str) -> Result<Self> {
        let api = Arc::new(ApiClient::new(&config)?);
        let store = Arc::new(ChatStore::new());
        let outbox = Outbox::new(api.clone() as Arc<dyn ChatApi>, store.clone(), user_id);

        Ok(Self {
            config,
            api,
            ws: RwLock::new(None),
            store,
            outbox,
        })
    }

    /// The chat cache. Screens read projections from here and subscribe to
    /// its events.
    pub fn store(&self) -> &Arc<ChatStore> {
        &self.store
    }

    /// Attach the bearer token and open the realtime channel.
    pub async fn connect(&self, token: &str) -> Result<()> {
        self.api.set_token(Some(token.to_string()));
        let ws = WebSocketClient::connect(&self.config, token).await?;
        *self.ws.write() = Some(ws);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.ws
            .read()
            .as_ref()
            .map(|ws| ws.is_connected())
            .unwrap_or(false)
    }

    /// Fetch one page of the chat list into the store.
    pub async fn refresh_chats(
        &self,
        page: u32,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<ChatPage> {
        let chats = self.api.list_chats(page, page_size, search).await?;
        self.store.merge_page(&chats);
        Ok(chats)
    }

    /// Re-fetch a single chat. Block and deletion state can change between
    /// visits, so chat screens call this on every load.
    pub async fn refresh_chat(&self, chat_id: &str) -> Result<Chat> {
        let chat = self.api.get_chat(chat_id).await?;
        self.store.upsert_chat(chat.clone());
        Ok(chat)
    }

    /// Drain the realtime channel into the store (call once per UI tick).
    pub fn poll_events(&self) -> Vec<ChatEvent> {
        let events = {
            let ws = self.ws.read();
            match ws.as_ref() {
                Some(ws) => ws.receive_events(),
                None => return Vec::new(),
            }
        };

        for event in &events {
            match event {
                ChatEvent::Message(message) => {
                    self.store.append_message(message.clone());
                }
                ChatEvent::ChatUpdated(chat) => self.store.upsert_chat(chat.clone()),
                ChatEvent::Disconnected => log::info!("realtime channel disconnected"),
            }
        }
        events
    }

    /// Send a text message.
    pub async fn send_text(
        &self,
        target: SendTarget,
        text: impl Into<String>,
    ) -> Result<ChatMessage> {
        self.outbox.send(target, OutgoingContent::Text(text.into())).await
    }

    /// Run the image pipeline: permission, pick, send. `Ok(None)` means the
    /// user dismissed the picker.
    pub async fn send_image(
        &self,
        target: SendTarget,
        library: &dyn ImageLibrary,
    ) -> Result<Option<ChatMessage>> {
        match picker::pick_image(library).await? {
            PickOutcome::Picked(file) => self
                .outbox
                .send(target, OutgoingContent::Image(file))
                .await
                .map(Some),
            PickOutcome::Cancelled => Ok(None),
            PickOutcome::Denied => Err(Error::PermissionDenied),
        }
    }

    /// Run the document pipeline: pick, validate, send. `Ok(None)` means
    /// the user dismissed the picker.
    pub async fn send_document(
        &self,
        target: SendTarget,
        library: &dyn DocumentLibrary,
    ) -> Result<Option<ChatMessage>> {
        match picker::pick_document(library).await? {
            PickOutcome::Picked(file) => self
                .outbox
                .send(target, OutgoingContent::Document(file))
                .await
                .map(Some),
            PickOutcome::Cancelled => Ok(None),
            PickOutcome::Denied => Err(Error::PermissionDenied),
        }
    }

    /// Re-submit a FAILED message.
    pub async fn retry(&self, chat_id: &str, message_id: &str) -> Result<ChatMessage> {
        self.outbox.retry(chat_id, message_id).await
    }

    /// Mark a chat seen: zero the local tally and tell the server.
    pub fn mark_seen(&self, chat_id: &str) -> Result<()> {
        self.store.mark_seen(chat_id);
        if let Some(ws) = self.ws.read().as_ref() {
            ws.send_seen(chat_id)?;
        }
        Ok(())
    }

    pub fn disconnect(&self) {
        if let Some(ws) = self.ws.write().take() {
            ws.disconnect();
        }
    }
}

/// Client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub server_host: String,
    pub server_port: u16,
    pub use_tls: bool,
}

impl ClientConfig {
    pub fn new(host: &str, port: u16, use_tls: bool) -> Self {
        Self {
            server_host: host.to_string(),
            server_port: port,
            use_tls,
        }
    }

    pub fn http_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.server_host, self.server_port)
    }

    pub fn ws_url(&self) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        format!("{}://{}:{}/ws", scheme, self.server_host, self.server_port)
    }
}

// C FFI exports for cross-language usage
#[no_mangle]
pub extern "C" fn worktalk_version() -> *const std::ffi::c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const std::ffi::c_char
}
