//! Network layer for WorkTalk - HTTP API and WebSocket client

use crate::error::{Error, Result};
use crate::models::*;
use crate::ClientConfig;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

// ============================================================================
// Wire payloads
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub chat_id: String,
    pub sender_id: String,
    pub message_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateChatBody<'a> {
    user_ids: &'a [String],
    #[serde(rename = "type")]
    chat_type: ChatType,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_name: Option<&'a str>,
}

// ============================================================================
// API seam
// ============================================================================

/// The REST surface the messaging pipeline depends on. A trait so the
/// pipeline can run against an in-memory fake in tests.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn list_chats(
        &self,
        page: u32,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<ChatPage>;

    async fn get_chat(&self, chat_id: &str) -> Result<Chat>;

    async fn create_chat(
        &self,
        user_ids: &[String],
        chat_type: ChatType,
        group_name: Option<&str>,
    ) -> Result<Chat>;

    async fn send_message(&self, outgoing: &OutgoingMessage) -> Result<ChatMessage>;
}

// ============================================================================
// HTTP API Client
// ============================================================================

pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Mutex<Option<String>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: config.http_url(),
            token: Mutex::new(None),
        })
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.lock() = token;
    }

    fn auth_header(&self) -> Option<String> {
        self.token
            .lock()
            .as_ref()
            .map(|t| format!("Bearer {}", t))
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_header() {
            Some(auth) => req.header("Authorization", auth),
            None => req,
        }
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ChatApi for ApiClient {
    async fn list_chats(
        &self,
        page: u32,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<ChatPage> {
        let mut req = self
            .client
            .get(format!("{}/chats", self.base_url))
            .query(&[("page", page.to_string()), ("pageSize", page_size.to_string())]);
        if let Some(search) = search {
            req = req.query(&[("search", search)]);
        }

        let resp = Self::check(self.authorized(req).send().await?).await?;
        Ok(resp.json().await?)
    }

    async fn get_chat(&self, chat_id: &str) -> Result<Chat> {
        let req = self
            .client
            .get(format!("{}/chats/{}", self.base_url, chat_id));

        let resp = self.authorized(req).send().await?;
        if resp.status().as_u16() == 404 {
            return Err(Error::UnknownChat(chat_id.to_string()));
        }
        let resp = Self::check(resp).await?;
        Ok(resp.json().await?)
    }

    async fn create_chat(
        &self,
        user_ids: &[String],
        chat_type: ChatType,
        group_name: Option<&str>,
    ) -> Result<Chat> {
        let req = self
            .client
            .post(format!("{}/chats", self.base_url))
            .json(&CreateChatBody {
                user_ids,
                chat_type,
                group_name,
            });

        let resp = Self::check(self.authorized(req).send().await?).await?;
        Ok(resp.json().await?)
    }

    async fn send_message(&self, outgoing: &OutgoingMessage) -> Result<ChatMessage> {
        let req = self
            .client
            .post(format!(
                "{}/chats/{}/messages",
                self.base_url, outgoing.chat_id
            ))
            .json(outgoing);

        let resp = Self::check(self.authorized(req).send().await?).await?;
        Ok(resp.json().await?)
    }
}

// ============================================================================
// WebSocket client
// ============================================================================

/// Inbound realtime events.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    Message(ChatMessage),
    ChatUpdated(Chat),
    Disconnected,
}

fn parse_event(text: &str) -> Option<ChatEvent> {
    let data: serde_json::Value = serde_json::from_str(text).ok()?;
    let payload = data.get("payload")?;
    match data["type"].as_str()? {
        "message" => serde_json::from_value(payload.clone())
            .ok()
            .map(ChatEvent::Message),
        "chat" => serde_json::from_value(payload.clone())
            .ok()
            .map(ChatEvent::ChatUpdated),
        _ => None,
    }
}

pub struct WebSocketClient {
    sender: mpsc::UnboundedSender<String>,
    incoming: Arc<Mutex<VecDeque<ChatEvent>>>,
    connected: Arc<Mutex<bool>>,
}

impl WebSocketClient {
    /// Opens the realtime channel. The bearer token is attached at connect
    /// time as a query parameter on the socket URL.
    pub async fn connect(config: &ClientConfig, token: &str) -> Result<Self> {
        let mut url = url::Url::parse(&config.ws_url())
            .map_err(|e| Error::WebSocket(e.to_string()))?;
        url.query_pairs_mut().append_pair("token", token);

        let (ws_stream, _) = connect_async(url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let incoming = Arc::new(Mutex::new(VecDeque::new()));
        let connected = Arc::new(Mutex::new(true));

        let incoming_clone = incoming.clone();
        let connected_clone = connected.clone();

        // Receive task
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(WsMessage::Text(text)) => {
                        if let Some(event) = parse_event(&text) {
                            incoming_clone.lock().push_back(event);
                        }
                    }
                    Ok(WsMessage::Close(_)) => {
                        log::info!("realtime channel closed by server");
                        *connected_clone.lock() = false;
                        incoming_clone.lock().push_back(ChatEvent::Disconnected);
                        break;
                    }
                    Err(e) => {
                        log::warn!("realtime channel read error: {}", e);
                        *connected_clone.lock() = false;
                        incoming_clone.lock().push_back(ChatEvent::Disconnected);
                        break;
                    }
                    _ => {}
                }
            }
        });

        // Send task
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if write.send(WsMessage::Text(msg)).await.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            sender: tx,
            incoming,
            connected,
        })
    }

    /// Tells the server the viewer has seen a chat.
    pub fn send_seen(&self, chat_id: &str) -> Result<()> {
        let msg = json!({
            "type": "seen",
            "payload": { "chatId": chat_id }
        });

        self.sender
            .send(msg.to_string())
            .map_err(|e| Error::WebSocket(e.to_string()))
    }

    /// Drains everything received since the last call.
    pub fn receive_events(&self) -> Vec<ChatEvent> {
        self.incoming.lock().drain(..).collect()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    pub fn disconnect(&self) {
        *self.connected.lock() = false;
    }
}
