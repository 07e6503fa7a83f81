//! Data models for WorkTalk

use serde::{Deserialize, Serialize};

// ============================================================================
// Users & membership
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub picture_url: Option<String>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Membership record linking a user to a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUser {
    pub id: String,
    pub chat_id: String,
    pub user_id: String,
    pub user: UserProfile,
}

// ============================================================================
// Chats
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatType {
    Private,
    Group,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub name: String,
    pub icon_url: Option<String>,
    pub deleted_at: Option<i64>,
}

/// Suppresses message exchange between two chat participants.
/// Soft-deleted rather than removed, so unblock keeps the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub chat_user_id: String,
    pub deleted_at: Option<i64>,
}

impl Block {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Suppresses notification delivery for a chat until a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mute {
    pub chat_user_id: String,
    pub muted_until: i64,
}

/// Per-sender unseen message tally for the viewing user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnseenCount {
    pub sender_id: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    #[serde(default)]
    pub group: Option<GroupInfo>,
    #[serde(default)]
    pub users: Vec<ChatUser>,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub mutes: Vec<Mute>,
    #[serde(default)]
    pub unseen_message_counts: Vec<UnseenCount>,
}

impl Chat {
    /// The viewer's own membership record, if they are a participant.
    pub fn membership_of(&self, user_id: &str) -> Option<&ChatUser> {
        self.users.iter().find(|u| u.user_id == user_id)
    }

    pub fn has_active_block(&self) -> bool {
        self.blocks.iter().any(Block::is_active)
    }

    pub fn is_group_deleted(&self) -> bool {
        self.group
            .as_ref()
            .map(|g| g.deleted_at.is_some())
            .unwrap_or(false)
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Text,
    Image,
    File,
}

impl Default for MessageType {
    fn default() -> Self {
        Self::Text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Pending,
    Sent,
    Failed,
}

impl Default for MessageStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// A picker-resolved attachment. `mime_type` travels as `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub uri: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub message_type: MessageType,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub file: Option<FileRef>,
    /// Server-resolved URL, present once the attachment is stored.
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub status: MessageStatus,
    /// Epoch millis, assigned at creation and never mutated.
    pub created_at: i64,
}

impl ChatMessage {
    pub fn text(
        id: impl Into<String>,
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            message_type: MessageType::Text,
            text: Some(text.into()),
            file: None,
            file_url: None,
            status: MessageStatus::Pending,
            created_at,
        }
    }

    pub fn attachment(
        id: impl Into<String>,
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        message_type: MessageType,
        file: FileRef,
        created_at: i64,
    ) -> Self {
        debug_assert!(message_type != MessageType::Text);
        Self {
            id: id.into(),
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            message_type,
            text: None,
            file: Some(file),
            file_url: None,
            status: MessageStatus::Pending,
            created_at,
        }
    }

    /// Exactly one of `text`/`file` must be populated, matching the type.
    pub fn content_is_consistent(&self) -> bool {
        match self.message_type {
            MessageType::Text => self.text.is_some() && self.file.is_none(),
            MessageType::Image | MessageType::File => {
                self.file.is_some() && self.text.is_none()
            }
        }
    }
}

// ============================================================================
// Paginated chat list
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPage {
    pub items: Vec<Chat>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}
