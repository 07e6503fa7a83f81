//! Read-side projection of a chat for display

use crate::models::{Chat, ChatUser};

/// Display attributes derived for one chat from the signed-in user's point
/// of view. Computed from the chat record alone, no I/O, so it can be
/// recomputed on every render; `PartialEq` lets callers skip work when the
/// projection did not change.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChat {
    pub display_name: String,
    pub icon_url: String,
    /// Chat memberships excluding the viewer, in server order.
    pub members: Vec<ChatUser>,
    /// Active block imposed by the viewer. Any active block in either
    /// direction gates the compose UI, see [`crate::gating::compose_gate`].
    pub is_blocked_by_viewer: bool,
    pub is_group_deleted: bool,
    pub unseen_count: i64,
}

pub fn resolve(chat: &Chat, viewer_id: &str) -> ResolvedChat {
    let members: Vec<ChatUser> = chat
        .users
        .iter()
        .filter(|u| u.user_id != viewer_id)
        .cloned()
        .collect();

    let display_name = match &chat.group {
        Some(group) => group.name.clone(),
        None => members
            .iter()
            .map(|m| m.user.full_name())
            .collect::<Vec<_>>()
            .join(", "),
    };

    let icon_url = match &chat.group {
        Some(group) => group.icon_url.clone().unwrap_or_default(),
        None => members
            .first()
            .and_then(|m| m.user.picture_url.clone())
            .unwrap_or_default(),
    };

    // Block rows hang off the membership of the blocked party, so an
    // active block on someone else's membership is one the viewer imposed.
    let viewer_membership_id = chat.membership_of(viewer_id).map(|m| m.id.as_str());
    let is_blocked_by_viewer = chat
        .blocks
        .iter()
        .any(|b| b.is_active() && Some(b.chat_user_id.as_str()) != viewer_membership_id);

    let unseen_count = chat
        .unseen_message_counts
        .iter()
        .filter(|c| c.sender_id != viewer_id)
        .map(|c| c.count)
        .sum();

    ResolvedChat {
        display_name,
        icon_url,
        members,
        is_blocked_by_viewer,
        is_group_deleted: chat.is_group_deleted(),
        unseen_count,
    }
}

/// Whether the viewer has an active mute on this chat at `now_ms`.
/// Time is a parameter so the resolve path itself stays pure.
pub fn is_muted(chat: &Chat, viewer_id: &str, now_ms: i64) -> bool {
    match chat.membership_of(viewer_id) {
        Some(member) => chat
            .mutes
            .iter()
            .any(|m| m.chat_user_id == member.id && m.muted_until > now_ms),
        None => false,
    }
}
