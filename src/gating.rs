//! Compose-affordance gating

use crate::models::Chat;

/// Which state governs a chat's compose UI. Exactly one applies at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeGate {
    /// An active block exists on the chat, in either direction.
    Blocked,
    /// Group chat whose group record is soft-deleted.
    GroupDeleted,
    /// Compose enabled.
    Normal,
}

/// Evaluated fresh on every chat load; block and deletion state can change
/// between visits, so the result is never cached.
pub fn compose_gate(chat: &Chat) -> ComposeGate {
    if chat.has_active_block() {
        ComposeGate::Blocked
    } else if chat.is_group_deleted() {
        ComposeGate::GroupDeleted
    } else {
        ComposeGate::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Block, Chat, ChatType, GroupInfo};

    fn group_chat(deleted_at: Option<i64>) -> Chat {
        Chat {
            id: "c1".into(),
            chat_type: ChatType::Group,
            group: Some(GroupInfo {
                name: "Recruiters".into(),
                icon_url: None,
                deleted_at,
            }),
            users: vec![],
            blocks: vec![],
            mutes: vec![],
            unseen_message_counts: vec![],
        }
    }

    #[test]
    fn test_normal_chat() {
        assert_eq!(compose_gate(&group_chat(None)), ComposeGate::Normal);
    }

    #[test]
    fn test_deleted_group_disables_compose() {
        let chat = group_chat(Some(1_700_000_000_000));
        assert_eq!(compose_gate(&chat), ComposeGate::GroupDeleted);
    }

    #[test]
    fn test_block_wins_over_deleted_group() {
        let mut chat = group_chat(Some(1_700_000_000_000));
        chat.blocks = vec![Block { chat_user_id: "cu2".into(), deleted_at: None }];
        assert_eq!(compose_gate(&chat), ComposeGate::Blocked);
    }

    #[test]
    fn test_soft_deleted_block_does_not_gate() {
        let mut chat = group_chat(None);
        chat.blocks = vec![Block {
            chat_user_id: "cu2".into(),
            deleted_at: Some(1_700_000_000_000),
        }];
        assert_eq!(compose_gate(&chat), ComposeGate::Normal);
    }
}
