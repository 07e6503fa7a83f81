//! Date-bucketed grouping of chat messages for rendering

use crate::models::ChatMessage;
use chrono::{DateTime, Local, NaiveDate};
use std::cmp::Reverse;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct DateGroup {
    pub date: NaiveDate,
    pub messages: Vec<ChatMessage>,
}

/// Groups an arbitrarily-ordered message list into calendar-day buckets.
///
/// The bucket key is the local calendar date of `created_at`, not an
/// elapsed-24h window. Within a bucket, duplicate ids are dropped silently
/// (first occurrence wins) and messages are ordered newest-first; buckets
/// themselves come out newest-date-first. Pure transform, re-run on every
/// message-list update.
pub fn group_by_date(messages: &[ChatMessage]) -> Vec<DateGroup> {
    let mut groups: Vec<DateGroup> = Vec::new();
    let mut seen_ids: Vec<HashSet<String>> = Vec::new();

    for message in messages {
        let date = local_date(message.created_at);
        let idx = match groups.iter().position(|g| g.date == date) {
            Some(idx) => idx,
            None => {
                groups.push(DateGroup { date, messages: Vec::new() });
                seen_ids.push(HashSet::new());
                groups.len() - 1
            }
        };
        if seen_ids[idx].insert(message.id.clone()) {
            groups[idx].messages.push(message.clone());
        }
    }

    for group in &mut groups {
        group.messages.sort_by_key(|m| Reverse(m.created_at));
    }
    groups.sort_by_key(|g| Reverse(g.date));
    groups
}

fn local_date(created_at_ms: i64) -> NaiveDate {
    DateTime::from_timestamp_millis(created_at_ms)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .with_timezone(&Local)
        .date_naive()
}
