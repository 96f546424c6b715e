use serde::{Deserialize, Serialize};

pub const MENTION_SCHEMA_VERSION: u8 = 1;

/// A forum character as seen by the mention engine. Owned by the character
/// directory; the engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CharacterRecord {
    pub id: u64,
    pub member_id: u64,
    pub name: String,
    /// The member's default persona. Mentions of it render as member markup.
    #[serde(default)]
    pub is_main: bool,
    #[serde(default)]
    pub retired: bool,
}

/// Account-level data consulted when building notifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub primary_group: u32,
    #[serde(default)]
    pub post_group: u32,
    #[serde(default)]
    pub additional_groups: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl MemberRecord {
    /// Primary, post and additional groups merged, zero entries dropped,
    /// first occurrence order kept.
    pub fn groups(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(2 + self.additional_groups.len());
        let all = [self.primary_group, self.post_group]
            .into_iter()
            .chain(self.additional_groups.iter().copied());
        for group in all {
            if group != 0 && !out.contains(&group) {
                out.push(group);
            }
        }
        out
    }
}

/// A character the resolver accepted, with the byte offset of the trigger it claimed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResolvedMention {
    pub character: CharacterRecord,
    pub position: Option<usize>,
}

impl ResolvedMention {
    pub fn member_id(&self) -> u64 {
        self.character.member_id
    }

    pub fn character_id(&self) -> u64 {
        self.character.id
    }
}

/// Persisted mention row. Unique per (content id, content type, mentioned member).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MentionRecord {
    pub schema_version: u8,
    pub content_type: String,
    pub content_id: u64,
    pub mentioned_by_member: u64,
    pub mentioned_by_character: u64,
    pub mentioned_member: u64,
    pub mentioned_character: u64,
    /// Unix seconds.
    pub time: i64,
}

/// Who mentioned the notice target.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MentionedBy {
    pub member_id: u64,
    pub character_id: u64,
    pub name: String,
}

/// Consolidated recipient data handed to notification dispatch.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MentionNotice {
    pub member_id: u64,
    pub character_id: u64,
    pub character_name: String,
    pub is_main: bool,
    pub email: String,
    pub groups: Vec<u32>,
    pub locale: Option<String>,
    pub mentioned_by: MentionedBy,
    pub time: i64,
}
