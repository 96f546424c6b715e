//! # Storage Module - Mention Persistence
//!
//! Mention rows live in a sled tree, one `bincode` value per
//! (content type, content id, mentioned member):
//!
//! ```text
//! mentions:{content_type}:{content_id:020}:{mentioned_member:020}
//! ```
//!
//! The key is the uniqueness constraint. Inserts are a compare-and-swap
//! against an absent key, so mentioning the same member twice in one piece of
//! content stores a single row, even when two requests race, and the second
//! insert is not an error.
//!
//! ```rust,no_run
//! use storybb_mentions::storage::MentionStore;
//!
//! let store = MentionStore::open("./data/mentions")?;
//! let rows = store.records_for_content("msg", 42)?;
//! # Ok::<(), storybb_mentions::mentions::MentionError>(())
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use sled::IVec;

use crate::directory::{CharacterDirectory, MemberDirectory};
use crate::mentions::errors::MentionError;
use crate::mentions::hooks::MentionHooks;
use crate::mentions::types::{
    MentionNotice, MentionRecord, MentionedBy, ResolvedMention, MENTION_SCHEMA_VERSION,
};
use crate::metrics;
use crate::validation::validate_content_type;

const TREE_MENTIONS: &str = "mentions";

/// Sled-backed store of mention records. Cheap to clone; clones share the tree.
#[derive(Clone)]
pub struct MentionStore {
    _db: sled::Db,
    mentions: sled::Tree,
    hooks: Arc<MentionHooks>,
}

impl std::fmt::Debug for MentionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MentionStore")
            .field("records", &self.mentions.len())
            .field("hooks", &self.hooks)
            .finish()
    }
}

impl MentionStore {
    /// Open (or create) the store rooted at `path` with no hooks.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MentionError> {
        Self::open_with_hooks(path, MentionHooks::new())
    }

    pub fn open_with_hooks<P: AsRef<Path>>(path: P, hooks: MentionHooks) -> Result<Self, MentionError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let mentions = db.open_tree(TREE_MENTIONS)?;
        info!(
            "Opened mention store at {} ({} records)",
            path_ref.display(),
            mentions.len()
        );
        Ok(Self {
            _db: db,
            mentions,
            hooks: Arc::new(hooks),
        })
    }

    fn content_prefix(content_type: &str, content_id: u64) -> Vec<u8> {
        format!("mentions:{}:{:020}:", content_type, content_id).into_bytes()
    }

    fn mention_key(content_type: &str, content_id: u64, mentioned_member: u64) -> Vec<u8> {
        format!(
            "mentions:{}:{:020}:{:020}",
            content_type, content_id, mentioned_member
        )
        .into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, MentionError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize(bytes: IVec) -> Result<MentionRecord, MentionError> {
        let record: MentionRecord = bincode::deserialize(&bytes)?;
        if record.schema_version != MENTION_SCHEMA_VERSION {
            return Err(MentionError::SchemaMismatch {
                entity: "mention",
                expected: MENTION_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Store one row per mentioned member after the content type's hooks ran.
    /// Members already mentioned in this content are skipped silently.
    /// Returns how many rows were new.
    pub fn insert_mentions(
        &self,
        content_type: &str,
        content_id: u64,
        mentions: &[ResolvedMention],
        mentioned_by_member: u64,
        mentioned_by_character: u64,
    ) -> Result<usize, MentionError> {
        validate_content_type(content_type)?;
        let mut targets = mentions.to_vec();
        self.hooks.apply(content_type, content_id, &mut targets);

        let time = Utc::now().timestamp();
        let mut inserted = 0usize;
        for mention in &targets {
            let key = Self::mention_key(content_type, content_id, mention.member_id());
            let record = MentionRecord {
                schema_version: MENTION_SCHEMA_VERSION,
                content_type: content_type.to_string(),
                content_id,
                mentioned_by_member,
                mentioned_by_character,
                mentioned_member: mention.member_id(),
                mentioned_character: mention.character_id(),
                time,
            };
            let bytes = Self::serialize(&record)?;
            match self
                .mentions
                .compare_and_swap(key, None::<&[u8]>, Some(bytes))?
            {
                Ok(()) => {
                    inserted += 1;
                    metrics::record_inserted(content_type);
                }
                Err(_) => {
                    metrics::inc_duplicates_ignored();
                    debug!(
                        "Member {} already mentioned in {} {}",
                        mention.member_id(),
                        content_type,
                        content_id
                    );
                }
            }
        }
        if inserted > 0 {
            self.mentions.flush()?;
        }
        Ok(inserted)
    }

    /// Bring stored rows in line with an edited body: rows for members no
    /// longer mentioned go, new members are inserted. Returns (added, removed).
    pub fn modify_mentions(
        &self,
        content_type: &str,
        content_id: u64,
        mentions: &[ResolvedMention],
        mentioned_by_member: u64,
        mentioned_by_character: u64,
    ) -> Result<(usize, usize), MentionError> {
        validate_content_type(content_type)?;
        let keep: BTreeSet<u64> = mentions.iter().map(|m| m.member_id()).collect();
        let mut removed = 0usize;
        for record in self.records_for_content(content_type, content_id)? {
            if !keep.contains(&record.mentioned_member) {
                let key = Self::mention_key(content_type, content_id, record.mentioned_member);
                if self.mentions.remove(key)?.is_some() {
                    removed += 1;
                }
            }
        }
        let added = self.insert_mentions(
            content_type,
            content_id,
            mentions,
            mentioned_by_member,
            mentioned_by_character,
        )?;
        if removed > 0 {
            self.mentions.flush()?;
        }
        Ok((added, removed))
    }

    /// Drop every row of a content item. Returns how many were removed.
    pub fn delete_mentions(&self, content_type: &str, content_id: u64) -> Result<usize, MentionError> {
        validate_content_type(content_type)?;
        let prefix = Self::content_prefix(content_type, content_id);
        let keys: Result<Vec<IVec>, _> = self
            .mentions
            .scan_prefix(&prefix)
            .map(|entry| entry.map(|(key, _)| key))
            .collect();
        let mut removed = 0usize;
        for key in keys? {
            self.mentions.remove(key)?;
            removed += 1;
        }
        if removed > 0 {
            self.mentions.flush()?;
        }
        Ok(removed)
    }

    /// Raw rows of one content item, ordered by mentioned member.
    pub fn records_for_content(
        &self,
        content_type: &str,
        content_id: u64,
    ) -> Result<Vec<MentionRecord>, MentionError> {
        validate_content_type(content_type)?;
        let prefix = Self::content_prefix(content_type, content_id);
        self.mentions
            .scan_prefix(&prefix)
            .map(|entry| {
                entry
                    .map_err(MentionError::from)
                    .and_then(|(_key, value)| Self::deserialize(value))
            })
            .collect()
    }

    pub fn count(&self) -> usize {
        self.mentions.len()
    }

    /// Who was mentioned in a content item, with the data notification
    /// dispatch needs, keyed by mentioned character id.
    ///
    /// `only_characters` restricts the result to those targets when non-empty.
    /// Rows whose character or member no longer exists are skipped.
    pub fn mentions_by_content<C, M>(
        &self,
        content_type: &str,
        content_id: u64,
        only_characters: &[u64],
        characters: &C,
        members: &M,
    ) -> Result<BTreeMap<u64, MentionNotice>, MentionError>
    where
        C: CharacterDirectory + ?Sized,
        M: MemberDirectory + ?Sized,
    {
        let mut notices = BTreeMap::new();
        for record in self.records_for_content(content_type, content_id)? {
            if !only_characters.is_empty() && !only_characters.contains(&record.mentioned_character) {
                continue;
            }
            let Some(target) = characters.character(record.mentioned_character)? else {
                warn!(
                    "Mention in {} {} points at missing character {}",
                    content_type, content_id, record.mentioned_character
                );
                continue;
            };
            let Some(member) = members.member(record.mentioned_member)? else {
                warn!(
                    "Mention in {} {} points at missing member {}",
                    content_type, content_id, record.mentioned_member
                );
                continue;
            };

            let by_name = match characters.character(record.mentioned_by_character)? {
                Some(by) => by.name,
                None => members
                    .member(record.mentioned_by_member)?
                    .map(|m| m.name)
                    .unwrap_or_default(),
            };

            notices.insert(
                target.id,
                MentionNotice {
                    member_id: member.id,
                    character_id: target.id,
                    character_name: target.name,
                    is_main: target.is_main,
                    email: member.email.clone(),
                    groups: member.groups(),
                    locale: member.locale.clone(),
                    mentioned_by: MentionedBy {
                        member_id: record.mentioned_by_member,
                        character_id: record.mentioned_by_character,
                        name: by_name,
                    },
                    time: record.time,
                },
            );
        }
        Ok(notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mentions::types::CharacterRecord;
    use tempfile::TempDir;

    fn mention(character_id: u64, member_id: u64) -> ResolvedMention {
        ResolvedMention {
            character: CharacterRecord {
                id: character_id,
                member_id,
                name: format!("char{}", character_id),
                is_main: false,
                retired: false,
            },
            position: None,
        }
    }

    #[test]
    fn second_insert_is_a_no_op() {
        let dir = TempDir::new().expect("tempdir");
        let store = MentionStore::open(dir.path()).expect("store");
        let list = vec![mention(10, 1)];
        assert_eq!(store.insert_mentions("msg", 5, &list, 2, 20).expect("insert"), 1);
        assert_eq!(store.insert_mentions("msg", 5, &list, 2, 20).expect("insert again"), 0);
        assert_eq!(store.records_for_content("msg", 5).expect("read").len(), 1);
    }

    #[test]
    fn two_characters_of_one_member_share_a_row() {
        let dir = TempDir::new().expect("tempdir");
        let store = MentionStore::open(dir.path()).expect("store");
        let list = vec![mention(10, 1), mention(11, 1)];
        assert_eq!(store.insert_mentions("msg", 5, &list, 2, 20).expect("insert"), 1);
        let rows = store.records_for_content("msg", 5).expect("read");
        assert_eq!(rows[0].mentioned_character, 10);
    }

    #[test]
    fn content_ids_do_not_bleed_into_each_other() {
        let dir = TempDir::new().expect("tempdir");
        let store = MentionStore::open(dir.path()).expect("store");
        store.insert_mentions("msg", 5, &[mention(10, 1)], 2, 20).expect("insert");
        store.insert_mentions("msg", 50, &[mention(10, 1)], 2, 20).expect("insert");
        assert_eq!(store.delete_mentions("msg", 5).expect("delete"), 1);
        assert!(store.records_for_content("msg", 5).expect("read").is_empty());
        assert_eq!(store.records_for_content("msg", 50).expect("read").len(), 1);
    }

    #[test]
    fn invalid_content_type_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let store = MentionStore::open(dir.path()).expect("store");
        let err = store.insert_mentions("msg:1", 5, &[mention(10, 1)], 2, 20);
        assert!(matches!(err, Err(MentionError::Invalid(_))));
        assert_eq!(store.count(), 0);
    }
}
