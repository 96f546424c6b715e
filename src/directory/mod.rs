//! # Directory Module - Character and Member Lookup
//!
//! The mention engine does not own character or member data. It reads them
//! through the traits below, which the forum's database layer implements.
//! [`JsonDirectory`] is a file-backed implementation used by the CLI and tests:
//!
//! ```text
//! data/
//! ├── characters.json   ← [CharacterRecord, ...]
//! └── members.json      ← [MemberRecord, ...]
//! ```
//!
//! Character names are kept entity-encoded, the way the forum stores them.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use fs2::FileExt;
use log::{info, warn};
use serde::de::DeserializeOwned;
use tokio::fs;

use crate::mentions::errors::MentionError;
use crate::mentions::scanner::CandidateSet;
use crate::mentions::types::{CharacterRecord, MemberRecord};
use crate::validation::{validate_character_name, NameRules};

const CHARACTERS_FILE: &str = "characters.json";
const MEMBERS_FILE: &str = "members.json";

/// Character lookup used by the resolver and the notification read path.
pub trait CharacterDirectory {
    /// Characters whose name equals one of `names` under the directory's
    /// collation, longest name first, at most `limit` entries. Retired
    /// characters are excluded.
    fn find_by_names(
        &self,
        names: &CandidateSet,
        limit: usize,
    ) -> Result<Vec<CharacterRecord>, MentionError>;

    fn character(&self, id: u64) -> Result<Option<CharacterRecord>, MentionError>;

    fn characters_of_member(&self, member_id: u64) -> Result<Vec<CharacterRecord>, MentionError>;

    /// The member's main character, if it has one.
    fn main_character(&self, member_id: u64) -> Result<Option<CharacterRecord>, MentionError> {
        Ok(self
            .characters_of_member(member_id)?
            .into_iter()
            .find(|c| c.is_main))
    }
}

pub trait MemberDirectory {
    fn member(&self, id: u64) -> Result<Option<MemberRecord>, MentionError>;
}

/// Authorization seam: may this member mention others at all.
pub trait MentionPermission {
    fn may_mention(&self, member_id: u64) -> bool;
}

impl<F> MentionPermission for F
where
    F: Fn(u64) -> bool,
{
    fn may_mention(&self, member_id: u64) -> bool {
        self(member_id)
    }
}

/// Grants mentioning to members of any of the listed groups. An empty list
/// lets everyone mention.
pub struct GroupPermission<'a, M: MemberDirectory + ?Sized> {
    members: &'a M,
    allowed_groups: &'a [u32],
}

impl<'a, M: MemberDirectory + ?Sized> GroupPermission<'a, M> {
    pub fn new(members: &'a M, allowed_groups: &'a [u32]) -> Self {
        Self {
            members,
            allowed_groups,
        }
    }
}

impl<M: MemberDirectory + ?Sized> MentionPermission for GroupPermission<'_, M> {
    fn may_mention(&self, member_id: u64) -> bool {
        if self.allowed_groups.is_empty() {
            return true;
        }
        match self.members.member(member_id) {
            Ok(Some(member)) => member
                .groups()
                .iter()
                .any(|g| self.allowed_groups.contains(g)),
            Ok(None) => false,
            Err(e) => {
                warn!("Member lookup for {} failed during permission check: {}", member_id, e);
                false
            }
        }
    }
}

/// Character and member directory persisted as two JSON files.
#[derive(Debug, Clone, Default)]
pub struct JsonDirectory {
    data_dir: Option<PathBuf>,
    characters: BTreeMap<u64, CharacterRecord>,
    members: BTreeMap<u64, MemberRecord>,
}

impl JsonDirectory {
    /// In-memory directory; [`add_character`](Self::add_character) will not persist.
    pub fn from_records(
        characters: impl IntoIterator<Item = CharacterRecord>,
        members: impl IntoIterator<Item = MemberRecord>,
    ) -> Self {
        Self {
            data_dir: None,
            characters: characters.into_iter().map(|c| (c.id, c)).collect(),
            members: members.into_iter().map(|m| (m.id, m)).collect(),
        }
    }

    /// Load both files from `data_dir`. Missing files mean an empty directory.
    pub async fn load(data_dir: &str) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .await
            .map_err(|e| anyhow!("Failed to create data directory {}: {}", data_dir, e))?;
        let root = Path::new(data_dir);
        let characters: Vec<CharacterRecord> = Self::load_file(&root.join(CHARACTERS_FILE)).await?;
        let members: Vec<MemberRecord> = Self::load_file(&root.join(MEMBERS_FILE)).await?;
        info!(
            "Loaded {} characters and {} members from {}",
            characters.len(),
            members.len(),
            data_dir
        );
        let mut dir = Self::from_records(characters, members);
        dir.data_dir = Some(root.to_path_buf());
        Ok(dir)
    }

    async fn load_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        match fs::read_to_string(path).await {
            Ok(data) => {
                // Guard against any accidental leading NULs
                let cleaned = data.trim_start_matches('\0');
                if cleaned.trim().is_empty() {
                    return Ok(Vec::new());
                }
                serde_json::from_str(cleaned)
                    .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(anyhow!("Failed reading {}: {}", path.display(), e)),
        }
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Add a character. Names are unique ignoring case and must stay
    /// mentionable under `rules`.
    pub async fn add_character(&mut self, record: CharacterRecord, rules: &NameRules) -> Result<()> {
        validate_character_name(&record.name, rules)?;
        if self.characters.contains_key(&record.id) {
            return Err(anyhow!("Character id {} already exists", record.id));
        }
        let lowered = record.name.to_lowercase();
        if self.characters.values().any(|c| c.name.to_lowercase() == lowered) {
            return Err(anyhow!("Character name '{}' is already taken", record.name));
        }
        if record.is_main {
            if let Some(existing) = self.main_character(record.member_id)? {
                return Err(anyhow!(
                    "Member {} already has main character '{}'",
                    record.member_id,
                    existing.name
                ));
            }
        }
        self.characters.insert(record.id, record);
        self.save_characters().await
    }

    pub async fn add_member(&mut self, member: MemberRecord) -> Result<()> {
        if self.members.contains_key(&member.id) {
            return Err(anyhow!("Member id {} already exists", member.id));
        }
        self.members.insert(member.id, member);
        self.save_members().await
    }

    async fn save_characters(&self) -> Result<()> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };
        let records: Vec<&CharacterRecord> = self.characters.values().collect();
        let content = serde_json::to_string_pretty(&records)
            .map_err(|e| anyhow!("Failed to serialize characters: {}", e))?;
        write_file_locked(&dir.join(CHARACTERS_FILE), content).await
    }

    async fn save_members(&self) -> Result<()> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };
        let records: Vec<&MemberRecord> = self.members.values().collect();
        let content = serde_json::to_string_pretty(&records)
            .map_err(|e| anyhow!("Failed to serialize members: {}", e))?;
        write_file_locked(&dir.join(MEMBERS_FILE), content).await
    }
}

/// Replace a directory file. Writers serialize on an exclusive lock held on a
/// `<file>.lock` sidecar; the new content goes to a temp file that is synced and
/// renamed over the target, so readers only ever see a complete file.
async fn write_file_locked(path: &Path, content: String) -> Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || replace_file(&path, content.as_bytes()))
        .await
        .map_err(|e| anyhow!("Directory writer task failed: {}", e))?
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

fn replace_file(path: &Path, content: &[u8]) -> Result<()> {
    use std::fs::{File, OpenOptions};
    use std::io::Write;

    let lock = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(sidecar(path, ".lock"))?;
    lock.lock_exclusive()
        .map_err(|e| anyhow!("Failed to lock {}: {}", path.display(), e))?;

    // Only the lock holder touches the temp file.
    let tmp_path = sidecar(path, ".tmp");
    let mut tmp = File::create(&tmp_path)?;
    tmp.write_all(content)?;
    tmp.sync_all()?;
    std::fs::rename(&tmp_path, path)
        .map_err(|e| anyhow!("Failed to replace {}: {}", path.display(), e))?;
    lock.unlock()?;
    Ok(())
}

impl CharacterDirectory for JsonDirectory {
    fn find_by_names(
        &self,
        names: &CandidateSet,
        limit: usize,
    ) -> Result<Vec<CharacterRecord>, MentionError> {
        // Case-insensitive, like the forum database's default collation.
        let wanted: BTreeSet<String> = names.iter().map(|n| n.to_lowercase()).collect();
        let mut found: Vec<CharacterRecord> = self
            .characters
            .values()
            .filter(|c| !c.retired && wanted.contains(&c.name.to_lowercase()))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.name
                .chars()
                .count()
                .cmp(&a.name.chars().count())
                .then(a.id.cmp(&b.id))
        });
        found.truncate(limit);
        Ok(found)
    }

    fn character(&self, id: u64) -> Result<Option<CharacterRecord>, MentionError> {
        Ok(self.characters.get(&id).cloned())
    }

    fn characters_of_member(&self, member_id: u64) -> Result<Vec<CharacterRecord>, MentionError> {
        Ok(self
            .characters
            .values()
            .filter(|c| c.member_id == member_id)
            .cloned()
            .collect())
    }
}

impl MemberDirectory for JsonDirectory {
    fn member(&self, id: u64) -> Result<Option<MemberRecord>, MentionError> {
        Ok(self.members.get(&id).cloned())
    }
}
