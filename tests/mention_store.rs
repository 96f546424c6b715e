//! Persistence: idempotent inserts, edits, deletes and hooks.

mod common;

use std::sync::Arc;
use std::thread;

use common::*;
use storybb_mentions::mentions::{
    mentioned_characters, MentionHooks, ResolvedMention, ScanOptions,
};
use storybb_mentions::storage::MentionStore;
use tempfile::tempdir;

fn resolve(body: &str) -> Vec<ResolvedMention> {
    let dir = forum_directory();
    mentioned_characters(body, MEMBER_JANE, &dir, &anyone, &ScanOptions::default())
        .expect("resolve")
        .into_values()
        .collect()
}

#[test]
fn inserting_twice_stores_one_record() {
    let tmp = tempdir().unwrap();
    let store = MentionStore::open(tmp.path()).unwrap();
    let mentions = resolve("@Ghost and @Rook");
    assert_eq!(mentions.len(), 2);

    let first = store
        .insert_mentions("msg", 100, &mentions, MEMBER_JANE, CHAR_JANE)
        .expect("first insert");
    let second = store
        .insert_mentions("msg", 100, &mentions, MEMBER_JANE, CHAR_JANE)
        .expect("second insert must not error");
    assert_eq!(first, 2);
    assert_eq!(second, 0);

    let rows = store.records_for_content("msg", 100).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.mentioned_by_member == MEMBER_JANE));
    assert!(rows.iter().all(|r| r.mentioned_by_character == CHAR_JANE));
}

#[test]
fn racing_inserts_keep_a_single_row() {
    let tmp = tempdir().unwrap();
    let store = MentionStore::open(tmp.path()).unwrap();
    let mentions = Arc::new(resolve("@Ghost"));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let mentions = Arc::clone(&mentions);
            thread::spawn(move || {
                store
                    .insert_mentions("msg", 7, &mentions, MEMBER_JANE, CHAR_JANE)
                    .expect("insert")
            })
        })
        .collect();
    let inserted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(inserted, 1);
    assert_eq!(store.records_for_content("msg", 7).unwrap().len(), 1);
}

#[test]
fn same_member_in_other_content_is_separate() {
    let tmp = tempdir().unwrap();
    let store = MentionStore::open(tmp.path()).unwrap();
    let mentions = resolve("@Ghost");
    store.insert_mentions("msg", 1, &mentions, MEMBER_JANE, CHAR_JANE).unwrap();
    store.insert_mentions("msg", 2, &mentions, MEMBER_JANE, CHAR_JANE).unwrap();
    store.insert_mentions("page", 1, &mentions, MEMBER_JANE, CHAR_JANE).unwrap();
    assert_eq!(store.count(), 3);
}

#[test]
fn edit_removes_dropped_members_and_adds_new_ones() {
    let tmp = tempdir().unwrap();
    let store = MentionStore::open(tmp.path()).unwrap();
    store
        .insert_mentions("msg", 9, &resolve("@Ghost @Rook"), MEMBER_JANE, CHAR_JANE)
        .unwrap();

    let (added, removed) = store
        .modify_mentions("msg", 9, &resolve("@Rook and @Tom &amp; Jerry"), MEMBER_JANE, CHAR_JANE)
        .unwrap();
    assert_eq!((added, removed), (1, 1));

    let members: Vec<u64> = store
        .records_for_content("msg", 9)
        .unwrap()
        .iter()
        .map(|r| r.mentioned_member)
        .collect();
    assert_eq!(members, vec![MEMBER_DOE, MEMBER_TOONS]);
}

#[test]
fn delete_clears_one_content_item() {
    let tmp = tempdir().unwrap();
    let store = MentionStore::open(tmp.path()).unwrap();
    store.insert_mentions("msg", 3, &resolve("@Ghost @Jane"), MEMBER_DOE, CHAR_ROOK).unwrap();
    store.insert_mentions("msg", 4, &resolve("@Ghost"), MEMBER_DOE, CHAR_ROOK).unwrap();
    assert_eq!(store.delete_mentions("msg", 3).unwrap(), 2);
    assert_eq!(store.delete_mentions("msg", 3).unwrap(), 0);
    assert_eq!(store.count(), 1);
}

#[test]
fn hooks_filter_per_content_type() {
    let tmp = tempdir().unwrap();
    let mut hooks = MentionHooks::new();
    // Private messages never notify the ghost player.
    hooks.register("pm", |_, list| list.retain(|m| m.member_id() != MEMBER_GHOST));
    let store = MentionStore::open_with_hooks(tmp.path(), hooks).unwrap();
    let mentions = resolve("@Ghost @Rook");

    assert_eq!(store.insert_mentions("pm", 1, &mentions, MEMBER_JANE, CHAR_JANE).unwrap(), 1);
    assert_eq!(store.insert_mentions("msg", 1, &mentions, MEMBER_JANE, CHAR_JANE).unwrap(), 2);
}

#[test]
fn records_survive_reopen() {
    let tmp = tempdir().unwrap();
    {
        let store = MentionStore::open(tmp.path()).unwrap();
        store.insert_mentions("msg", 5, &resolve("@Ghost"), MEMBER_JANE, CHAR_JANE).unwrap();
    }
    let store = MentionStore::open(tmp.path()).unwrap();
    let rows = store.records_for_content("msg", 5).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].mentioned_character, CHAR_GHOST);
    assert!(rows[0].time > 0);
}
