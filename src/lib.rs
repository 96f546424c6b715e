//! # StoryBB Mentions - `@name` mentions for a roleplay forum
//!
//! Members of a StoryBB forum post as characters. Writing `@Character Name`
//! in a post notifies the member who owns that character. This crate finds
//! those mentions, turns them into markup, stores who mentioned whom, and
//! reads that back for notification dispatch.
//!
//! ## Features
//!
//! - **Scanner**: character-level tokenizer with several candidates open at once,
//!   quote exclusion, line-break reset and a configurable length cap.
//! - **Resolver**: longest-match-wins against the character directory, with a
//!   literal `@name` re-check against the body.
//! - **Writer**: idempotent sled persistence, `[member]`/`[char]` markup, and the
//!   read path used by notifications.
//! - **Directory**: traits for the forum's character and member data plus a
//!   JSON-file implementation.
//!
//! ## Module Organization
//!
//! - [`mentions`] - scanner, resolver, markup, hooks and shared types
//! - [`storage`] - sled-backed mention store
//! - [`directory`] - character/member lookup traits and the JSON directory
//! - [`config`] - TOML configuration
//! - [`validation`] - content type and character name checks
//! - [`metrics`] - process-wide counters
//! - [`logutil`] - single-line body previews for logs
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    Scanner      │ ← body → candidate names
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │    Resolver     │ ← candidates → characters (directory, permission)
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Markup/Store   │ ← rendered body, persisted mention rows
//! └─────────────────┘
//! ```

pub mod config;
pub mod directory;
pub mod logutil;
pub mod mentions;
pub mod metrics;
pub mod storage;
pub mod validation;
