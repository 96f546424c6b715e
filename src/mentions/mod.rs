//! # Mentions - `@name` references in post bodies
//!
//! The pipeline runs in three steps, each a stateless module:
//!
//! - [`scanner`] - extract candidate names from a body
//! - [`resolver`] - match candidates against the character directory
//! - [`markup`] - render accepted mentions as `[member]` / `[char]` tags
//!
//! Persistence lives in [`crate::storage::MentionStore`].
//!
//! ```rust
//! use storybb_mentions::directory::JsonDirectory;
//! use storybb_mentions::mentions::{mentioned_characters, render_body, CharacterRecord, ScanOptions};
//!
//! let directory = JsonDirectory::from_records(
//!     vec![CharacterRecord { id: 7, member_id: 2, name: "Jane Doe".into(), is_main: false, retired: false }],
//!     vec![],
//! );
//! let opts = ScanOptions::default();
//! let body = "Hello @Jane Doe, nice to meet you";
//! let found = mentioned_characters(body, 1, &directory, &|_: u64| true, &opts).unwrap();
//! assert!(found.contains_key(&7));
//! let rendered = render_body(body, found.values(), opts.trigger);
//! assert_eq!(rendered, "Hello [char=7]Jane Doe[/char], nice to meet you");
//! ```

pub mod errors;
pub mod hooks;
pub mod markup;
pub mod resolver;
pub mod scanner;
pub mod types;

pub use errors::MentionError;
pub use hooks::MentionHooks;
pub use markup::{existing_mentions, render_body, ExistingMentions};
pub use resolver::{mentioned_characters, MentionMap};
pub use scanner::{possible_mentions, CandidateSet, ScanOptions};
pub use types::{CharacterRecord, MemberRecord, MentionNotice, MentionRecord, ResolvedMention};
