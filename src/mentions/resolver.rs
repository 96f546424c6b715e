//! Matching candidate hypotheses against the character directory.
//!
//! The scanner overgenerates on purpose; this is where ambiguity is settled.
//! Directory hits are walked longest name first and each trigger in the body
//! can be claimed by one character only, so `@Jane Doe` resolves to "Jane Doe"
//! even when a "Jane" exists too. A hit that has no literal `@<name>` left to
//! claim is dropped.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::directory::{CharacterDirectory, MentionPermission};
use crate::logutil::body_preview;
use crate::mentions::errors::MentionError;
use crate::mentions::markup::{existing_mentions, inside_span, match_ignore_case, tag_spans, trigger_at};
use crate::mentions::scanner::{possible_mentions_prepared, prepare_body, ScanOptions};
use crate::mentions::types::{CharacterRecord, ResolvedMention};
use crate::metrics;

/// Resolved mentions keyed by character id.
pub type MentionMap = BTreeMap<u64, ResolvedMention>;

fn by_name_length_desc(a: &CharacterRecord, b: &CharacterRecord) -> std::cmp::Ordering {
    b.name
        .chars()
        .count()
        .cmp(&a.name.chars().count())
        .then(a.id.cmp(&b.id))
}

/// Assign trigger positions in `body` to characters, longest name first.
///
/// Returns each accepted character with the first position it claimed.
/// Triggers covered by an accepted name, or sitting inside existing mention
/// markup, cannot be claimed by anyone else.
/// `body` is the prepared (quote-stripped, still encoded) text.
pub fn claim_positions(
    body: &str,
    mut characters: Vec<CharacterRecord>,
    trigger: char,
) -> Vec<ResolvedMention> {
    characters.sort_by(by_name_length_desc);
    let spans = tag_spans(body);
    let triggers: Vec<usize> = body
        .char_indices()
        .map(|(idx, _)| idx)
        .filter(|&idx| trigger_at(body, idx, trigger) && !inside_span(&spans, idx))
        .collect();
    let mut claimed: BTreeSet<usize> = BTreeSet::new();
    let mut accepted = Vec::new();

    for character in characters {
        let mut first = None;
        for &pos in &triggers {
            if claimed.contains(&pos) {
                continue;
            }
            let after = pos + trigger.len_utf8();
            if let Some(len) = match_ignore_case(&body[after..], &character.name) {
                let end = after + len;
                claimed.extend(triggers.iter().copied().filter(|&t| t >= pos && t < end));
                first.get_or_insert(pos);
            }
        }
        if let Some(pos) = first {
            accepted.push(ResolvedMention {
                character,
                position: Some(pos),
            });
        }
    }
    accepted
}

/// Characters mentioned in `body` by `actor`.
///
/// Returns an empty map without touching the directory when the actor may
/// not mention, or when the body has neither candidates nor existing tags.
pub fn mentioned_characters<D, P>(
    body: &str,
    actor: u64,
    directory: &D,
    permission: &P,
    opts: &ScanOptions,
) -> Result<MentionMap, MentionError>
where
    D: CharacterDirectory + ?Sized,
    P: MentionPermission + ?Sized,
{
    if body.trim().is_empty() {
        return Ok(MentionMap::new());
    }
    if !permission.may_mention(actor) {
        metrics::inc_permission_denied();
        debug!("Member {} may not mention; skipping lookup", actor);
        return Ok(MentionMap::new());
    }

    let prepared = prepare_body(body, opts);
    let candidates = possible_mentions_prepared(&prepared, opts);
    let existing = existing_mentions(&prepared);
    metrics::observe_scan(candidates.len());
    if candidates.is_empty() && existing.is_empty() {
        return Ok(MentionMap::new());
    }

    let mut resolved = MentionMap::new();
    if !candidates.is_empty() {
        metrics::inc_directory_lookups();
        let hits: Vec<CharacterRecord> = directory
            .find_by_names(&candidates, candidates.len())?
            .into_iter()
            .filter(|c| !c.retired)
            .collect();
        let hit_count = hits.len();
        let accepted = claim_positions(&prepared, hits, opts.trigger);
        metrics::observe_resolution(accepted.len(), hit_count - accepted.len());
        for mention in accepted {
            resolved.insert(mention.character_id(), mention);
        }
    }

    for member_id in &existing.members {
        if let Some(main) = directory.main_character(*member_id)? {
            if !main.retired {
                resolved.entry(main.id).or_insert(ResolvedMention {
                    character: main,
                    position: None,
                });
            }
        }
    }
    for character_id in &existing.characters {
        if let Some(character) = directory.character(*character_id)? {
            if !character.retired {
                resolved.entry(character.id).or_insert(ResolvedMention {
                    character,
                    position: None,
                });
            }
        }
    }

    debug!(
        "Resolved {} mention(s) from {} candidate(s) in '{}'",
        resolved.len(),
        candidates.len(),
        body_preview(body)
    );
    Ok(resolved)
}
