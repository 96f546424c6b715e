//! Mention markup: rendering resolved mentions into a body, and reading the
//! `[member=ID]` / `[char=ID]` tags a previously rendered body already carries.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::mentions::types::{CharacterRecord, ResolvedMention};

fn member_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\[member=(\d+)\]").expect("valid member tag pattern"))
}

fn char_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\[char=(\d+)\]").expect("valid char tag pattern"))
}

fn tag_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)\[member=\d+\].*?\[/member\]|\[char=\d+\].*?\[/char\]")
            .expect("valid tag span pattern")
    })
}

/// Byte ranges of complete mention tags, start mapped to end. Text inside
/// them is already rendered and never matched again.
pub(crate) fn tag_spans(body: &str) -> BTreeMap<usize, usize> {
    tag_span()
        .find_iter(body)
        .map(|m| (m.start(), m.end()))
        .collect()
}

pub(crate) fn inside_span(spans: &BTreeMap<usize, usize>, idx: usize) -> bool {
    spans
        .range(..=idx)
        .next_back()
        .map_or(false, |(_, &end)| idx < end)
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn spacing_markup_tail() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:&nbsp;|<br\s*/?>)$").expect("valid spacing pattern"))
}

/// A trigger only opens a mention at the start of the text or after
/// whitespace. `&nbsp;` and `<br>` count as whitespace in a stored body.
pub(crate) fn trigger_at(body: &str, idx: usize, trigger: char) -> bool {
    if !body[idx..].starts_with(trigger) {
        return false;
    }
    let before = &body[..idx];
    match before.chars().next_back() {
        None => true,
        Some(c) if c.is_whitespace() => true,
        Some(';') | Some('>') => spacing_markup_tail().is_match(before),
        Some(_) => false,
    }
}

/// Byte length of the prefix of `haystack` equal to `name`, ignoring case.
pub(crate) fn match_ignore_case(haystack: &str, name: &str) -> Option<usize> {
    if name.is_empty() {
        return None;
    }
    let mut hay = haystack.char_indices();
    for wanted in name.chars() {
        let (_, found) = hay.next()?;
        if !chars_eq_ignore_case(found, wanted) {
            return None;
        }
    }
    Some(hay.next().map_or(haystack.len(), |(idx, _)| idx))
}

/// Markup for one mention: member markup for a main character, character markup otherwise.
pub fn mention_tag(character: &CharacterRecord) -> String {
    if character.is_main {
        format!("[member={}]{}[/member]", character.member_id, character.name)
    } else {
        format!("[char={}]{}[/char]", character.id, character.name)
    }
}

/// Replace each `<trigger><name>` of the given mentions with its markup.
///
/// One left-to-right pass with the longest names tried first at every
/// trigger, so `@Jane Doe` is never split into `@Jane` plus text. Inserted
/// markup and tags already in the body are copied through untouched, even when
/// a name inside them contains the trigger. Rendering a rendered body returns
/// it unchanged.
pub fn render_body<'a, I>(body: &str, mentions: I, trigger: char) -> String
where
    I: IntoIterator<Item = &'a ResolvedMention>,
{
    let mut characters: Vec<&CharacterRecord> =
        mentions.into_iter().map(|m| &m.character).collect();
    if characters.is_empty() {
        return body.to_string();
    }
    characters.sort_by(|a, b| {
        b.name
            .chars()
            .count()
            .cmp(&a.name.chars().count())
            .then(a.id.cmp(&b.id))
    });

    let spans = tag_spans(body);
    let mut out = String::with_capacity(body.len() + characters.len() * 24);
    let mut idx = 0;
    while let Some(ch) = body[idx..].chars().next() {
        if let Some(&end) = spans.get(&idx) {
            out.push_str(&body[idx..end]);
            idx = end;
            continue;
        }
        if ch == trigger && trigger_at(body, idx, trigger) {
            let after = idx + ch.len_utf8();
            let hit = characters.iter().find_map(|c| {
                match_ignore_case(&body[after..], &c.name).map(|len| (*c, len))
            });
            if let Some((character, len)) = hit {
                out.push_str(&mention_tag(character));
                idx = after + len;
                continue;
            }
        }
        out.push(ch);
        idx += ch.len_utf8();
    }
    out
}

/// Ids referenced by mention markup already present in a body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingMentions {
    /// Member ids from `[member=ID]`; these point at the member's main character.
    pub members: BTreeSet<u64>,
    /// Character ids from `[char=ID]`.
    pub characters: BTreeSet<u64>,
}

impl ExistingMentions {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.characters.is_empty()
    }
}

pub fn existing_mentions(body: &str) -> ExistingMentions {
    let collect = |re: &Regex| -> BTreeSet<u64> {
        re.captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .filter_map(|id| id.as_str().parse::<u64>().ok())
            .filter(|id| *id != 0)
            .collect()
    };
    ExistingMentions {
        members: collect(member_tag()),
        characters: collect(char_tag()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mention(id: u64, member_id: u64, name: &str, is_main: bool) -> ResolvedMention {
        ResolvedMention {
            character: CharacterRecord {
                id,
                member_id,
                name: name.to_string(),
                is_main,
                retired: false,
            },
            position: None,
        }
    }

    #[test]
    fn match_is_case_insensitive_and_reports_byte_length() {
        assert_eq!(match_ignore_case("jANE doe!", "Jane Doe"), Some(8));
        assert_eq!(match_ignore_case("Jan", "Jane"), None);
        assert_eq!(match_ignore_case("ÉLODIE x", "élodie"), Some(7));
        assert_eq!(match_ignore_case("anything", ""), None);
    }

    #[test]
    fn main_and_secondary_characters_use_different_tags() {
        let mentions = [mention(7, 2, "Jane", true), mention(9, 2, "Rook", false)];
        let out = render_body("hi @jane and @Rook.", mentions.iter(), '@');
        assert_eq!(out, "hi [member=2]Jane[/member] and [char=9]Rook[/char].");
    }

    #[test]
    fn longest_name_is_rendered_first() {
        let mentions = [mention(1, 1, "Jane", false), mention(2, 3, "Jane Doe", false)];
        let out = render_body("@Jane Doe and @Jane", mentions.iter(), '@');
        assert_eq!(out, "[char=2]Jane Doe[/char] and [char=1]Jane[/char]");
    }

    #[test]
    fn addresses_are_not_rendered() {
        let mentions = [mention(1, 1, "Jane", true)];
        let out = render_body("mail jane@jane.org or @Jane", mentions.iter(), '@');
        assert_eq!(out, "mail jane@jane.org or [member=1]Jane[/member]");
        let out = render_body("hi&nbsp;@Jane<br />@Jane", mentions.iter(), '@');
        assert_eq!(out, "hi&nbsp;[member=1]Jane[/member]<br />[member=1]Jane[/member]");
    }

    #[test]
    fn existing_tags_are_copied_through() {
        let mentions = [mention(1, 1, "Bo @Al", false), mention(2, 2, "Al", false)];
        let body = "hi [char=1]Bo @Al[/char] and @Al";
        assert_eq!(
            render_body(body, mentions.iter(), '@'),
            "hi [char=1]Bo @Al[/char] and [char=2]Al[/char]"
        );
        let spans = tag_spans(body);
        assert!(inside_span(&spans, body.find('@').unwrap()));
        assert!(!inside_span(&spans, body.rfind('@').unwrap()));
    }

    #[test]
    fn existing_tags_are_collected() {
        let found = existing_mentions("[member=4]A[/member] [CHAR=12]B[/char] [char=0]x[/char]");
        assert_eq!(found.members.into_iter().collect::<Vec<_>>(), vec![4]);
        assert_eq!(found.characters.into_iter().collect::<Vec<_>>(), vec![12]);
    }
}
