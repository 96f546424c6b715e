//! Candidate extraction: turn a stored post body into the set of strings that
//! might name a mentioned character.
//!
//! Scanning works on a prepared copy of the body (quotes removed, line-break
//! markup turned into `\n`, special characters decoded). Each trigger that
//! starts a word opens a buffer; several buffers can be open at once because a
//! trigger inside a name being collected opens a shorter hypothesis of its
//! own. A newline closes everything and a buffer that reaches the length cap
//! stops growing, which bounds the work done for any single trigger.
//!
//! Hypotheses are emitted in the same entity-encoded form the forum stores
//! names in, so they compare directly against the character directory.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

pub const DEFAULT_TRIGGER: char = '@';
pub const DEFAULT_MAX_CANDIDATE_CHARS: usize = 60;

/// Deduplicated candidate names. Ordered so output is stable for logs and the CLI.
pub type CandidateSet = BTreeSet<String>;

/// Knobs for the scanner. Usually built from [`crate::config::MentionsConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub trigger: char,
    /// Longest candidate (trigger excluded, measured in decoded characters).
    pub max_candidate_chars: usize,
    pub strip_quotes: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            trigger: DEFAULT_TRIGGER,
            max_candidate_chars: DEFAULT_MAX_CANDIDATE_CHARS,
            strip_quotes: true,
        }
    }
}

fn quote_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\[quote(?:[\s=][^\]]*)?\]").expect("valid quote open pattern"))
}

fn quote_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\[/quote\]").expect("valid quote close pattern"))
}

fn line_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("valid line break pattern"))
}

/// Remove every complete `[quote]...[/quote]` block, innermost first, until no
/// pair is left. Unpaired tags are left in place.
pub fn strip_quotes(body: &str) -> String {
    let mut text = body.to_string();
    loop {
        let span = quote_close().find_iter(&text).find_map(|close| {
            quote_open()
                .find_iter(&text[..close.start()])
                .last()
                .map(|open| open.start()..close.end())
        });
        match span {
            Some(range) => text.replace_range(range, ""),
            None => break,
        }
    }
    text
}

/// Stored body with quotes dropped and markup spacing normalized, still entity-encoded.
/// This is the text accepted names are re-checked against.
pub fn prepare_body(body: &str, opts: &ScanOptions) -> String {
    let spaced = body.replace("&nbsp;", " ");
    let broken = line_break().replace_all(&spaced, "\n");
    if opts.strip_quotes {
        strip_quotes(&broken)
    } else {
        broken.into_owned()
    }
}

/// Decode the entities `htmlspecialchars` produces. Single pass, so `&amp;lt;`
/// becomes `&lt;` and not `<`.
pub fn decode_entities(text: &str) -> String {
    const ENTITIES: [(&str, char); 7] = [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&#039;", '\''),
        ("&#39;", '\''),
        ("&apos;", '\''),
    ];
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        match ENTITIES.iter().find(|(entity, _)| tail.starts_with(entity)) {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &tail[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Inverse of [`decode_entities`]; matches how the forum stores names.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

struct OpenCandidate {
    text: String,
    chars: usize,
}

/// Collect the raw text following each trigger, trigger removed.
///
/// `text` must already be decoded. A trigger only counts at the start of the
/// text or after whitespace, so addresses like `me@example.org` are ignored.
pub fn scan_candidates(text: &str, opts: &ScanOptions) -> Vec<String> {
    let mut open: Vec<OpenCandidate> = Vec::new();
    let mut finished: Vec<String> = Vec::new();
    let mut prev: Option<char> = None;

    for ch in text.chars() {
        if ch == opts.trigger && prev.map_or(true, char::is_whitespace) {
            open.push(OpenCandidate {
                text: String::new(),
                chars: 0,
            });
        } else if ch == '\n' {
            finished.extend(open.drain(..).map(|c| c.text));
        }

        let mut i = 0;
        while i < open.len() {
            // Buffers include the trigger, hence the +1.
            if open[i].chars > opts.max_candidate_chars {
                finished.push(open.remove(i).text);
                continue;
            }
            open[i].text.push(ch);
            open[i].chars += 1;
            i += 1;
        }
        prev = Some(ch);
    }
    finished.extend(open.into_iter().map(|c| c.text));

    finished
        .into_iter()
        .map(|raw| match raw.strip_prefix(opts.trigger) {
            Some(rest) => rest.to_string(),
            None => raw,
        })
        .collect()
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Split into word runs and single separator characters, separators kept.
fn split_words(raw: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;
    for (idx, ch) in raw.char_indices() {
        if is_word_char(ch) {
            word_start.get_or_insert(idx);
            continue;
        }
        if let Some(start) = word_start.take() {
            tokens.push(&raw[start..idx]);
        }
        tokens.push(&raw[idx..idx + ch.len_utf8()]);
    }
    if let Some(start) = word_start {
        tokens.push(&raw[start..]);
    }
    tokens
}

/// Every token-count prefix of a raw candidate, trimmed and entity-encoded.
/// `"Jane Doe, hi"` gives `Jane`, `Jane Doe`, `Jane Doe,`, `Jane Doe, hi`.
pub fn hypotheses(raw: &str) -> Vec<String> {
    let tokens = split_words(raw);
    let mut out = Vec::with_capacity(tokens.len());
    let mut joined = String::with_capacity(raw.len());
    for token in tokens {
        joined.push_str(token);
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            continue;
        }
        let escaped = html_escape(trimmed);
        if out.last() != Some(&escaped) {
            out.push(escaped);
        }
    }
    out
}

/// Full candidate extraction for a stored body.
///
/// Candidates come back entity-encoded. The `max_candidate_chars` cap counts
/// decoded characters, so `Tom &amp; Jerry` is 11 characters long.
pub fn possible_mentions(body: &str, opts: &ScanOptions) -> CandidateSet {
    let prepared = prepare_body(body, opts);
    possible_mentions_prepared(&prepared, opts)
}

/// Candidate extraction for a body already passed through [`prepare_body`].
pub fn possible_mentions_prepared(prepared: &str, opts: &ScanOptions) -> CandidateSet {
    if !prepared.contains(opts.trigger) {
        return CandidateSet::new();
    }
    let decoded = decode_entities(prepared);
    scan_candidates(&decoded, opts)
        .iter()
        .flat_map(|raw| hypotheses(raw))
        .collect()
}
