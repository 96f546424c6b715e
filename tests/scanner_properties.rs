//! Candidate extraction behaviour on realistic post bodies.

use storybb_mentions::mentions::scanner::{decode_entities, possible_mentions, ScanOptions};

fn scan(body: &str) -> Vec<String> {
    possible_mentions(body, &ScanOptions::default())
        .into_iter()
        .collect()
}

#[test]
fn bodies_without_trigger_have_no_candidates() {
    for body in [
        "",
        "just words",
        "line one<br>line two",
        "[quote]nothing here[/quote]",
        "mail me at someone(at)example.org",
    ] {
        assert!(scan(body).is_empty(), "unexpected candidates for {:?}", body);
    }
}

#[test]
fn multi_word_names_produce_every_prefix() {
    let found = scan("Hello @Jane Doe, nice to meet you");
    for expected in ["Jane", "Jane Doe", "Jane Doe,", "Jane Doe, nice"] {
        assert!(found.iter().any(|c| c == expected), "missing {:?} in {:?}", expected, found);
    }
    assert!(!found.iter().any(|c| c.starts_with("Hello")));
}

#[test]
fn candidates_respect_the_length_cap() {
    let body = format!(
        "@{} and @{} @short",
        "word ".repeat(30),
        "x".repeat(100)
    );
    let found = scan(&body);
    assert!(!found.is_empty());
    for candidate in &found {
        assert!(candidate.chars().count() <= 60, "{:?} is too long", candidate);
    }

    let tight = ScanOptions {
        max_candidate_chars: 10,
        ..ScanOptions::default()
    };
    for candidate in possible_mentions(&body, &tight) {
        assert!(candidate.chars().count() <= 10, "{:?} is too long", candidate);
    }
}

#[test]
fn length_cap_counts_decoded_characters() {
    let body = format!("@{} @{}", "&amp;".repeat(70), "Tom &amp; Jerry &quot;".repeat(10));
    let found = scan(&body);
    let longest = found
        .iter()
        .map(|c| decode_entities(c).chars().count())
        .max()
        .unwrap_or(0);
    assert_eq!(longest, 60);
    for candidate in &found {
        assert!(
            decode_entities(candidate).chars().count() <= 60,
            "{:?} is too long",
            candidate
        );
    }
    // The stored form is longer than the cap.
    assert!(found.contains(&"&amp;".repeat(60)));
}

#[test]
fn quoted_mentions_are_excluded() {
    let found = scan("[quote]@Ghost[/quote] @Jane");
    assert_eq!(found, vec!["Jane".to_string()]);

    let nested = scan("[quote author=a][quote]@Ghost[/quote]@Ghost two[/quote]@Jane");
    assert_eq!(nested, vec!["Jane".to_string()]);
}

#[test]
fn quotes_can_be_kept_when_configured() {
    let opts = ScanOptions {
        strip_quotes: false,
        ..ScanOptions::default()
    };
    let found = possible_mentions("[quote] @Ghost[/quote]", &opts);
    assert!(found.contains("Ghost"));
}

#[test]
fn newline_cuts_the_candidate() {
    assert_eq!(scan("@Jane\nDoe"), vec!["Jane".to_string()]);
    assert_eq!(scan("@Jane<br />Doe"), vec!["Jane".to_string()]);
}

#[test]
fn trigger_needs_whitespace_or_start() {
    assert!(scan("write to jane@example.org").is_empty());
    let found = scan("cc:@Jane\t@Rook");
    assert_eq!(found, vec!["Rook".to_string()]);
}

#[test]
fn nested_trigger_keeps_both_hypotheses() {
    let found = scan("@Ann @Bo");
    assert!(found.contains(&"Ann".to_string()));
    assert!(found.contains(&"Ann @Bo".to_string()));
    assert!(found.contains(&"Bo".to_string()));
}

#[test]
fn encoded_bodies_yield_encoded_candidates() {
    let found = scan("thanks @Tom &amp; Jerry!");
    assert!(found.contains(&"Tom &amp; Jerry".to_string()));
    assert!(found.contains(&"Tom &amp; Jerry!".to_string()));
}

#[test]
fn unmatched_quote_text_is_scanned_normally() {
    let found = scan("[quote] @Jane never closed");
    assert!(found.contains(&"Jane".to_string()));
}

#[test]
fn custom_trigger() {
    let opts = ScanOptions {
        trigger: '+',
        ..ScanOptions::default()
    };
    let found = possible_mentions("ping +Rook and @Jane", &opts);
    assert!(found.contains("Rook"));
    assert!(!found.iter().any(|c| c.contains("Jane") && !c.starts_with("Rook")));
}
