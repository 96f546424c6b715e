//! Input validation for values that end up in storage keys or the character directory.

use crate::mentions::scanner::{decode_entities, DEFAULT_MAX_CANDIDATE_CHARS};

/// Maximum length of a content type tag such as `msg` or `page`.
pub const MAX_CONTENT_TYPE_LEN: usize = 32;

/// Validation errors with helpful messages
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Content type cannot be empty")]
    EmptyContentType,

    #[error("Content type is too long (maximum {max} characters)")]
    ContentTypeTooLong { max: usize },

    #[error("Content type contains invalid characters: {chars}")]
    InvalidContentType { chars: String },

    #[error("Character name is too short (minimum {min} characters)")]
    NameTooShort { min: usize },

    #[error("Character name is too long to be mentioned (maximum {max} characters)")]
    NameTooLong { max: usize },

    #[error("Character name cannot start or end with whitespace")]
    InvalidWhitespace,

    #[error("Character name contains control characters or line breaks")]
    ControlCharacters,
}

/// Character name rules. `max_length` should match the scanner's candidate
/// cap, otherwise a name could be stored that can never be mentioned.
#[derive(Debug, Clone)]
pub struct NameRules {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for NameRules {
    fn default() -> Self {
        NameRules {
            min_length: 1,
            max_length: DEFAULT_MAX_CANDIDATE_CHARS,
        }
    }
}

impl NameRules {
    pub fn with_max_length(max_length: usize) -> Self {
        NameRules {
            max_length,
            ..NameRules::default()
        }
    }
}

/// Content types become part of sled keys, so they are restricted to
/// ASCII letters, digits, `_` and `-`.
pub fn validate_content_type(content_type: &str) -> Result<(), ValidationError> {
    if content_type.is_empty() {
        return Err(ValidationError::EmptyContentType);
    }
    if content_type.len() > MAX_CONTENT_TYPE_LEN {
        return Err(ValidationError::ContentTypeTooLong {
            max: MAX_CONTENT_TYPE_LEN,
        });
    }
    let invalid: String = content_type
        .chars()
        .filter(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        .collect();
    if !invalid.is_empty() {
        return Err(ValidationError::InvalidContentType { chars: invalid });
    }
    Ok(())
}

/// Validate an entity-encoded character name. Length is counted on the
/// decoded text, which is what the scanner measures.
pub fn validate_character_name(name: &str, rules: &NameRules) -> Result<(), ValidationError> {
    let decoded = decode_entities(name);
    let len = decoded.chars().count();
    if len < rules.min_length.max(1) {
        return Err(ValidationError::NameTooShort {
            min: rules.min_length.max(1),
        });
    }
    if len > rules.max_length {
        return Err(ValidationError::NameTooLong {
            max: rules.max_length,
        });
    }
    if decoded.trim() != decoded {
        return Err(ValidationError::InvalidWhitespace);
    }
    if decoded.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacters);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types() {
        assert!(validate_content_type("msg").is_ok());
        assert!(validate_content_type("page-comment_2").is_ok());
        assert_eq!(validate_content_type(""), Err(ValidationError::EmptyContentType));
        assert_eq!(
            validate_content_type("msg:1"),
            Err(ValidationError::InvalidContentType { chars: ":".into() })
        );
        assert!(matches!(
            validate_content_type(&"x".repeat(33)),
            Err(ValidationError::ContentTypeTooLong { max: 32 })
        ));
    }

    #[test]
    fn character_names() {
        let rules = NameRules::default();
        assert!(validate_character_name("Jane Doe", &rules).is_ok());
        // 60 decoded characters even though the stored form is longer
        let long_amp = format!("{}&amp;", "a".repeat(59));
        assert!(validate_character_name(&long_amp, &rules).is_ok());
        assert_eq!(
            validate_character_name(&"a".repeat(61), &rules),
            Err(ValidationError::NameTooLong { max: 60 })
        );
        assert_eq!(
            validate_character_name(" Jane", &rules),
            Err(ValidationError::InvalidWhitespace)
        );
        assert_eq!(
            validate_character_name("Ja\tne", &rules),
            Err(ValidationError::ControlCharacters)
        );
        assert_eq!(
            validate_character_name("", &rules),
            Err(ValidationError::NameTooShort { min: 1 })
        );
    }
}
