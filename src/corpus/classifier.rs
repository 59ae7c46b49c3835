// Token Strength & Name Heuristics
//
// STATIC ANALYSIS of individual token values and the fields that carry them.
// Two independent signals are produced and never merged into one score:
//
// - strength(value): how many distinct alphanumeric characters the value uses,
//   halved when it has no digit at all
// - is_token_name(name): whether the field name looks like a token field
//
// Example:
//   strength("abc123")  -> 6.0
//   strength("abcdef")  -> 3.0
//   is_token_name("CSRF") -> true
//
// Used by: evaluate.rs for weak/insecure form detection, differential.rs for
// the freshness probe

use crate::config::{COMMON_TOKEN_NAMES, STRONG_TOKEN_STRENGTH, TOKEN_CHARSET};
use std::collections::BTreeSet;

/// Distinct digits, lowercase and uppercase letters in `token`; halved when no
/// digit is present.
pub fn strength(token: &str) -> f64 {
    let distinct: BTreeSet<char> = token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    let count = distinct.len() as f64;
    if distinct.iter().any(|c| c.is_ascii_digit()) {
        count
    } else {
        count / 2.0
    }
}

pub fn is_strong(token: &str) -> bool {
    strength(token) > STRONG_TOKEN_STRENGTH
}

/// Value uses only the characters a token would (word chars and dashes)
pub fn is_token_charset(value: &str) -> bool {
    !value.is_empty() && TOKEN_CHARSET.is_match(value)
}

/// Field name matches one of the common token names exactly (case-insensitive)
pub fn is_token_name(name: &str) -> bool {
    let lowered = name.to_lowercase();
    COMMON_TOKEN_NAMES.iter().any(|n| *n == lowered)
}

/// How a single field value should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAssessment {
    /// Strong enough to count as protection
    Protection,
    /// Weak value in a field named like a token
    Weak,
    /// Not a token
    Ignored,
}

pub fn assess_field(name: &str, value: &str) -> FieldAssessment {
    if !is_token_charset(value) {
        return FieldAssessment::Ignored;
    }
    if is_strong(value) {
        FieldAssessment::Protection
    } else if is_token_name(name) {
        FieldAssessment::Weak
    } else {
        FieldAssessment::Ignored
    }
}
