// Token tampering for csrf-audit
// Generates tampered copies of a form submission, one strategy at a time

use crate::config::is_token_shaped;
use crate::corpus::seeds::Seeds;
use crate::errors::AuditError;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How a token-shaped field gets tampered with.
///
/// - Remove: drop the field entirely
/// - Clear: keep the field, send an empty value
/// - Generate: forge a same-shape token from the observed alphabets
/// - TruncateAt(i): keep only the first i characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Remove,
    Clear,
    Generate,
    TruncateAt(usize),
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Remove => write!(f, "remove"),
            Strategy::Clear => write!(f, "clear"),
            Strategy::Generate => write!(f, "generate"),
            Strategy::TruncateAt(i) => write!(f, "truncate-at({})", i),
        }
    }
}

impl FromStr for Strategy {
    type Err = AuditError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "remove" => Ok(Strategy::Remove),
            "clear" => Ok(Strategy::Clear),
            "generate" => Ok(Strategy::Generate),
            _ => name
                .strip_prefix("truncate-at(")
                .and_then(|rest| rest.strip_suffix(')'))
                .and_then(|index| index.parse::<usize>().ok())
                .map(Strategy::TruncateAt)
                .ok_or_else(|| AuditError::InvalidStrategy(name.to_string())),
        }
    }
}

/// Apply `strategy` to every token-shaped value in `data`, returning a new map.
pub fn mutate<R: Rng + ?Sized>(
    data: &BTreeMap<String, String>,
    strategy: Strategy,
    seeds: &Seeds,
    rng: &mut R,
) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (name, value) in data {
        if !is_token_shaped(value) {
            out.insert(name.clone(), value.clone());
            continue;
        }
        match strategy {
            Strategy::Remove => {}
            Strategy::Clear => {
                out.insert(name.clone(), String::new());
            }
            Strategy::Generate => {
                out.insert(name.clone(), forge_token(value, seeds, rng));
            }
            Strategy::TruncateAt(i) => {
                out.insert(name.clone(), value.chars().take(i).collect());
            }
        }
    }
    out
}

/// Mutate by strategy name.
///
/// # Panics
///
/// Panics on an unknown strategy name. Names come from calling code, never
/// from the target, so an unknown one is a bug.
pub fn mutate_named<R: Rng + ?Sized>(
    data: &BTreeMap<String, String>,
    strategy: &str,
    seeds: &Seeds,
    rng: &mut R,
) -> BTreeMap<String, String> {
    let strategy = match strategy.parse::<Strategy>() {
        Ok(s) => s,
        Err(e) => panic!("{}", e),
    };
    mutate(data, strategy, seeds, rng)
}

/// Same-shape replacement for `token`: digits are redrawn from the observed
/// digits, lowercase letters from the observed letters, and everything else
/// (uppercase included) is kept as is.
pub fn forge_token<R: Rng + ?Sized>(token: &str, seeds: &Seeds, rng: &mut R) -> String {
    token
        .chars()
        .map(|c| {
            let pool = if c.is_ascii_digit() {
                &seeds.digits
            } else if c.is_ascii_lowercase() {
                &seeds.letters
            } else {
                return c;
            };
            pool.choose(rng).copied().unwrap_or(c)
        })
        .collect()
}

/// The first token-shaped value in a submission
pub fn find_token(data: &BTreeMap<String, String>) -> Option<&str> {
    data.values().map(String::as_str).find(|v| is_token_shaped(v))
}
