// Token Similarity
//
// Near-duplicate scoring and shared-substring grouping over the token corpus.
// Tokens from a good generator should score low against each other and share
// no long static parts.

use crate::errors::{AuditError, AuditResult};
use std::collections::{BTreeMap, BTreeSet};

/// Shared substrings shorter than this are noise
const MIN_SHARED_LEN: usize = 3;

/// Length of the longest common subsequence of two char slices
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Normalized indel similarity in [0, 1]
fn indel_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * lcs_len(a, b) as f64 / total as f64
}

/// Best alignment of the shorter string against any same-length window of
/// the longer one, as an integer percentage.
pub fn partial_ratio(a: &str, b: &str) -> u32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    let mut best = 0.0f64;
    for window in long.windows(short.len()) {
        best = best.max(indel_ratio(short, window));
        if best >= 1.0 {
            break;
        }
    }
    (best * 100.0).round() as u32
}

/// Mean over tokens of each token's mean similarity to the rest of the corpus.
///
/// Exactly one perfect score is dropped per token (its match against itself);
/// a genuine duplicate still counts. Fewer than two tokens is not enough data.
pub fn fuzzy_similarity(tokens: &[String]) -> AuditResult<f64> {
    if tokens.len() < 2 {
        return Err(AuditError::insufficient(format!(
            "similarity needs at least 2 tokens, corpus has {}",
            tokens.len()
        )));
    }

    let mut averages = Vec::with_capacity(tokens.len());
    for token in tokens {
        let mut self_removed = false;
        let mut scores = Vec::with_capacity(tokens.len() - 1);
        for other in tokens {
            let score = partial_ratio(token, other);
            if score == 100 && !self_removed {
                self_removed = true;
                continue;
            }
            scores.push(score as f64);
        }
        if scores.is_empty() {
            continue;
        }
        averages.push(scores.iter().sum::<f64>() / scores.len() as f64);
    }

    if averages.is_empty() {
        return Err(AuditError::insufficient("no comparable tokens"));
    }
    Ok(averages.iter().sum::<f64>() / averages.len() as f64)
}

/// Longest common contiguous substring; the earliest one in `a` wins ties.
pub fn longest_common_substring(a: &str, b: &str) -> String {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    let (mut best_len, mut best_end) = (0usize, 0usize);

    for i in 0..a.len() {
        for j in 0..b.len() {
            cur[j + 1] = if a[i] == b[j] { prev[j] + 1 } else { 0 };
            if cur[j + 1] > best_len {
                best_len = cur[j + 1];
                best_end = i + 1;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    a[best_end - best_len..best_end].iter().collect()
}

/// Group tokens by the static parts they share with other tokens.
///
/// Every unordered pair of distinct values is compared once; only shared
/// substrings longer than two characters form a group.
pub fn common_substrings(tokens: &[String]) -> BTreeMap<String, Vec<String>> {
    let unique: Vec<&String> = tokens.iter().collect::<BTreeSet<_>>().into_iter().collect();
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (i, first) in unique.iter().enumerate() {
        for second in &unique[i + 1..] {
            let shared = longest_common_substring(first, second);
            if shared.chars().count() < MIN_SHARED_LEN {
                continue;
            }
            let members = groups.entry(shared).or_default();
            for token in [*first, *second] {
                if !members.contains(token) {
                    members.push(token.clone());
                }
            }
        }
    }
    groups
}
