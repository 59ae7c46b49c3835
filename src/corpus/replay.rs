// Replay Detection
//
// A token value seen on two different URLs means the server hands out the
// same token regardless of page: a replayable token. The same value on a URL
// that was simply revisited is not evidence of replay.

use crate::models::TokenDatabase;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayPair {
    pub first_url: String,
    pub second_url: String,
    pub shared_tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReplayReport {
    /// Every token value in the corpus is unique
    NoDuplicates,
    /// Tokens reused across different URLs
    Confirmed(Vec<ReplayPair>),
    /// Duplicates exist, but only on revisits of the same URL
    FalsePositive,
}

impl ReplayReport {
    pub fn pairs(&self) -> &[ReplayPair] {
        match self {
            ReplayReport::Confirmed(pairs) => pairs,
            _ => &[],
        }
    }
}

pub fn detect_replay(db: &TokenDatabase) -> ReplayReport {
    let all = db.values();
    let unique: HashSet<&String> = all.iter().collect();
    if unique.len() == all.len() {
        return ReplayReport::NoDuplicates;
    }

    let records = db.records();
    let mut pairs = Vec::new();
    for (i, first) in records.iter().enumerate() {
        for second in &records[i + 1..] {
            if first.url == second.url {
                continue;
            }
            let shared: Vec<String> = first.tokens.intersection(&second.tokens).cloned().collect();
            if !shared.is_empty() {
                pairs.push(ReplayPair {
                    first_url: first.url.clone(),
                    second_url: second.url.clone(),
                    shared_tokens: shared,
                });
            }
        }
    }

    if pairs.is_empty() {
        ReplayReport::FalsePositive
    } else {
        ReplayReport::Confirmed(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn cross_url_reuse_is_replay() {
        let mut db = TokenDatabase::new();
        db.push("A", set(&["X"]));
        db.push("B", set(&["X"]));
        let report = detect_replay(&db);
        assert_eq!(report.pairs().len(), 1);
        assert_eq!(report.pairs()[0].first_url, "A");
        assert_eq!(report.pairs()[0].second_url, "B");
        assert_eq!(report.pairs()[0].shared_tokens, vec!["X".to_string()]);
    }

    #[test]
    fn revisit_is_false_positive() {
        let mut db = TokenDatabase::new();
        db.push("A", set(&["X"]));
        db.push("A", set(&["X"]));
        assert_eq!(detect_replay(&db), ReplayReport::FalsePositive);
    }

    #[test]
    fn unique_tokens() {
        let mut db = TokenDatabase::new();
        db.push("A", set(&["X"]));
        db.push("B", set(&["Y"]));
        db.push("C", set(&[]));
        assert_eq!(detect_replay(&db), ReplayReport::NoDuplicates);
    }
}
