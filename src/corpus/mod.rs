// Token Corpus Analysis Module
//
// Pure functions over the tokens collected during a crawl:
//
// - classifier: per-value strength and field-name heuristics
// - replay: cross-URL token reuse
// - similarity: fuzzy near-duplicate scoring and shared static parts
// - seeds: observed alphabets for forging
// - hashes: static hash-shape hints
//
// Architecture:
//   classifier.rs (leaf)  <- evaluate.rs, differential.rs
//   seeds.rs (leaf)       <- mutator.rs
//   replay.rs, similarity.rs -> analyze_corpus() below

pub mod classifier;
pub mod hashes;
pub mod replay;
pub mod seeds;
pub mod similarity;

pub use classifier::*;
pub use hashes::*;
pub use replay::*;
pub use seeds::*;
pub use similarity::*;

use crate::errors::AuditResult;
use crate::models::TokenDatabase;
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything the comparing phase reports about a corpus
#[derive(Debug, Clone, Serialize)]
pub struct CorpusAnalysis {
    pub replay: ReplayReport,
    /// Err when the corpus holds fewer than two tokens
    #[serde(skip)]
    pub mean_similarity: AuditResult<f64>,
    pub substring_groups: BTreeMap<String, Vec<String>>,
}

pub fn analyze_corpus(db: &TokenDatabase) -> CorpusAnalysis {
    let tokens = db.values();
    CorpusAnalysis {
        replay: detect_replay(db),
        mean_similarity: fuzzy_similarity(&tokens),
        substring_groups: common_substrings(&tokens),
    }
}
