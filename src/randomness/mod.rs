// Randomness battery for csrf-audit
//
// The whole token corpus becomes one bitstream (8 bits per byte, most
// significant first). Each test reads a fixed prefix of it; tests whose
// minimum length is not met are reported unavailable, never failed.

pub mod complexity;
pub mod frequency;
pub mod maurer;
pub mod serial;
pub mod spectral;
pub mod special;
pub mod template;
pub mod walk;

use crate::errors::{AuditError, AuditResult};
use crate::models::TestVerdict;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

pub const SIGNIFICANCE: f64 = 0.01;

pub fn bits_from_tokens<S: AsRef<str>>(tokens: &[S]) -> Vec<u8> {
    tokens
        .iter()
        .flat_map(|t| t.as_ref().bytes())
        .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 1))
        .collect()
}

/// "0110..." to bits; any other character is skipped.
pub fn bits_from_str(s: &str) -> Vec<u8> {
    s.chars()
        .filter_map(|c| match c {
            '0' => Some(0),
            '1' => Some(1),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TestOutcome {
    Verdict(TestVerdict),
    Unavailable(String),
    Degenerate(String),
}

impl TestOutcome {
    pub fn passed(&self) -> Option<bool> {
        match self {
            TestOutcome::Verdict(v) => Some(v.pass),
            _ => None,
        }
    }
}

/// Pass when fewer than half the p-values are at or below the significance
/// level. Any non-finite p-value makes the test degenerate.
pub fn judge(name: &str, p_values: Vec<f64>) -> TestOutcome {
    if p_values.is_empty() {
        return TestOutcome::Degenerate("no p-values".to_string());
    }
    if p_values.iter().any(|p| !p.is_finite()) {
        return TestOutcome::Degenerate(format!("non-finite p-value in {}", name));
    }
    let failures = p_values.iter().filter(|&&p| p <= SIGNIFICANCE).count();
    let pass = failures * 2 < p_values.len();
    TestOutcome::Verdict(TestVerdict {
        name: name.to_string(),
        p_values,
        pass,
    })
}

pub struct BatteryEntry {
    pub name: &'static str,
    /// Bits consumed from the start of the stream; None means all of it
    pub prefix: Option<usize>,
    pub min_bits: usize,
    pub run: fn(&[u8]) -> AuditResult<Vec<f64>>,
}

impl BatteryEntry {
    pub fn evaluate(&self, bits: &[u8]) -> TestOutcome {
        if bits.len() < self.min_bits {
            return TestOutcome::Unavailable(format!(
                "needs {} bits, have {}",
                self.min_bits,
                bits.len()
            ));
        }
        let end = self.prefix.map_or(bits.len(), |p| p.min(bits.len()));
        match (self.run)(&bits[..end]) {
            Ok(p_values) => judge(self.name, p_values),
            Err(AuditError::DegenerateStatistic { reason, .. }) => TestOutcome::Degenerate(reason),
            Err(e) => TestOutcome::Unavailable(e.to_string()),
        }
    }
}

fn block_frequency_20(bits: &[u8]) -> AuditResult<Vec<f64>> {
    frequency::block_frequency(bits, 20)
}

fn aperiodic_template(bits: &[u8]) -> AuditResult<Vec<f64>> {
    template::non_overlapping_template(bits, &template::APERIODIC_TEMPLATE, template::NON_OVERLAPPING_BLOCKS)
}

pub static BATTERY: [BatteryEntry; 15] = [
    BatteryEntry { name: "monobit", prefix: Some(100), min_bits: 100, run: frequency::monobit },
    BatteryEntry { name: "block_frequency", prefix: Some(2000), min_bits: 100, run: block_frequency_20 },
    BatteryEntry { name: "runs", prefix: None, min_bits: 100, run: frequency::runs },
    BatteryEntry { name: "longest_run", prefix: None, min_bits: 128, run: frequency::longest_run },
    BatteryEntry { name: "spectral", prefix: Some(1024), min_bits: 1000, run: spectral::spectral },
    BatteryEntry {
        name: "non_overlapping_template",
        prefix: Some(1_048_576),
        min_bits: 1000,
        run: aperiodic_template,
    },
    BatteryEntry {
        name: "overlapping_template",
        prefix: Some(998_976),
        min_bits: 5160,
        run: template::overlapping_template,
    },
    BatteryEntry { name: "serial", prefix: Some(500), min_bits: 100, run: serial::serial },
    BatteryEntry { name: "cumulative_sums", prefix: Some(100), min_bits: 100, run: walk::cumulative_sums },
    BatteryEntry {
        name: "random_excursions",
        prefix: Some(1_000_000),
        min_bits: 2 * walk::MIN_CYCLES,
        run: walk::random_excursions,
    },
    BatteryEntry {
        name: "random_excursions_variant",
        prefix: Some(1_000_000),
        min_bits: 2 * walk::MIN_CYCLES,
        run: walk::random_excursions_variant,
    },
    BatteryEntry { name: "approximate_entropy", prefix: Some(500), min_bits: 500, run: serial::approximate_entropy },
    BatteryEntry {
        name: "maurer_universal",
        prefix: Some(387_840),
        min_bits: 4224,
        run: maurer::maurer_universal,
    },
    BatteryEntry {
        name: "linear_complexity",
        prefix: Some(1_000_000),
        min_bits: 2000,
        run: complexity::linear_complexity,
    },
    BatteryEntry { name: "binary_matrix_rank", prefix: None, min_bits: 38_912, run: complexity::binary_matrix_rank },
];

/// Every test's outcome, keyed by test name.
pub fn run_battery_detailed(bits: &[u8]) -> BTreeMap<String, TestOutcome> {
    BATTERY
        .par_iter()
        .map(|spec| (spec.name.to_string(), spec.evaluate(bits)))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

/// Test name to pass/fail for every test that produced a verdict.
pub fn run_randomness_battery<S: AsRef<str>>(tokens: &[S]) -> BTreeMap<String, bool> {
    let bits = bits_from_tokens(tokens);
    debug!("Randomness battery over {} bits", bits.len());
    run_battery_detailed(&bits)
        .into_iter()
        .filter_map(|(name, outcome)| {
            if let TestOutcome::Unavailable(reason) | TestOutcome::Degenerate(reason) = &outcome {
                debug!("{} skipped: {}", name, reason);
            }
            outcome.passed().map(|pass| (name, pass))
        })
        .collect()
}
