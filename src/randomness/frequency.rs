// Frequency-family tests: monobit, block frequency, runs, longest run of ones

use super::special::{erfc, igamc};
use crate::errors::{AuditError, AuditResult};
use std::f64::consts::SQRT_2;

/// Proportion of ones over the whole sequence.
pub fn monobit(bits: &[u8]) -> AuditResult<Vec<f64>> {
    if bits.is_empty() {
        return Err(AuditError::insufficient("empty bitstream"));
    }
    let n = bits.len() as f64;
    let sum: i64 = bits.iter().map(|&b| if b == 1 { 1 } else { -1 }).sum();
    let s_obs = (sum as f64).abs() / n.sqrt();
    Ok(vec![erfc(s_obs / SQRT_2)])
}

/// Proportion of ones inside consecutive `block_size`-bit blocks.
pub fn block_frequency(bits: &[u8], block_size: usize) -> AuditResult<Vec<f64>> {
    let blocks = if block_size == 0 { 0 } else { bits.len() / block_size };
    if blocks == 0 {
        return Err(AuditError::insufficient(format!(
            "block frequency needs at least one {}-bit block",
            block_size
        )));
    }
    let m = block_size as f64;
    let chi: f64 = bits
        .chunks_exact(block_size)
        .map(|block| {
            let pi = block.iter().filter(|&&b| b == 1).count() as f64 / m;
            (pi - 0.5).powi(2)
        })
        .sum::<f64>()
        * 4.0
        * m;
    Ok(vec![igamc(blocks as f64 / 2.0, chi / 2.0)])
}

/// Number of uninterrupted runs of identical bits.
pub fn runs(bits: &[u8]) -> AuditResult<Vec<f64>> {
    if bits.len() < 2 {
        return Err(AuditError::insufficient("runs needs two bits"));
    }
    let n = bits.len() as f64;
    let pi = bits.iter().filter(|&&b| b == 1).count() as f64 / n;
    let spread = pi * (1.0 - pi);
    if spread == 0.0 {
        return Err(AuditError::degenerate("runs", "sequence is constant"));
    }
    let v_obs = 1 + bits.windows(2).filter(|w| w[0] != w[1]).count();
    let num = (v_obs as f64 - 2.0 * n * spread).abs();
    let den = 2.0 * (2.0 * n).sqrt() * spread;
    Ok(vec![erfc(num / den)])
}

/// Block size, smallest counted run, and class probabilities for the
/// longest-run test at a given sequence length.
fn longest_run_table(n: usize) -> Option<(usize, usize, &'static [f64])> {
    const SHORT: [f64; 4] = [0.2148, 0.3672, 0.2305, 0.1875];
    const MEDIUM: [f64; 6] = [0.1174, 0.2430, 0.2493, 0.1752, 0.1027, 0.1124];
    const LONG: [f64; 7] = [0.0882, 0.2092, 0.2483, 0.1933, 0.1208, 0.0675, 0.0727];
    match n {
        0..=127 => None,
        128..=6271 => Some((8, 1, &SHORT)),
        6272..=749_999 => Some((128, 4, &MEDIUM)),
        _ => Some((10_000, 10, &LONG)),
    }
}

fn longest_ones(block: &[u8]) -> usize {
    let mut best = 0;
    let mut current = 0;
    for &b in block {
        if b == 1 {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}

/// Longest run of ones within M-bit blocks, M chosen by sequence length.
pub fn longest_run(bits: &[u8]) -> AuditResult<Vec<f64>> {
    let (m, low, pi) = longest_run_table(bits.len())
        .ok_or_else(|| AuditError::insufficient("longest run needs 128 bits"))?;
    let k = pi.len() - 1;
    let mut v = vec![0usize; pi.len()];
    for block in bits.chunks_exact(m) {
        let run = longest_ones(block).clamp(low, low + k);
        v[run - low] += 1;
    }
    let blocks = (bits.len() / m) as f64;
    let chi: f64 = v
        .iter()
        .zip(pi)
        .map(|(&observed, &p)| {
            let expected = blocks * p;
            (observed as f64 - expected).powi(2) / expected
        })
        .sum();
    Ok(vec![igamc(k as f64 / 2.0, chi / 2.0)])
}
