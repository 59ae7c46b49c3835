// Template matching tests, non-overlapping and overlapping

use super::special::igamc;
use crate::errors::{AuditError, AuditResult};

pub const APERIODIC_TEMPLATE: [u8; 9] = [0, 0, 0, 0, 0, 0, 0, 0, 1];
pub const ONES_TEMPLATE: [u8; 9] = [1; 9];

pub const NON_OVERLAPPING_BLOCKS: usize = 8;
pub const OVERLAPPING_BLOCK_SIZE: usize = 1032;
const OVERLAPPING_PI: [f64; 6] = [0.364091, 0.185659, 0.139381, 0.100571, 0.070432, 0.139865];

/// Matches of `template` in `block`; after a hit the window jumps past it.
fn count_non_overlapping(block: &[u8], template: &[u8]) -> usize {
    let m = template.len();
    let mut hits = 0;
    let mut i = 0;
    while i + m <= block.len() {
        if &block[i..i + m] == template {
            hits += 1;
            i += m;
        } else {
            i += 1;
        }
    }
    hits
}

pub fn non_overlapping_template(bits: &[u8], template: &[u8], blocks: usize) -> AuditResult<Vec<f64>> {
    let m = template.len();
    let block_size = if blocks == 0 { 0 } else { bits.len() / blocks };
    if m == 0 || block_size < m {
        return Err(AuditError::insufficient(format!(
            "template matching needs {} blocks of at least {} bits",
            blocks, m
        )));
    }
    let two_m = 2f64.powi(m as i32);
    let mu = (block_size - m + 1) as f64 / two_m;
    let sigma2 = block_size as f64 * (1.0 / two_m - (2 * m - 1) as f64 / two_m.powi(2));
    if sigma2 <= 0.0 {
        return Err(AuditError::degenerate("non_overlapping_template", "zero variance"));
    }
    let chi: f64 = bits
        .chunks_exact(block_size)
        .take(blocks)
        .map(|block| (count_non_overlapping(block, template) as f64 - mu).powi(2) / sigma2)
        .sum();
    Ok(vec![igamc(blocks as f64 / 2.0, chi / 2.0)])
}

pub fn overlapping_template(bits: &[u8]) -> AuditResult<Vec<f64>> {
    let m = ONES_TEMPLATE.len();
    let k = OVERLAPPING_PI.len() - 1;
    let blocks = bits.len() / OVERLAPPING_BLOCK_SIZE;
    if blocks == 0 {
        return Err(AuditError::insufficient("overlapping template needs a 1032-bit block"));
    }
    let mut v = [0usize; 6];
    for block in bits.chunks_exact(OVERLAPPING_BLOCK_SIZE) {
        let hits = block.windows(m).filter(|w| *w == ONES_TEMPLATE).count();
        v[hits.min(k)] += 1;
    }
    let n = blocks as f64;
    let chi: f64 = v
        .iter()
        .zip(OVERLAPPING_PI)
        .map(|(&observed, p)| (observed as f64 - n * p).powi(2) / (n * p))
        .sum();
    Ok(vec![igamc(k as f64 / 2.0, chi / 2.0)])
}
