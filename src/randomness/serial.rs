// Pattern-frequency tests over overlapping m-bit windows with wrap-around

use super::special::igamc;
use crate::errors::{AuditError, AuditResult};

/// Counts of every m-bit pattern across the sequence, the sequence being
/// extended circularly by its first m-1 bits.
fn pattern_counts(bits: &[u8], m: usize) -> Vec<u64> {
    let mut counts = vec![0u64; 1 << m];
    if m == 0 {
        return counts;
    }
    let n = bits.len();
    for i in 0..n {
        let index = (0..m).fold(0usize, |acc, j| (acc << 1) | bits[(i + j) % n] as usize);
        counts[index] += 1;
    }
    counts
}

fn psi_squared(bits: &[u8], m: usize) -> f64 {
    if m == 0 {
        return 0.0;
    }
    let n = bits.len() as f64;
    let sum: f64 = pattern_counts(bits, m).iter().map(|&c| (c * c) as f64).sum();
    2f64.powi(m as i32) / n * sum - n
}

/// Serial test with block length `m`, two p-values.
pub fn serial_with(bits: &[u8], m: usize) -> AuditResult<Vec<f64>> {
    if m < 2 || bits.len() < m {
        return Err(AuditError::insufficient(format!("serial needs m >= 2 and {} bits", m)));
    }
    let psi_m = psi_squared(bits, m);
    let psi_m1 = psi_squared(bits, m - 1);
    let psi_m2 = psi_squared(bits, m - 2);
    let del1 = psi_m - psi_m1;
    let del2 = psi_m - 2.0 * psi_m1 + psi_m2;
    Ok(vec![
        igamc(2f64.powi(m as i32 - 2), del1 / 2.0),
        igamc(2f64.powi(m as i32 - 3), del2 / 2.0),
    ])
}

/// Serial test with m = floor(log2 n) - 3.
pub fn serial(bits: &[u8]) -> AuditResult<Vec<f64>> {
    let n = bits.len();
    if n < 32 {
        return Err(AuditError::insufficient("serial needs at least 32 bits"));
    }
    let m = n.ilog2() as usize - 3;
    serial_with(bits, m)
}

fn phi(bits: &[u8], m: usize) -> f64 {
    let n = bits.len() as f64;
    pattern_counts(bits, m)
        .into_iter()
        .filter(|&c| c > 0)
        .map(|c| {
            let p = c as f64 / n;
            p * p.ln()
        })
        .sum()
}

pub fn approximate_entropy_with(bits: &[u8], m: usize) -> AuditResult<Vec<f64>> {
    if m == 0 || bits.len() <= m {
        return Err(AuditError::insufficient("approximate entropy needs more than m bits"));
    }
    let n = bits.len() as f64;
    let ap_en = phi(bits, m) - phi(bits, m + 1);
    let chi = 2.0 * n * (2f64.ln() - ap_en);
    Ok(vec![igamc(2f64.powi(m as i32 - 1), chi / 2.0)])
}

pub fn approximate_entropy(bits: &[u8]) -> AuditResult<Vec<f64>> {
    approximate_entropy_with(bits, 5)
}
