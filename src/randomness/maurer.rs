// Maurer's universal statistical test (compressibility)

use super::special::erfc;
use crate::errors::{AuditError, AuditResult};
use std::f64::consts::SQRT_2;

pub const BLOCK_LENGTH: usize = 6;
pub const INIT_BLOCKS: usize = 640;
const EXPECTED: f64 = 5.217_705_2;
const VARIANCE: f64 = 2.954;

pub fn maurer_universal(bits: &[u8]) -> AuditResult<Vec<f64>> {
    let l = BLOCK_LENGTH;
    let q = INIT_BLOCKS;
    let total_blocks = bits.len() / l;
    if total_blocks <= q {
        return Err(AuditError::insufficient(format!(
            "universal test needs more than {} blocks of {} bits",
            q, l
        )));
    }
    let k = total_blocks - q;

    let block_value = |i: usize| -> usize {
        bits[i * l..(i + 1) * l]
            .iter()
            .fold(0usize, |acc, &b| (acc << 1) | b as usize)
    };

    // last position (1-based) each pattern was seen at
    let mut last_seen = vec![0usize; 1 << l];
    for i in 0..q {
        last_seen[block_value(i)] = i + 1;
    }
    let mut sum = 0.0;
    for i in q..total_blocks {
        let v = block_value(i);
        sum += ((i + 1 - last_seen[v]) as f64).log2();
        last_seen[v] = i + 1;
    }

    let kf = k as f64;
    let lf = l as f64;
    let f_n = sum / kf;
    let c = 0.7 - 0.8 / lf + (4.0 + 32.0 / lf) * kf.powf(-3.0 / lf) / 15.0;
    let sigma = c * (VARIANCE / kf).sqrt();
    if sigma == 0.0 || !sigma.is_finite() {
        return Err(AuditError::degenerate("maurer_universal", "zero variance"));
    }
    Ok(vec![erfc((f_n - EXPECTED).abs() / (SQRT_2 * sigma))])
}
