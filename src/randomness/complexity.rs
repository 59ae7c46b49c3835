// Linear complexity and binary matrix rank tests

use super::special::igamc;
use crate::errors::{AuditError, AuditResult};

pub const LFSR_BLOCK: usize = 10;
const LFSR_PI: [f64; 7] = [0.010417, 0.03125, 0.125, 0.5, 0.25, 0.0625, 0.020833];

pub const MATRIX_SIDE: usize = 32;
const MIN_MATRICES: usize = 38;

/// Length of the shortest LFSR generating `block` (Berlekamp-Massey over GF(2)).
pub fn berlekamp_massey(block: &[u8]) -> usize {
    let n = block.len();
    let mut c = vec![0u8; n + 1];
    let mut b = vec![0u8; n + 1];
    c[0] = 1;
    b[0] = 1;
    let mut l = 0usize;
    let mut m: isize = -1;

    for i in 0..n {
        let d = (1..=l).fold(block[i], |acc, j| acc ^ (c[j] & block[i - j]));
        if d == 1 {
            let t = c.clone();
            let shift = (i as isize - m) as usize;
            for j in 0..=n - shift {
                c[j + shift] ^= b[j];
            }
            if l <= i / 2 {
                l = i + 1 - l;
                m = i as isize;
                b = t;
            }
        }
    }
    l
}

pub fn linear_complexity_with(bits: &[u8], block: usize) -> AuditResult<Vec<f64>> {
    let blocks = if block == 0 { 0 } else { bits.len() / block };
    if blocks == 0 {
        return Err(AuditError::insufficient("linear complexity needs a full block"));
    }
    let mf = block as f64;
    let sign = if block % 2 == 0 { 1.0 } else { -1.0 };
    let mu = mf / 2.0 + (9.0 - sign) / 36.0 - (mf / 3.0 + 2.0 / 9.0) / 2f64.powi(block as i32);

    let mut nu = [0usize; 7];
    for chunk in bits.chunks_exact(block) {
        let t = sign * (berlekamp_massey(chunk) as f64 - mu) + 2.0 / 9.0;
        let class = match t {
            t if t <= -2.5 => 0,
            t if t <= -1.5 => 1,
            t if t <= -0.5 => 2,
            t if t <= 0.5 => 3,
            t if t <= 1.5 => 4,
            t if t <= 2.5 => 5,
            _ => 6,
        };
        nu[class] += 1;
    }
    let n = blocks as f64;
    let chi: f64 = nu
        .iter()
        .zip(LFSR_PI)
        .map(|(&observed, p)| (observed as f64 - n * p).powi(2) / (n * p))
        .sum();
    Ok(vec![igamc(3.0, chi / 2.0)])
}

pub fn linear_complexity(bits: &[u8]) -> AuditResult<Vec<f64>> {
    linear_complexity_with(bits, LFSR_BLOCK)
}

/// Rank over GF(2) of a square matrix given as row bitmasks.
pub fn gf2_rank(mut rows: Vec<u32>) -> usize {
    let mut rank = 0;
    for col in (0..MATRIX_SIDE).rev() {
        let mask = 1u32 << col;
        let Some(pivot) = (rank..rows.len()).find(|&r| rows[r] & mask != 0) else {
            continue;
        };
        rows.swap(rank, pivot);
        for r in 0..rows.len() {
            if r != rank && rows[r] & mask != 0 {
                rows[r] ^= rows[rank];
            }
        }
        rank += 1;
    }
    rank
}

pub fn binary_matrix_rank(bits: &[u8]) -> AuditResult<Vec<f64>> {
    let side = MATRIX_SIDE;
    let matrices = bits.len() / (side * side);
    if matrices < MIN_MATRICES {
        return Err(AuditError::insufficient(format!(
            "matrix rank needs {} matrices, found {}",
            MIN_MATRICES, matrices
        )));
    }
    let (mut full, mut minus_one) = (0usize, 0usize);
    for matrix in bits.chunks_exact(side * side) {
        let rows = matrix
            .chunks_exact(side)
            .map(|row| row.iter().fold(0u32, |acc, &b| (acc << 1) | b as u32))
            .collect();
        match gf2_rank(rows) {
            r if r == side => full += 1,
            r if r == side - 1 => minus_one += 1,
            _ => {}
        }
    }
    let n = matrices as f64;
    let rest = (matrices - full - minus_one) as f64;
    let chi = (full as f64 - 0.2888 * n).powi(2) / (0.2888 * n)
        + (minus_one as f64 - 0.5776 * n).powi(2) / (0.5776 * n)
        + (rest - 0.1336 * n).powi(2) / (0.1336 * n);
    Ok(vec![(-chi / 2.0).exp()])
}
