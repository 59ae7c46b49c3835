// Discrete Fourier transform test
//
// Plain O(n^2) DFT over a precomputed twiddle table; the battery only ever
// feeds it a 1024-bit prefix.

use super::special::erfc;
use crate::errors::{AuditError, AuditResult};
use std::f64::consts::{PI, SQRT_2};

/// Magnitudes of the first n/2 DFT coefficients of the ±1 sequence.
pub fn dft_moduli(bits: &[u8]) -> Vec<f64> {
    let n = bits.len();
    if n == 0 {
        return Vec::new();
    }
    let twiddles: Vec<(f64, f64)> = (0..n)
        .map(|j| {
            let angle = 2.0 * PI * j as f64 / n as f64;
            (angle.cos(), angle.sin())
        })
        .collect();
    let x: Vec<f64> = bits.iter().map(|&b| if b == 1 { 1.0 } else { -1.0 }).collect();

    (0..n / 2)
        .map(|k| {
            let (mut re, mut im) = (0.0, 0.0);
            for (j, &xj) in x.iter().enumerate() {
                let (c, s) = twiddles[(k * j) % n];
                re += xj * c;
                im -= xj * s;
            }
            (re * re + im * im).sqrt()
        })
        .collect()
}

pub fn spectral(bits: &[u8]) -> AuditResult<Vec<f64>> {
    if bits.len() < 2 {
        return Err(AuditError::insufficient("spectral needs at least two bits"));
    }
    let n = bits.len() as f64;
    let threshold = (20f64.ln() * n).sqrt();
    let n0 = 0.95 * n / 2.0;
    let n1 = dft_moduli(bits).into_iter().filter(|&m| m < threshold).count() as f64;
    let d = (n1 - n0) / (n * 0.95 * 0.05 / 4.0).sqrt();
    Ok(vec![erfc(d.abs() / SQRT_2)])
}
