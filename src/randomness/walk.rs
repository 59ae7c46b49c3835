// Random-walk tests: cumulative sums, random excursions and its variant
//
// The walk is the running sum of the sequence mapped to ±1. Excursion tests
// split it into cycles that start and end at zero.

use super::special::{erfc, igamc, normal_cdf};
use crate::errors::{AuditError, AuditResult};

pub const MIN_CYCLES: usize = 500;

fn partial_sums<'a>(bits: impl Iterator<Item = &'a u8>) -> Vec<i64> {
    bits.scan(0i64, |s, &b| {
        *s += if b == 1 { 1 } else { -1 };
        Some(*s)
    })
    .collect()
}

fn cusum_p(sums: &[i64]) -> f64 {
    let n = sums.len() as f64;
    let z = sums.iter().map(|s| s.abs()).max().unwrap_or(0);
    if z == 0 {
        return 1.0;
    }
    let zf = z as f64;
    let sqrt_n = n.sqrt();
    let nz = sums.len() as i64 / z;

    let mut sum1 = 0.0;
    for k in (-nz + 1) / 4..=(nz - 1) / 4 {
        let k = k as f64;
        sum1 += normal_cdf((4.0 * k + 1.0) * zf / sqrt_n) - normal_cdf((4.0 * k - 1.0) * zf / sqrt_n);
    }
    let mut sum2 = 0.0;
    for k in (-nz - 3) / 4..=(nz - 1) / 4 {
        let k = k as f64;
        sum2 += normal_cdf((4.0 * k + 3.0) * zf / sqrt_n) - normal_cdf((4.0 * k + 1.0) * zf / sqrt_n);
    }
    1.0 - sum1 + sum2
}

/// Maximal excursion of the walk, forward then reverse.
pub fn cumulative_sums(bits: &[u8]) -> AuditResult<Vec<f64>> {
    if bits.is_empty() {
        return Err(AuditError::insufficient("empty bitstream"));
    }
    Ok(vec![
        cusum_p(&partial_sums(bits.iter())),
        cusum_p(&partial_sums(bits.iter().rev())),
    ])
}

/// The walk padded with a leading zero, and a trailing zero when it does not
/// already end there.
fn padded_walk(bits: &[u8]) -> Vec<i64> {
    let mut walk = Vec::with_capacity(bits.len() + 2);
    walk.push(0);
    walk.extend(partial_sums(bits.iter()));
    if walk.last().copied() != Some(0) {
        walk.push(0);
    }
    walk
}

/// Per-cycle visit counts for each state in `states`
fn cycle_visits(walk: &[i64], states: &[i64]) -> Vec<Vec<usize>> {
    let mut cycles = Vec::new();
    let mut current = vec![0usize; states.len()];
    for &s in &walk[1..] {
        if s == 0 {
            cycles.push(std::mem::replace(&mut current, vec![0usize; states.len()]));
        } else if let Some(i) = states.iter().position(|&x| x == s) {
            current[i] += 1;
        }
    }
    cycles
}

fn excursion_pi(k: usize, x: i64) -> f64 {
    let ax = x.abs() as f64;
    let stay = 1.0 - 1.0 / (2.0 * ax);
    match k {
        0 => stay,
        5 => 1.0 / (2.0 * ax) * stay.powi(4),
        _ => 1.0 / (4.0 * ax * ax) * stay.powi(k as i32 - 1),
    }
}

const EXCURSION_STATES: [i64; 8] = [-4, -3, -2, -1, 1, 2, 3, 4];

/// Random excursions with an explicit cycle floor; p-values ordered by state
/// from -4 to 4.
pub fn random_excursions_with(bits: &[u8], min_cycles: usize) -> AuditResult<Vec<f64>> {
    let walk = padded_walk(bits);
    let cycles = cycle_visits(&walk, &EXCURSION_STATES);
    let j = cycles.len();
    if j == 0 || j < min_cycles {
        return Err(AuditError::insufficient(format!(
            "random excursions found {} cycles, needs {}",
            j, min_cycles
        )));
    }
    let jf = j as f64;
    let p_values = EXCURSION_STATES
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let mut nu = [0usize; 6];
            for cycle in &cycles {
                nu[cycle[i].min(5)] += 1;
            }
            let chi: f64 = nu
                .iter()
                .enumerate()
                .map(|(k, &observed)| {
                    let expected = jf * excursion_pi(k, x);
                    (observed as f64 - expected).powi(2) / expected
                })
                .sum();
            igamc(2.5, chi / 2.0)
        })
        .collect();
    Ok(p_values)
}

pub fn random_excursions(bits: &[u8]) -> AuditResult<Vec<f64>> {
    random_excursions_with(bits, MIN_CYCLES)
}

/// Variant test; p-values ordered by state from -9 to 9, zero excluded.
pub fn random_excursions_variant_with(bits: &[u8], min_cycles: usize) -> AuditResult<Vec<f64>> {
    let walk = padded_walk(bits);
    let j = walk.iter().filter(|&&s| s == 0).count() - 1;
    if j == 0 || j < min_cycles {
        return Err(AuditError::insufficient(format!(
            "random excursions variant found {} cycles, needs {}",
            j, min_cycles
        )));
    }
    let jf = j as f64;
    let p_values = (-9i64..=9)
        .filter(|&x| x != 0)
        .map(|x| {
            let visits = walk.iter().filter(|&&s| s == x).count() as f64;
            erfc((visits - jf).abs() / (2.0 * jf * (4.0 * x.abs() as f64 - 2.0)).sqrt())
        })
        .collect();
    Ok(p_values)
}

pub fn random_excursions_variant(bits: &[u8]) -> AuditResult<Vec<f64>> {
    random_excursions_variant_with(bits, MIN_CYCLES)
}
