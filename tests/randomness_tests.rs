use csrf_audit::randomness::{run_battery_detailed, run_randomness_battery, TestOutcome, BATTERY};

// ============================================
// Helpers
// ============================================

/// SplitMix64 words unpacked most significant bit first
fn splitmix_bits(seed: u64, words: usize) -> Vec<u8> {
    let mut state = seed;
    let mut bits = Vec::with_capacity(words * 64);
    for _ in 0..words {
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        for i in (0..64).rev() {
            bits.push(((z >> i) & 1) as u8);
        }
    }
    bits
}

// ============================================
// Battery Tests
// ============================================

#[test]
fn test_pseudorandom_stream_passes_everything() {
    let bits = splitmix_bits(42, 8192);
    let outcomes = run_battery_detailed(&bits);
    assert_eq!(outcomes.len(), BATTERY.len());
    for (name, outcome) in &outcomes {
        assert_eq!(outcome.passed(), Some(true), "{} -> {:?}", name, outcome);
    }
}

#[test]
fn test_excursions_need_enough_cycles() {
    // 65536 bits only return to zero a few hundred times
    let outcomes = run_battery_detailed(&splitmix_bits(42, 1024));
    assert!(matches!(outcomes["random_excursions"], TestOutcome::Unavailable(_)));
    assert!(matches!(outcomes["random_excursions_variant"], TestOutcome::Unavailable(_)));
    assert_eq!(outcomes["maurer_universal"].passed(), Some(true));
    assert_eq!(outcomes["binary_matrix_rank"].passed(), Some(true));
}

#[test]
fn test_biased_tokens_fail_monobit() {
    let tokens = vec!["~".repeat(16), "~".repeat(16)];
    let verdicts = run_randomness_battery(&tokens);
    assert_eq!(verdicts.get("monobit"), Some(&false));
    // 256 bits is too short for these
    assert!(!verdicts.contains_key("spectral"));
    assert!(!verdicts.contains_key("approximate_entropy"));
    assert!(!verdicts.contains_key("binary_matrix_rank"));
}

#[test]
fn test_battery_is_deterministic() {
    let tokens: Vec<String> = (0..40).map(|i| format!("Zk3q9LmP0aXr7TyB2cVn{:04}", i * 7919)).collect();
    let first = run_randomness_battery(&tokens);
    let second = run_randomness_battery(&tokens);
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn test_unavailable_is_not_failure() {
    let verdicts = run_randomness_battery(&["short".to_string()]);
    assert!(verdicts.is_empty());
}
