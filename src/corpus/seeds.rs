// Alphabet seeds observed in the token corpus
//
// Forged tokens draw from these so they look structurally plausible. Uppercase
// letters are not collected, so forging passes them through unchanged.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Seeds {
    pub digits: Vec<char>,
    pub letters: Vec<char>,
}

impl Seeds {
    pub fn is_empty(&self) -> bool {
        self.digits.is_empty() && self.letters.is_empty()
    }
}

/// One pass over the corpus collecting the digits and lowercase letters used.
pub fn extract_seeds<S: AsRef<str>>(tokens: &[S]) -> Seeds {
    let mut digits = BTreeSet::new();
    let mut letters = BTreeSet::new();
    for token in tokens {
        for c in token.as_ref().chars() {
            if c.is_ascii_digit() {
                digits.insert(c);
            } else if c.is_ascii_lowercase() {
                letters.insert(c);
            }
        }
    }
    Seeds {
        digits: digits.into_iter().collect(),
        letters: letters.into_iter().collect(),
    }
}
