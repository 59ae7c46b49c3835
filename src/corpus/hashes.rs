// Known hash shapes
//
// Read-only lookup from token shape to hash algorithm names. Purely an
// informational hint: a token that looks like MD5 output may be md5(something
// guessable).

use lazy_static::lazy_static;
use regex::Regex;

struct HashPattern {
    regex: Regex,
    names: &'static [&'static str],
}

lazy_static! {
    static ref HASH_PATTERNS: Vec<HashPattern> = vec![
        HashPattern {
            regex: Regex::new(r"^[a-fA-F0-9]{8}$").unwrap(),
            names: &["CRC-32", "Adler-32", "FNV-132", "Joaat"],
        },
        HashPattern {
            regex: Regex::new(r"^[a-fA-F0-9]{16}$").unwrap(),
            names: &["MySQL323", "DES(Oracle)", "Half MD5", "FNV-164", "CRC-64"],
        },
        HashPattern {
            regex: Regex::new(r"^[a-fA-F0-9]{32}$").unwrap(),
            names: &["MD5", "MD4", "MD2", "NTLM", "LM", "RIPEMD-128", "Tiger-128", "Haval-128"],
        },
        HashPattern {
            regex: Regex::new(r"^[a-fA-F0-9]{40}$").unwrap(),
            names: &["SHA-1", "RIPEMD-160", "Tiger-160", "Haval-160", "HAS-160"],
        },
        HashPattern {
            regex: Regex::new(r"^[a-fA-F0-9]{48}$").unwrap(),
            names: &["Tiger-192", "Haval-192"],
        },
        HashPattern {
            regex: Regex::new(r"^[a-fA-F0-9]{56}$").unwrap(),
            names: &["SHA-224", "SHA3-224", "Haval-224"],
        },
        HashPattern {
            regex: Regex::new(r"^[a-fA-F0-9]{64}$").unwrap(),
            names: &["SHA-256", "SHA3-256", "RIPEMD-256", "BLAKE2s-256", "Keccak-256", "GOST R 34.11-94"],
        },
        HashPattern {
            regex: Regex::new(r"^[a-fA-F0-9]{80}$").unwrap(),
            names: &["RIPEMD-320"],
        },
        HashPattern {
            regex: Regex::new(r"^[a-fA-F0-9]{96}$").unwrap(),
            names: &["SHA-384", "SHA3-384", "Keccak-384"],
        },
        HashPattern {
            regex: Regex::new(r"^[a-fA-F0-9]{128}$").unwrap(),
            names: &["SHA-512", "SHA3-512", "Whirlpool", "BLAKE2b-512", "Keccak-512"],
        },
        HashPattern {
            regex: Regex::new(r"^[a-zA-Z0-9+/]{27}=$").unwrap(),
            names: &["SHA-1(Base64)"],
        },
        HashPattern {
            regex: Regex::new(r"^[a-zA-Z0-9+/]{22}==$").unwrap(),
            names: &["MD5(Base64)"],
        },
        HashPattern {
            regex: Regex::new(r"^[a-zA-Z0-9+/]{43}=$").unwrap(),
            names: &["SHA-256(Base64)"],
        },
        HashPattern {
            regex: Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$").unwrap(),
            names: &["UUID"],
        },
    ];
}

/// Hash algorithms whose output has the same shape as `token`
pub fn hash_hints(token: &str) -> Vec<&'static str> {
    HASH_PATTERNS
        .iter()
        .filter(|p| p.regex.is_match(token))
        .flat_map(|p| p.names.iter().copied())
        .collect()
}
