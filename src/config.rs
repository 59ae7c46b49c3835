// Run configuration and heuristic constants for csrf-audit

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::time::Duration;

/// Field names that suggest a token even when the value is weak
pub const COMMON_TOKEN_NAMES: &[&str] = &["csrf", "auth", "token", "verify", "hash"];

/// Filler submitted in place of password inputs
pub const FILLER_PASSWORD: &str = "xXx!69!xXx";
/// Filler submitted in place of email inputs
pub const FILLER_EMAIL: &str = "xxx@xxx.xxx";
/// Filler submitted in place of free-text inputs
pub const FILLER_TEXT: &str = "testing";

pub const MOBILE_USER_AGENT: &str = "Mozilla/4.0 (compatible; MSIE 5.5; Windows CE; PPC; 240x320)";

/// Identical requests fired at once when probing for pooled tokens
pub const FRESHNESS_PROBE_COUNT: usize = 30;

/// Strength above which a value counts as real protection
pub const STRONG_TOKEN_STRENGTH: f64 = 10.0;

lazy_static! {
    /// Structural shape of an anti-CSRF token value. ASCII word characters
    /// only: a Unicode `\w` repeated 256 times exceeds the compiled size limit.
    pub static ref TOKEN_SHAPE: Regex = Regex::new(r"^(?-u:[\w\-_+=/]){14,256}$").unwrap();

    /// Values worth measuring for strength at all
    pub static ref TOKEN_CHARSET: Regex = Regex::new(r"^[\w\-_]+$").unwrap();

    static ref HEADER_LINE: Regex = Regex::new(r"(?m)^(.*?):\s(.*)$").unwrap();
}

pub fn is_token_shaped(value: &str) -> bool {
    TOKEN_SHAPE.is_match(value)
}

/// Headers sent with every request unless overridden
pub fn default_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert(
        "User-Agent".to_string(),
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
    );
    headers.insert(
        "Accept".to_string(),
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
    );
    headers.insert("Accept-Language".to_string(), "en-US,en;q=0.5".to_string());
    headers.insert("Connection".to_string(), "close".to_string());
    headers.insert("Upgrade-Insecure-Requests".to_string(), "1".to_string());
    headers
}

/// Parse raw `Name: value` lines (as copied from a browser's devtools) into a
/// header map. A single trailing comma is dropped from values and lines
/// with an empty value are ignored.
pub fn parse_headers(raw: &str) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    for cap in HEADER_LINE.captures_iter(raw) {
        let name = cap[1].trim();
        let mut value = cap[2].trim_end_matches('\r');
        if value.is_empty() || name.is_empty() {
            continue;
        }
        if let Some(stripped) = value.strip_suffix(',') {
            value = stripped;
        }
        headers.insert(name.to_string(), value.to_string());
    }
    headers
}

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub target: String,
    pub threads: usize,
    pub depth: usize,
    /// Delay before each differential request
    pub delay: Duration,
    pub timeout: Duration,
    pub headers: BTreeMap<String, String>,
}

impl AuditConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay.as_millis() as u64
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            threads: 2,
            depth: 2,
            delay: Duration::from_secs(0),
            timeout: Duration::from_secs(20),
            headers: default_headers(),
        }
    }
}
