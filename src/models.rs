// Core data models for csrf-audit
// Forms, tokens, the token database and differential test results

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// HTTP methods a form can submit with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Method {
    GET,
    POST,
}

impl Method {
    /// Parse a form's `method` attribute. Anything other than POST submits as GET,
    /// which is what browsers do.
    pub fn from_attr(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("post") {
            Method::POST
        } else {
            Method::GET
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::GET => write!(f, "GET"),
            Method::POST => write!(f, "POST"),
        }
    }
}

/// What kind of value a form input carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputKind {
    Password,
    Email,
    Text,
    TokenLike,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormInput {
    pub name: String,
    pub kind: InputKind,
    pub value: String,
}

impl FormInput {
    pub fn new(name: impl Into<String>, kind: InputKind, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: value.into(),
        }
    }
}

/// A parsed HTML form. Never mutated in place once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormRecord {
    pub action: String,
    pub method: Method,
    pub inputs: Vec<FormInput>,
}

impl FormRecord {
    pub fn new(action: impl Into<String>, method: Method, inputs: Vec<FormInput>) -> Self {
        Self {
            action: action.into(),
            method,
            inputs,
        }
    }
}

/// One crawled page and the forms found on it, in document order
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub url: String,
    pub forms: Vec<FormRecord>,
}

/// An observed token value and the page it came from.
/// Two tokens are equal when their values are equal.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    pub value: String,
    pub url: String,
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Token {}

impl Token {
    pub fn new(value: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            url: url.into(),
        }
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

/// Tokens seen on a single page visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenRecord {
    pub url: String,
    pub tokens: BTreeSet<String>,
}

/// Append-only list of per-visit token records, in crawl discovery order.
/// Revisiting a URL appends a new record rather than merging.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenDatabase {
    records: Vec<TokenRecord>,
}

impl TokenDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, url: impl Into<String>, tokens: BTreeSet<String>) {
        self.records.push(TokenRecord {
            url: url.into(),
            tokens,
        });
    }

    pub fn records(&self) -> &[TokenRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every token across all records, in record order, tagged with the URL
    /// it was seen on. Values repeated across records appear once per record.
    pub fn tokens(&self) -> Vec<Token> {
        self.records
            .iter()
            .flat_map(|r| r.tokens.iter().map(move |v| Token::new(v.as_str(), r.url.as_str())))
            .collect()
    }

    /// Same as `tokens`, values only
    pub fn values(&self) -> Vec<String> {
        self.records
            .iter()
            .flat_map(|r| r.tokens.iter().cloned())
            .collect()
    }

    /// First record that carried at least one token
    pub fn first_protected(&self) -> Option<&TokenRecord> {
        self.records.iter().find(|r| !r.tokens.is_empty())
    }
}

impl FromIterator<TokenRecord> for TokenDatabase {
    fn from_iter<I: IntoIterator<Item = TokenRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// A low-strength value in a field whose name looks like a token field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeakToken {
    pub url: String,
    pub name: String,
    pub value: String,
}

/// A form without any strong token
#[derive(Debug, Clone, Serialize)]
pub struct InsecureForm {
    pub url: String,
    pub form: FormRecord,
}

/// The representative form reduced to what gets submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormTarget {
    pub use_get: bool,
    pub action: String,
    pub data: BTreeMap<String, String>,
}

/// Raw response returned by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn content_length(&self) -> usize {
        self.body.len()
    }
}

/// Status and length of the unmodified request, plus how much the length
/// drifts between two identical requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BaselineObservation {
    pub status_code: u16,
    pub content_length: usize,
    pub tolerance_window: usize,
}

impl BaselineObservation {
    pub fn from_pair(first: &HttpResponse, second_length: Option<usize>) -> Self {
        let content_length = first.content_length();
        let tolerance_window = second_length
            .map(|len| len.abs_diff(content_length))
            .unwrap_or(0);
        Self {
            status_code: first.status,
            content_length,
            tolerance_window,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.tolerance_window > 0
    }
}

/// Outcome of one tampered request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BypassVerdict {
    BypassSucceeded,
    ProtectionHeld,
    Inconclusive,
}

impl fmt::Display for BypassVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BypassVerdict::BypassSucceeded => write!(f, "BYPASS SUCCEEDED"),
            BypassVerdict::ProtectionHeld => write!(f, "PROTECTION HELD"),
            BypassVerdict::Inconclusive => write!(f, "INCONCLUSIVE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationResult {
    pub strategy: String,
    /// None when the request never completed
    pub status_code: Option<u16>,
    pub content_length: Option<usize>,
    pub verdict: BypassVerdict,
}

/// Result of a single randomness test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestVerdict {
    pub name: String,
    pub p_values: Vec<f64>,
    pub pass: bool,
}
