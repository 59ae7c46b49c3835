/// Unit tests for core csrf-audit models
/// Tests models, the token database, and baseline arithmetic
use csrf_audit::models::{
    BaselineObservation, BypassVerdict, FormInput, FormRecord, HttpResponse, InputKind, Method, Token,
    TokenDatabase, TokenRecord,
};
use std::collections::{BTreeSet, HashSet};

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn test_method_display() {
    assert_eq!(Method::GET.to_string(), "GET");
    assert_eq!(Method::POST.to_string(), "POST");
}

#[test]
fn test_method_from_attribute() {
    // Browsers submit anything that isn't POST as GET
    assert_eq!(Method::from_attr("post"), Method::POST);
    assert_eq!(Method::from_attr(" POST "), Method::POST);
    assert_eq!(Method::from_attr("get"), Method::GET);
    assert_eq!(Method::from_attr(""), Method::GET);
    assert_eq!(Method::from_attr("dialog"), Method::GET);
}

#[test]
fn test_form_record_creation() {
    let form = FormRecord::new(
        "http://t/post",
        Method::POST,
        vec![
            FormInput::new("comment", InputKind::Text, ""),
            FormInput::new("csrf", InputKind::TokenLike, "Zk3q9LmP0aXr7TyB"),
        ],
    );

    assert_eq!(form.action, "http://t/post");
    assert_eq!(form.method, Method::POST);
    assert_eq!(form.inputs.len(), 2);
    assert_eq!(form.inputs[1].kind, InputKind::TokenLike);
}

#[test]
fn test_token_equality_ignores_url() {
    let a = Token {
        value: "abc".to_string(),
        url: "http://t/a".to_string(),
    };
    let b = Token {
        value: "abc".to_string(),
        url: "http://t/b".to_string(),
    };
    assert_eq!(a, b);

    let unique: HashSet<Token> = vec![a, b].into_iter().collect();
    assert_eq!(unique.len(), 1);
}

#[test]
fn test_token_database_keeps_revisits() {
    let mut db = TokenDatabase::new();
    assert!(db.is_empty());
    db.push("http://t/a", set(&["x"]));
    db.push("http://t/a", set(&["x"]));
    db.push("http://t/b", set(&[]));

    assert_eq!(db.len(), 3);
    assert_eq!(db.values(), vec!["x".to_string(), "x".to_string()]);
}

#[test]
fn test_tokens_keep_origin_url() {
    let mut db = TokenDatabase::new();
    db.push("http://t/a", set(&["x"]));
    db.push("http://t/b", set(&["x", "y"]));

    let tokens = db.tokens();
    let origins: Vec<(&str, &str)> = tokens.iter().map(|t| (t.value.as_str(), t.url.as_str())).collect();
    assert_eq!(origins, vec![("x", "http://t/a"), ("x", "http://t/b"), ("y", "http://t/b")]);

    // seeds and the battery read tokens through AsRef<str>
    let seeds = csrf_audit::corpus::extract_seeds(&tokens);
    assert_eq!(seeds.letters, vec!['x', 'y']);
}

#[test]
fn test_first_protected_skips_empty_records() {
    let db: TokenDatabase = vec![
        TokenRecord {
            url: "http://t/".to_string(),
            tokens: BTreeSet::new(),
        },
        TokenRecord {
            url: "http://t/form".to_string(),
            tokens: set(&["tok"]),
        },
    ]
    .into_iter()
    .collect();

    assert_eq!(db.first_protected().map(|r| r.url.as_str()), Some("http://t/form"));
    assert!(TokenDatabase::new().first_protected().is_none());
}

#[test]
fn test_baseline_tolerance_from_two_responses() {
    let first = HttpResponse::new(200, "x".repeat(500));

    let baseline = BaselineObservation::from_pair(&first, Some(488));
    assert_eq!(baseline.status_code, 200);
    assert_eq!(baseline.content_length, 500);
    assert_eq!(baseline.tolerance_window, 12);
    assert!(baseline.is_dynamic());

    // A failed second request leaves the window at zero
    let baseline = BaselineObservation::from_pair(&first, None);
    assert_eq!(baseline.tolerance_window, 0);
    assert!(!baseline.is_dynamic());
}

#[test]
fn test_content_length_counts_bytes() {
    assert_eq!(HttpResponse::new(200, "héllo").content_length(), 6);
}

#[test]
fn test_verdict_display() {
    assert_eq!(BypassVerdict::BypassSucceeded.to_string(), "BYPASS SUCCEEDED");
    assert_eq!(BypassVerdict::ProtectionHeld.to_string(), "PROTECTION HELD");
    assert_eq!(BypassVerdict::Inconclusive.to_string(), "INCONCLUSIVE");
}
