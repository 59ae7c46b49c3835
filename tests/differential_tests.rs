use async_trait::async_trait;
use csrf_audit::config::MOBILE_USER_AGENT;
use csrf_audit::corpus::Seeds;
use csrf_audit::differential::{
    probe_token_freshness, run_differential_protocol, DifferentialTester, Freshness, MOBILE_PROBE,
};
use csrf_audit::engine::Transport;
use csrf_audit::errors::{AuditError, AuditResult};
use csrf_audit::models::{BypassVerdict, FormTarget, HttpResponse};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::sync::Mutex;

const TOKEN: &str = "k3JdfO9a8xQ2mzPw";
const ACTION: &str = "http://target.test/comment";

type Handler = dyn Fn(usize, &BTreeMap<String, String>, &BTreeMap<String, String>, bool) -> AuditResult<HttpResponse>
    + Send
    + Sync;

/// In-memory server: the handler sees the call index, the submitted data,
/// the headers, and whether the request was a GET.
struct ScriptedTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<BTreeMap<String, String>>>,
}

impl ScriptedTransport {
    fn new<F>(handler: F) -> Self
    where
        F: Fn(usize, &BTreeMap<String, String>, &BTreeMap<String, String>, bool) -> AuditResult<HttpResponse>
            + Send
            + Sync
            + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(
        &self,
        _url: &str,
        data: &BTreeMap<String, String>,
        headers: &BTreeMap<String, String>,
        use_get: bool,
        _delay_ms: u64,
    ) -> AuditResult<HttpResponse> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(data.clone());
            calls.len() - 1
        };
        (self.handler)(index, data, headers, use_get)
    }
}

fn protected_page(token: &str) -> String {
    format!(
        r#"<form method="post" action="/comment">
             <input type="text" name="comment">
             <input type="hidden" name="csrf" value="{}">
           </form>"#,
        token
    )
}

fn target() -> FormTarget {
    let mut data = BTreeMap::new();
    data.insert("comment".to_string(), "testing".to_string());
    data.insert("csrf".to_string(), TOKEN.to_string());
    FormTarget {
        use_get: false,
        action: ACTION.to_string(),
        data,
    }
}

/// Seeds that can never reproduce TOKEN when forging
fn foreign_seeds() -> Seeds {
    Seeds {
        digits: vec!['0'],
        letters: vec!['z'],
    }
}

// ============================================
// Protocol Tests
// ============================================

#[tokio::test]
async fn test_server_ignoring_token_is_bypassed() {
    let transport = ScriptedTransport::new(|_, _, _, use_get| {
        if use_get {
            Ok(HttpResponse::new(200, protected_page(TOKEN)))
        } else {
            Ok(HttpResponse::new(200, "Comment saved"))
        }
    });
    let headers = BTreeMap::new();
    let mut rng = StdRng::seed_from_u64(3);

    let report = DifferentialTester::new(&transport, &headers, foreign_seeds())
        .run(&target(), &mut rng)
        .await
        .unwrap();

    let len = TOKEN.len();
    assert_eq!(report.token_length, len);
    assert_eq!(report.baseline.tolerance_window, 0);
    assert_eq!(report.result(MOBILE_PROBE).unwrap().verdict, BypassVerdict::ProtectionHeld);
    assert_eq!(report.result("remove").unwrap().verdict, BypassVerdict::BypassSucceeded);
    assert_eq!(report.result("clear").unwrap().verdict, BypassVerdict::BypassSucceeded);
    assert_eq!(report.result("generate").unwrap().verdict, BypassVerdict::BypassSucceeded);

    // every truncation got through, so every trailing length is unchecked
    let unchecked = report.unchecked_trailing();
    assert_eq!(unchecked.len(), len);
    assert_eq!(unchecked.first(), Some(&len));
    assert_eq!(unchecked.last(), Some(&1));

    // 2 baseline + mobile + remove + clear + (L+1) truncations + generate
    assert_eq!(transport.call_count(), len + 7);
}

#[tokio::test]
async fn test_validating_server_holds() {
    let transport = ScriptedTransport::new(|_, data, _, use_get| {
        if use_get {
            return Ok(HttpResponse::new(200, protected_page(TOKEN)));
        }
        match data.get("csrf") {
            Some(token) if token == TOKEN => Ok(HttpResponse::new(200, "Comment saved")),
            _ => Ok(HttpResponse::new(403, "Forbidden")),
        }
    });
    let headers = BTreeMap::new();
    let mut rng = StdRng::seed_from_u64(3);

    let report = run_differential_protocol(&target(), &transport, &headers, foreign_seeds(), &mut rng)
        .await
        .unwrap();

    for strategy in ["remove", "clear", "truncate-at(0)", "generate"] {
        assert_eq!(
            report.result(strategy).unwrap().verdict,
            BypassVerdict::ProtectionHeld,
            "{}",
            strategy
        );
    }
    // truncation stops at the first rejection
    assert!(report.result("truncate-at(1)").is_none());
    assert!(report.unchecked_trailing().is_empty());
    assert_eq!(transport.call_count(), 7);
}

#[tokio::test]
async fn test_only_trailing_characters_unchecked() {
    // Server compares the first 10 characters only
    let transport = ScriptedTransport::new(|_, data, _, use_get| {
        if use_get {
            return Ok(HttpResponse::new(200, protected_page(TOKEN)));
        }
        let sent = data.get("csrf").map(String::as_str).unwrap_or("");
        if sent.len() >= 10 && TOKEN.starts_with(&sent[..10]) {
            Ok(HttpResponse::new(200, "Comment saved"))
        } else {
            Ok(HttpResponse::new(200, "Invalid request token, please retry"))
        }
    });
    let headers = BTreeMap::new();
    let mut rng = StdRng::seed_from_u64(3);

    let report = DifferentialTester::new(&transport, &headers, foreign_seeds())
        .run(&target(), &mut rng)
        .await
        .unwrap();

    // truncating at 10..16 leaves 6..1 characters unchecked
    assert_eq!(report.unchecked_trailing(), vec![6, 5, 4, 3, 2, 1]);
    assert_eq!(report.result("truncate-at(9)").unwrap().verdict, BypassVerdict::ProtectionHeld);
    // 200 is never a rejection, so every truncation was tried
    assert!(report.result(&format!("truncate-at({})", TOKEN.len())).is_some());
}

#[tokio::test]
async fn test_dynamic_page_uses_tolerance() {
    // Baseline lengths 100 and 104; tampered responses land 3 bytes off
    let transport = ScriptedTransport::new(|index, _, _, use_get| match (index, use_get) {
        (_, true) => Ok(HttpResponse::new(200, protected_page(TOKEN))),
        (0, _) => Ok(HttpResponse::new(200, "a".repeat(100))),
        (1, _) => Ok(HttpResponse::new(200, "a".repeat(104))),
        _ => Ok(HttpResponse::new(200, "a".repeat(103))),
    });
    let headers = BTreeMap::new();
    let mut rng = StdRng::seed_from_u64(3);

    let report = DifferentialTester::new(&transport, &headers, foreign_seeds())
        .run(&target(), &mut rng)
        .await
        .unwrap();

    assert_eq!(report.baseline.content_length, 100);
    assert_eq!(report.baseline.tolerance_window, 4);
    assert_eq!(report.result("remove").unwrap().verdict, BypassVerdict::BypassSucceeded);
}

#[tokio::test]
async fn test_mobile_probe_detects_unprotected_page() {
    let transport = ScriptedTransport::new(|_, _, headers, use_get| {
        let mobile = headers.get("User-Agent").map(String::as_str) == Some(MOBILE_USER_AGENT);
        if use_get && mobile {
            Ok(HttpResponse::new(200, r#"<form method="post"><input name="comment"></form>"#))
        } else {
            Ok(HttpResponse::new(403, "Forbidden"))
        }
    });
    let headers = BTreeMap::new();
    let mut rng = StdRng::seed_from_u64(3);

    let report = DifferentialTester::new(&transport, &headers, foreign_seeds())
        .run(&target(), &mut rng)
        .await
        .unwrap();

    assert_eq!(report.result(MOBILE_PROBE).unwrap().verdict, BypassVerdict::BypassSucceeded);
    // baseline itself is rejected, so tampering can't be told apart
    assert_eq!(report.result("remove").unwrap().verdict, BypassVerdict::Inconclusive);
}

#[tokio::test]
async fn test_baseline_failure_aborts_protocol() {
    let transport = ScriptedTransport::new(|_, _, _, _| Err(AuditError::transport(ACTION, "connection refused")));
    let headers = BTreeMap::new();
    let mut rng = StdRng::seed_from_u64(3);

    let result = DifferentialTester::new(&transport, &headers, foreign_seeds())
        .run(&target(), &mut rng)
        .await;

    assert!(matches!(result, Err(AuditError::TransportFailure { .. })));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_failed_step_is_inconclusive() {
    // "remove" is the fourth request; it times out
    let transport = ScriptedTransport::new(|index, _, _, use_get| {
        if index == 3 {
            return Err(AuditError::transport(ACTION, "timed out"));
        }
        if use_get {
            Ok(HttpResponse::new(200, protected_page(TOKEN)))
        } else {
            Ok(HttpResponse::new(200, "Comment saved"))
        }
    });
    let headers = BTreeMap::new();
    let mut rng = StdRng::seed_from_u64(3);

    let report = DifferentialTester::new(&transport, &headers, foreign_seeds())
        .run(&target(), &mut rng)
        .await
        .unwrap();

    let remove = report.result("remove").unwrap();
    assert_eq!(remove.verdict, BypassVerdict::Inconclusive);
    assert_eq!(remove.status_code, None);
    // later steps still ran
    assert_eq!(report.result("clear").unwrap().verdict, BypassVerdict::BypassSucceeded);
}

#[tokio::test]
async fn test_second_baseline_failure_means_static() {
    let transport = ScriptedTransport::new(|index, _, _, use_get| match (index, use_get) {
        (1, _) => Err(AuditError::transport(ACTION, "reset")),
        (_, true) => Ok(HttpResponse::new(200, protected_page(TOKEN))),
        (0, _) => Ok(HttpResponse::new(200, "a".repeat(100))),
        _ => Ok(HttpResponse::new(200, "a".repeat(101))),
    });
    let headers = BTreeMap::new();
    let mut rng = StdRng::seed_from_u64(3);

    let report = DifferentialTester::new(&transport, &headers, foreign_seeds())
        .run(&target(), &mut rng)
        .await
        .unwrap();

    assert_eq!(report.baseline.tolerance_window, 0);
    // one byte off with zero tolerance
    assert_eq!(report.result("remove").unwrap().verdict, BypassVerdict::ProtectionHeld);
}

// ============================================
// Freshness Probe Tests
// ============================================

#[tokio::test]
async fn test_pooled_tokens_detected() {
    let pooled = "Zk3q9LmP0aXr7TyB2cVn";
    let transport = ScriptedTransport::new(move |_, _, _, _| Ok(HttpResponse::new(200, protected_page(pooled))));

    let freshness = probe_token_freshness(&transport, ACTION, &BTreeMap::new(), 30).await;

    assert_eq!(
        freshness,
        Freshness::Pooled {
            repeated: vec![pooled.to_string()]
        }
    );
    assert_eq!(transport.call_count(), 30);
}

#[tokio::test]
async fn test_fresh_tokens_per_request() {
    let transport = ScriptedTransport::new(|index, _, _, _| {
        Ok(HttpResponse::new(200, protected_page(&format!("Zk3q9LmP0aXr7TyB{:06}", index))))
    });

    let freshness = probe_token_freshness(&transport, ACTION, &BTreeMap::new(), 30).await;

    assert_eq!(freshness, Freshness::Fresh { observed: 30 });
}

#[tokio::test]
async fn test_weak_values_are_not_tokens() {
    let transport = ScriptedTransport::new(|_, _, _, _| Ok(HttpResponse::new(200, protected_page("abc123"))));

    let freshness = probe_token_freshness(&transport, ACTION, &BTreeMap::new(), 5).await;

    assert_eq!(freshness, Freshness::NoTokens);
}
