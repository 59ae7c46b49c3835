// Differential tamper-and-compare testing for csrf-audit
//
// Sends the representative form untouched to establish a baseline, then sends
// tampered copies one at a time and compares each response against it. Steps
// run strictly in order; a failed request only turns its own step
// inconclusive.

use crate::config::{FRESHNESS_PROBE_COUNT, MOBILE_USER_AGENT};
use crate::corpus::classifier::{is_strong, is_token_charset};
use crate::corpus::seeds::Seeds;
use crate::engine::Transport;
use crate::errors::AuditResult;
use crate::models::{BaselineObservation, BypassVerdict, FormTarget, HttpResponse, MutationResult};
use crate::mutator::{find_token, mutate, Strategy};
use crate::parsers::forms::{is_protected, parse_forms};
use crate::verdict::{decide_outcome, is_rejection};
use futures::future::join_all;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info, warn};

pub const MOBILE_PROBE: &str = "mobile-user-agent";

#[derive(Debug, Clone, Serialize)]
pub struct DifferentialReport {
    pub baseline: BaselineObservation,
    /// Length of the token that was truncated, 0 when the form had none
    pub token_length: usize,
    /// In protocol order: mobile probe, remove, clear, truncations, generate
    pub results: Vec<MutationResult>,
}

impl DifferentialReport {
    /// Trailing character counts the server did not check: one entry per
    /// truncation that still got through.
    pub fn unchecked_trailing(&self) -> Vec<usize> {
        self.results
            .iter()
            .filter(|r| r.verdict == BypassVerdict::BypassSucceeded)
            .filter_map(|r| match r.strategy.parse::<Strategy>() {
                Ok(Strategy::TruncateAt(i)) if i < self.token_length => Some(self.token_length - i),
                _ => None,
            })
            .collect()
    }

    pub fn result(&self, strategy: &str) -> Option<&MutationResult> {
        self.results.iter().find(|r| r.strategy == strategy)
    }
}

pub struct DifferentialTester<'a, T: Transport> {
    transport: &'a T,
    headers: &'a BTreeMap<String, String>,
    seeds: Seeds,
    delay_ms: u64,
}

impl<'a, T: Transport> DifferentialTester<'a, T> {
    pub fn new(transport: &'a T, headers: &'a BTreeMap<String, String>, seeds: Seeds) -> Self {
        Self {
            transport,
            headers,
            seeds,
            delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    async fn submit(&self, form: &FormTarget, data: &BTreeMap<String, String>) -> AuditResult<HttpResponse> {
        self.transport
            .request(&form.action, data, self.headers, form.use_get, self.delay_ms)
            .await
    }

    /// Baseline from two identical submissions. Fails only when the first
    /// submission fails; a failed second one leaves the tolerance at zero.
    pub async fn baseline(&self, form: &FormTarget) -> AuditResult<BaselineObservation> {
        let first = self.submit(form, &form.data).await.map_err(|e| {
            warn!("[Differential] Baseline request failed: {}", e);
            e
        })?;
        let second = match self.submit(form, &form.data).await {
            Ok(resp) => Some(resp.content_length()),
            Err(e) => {
                warn!("[Differential] Second baseline request failed, assuming static response: {}", e);
                None
            }
        };
        let baseline = BaselineObservation::from_pair(&first, second);
        info!(
            "[Differential] Baseline: status {}, length {}, tolerance {}",
            baseline.status_code, baseline.content_length, baseline.tolerance_window
        );
        Ok(baseline)
    }

    /// Is the page still protected when fetched with a mobile User-Agent?
    async fn mobile_probe(&self, form: &FormTarget) -> MutationResult {
        let mut headers = self.headers.clone();
        headers.insert("User-Agent".to_string(), MOBILE_USER_AGENT.to_string());
        let empty = BTreeMap::new();

        match self
            .transport
            .request(&form.action, &empty, &headers, true, self.delay_ms)
            .await
        {
            Ok(resp) => {
                let forms = parse_forms(&form.action, &resp.body);
                let verdict = if is_protected(&forms) {
                    BypassVerdict::ProtectionHeld
                } else {
                    BypassVerdict::BypassSucceeded
                };
                MutationResult {
                    strategy: MOBILE_PROBE.to_string(),
                    status_code: Some(resp.status),
                    content_length: Some(resp.content_length()),
                    verdict,
                }
            }
            Err(e) => {
                warn!("[Differential] Mobile probe failed: {}", e);
                MutationResult {
                    strategy: MOBILE_PROBE.to_string(),
                    status_code: None,
                    content_length: None,
                    verdict: BypassVerdict::Inconclusive,
                }
            }
        }
    }

    async fn tamper<R: Rng + ?Sized>(
        &self,
        form: &FormTarget,
        baseline: &BaselineObservation,
        strategy: Strategy,
        rng: &mut R,
    ) -> MutationResult {
        let data = mutate(&form.data, strategy, &self.seeds, rng);
        let outcome = self.submit(form, &data).await;
        let verdict = decide_outcome(baseline, &outcome);
        match &outcome {
            Ok(resp) => debug!("[Differential] {} -> {} ({} bytes): {}", strategy, resp.status, resp.content_length(), verdict),
            Err(e) => warn!("[Differential] {} failed: {}", strategy, e),
        }
        MutationResult {
            strategy: strategy.to_string(),
            status_code: outcome.as_ref().ok().map(|r| r.status),
            content_length: outcome.as_ref().ok().map(|r| r.content_length()),
            verdict,
        }
    }

    /// Run the whole protocol against one form.
    ///
    /// Requests issued for a token of length L: 2 baseline, 1 mobile, 1
    /// remove, 1 clear, up to L+1 truncations, 1 generate.
    pub async fn run<R: Rng + ?Sized>(&self, form: &FormTarget, rng: &mut R) -> AuditResult<DifferentialReport> {
        let baseline = self.baseline(form).await?;
        let mut results = vec![self.mobile_probe(form).await];

        for strategy in [Strategy::Remove, Strategy::Clear] {
            results.push(self.tamper(form, &baseline, strategy, rng).await);
        }

        let token_length = find_token(&form.data).map(|t| t.chars().count()).unwrap_or(0);
        if token_length > 0 {
            for i in 0..=token_length {
                let result = self.tamper(form, &baseline, Strategy::TruncateAt(i), rng).await;
                let rejected = result.status_code.map(is_rejection).unwrap_or(false);
                results.push(result);
                if rejected {
                    debug!("[Differential] Server rejects truncation at {}", i);
                    break;
                }
            }
        }

        results.push(self.tamper(form, &baseline, Strategy::Generate, rng).await);

        Ok(DifferentialReport {
            baseline,
            token_length,
            results,
        })
    }
}

/// Convenience wrapper for a one-off protocol run
pub async fn run_differential_protocol<T: Transport, R: Rng + ?Sized>(
    form: &FormTarget,
    transport: &T,
    headers: &BTreeMap<String, String>,
    seeds: Seeds,
    rng: &mut R,
) -> AuditResult<DifferentialReport> {
    DifferentialTester::new(transport, headers, seeds).run(form, rng).await
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Freshness {
    /// Some token came back for more than one simultaneous request
    Pooled { repeated: Vec<String> },
    /// Every response carried its own token
    Fresh { observed: usize },
    /// No response carried a strong token
    NoTokens,
}

/// Strong token values on one page, deduplicated
fn page_tokens(url: &str, body: &str) -> BTreeSet<String> {
    parse_forms(url, body)
        .into_iter()
        .flat_map(|f| f.inputs.into_iter())
        .map(|i| i.value)
        .filter(|v| is_token_charset(v) && is_strong(v))
        .collect()
}

/// Fire `count` identical GETs at once and check whether any two responses
/// share a token. Results are only inspected after every request finished.
pub async fn probe_token_freshness<T: Transport>(
    transport: &T,
    url: &str,
    headers: &BTreeMap<String, String>,
    count: usize,
) -> Freshness {
    let empty = BTreeMap::new();
    let requests = (0..count).map(|_| transport.request(url, &empty, headers, true, 0));
    let responses = join_all(requests).await;

    let mut seen = HashSet::new();
    let mut repeated = BTreeSet::new();
    let mut observed = 0;
    for resp in responses {
        match resp {
            Ok(resp) => {
                for token in page_tokens(url, &resp.body) {
                    observed += 1;
                    if !seen.insert(token.clone()) {
                        repeated.insert(token);
                    }
                }
            }
            Err(e) => debug!("[Freshness] Request failed: {}", e),
        }
    }

    if observed == 0 {
        Freshness::NoTokens
    } else if repeated.is_empty() {
        Freshness::Fresh { observed }
    } else {
        Freshness::Pooled {
            repeated: repeated.into_iter().collect(),
        }
    }
}

/// The standard probe size
pub async fn probe_default<T: Transport>(transport: &T, url: &str, headers: &BTreeMap<String, String>) -> Freshness {
    probe_token_freshness(transport, url, headers, FRESHNESS_PROBE_COUNT).await
}
