// Verdict engine for csrf-audit
// Decides whether a tampered request got through, was rejected, or can't be told apart

use crate::errors::AuditResult;
use crate::models::{BaselineObservation, BypassVerdict, HttpResponse};

/// 4xx or 5xx
pub fn is_rejection(status: u16) -> bool {
    (400..600).contains(&status)
}

/// Decide verdict for a tampered request against the baseline.
///
/// 1. Same status as baseline and that status is 4xx/5xx = INCONCLUSIVE
///    (the untampered request is rejected too, so nothing points at the token)
/// 2. Same status and length within the tolerance window = BYPASS SUCCEEDED
/// 3. Anything else = PROTECTION HELD
pub fn decide_verdict(baseline: &BaselineObservation, status: u16, content_length: usize) -> BypassVerdict {
    if status != baseline.status_code {
        return BypassVerdict::ProtectionHeld;
    }
    if is_rejection(status) {
        return BypassVerdict::Inconclusive;
    }
    if content_length.abs_diff(baseline.content_length) <= baseline.tolerance_window {
        BypassVerdict::BypassSucceeded
    } else {
        BypassVerdict::ProtectionHeld
    }
}

/// Verdict for a request that may not have completed
pub fn decide_outcome(baseline: &BaselineObservation, outcome: &AuditResult<HttpResponse>) -> BypassVerdict {
    match outcome {
        Ok(resp) => decide_verdict(baseline, resp.status, resp.content_length()),
        Err(_) => BypassVerdict::Inconclusive,
    }
}
