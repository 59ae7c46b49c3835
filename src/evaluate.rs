// Form evaluation for csrf-audit
//
// Walks the crawled pages once and returns four independent collections:
// weak tokens, the per-visit token database, every token value, and forms
// with no protection at all. Also picks the representative form the
// differential tester works on.

use crate::config::{is_token_shaped, FILLER_EMAIL, FILLER_PASSWORD, FILLER_TEXT};
use crate::corpus::classifier::{assess_field, FieldAssessment};
use crate::models::{FormTarget, InputKind, InsecureForm, Method, Page, Token, TokenDatabase, WeakToken};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Clone, Default, Serialize)]
pub struct Evaluation {
    pub weak_tokens: Vec<WeakToken>,
    pub token_database: TokenDatabase,
    /// Tokens in record order with the page they came from; a value repeated
    /// on different visits appears once per visit
    pub all_tokens: Vec<Token>,
    pub insecure_forms: Vec<InsecureForm>,
}

pub fn evaluate(pages: &[Page]) -> Evaluation {
    let mut weak_tokens = Vec::new();
    let mut token_database = TokenDatabase::new();
    let mut insecure_forms = Vec::new();
    let mut reported_actions: HashSet<&str> = HashSet::new();

    for page in pages {
        let mut local_tokens = BTreeSet::new();
        for form in &page.forms {
            let mut protected = false;
            for input in &form.inputs {
                match assess_field(&input.name, &input.value) {
                    FieldAssessment::Protection => {
                        local_tokens.insert(input.value.clone());
                        protected = true;
                        break;
                    }
                    FieldAssessment::Weak => weak_tokens.push(WeakToken {
                        url: page.url.clone(),
                        name: input.name.clone(),
                        value: input.value.clone(),
                    }),
                    FieldAssessment::Ignored => {}
                }
            }
            if !protected && reported_actions.insert(form.action.as_str()) {
                insecure_forms.push(InsecureForm {
                    url: page.url.clone(),
                    form: form.clone(),
                });
            }
        }
        token_database.push(page.url.clone(), local_tokens);
    }

    let all_tokens = token_database.tokens();
    Evaluation {
        weak_tokens,
        token_database,
        all_tokens,
        insecure_forms,
    }
}

/// Pick the first form that carries a token-shaped value and is not a login
/// form, and build its submission data.
///
/// When `tolerate` is set, a protected login form is accepted if no other
/// candidate exists. Password, email and text fields get filler values;
/// everything else keeps the value the page served.
pub fn select_form(pages: &[Page], tolerate: bool) -> Option<FormTarget> {
    let mut fallback = None;

    for form in pages.iter().flat_map(|p| p.forms.iter()) {
        let protected = form.inputs.iter().any(|i| is_token_shaped(&i.value));
        if !protected {
            continue;
        }
        let login = form.inputs.iter().any(|i| i.kind == InputKind::Password);

        let data: BTreeMap<String, String> = form
            .inputs
            .iter()
            .map(|i| {
                let value = match i.kind {
                    InputKind::Password => FILLER_PASSWORD.to_string(),
                    InputKind::Email => FILLER_EMAIL.to_string(),
                    InputKind::Text => FILLER_TEXT.to_string(),
                    InputKind::TokenLike | InputKind::Other => i.value.clone(),
                };
                (i.name.clone(), value)
            })
            .collect();
        let target = FormTarget {
            use_get: form.method == Method::GET,
            action: form.action.clone(),
            data,
        };

        if !login {
            return Some(target);
        }
        if tolerate && fallback.is_none() {
            fallback = Some(target);
        }
    }
    fallback
}
