// HTML form parser for csrf-audit
// Uses scraper to turn a page into FormRecords with absolute action URLs

use crate::config::is_token_shaped;
use crate::models::{FormInput, FormRecord, InputKind, Method};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use url::Url;

lazy_static! {
    static ref FORM: Selector = Selector::parse("form").unwrap();
    static ref FIELD: Selector = Selector::parse("input, textarea, select").unwrap();
    static ref OPTION: Selector = Selector::parse("option").unwrap();
}

/// Parse every form on a page, in document order.
///
/// Relative actions are resolved against `page_url`; a missing or empty action
/// submits back to the page itself.
pub fn parse_forms(page_url: &str, html: &str) -> Vec<FormRecord> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    document
        .select(&FORM)
        .map(|form| {
            let method = Method::from_attr(form.value().attr("method").unwrap_or("get"));
            let action = resolve_action(base.as_ref(), page_url, form.value().attr("action"));
            let inputs = form.select(&FIELD).filter_map(parse_field).collect();
            FormRecord::new(action, method, inputs)
        })
        .collect()
}

fn resolve_action(base: Option<&Url>, page_url: &str, action: Option<&str>) -> String {
    let action = action.map(str::trim).unwrap_or("");
    if action.is_empty() {
        return page_url.to_string();
    }
    match base.and_then(|b| b.join(action).ok()) {
        Some(url) => url.to_string(),
        None => action.to_string(),
    }
}

fn parse_field(el: ElementRef<'_>) -> Option<FormInput> {
    let name = el.value().attr("name")?.to_string();
    let tag = el.value().name();

    let value = match tag {
        "textarea" => el.text().collect::<String>(),
        "select" => el
            .select(&OPTION)
            .find(|o| o.value().attr("selected").is_some())
            .or_else(|| el.select(&OPTION).next())
            .and_then(|o| o.value().attr("value").map(str::to_string))
            .unwrap_or_default(),
        _ => el.value().attr("value").unwrap_or("").to_string(),
    };

    let declared = if tag == "input" {
        el.value().attr("type").unwrap_or("text").to_ascii_lowercase()
    } else {
        "text".to_string()
    };
    let kind = classify_input(&declared, &value);

    Some(FormInput { name, kind, value })
}

/// Map a declared input type onto the kinds the auditor cares about
pub fn classify_input(declared_type: &str, value: &str) -> InputKind {
    match declared_type {
        "password" => InputKind::Password,
        "email" => InputKind::Email,
        _ if is_token_shaped(value) => InputKind::TokenLike,
        "text" | "search" => InputKind::Text,
        _ => InputKind::Other,
    }
}

/// True when any form carries a token-shaped value
pub fn is_protected(forms: &[FormRecord]) -> bool {
    forms
        .iter()
        .flat_map(|f| f.inputs.iter())
        .any(|i| is_token_shaped(&i.value))
}
