//! Label selector parsing and matching
//!
//! Parses Kubernetes label selector strings into `kube::core::Selector` so that
//! list, watch and delete-collection requests can be filtered the same way the API
//! server would filter them.
//!
//! Supported syntax:
//! - Equality: `key=value` or `key==value`
//! - Inequality: `key!=value`
//! - Set-based: `key in (value1,value2)` or `key notin (value1,value2)`
//! - Existence: `key` or `!key`
//! - Requirements joined by commas are ANDed: `key1=value1,key2 in (v2,v3)`

use crate::{Error, Result};
use kube::core::{Expression, Selector, SelectorExt};
use std::collections::{BTreeMap, BTreeSet};

/// Split a selector string by commas, but not inside parentheses
fn split_preserving_parentheses(selector: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut start = 0;
    let mut depth = 0;

    for (i, ch) in selector.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                result.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if start < selector.len() {
        result.push(&selector[start..]);
    }

    result
}

fn invalid(selector: &str, reason: impl Into<String>) -> Error {
    Error::InvalidSelector {
        selector: selector.to_string(),
        reason: reason.into(),
    }
}

fn parse_key<'a>(selector: &str, key: &'a str) -> Result<&'a str> {
    let key = key.trim();
    if key.is_empty() {
        return Err(invalid(selector, "empty label key"));
    }
    if key.contains(char::is_whitespace) {
        return Err(invalid(selector, format!("invalid label key {:?}", key)));
    }
    Ok(key)
}

/// Parse `(v1,v2,...)` into a value set
fn parse_value_set(selector: &str, rest: &str) -> Result<BTreeSet<String>> {
    let rest = rest.trim();
    let inner = rest
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(|| {
            invalid(
                selector,
                format!("expected a parenthesized value set, got {:?}", rest),
            )
        })?;

    Ok(inner
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect())
}

fn parse_requirement(selector: &str, requirement: &str) -> Result<Expression> {
    if let Some((key, rest)) = requirement.split_once(" notin ") {
        let key = parse_key(selector, key)?;
        return Ok(Expression::NotIn(key.to_string(), parse_value_set(selector, rest)?));
    }
    if let Some((key, rest)) = requirement.split_once(" in ") {
        let key = parse_key(selector, key)?;
        return Ok(Expression::In(key.to_string(), parse_value_set(selector, rest)?));
    }
    if let Some(key) = requirement.strip_prefix('!') {
        let key = parse_key(selector, key)?;
        return Ok(Expression::DoesNotExist(key.to_string()));
    }
    if let Some((key, value)) = requirement.split_once("!=") {
        let key = parse_key(selector, key)?;
        return Ok(Expression::NotEqual(key.to_string(), value.trim().to_string()));
    }
    if let Some((key, value)) = requirement
        .split_once("==")
        .or_else(|| requirement.split_once('='))
    {
        let key = parse_key(selector, key)?;
        return Ok(Expression::Equal(key.to_string(), value.trim().to_string()));
    }

    let key = parse_key(selector, requirement)?;
    Ok(Expression::Exists(key.to_string()))
}

/// Parse a Kubernetes label selector string into a Selector
///
/// An empty selector selects everything.
///
/// # Examples
///
/// ```
/// use tekton_fake_client::label_selector::parse_label_selector;
///
/// let selector = parse_label_selector("app=build,env in (production,staging)").unwrap();
/// assert!(!selector.selects_all());
/// assert!(parse_label_selector("env in production").is_err());
/// ```
pub fn parse_label_selector(selector: &str) -> Result<Selector> {
    let mut expressions = Vec::new();

    for requirement in split_preserving_parentheses(selector) {
        let requirement = requirement.trim();
        if requirement.is_empty() {
            continue;
        }
        expressions.push(parse_requirement(selector, requirement)?);
    }

    Ok(Selector::from_iter(expressions))
}

/// Selector that matches every label set
pub fn everything() -> Selector {
    Selector::default()
}

/// Match an optional label set; objects without labels behave as an empty set
pub fn matches(selector: &Selector, labels: Option<&BTreeMap<String, String>>) -> bool {
    match labels {
        Some(labels) => selector.matches(labels),
        None => selector.matches(&BTreeMap::new()),
    }
}

/// Match labels against a label selector string
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use tekton_fake_client::label_selector::matches_label_selector;
///
/// let labels = BTreeMap::from([
///     ("tekton.dev/pipeline".to_string(), "build".to_string()),
///     ("env".to_string(), "production".to_string()),
/// ]);
///
/// assert!(matches_label_selector(&labels, "tekton.dev/pipeline=build").unwrap());
/// assert!(matches_label_selector(&labels, "env in (production,staging)").unwrap());
/// assert!(!matches_label_selector(&labels, "env=dev").unwrap());
/// ```
pub fn matches_label_selector(labels: &BTreeMap<String, String>, selector: &str) -> Result<bool> {
    Ok(parse_label_selector(selector)?.matches(labels))
}
