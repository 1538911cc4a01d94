use crate::{tracker::GVK, Error, Result};
use serde_json::Value;

/// Lower-case plural resource name for a kind, following the kube-rs discovery rules
pub fn pluralize(kind: &str) -> String {
    let word = kind.to_ascii_lowercase();

    if word == "endpoints" || word == "endpointslices" {
        return word;
    }

    if ["s", "x", "z", "ch", "sh"].iter().any(|end| word.ends_with(end)) {
        return format!("{word}es");
    }

    // consonant + y => ies
    if let Some(stem) = word.strip_suffix('y') {
        if stem
            .chars()
            .last()
            .is_some_and(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'))
        {
            return format!("{stem}ies");
        }
    }

    format!("{word}s")
}

/// Read the group, version and kind of an untyped object
pub fn extract_gvk(value: &Value) -> Result<GVK> {
    let api_version = value
        .get("apiVersion")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidRequest("object is missing apiVersion".to_string()))?;

    let kind = value
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidRequest("object is missing kind".to_string()))?;

    let (group, version) = api_version.split_once('/').unwrap_or(("", api_version));
    Ok(GVK::new(group, version, kind))
}
