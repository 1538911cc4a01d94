//! Patch semantics supported by the fake

use crate::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Patch types, named after the `Content-Type` the API server expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::enum_variant_names)]
pub enum PatchType {
    /// RFC 6902 JSON Patch - application/json-patch+json
    JsonPatch,
    /// RFC 7386 JSON Merge Patch - application/merge-patch+json
    MergePatch,
    /// Kubernetes Strategic Merge Patch - application/strategic-merge-patch+json
    StrategicMergePatch,
    /// Server-Side Apply - application/apply-patch+yaml
    ApplyPatch,
}

impl PatchType {
    pub fn content_type(&self) -> &'static str {
        match self {
            PatchType::JsonPatch => "application/json-patch+json",
            PatchType::MergePatch => "application/merge-patch+json",
            PatchType::StrategicMergePatch => "application/strategic-merge-patch+json",
            PatchType::ApplyPatch => "application/apply-patch+yaml",
        }
    }
}

impl fmt::Display for PatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.content_type())
    }
}

impl FromStr for PatchType {
    type Err = Error;

    /// Parse a `Content-Type` header value; parameters such as `charset` are ignored
    fn from_str(s: &str) -> Result<Self> {
        let media_type = s.split(';').next().unwrap_or_default().trim();
        match media_type {
            "application/json-patch+json" => Ok(PatchType::JsonPatch),
            "application/merge-patch+json" => Ok(PatchType::MergePatch),
            "application/strategic-merge-patch+json" => Ok(PatchType::StrategicMergePatch),
            "application/apply-patch+yaml" => Ok(PatchType::ApplyPatch),
            other => Err(Error::InvalidPatch(format!("unsupported patch type {:?}", other))),
        }
    }
}

/// Decode raw patch bytes for the given patch type
///
/// Apply patches may be YAML; everything else must be JSON.
pub fn decode_patch(patch_type: PatchType, data: &[u8]) -> Result<Value> {
    let decoded = match patch_type {
        PatchType::ApplyPatch => serde_yaml::from_slice::<Value>(data)
            .map_err(|e| Error::InvalidPatch(format!("malformed apply patch: {}", e)))?,
        _ => serde_json::from_slice::<Value>(data)
            .map_err(|e| Error::InvalidPatch(format!("malformed {} body: {}", patch_type, e)))?,
    };

    match (patch_type, &decoded) {
        (PatchType::JsonPatch, Value::Array(_)) => Ok(decoded),
        (PatchType::JsonPatch, _) => Err(Error::InvalidPatch(
            "JSON patch must be an array of operations".to_string(),
        )),
        (_, Value::Object(_)) => Ok(decoded),
        _ => Err(Error::InvalidPatch(format!(
            "{} body must be a JSON object",
            patch_type
        ))),
    }
}

/// Apply a decoded patch to a copy of `existing` and return the result
///
/// `existing` itself is never modified, so a failing patch leaves no trace.
pub fn apply_patch(existing: &Value, patch: &Value, patch_type: PatchType) -> Result<Value> {
    let mut patched = existing.clone();
    match patch_type {
        PatchType::JsonPatch => {
            let operations: json_patch::Patch = serde_json::from_value(patch.clone())
                .map_err(|e| Error::InvalidPatch(format!("malformed JSON patch: {}", e)))?;
            json_patch::patch(&mut patched, &operations)?;
        }
        // Strategic merge and apply need schema knowledge and field ownership;
        // a JSON merge is the closest schema-free approximation.
        PatchType::MergePatch | PatchType::StrategicMergePatch | PatchType::ApplyPatch => {
            json_patch::merge(&mut patched, patch);
        }
    }
    Ok(patched)
}
