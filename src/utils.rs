use crate::{Error, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use serde_json::Value;

pub fn extract_metadata(object: &Value) -> Result<ObjectMeta> {
    let meta_value = object
        .get("metadata")
        .ok_or_else(|| Error::MetadataError("Object missing metadata field".to_string()))?;

    serde_json::from_value(meta_value.clone())
        .map_err(|e| Error::MetadataError(format!("Failed to parse metadata: {}", e)))
}

pub fn should_be_deleted(meta: &ObjectMeta) -> bool {
    meta.deletion_timestamp.is_some() && meta.finalizers.as_ref().is_none_or(Vec::is_empty)
}

pub fn has_finalizers(meta: &ObjectMeta) -> bool {
    meta.finalizers.as_ref().is_some_and(|f| !f.is_empty())
}

/// Fill in the fields the API server sets on first write
pub fn ensure_metadata(meta: &mut ObjectMeta, namespace: &str) {
    // Cluster-scoped objects never carry a namespace
    if namespace.is_empty() {
        meta.namespace = None;
    } else if meta.namespace.as_deref().is_none_or(str::is_empty) {
        meta.namespace = Some(namespace.to_string());
    }
    if meta.creation_timestamp.is_none() {
        meta.creation_timestamp = Some(Time(chrono::Utc::now()));
    }
    if meta.uid.is_none() {
        meta.uid = Some(uuid::Uuid::new_v4().to_string());
    }
}

/// Reject objects addressed to one namespace but claiming another
pub fn check_namespace(meta: &ObjectMeta, namespace: &str) -> Result<()> {
    match meta.namespace.as_deref() {
        Some(obj_ns) if !obj_ns.is_empty() && !namespace.is_empty() && obj_ns != namespace => {
            Err(Error::InvalidRequest(format!(
                "the namespace of the object ({}) does not match the namespace on the request ({})",
                obj_ns, namespace
            )))
        }
        _ => Ok(()),
    }
}

/// Timestamps travel with second precision, so compare at that granularity
pub fn deletion_timestamp_equal(a: &Option<Time>, b: &Option<Time>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.0.timestamp() == b.0.timestamp(),
        (None, None) => true,
        _ => false,
    }
}
