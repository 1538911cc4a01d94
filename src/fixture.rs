//! Default reactions backed by an [`ObjectTracker`]
//!
//! These sit at the end of the reaction chain and turn each action into the
//! corresponding tracker call.

use crate::action::{Action, Payload, Verb};
use crate::patch::{apply_patch, decode_patch, PatchType};
use crate::tracker::{ObjectTracker, GVK};
use crate::watch::Watcher;
use crate::{Error, Result};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, trace};

/// Reaction answering get, list, create, update, delete, delete-collection and patch
pub fn object_reaction(
    tracker: Arc<ObjectTracker>,
) -> impl Fn(&Action) -> Result<Option<Value>> + Send + Sync + 'static {
    move |action| react(&tracker, action).map(Some)
}

/// Watch reaction registering a tracker watch with the action's selectors
pub fn watch_reaction(
    tracker: Arc<ObjectTracker>,
) -> impl Fn(&Action) -> Result<Option<Watcher>> + Send + Sync + 'static {
    move |action| {
        let restrictions = action.restrictions().cloned().unwrap_or_default();
        restrictions.fields.validate()?;
        tracker
            .watch(&action.resource, &action.namespace, restrictions)
            .map(Some)
    }
}

fn missing_payload(action: &Action) -> Error {
    Error::InvalidRequest(format!("malformed {} action", action.verb))
}

fn react(tracker: &ObjectTracker, action: &Action) -> Result<Value> {
    trace!("Default reaction for action: {}", action);

    if let Some(sub) = action.subresource.as_deref() {
        if sub != "status" {
            return Err(Error::InvalidRequest(format!(
                "subresource {:?} is not supported for {}",
                sub, action.resource
            )));
        }
    }

    let gvr = &action.resource;
    let namespace = action.namespace.as_str();

    match action.verb {
        Verb::Get => {
            let name = action.name().ok_or_else(|| missing_payload(action))?;
            tracker.get(gvr, namespace, name)
        }
        Verb::List => list(tracker, action),
        Verb::Create => {
            let object = action.object().ok_or_else(|| missing_payload(action))?;
            tracker.create(gvr, object.clone(), namespace)
        }
        Verb::Update => {
            let object = action.object().ok_or_else(|| missing_payload(action))?;
            tracker.update(gvr, object.clone(), namespace, action.is_status())
        }
        Verb::Delete => {
            let name = action.name().ok_or_else(|| missing_payload(action))?;
            tracker.delete(gvr, namespace, name)
        }
        Verb::DeleteCollection => delete_collection(tracker, action),
        Verb::Patch => patch(tracker, action),
        Verb::Watch => Err(Error::InvalidRequest(
            "watch actions are answered by watch reactors".to_string(),
        )),
    }
}

fn list(tracker: &ObjectTracker, action: &Action) -> Result<Value> {
    let restrictions = action.restrictions().cloned().unwrap_or_default();
    restrictions.fields.validate()?;

    let mut items = Vec::new();
    for item in tracker.list(&action.resource, &action.namespace)? {
        if restrictions.fields.matches(&item)? {
            items.push(item);
        }
    }

    let kind = action.kind.clone().unwrap_or_else(|| {
        GVK::new(
            action.resource.group.clone(),
            action.resource.version.clone(),
            "",
        )
    });

    Ok(json!({
        "apiVersion": kind.api_version(),
        "kind": format!("{}List", kind.kind),
        "metadata": { "resourceVersion": tracker.resource_version()? },
        "items": items,
    }))
}

fn delete_collection(tracker: &ObjectTracker, action: &Action) -> Result<Value> {
    let restrictions = action.restrictions().cloned().unwrap_or_default();
    restrictions.fields.validate()?;

    let mut deleted = 0usize;
    for item in tracker.list(&action.resource, &action.namespace)? {
        if !restrictions.matches(&item)? {
            continue;
        }
        let name = item["metadata"]["name"].as_str().unwrap_or_default();
        let namespace = item["metadata"]["namespace"].as_str().unwrap_or_default();
        tracker.delete(&action.resource, namespace, name)?;
        deleted += 1;
    }

    debug!("Deleted {} objects for action: {}", deleted, action);
    Ok(json!({
        "apiVersion": "v1",
        "kind": "Status",
        "status": "Success",
    }))
}

fn patch(tracker: &ObjectTracker, action: &Action) -> Result<Value> {
    let Payload::Patch {
        name,
        patch_type,
        data,
    } = &action.payload
    else {
        return Err(missing_payload(action));
    };

    let gvr = &action.resource;
    let namespace = action.namespace.as_str();
    let decoded = decode_patch(*patch_type, data)?;

    match tracker.get(gvr, namespace, name) {
        Ok(existing) => {
            let patched = apply_patch(&existing, &decoded, *patch_type)?;
            tracker.update(gvr, patched, namespace, action.is_status())
        }
        // Apply creates missing objects, but never through a subresource
        Err(err)
            if err.is_not_found()
                && *patch_type == PatchType::ApplyPatch
                && action.subresource.is_none() =>
        {
            let object = with_name(decoded, name)?;
            debug!("Apply patch creating missing object: {}/{}", namespace, name);
            tracker.create(gvr, object, namespace)
        }
        Err(err) => Err(err),
    }
}

/// Set `metadata.name` on an apply body, creating `metadata` when absent
fn with_name(mut object: Value, name: &str) -> Result<Value> {
    let fields = object
        .as_object_mut()
        .ok_or_else(|| Error::InvalidPatch("apply patch body must be an object".to_string()))?;

    let metadata = fields
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if metadata.is_null() {
        *metadata = Value::Object(Map::new());
    }
    metadata
        .as_object_mut()
        .ok_or_else(|| Error::InvalidPatch("metadata must be an object".to_string()))?
        .insert("name".to_string(), Value::String(name.to_string()));

    Ok(object)
}
