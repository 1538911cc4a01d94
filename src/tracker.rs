use crate::action::ListRestrictions;
use crate::utils::{
    check_namespace, deletion_timestamp_equal, ensure_metadata, extract_metadata, has_finalizers,
    should_be_deleted,
};
use crate::watch::Watcher;
use crate::{Error, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::core::WatchEvent;
use kube::Resource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use tracing::{debug, trace};

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GVR {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GVR {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// Resource identity of a statically typed resource
    pub fn for_resource<K: Resource<DynamicType = ()>>() -> Self {
        Self::new(K::group(&()), K::version(&()), K::plural(&()))
    }
}

impl fmt::Display for GVR {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.resource)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.resource)
        }
    }
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GVK {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GVK {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    pub fn for_resource<K: Resource<DynamicType = ()>>() -> Self {
        Self::new(K::group(&()), K::version(&()), K::kind(&()))
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    pub data: Value,
    pub metadata: ObjectMeta,
}

type ObjectsByName = BTreeMap<String, StoredObject>;
type ObjectsByNamespace = BTreeMap<String, ObjectsByName>;
type ObjectStorage = HashMap<GVR, ObjectsByNamespace>;

#[derive(Default)]
struct Store {
    objects: ObjectStorage,
    /// Last resource version handed out; shared by every object
    resource_version: u64,
}

impl Store {
    fn next_resource_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }

    fn lookup(&self, gvr: &GVR, namespace: &str, name: &str) -> Option<&StoredObject> {
        self.objects.get(gvr)?.get(namespace)?.get(name)
    }

    fn insert(&mut self, gvr: &GVR, namespace: &str, name: &str, stored: StoredObject) -> bool {
        self.objects
            .entry(gvr.clone())
            .or_default()
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), stored)
            .is_some()
    }

    fn remove(&mut self, gvr: &GVR, namespace: &str, name: &str) -> Option<StoredObject> {
        self.objects.get_mut(gvr)?.get_mut(namespace)?.remove(name)
    }
}

#[derive(Debug, Clone, Copy)]
enum EventType {
    Added,
    Modified,
    Deleted,
}

struct WatchRegistration {
    /// Empty means all namespaces
    namespace: String,
    restrictions: ListRestrictions,
    tx: mpsc::UnboundedSender<WatchEvent<Value>>,
}

/// In-memory object store with watch support
///
/// Objects are kept as JSON and grouped by resource, namespace and name. Listings
/// are ordered by namespace, then name.
pub struct ObjectTracker {
    store: RwLock<Store>,
    watchers: Mutex<HashMap<GVR, Vec<WatchRegistration>>>,
    with_status_subresource: RwLock<HashSet<GVR>>,
}

fn not_found(gvr: &GVR, namespace: &str, name: &str) -> Error {
    Error::NotFound {
        kind: gvr.resource.clone(),
        name: name.to_string(),
        namespace: namespace.to_string(),
    }
}

fn required_name(meta: &ObjectMeta) -> Result<String> {
    meta.name
        .clone()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::InvalidRequest("Object name is required".to_string()))
}

fn poisoned(what: &str) -> Error {
    Error::Internal(format!("{} lock poisoned", what))
}

impl ObjectTracker {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::default()),
            watchers: Mutex::new(HashMap::new()),
            with_status_subresource: RwLock::new(HashSet::new()),
        }
    }

    fn read_store(&self) -> Result<RwLockReadGuard<'_, Store>> {
        self.store.read().map_err(|_| poisoned("object store"))
    }

    fn write_store(&self) -> Result<RwLockWriteGuard<'_, Store>> {
        self.store.write().map_err(|_| poisoned("object store"))
    }

    /// Registrations are plain data, so a poisoned lock is recovered
    fn lock_watchers(&self) -> MutexGuard<'_, HashMap<GVR, Vec<WatchRegistration>>> {
        self.watchers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enable the status subresource for a resource
    ///
    /// Main updates then keep the stored status and status updates keep everything else.
    pub fn add_status_subresource(&self, gvr: GVR) {
        self.with_status_subresource
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(gvr);
    }

    pub fn has_status_subresource(&self, gvr: &GVR) -> bool {
        self.with_status_subresource
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(gvr)
    }

    /// Latest resource version handed out by this tracker
    pub fn resource_version(&self) -> Result<String> {
        Ok(self.read_store()?.resource_version.to_string())
    }

    /// Seed an object, replacing any existing object with the same name
    ///
    /// Unlike `create`, a provided resourceVersion is kept.
    pub fn add(&self, gvr: &GVR, mut object: Value, namespace: &str) -> Result<Value> {
        trace!("Adding object: {} in namespace: {}", gvr, namespace);

        let mut meta = extract_metadata(&object)?;
        let name = required_name(&meta)?;
        check_namespace(&meta, namespace)?;

        if meta.deletion_timestamp.is_some() && !has_finalizers(&meta) {
            return Err(Error::InvalidRequest(format!(
                "refusing to add object {} with metadata.deletionTimestamp but no finalizers",
                name
            )));
        }

        let mut store = self.write_store()?;
        if meta.resource_version.as_deref().is_none_or(str::is_empty) {
            meta.resource_version = Some(store.next_resource_version());
        }
        ensure_metadata(&mut meta, namespace);
        object["metadata"] = serde_json::to_value(&meta)?;

        let stored = StoredObject {
            data: object.clone(),
            metadata: meta,
        };
        let replaced = store.insert(gvr, namespace, &name, stored);
        let event = if replaced {
            EventType::Modified
        } else {
            EventType::Added
        };
        self.dispatch(gvr, namespace, event, &object);

        debug!("Added object: {}/{}", namespace, name);
        Ok(object)
    }

    pub fn create(&self, gvr: &GVR, mut object: Value, namespace: &str) -> Result<Value> {
        trace!("Creating object: {} in namespace: {}", gvr, namespace);

        let mut meta = extract_metadata(&object)?;
        if meta.name.as_deref().is_none_or(str::is_empty) {
            if let Some(prefix) = meta.generate_name.as_deref().filter(|p| !p.is_empty()) {
                let suffix = uuid::Uuid::new_v4().simple().to_string();
                meta.name = Some(format!("{}{}", prefix, &suffix[..5]));
            }
        }
        let name = required_name(&meta)?;
        check_namespace(&meta, namespace)?;

        if meta
            .resource_version
            .as_ref()
            .is_some_and(|rv| !rv.is_empty())
        {
            return Err(Error::InvalidRequest(
                "resourceVersion can not be set for Create requests".to_string(),
            ));
        }

        let mut store = self.write_store()?;
        if store.lookup(gvr, namespace, &name).is_some() {
            return Err(Error::AlreadyExists {
                kind: gvr.resource.clone(),
                name,
                namespace: namespace.to_string(),
            });
        }

        meta.resource_version = Some(store.next_resource_version());
        meta.deletion_timestamp = None;
        ensure_metadata(&mut meta, namespace);
        object["metadata"] = serde_json::to_value(&meta)?;

        let stored = StoredObject {
            data: object.clone(),
            metadata: meta,
        };
        store.insert(gvr, namespace, &name, stored);
        self.dispatch(gvr, namespace, EventType::Added, &object);

        debug!("Created object: {}/{}", namespace, name);
        Ok(object)
    }

    pub fn get(&self, gvr: &GVR, namespace: &str, name: &str) -> Result<Value> {
        trace!("Getting object: {} {}/{}", gvr, namespace, name);

        let store = self.read_store()?;
        store
            .lookup(gvr, namespace, name)
            .map(|stored| stored.data.clone())
            .ok_or_else(|| not_found(gvr, namespace, name))
    }

    /// Replace an object
    ///
    /// A non-empty resourceVersion must match the stored one. When the status
    /// subresource is enabled, `is_status` selects which half of the object is written.
    pub fn update(
        &self,
        gvr: &GVR,
        mut object: Value,
        namespace: &str,
        is_status: bool,
    ) -> Result<Value> {
        trace!("Updating object: {} in namespace: {}", gvr, namespace);

        let meta = extract_metadata(&object)?;
        let name = required_name(&meta)?;
        check_namespace(&meta, namespace)?;

        let mut store = self.write_store()?;
        let existing = store
            .lookup(gvr, namespace, &name)
            .cloned()
            .ok_or_else(|| not_found(gvr, namespace, &name))?;
        let existing_meta = existing.metadata;

        if let (Some(provided_rv), Some(current_rv)) =
            (&meta.resource_version, &existing_meta.resource_version)
        {
            if !provided_rv.is_empty() && provided_rv != current_rv {
                return Err(Error::Conflict(format!(
                    "the object {}/{} has been modified; resource version mismatch: expected {}, got {}",
                    namespace, name, current_rv, provided_rv
                )));
            }
        }

        let mut new_meta = meta;
        if self.has_status_subresource(gvr) {
            if is_status {
                // Status writes only ever touch status
                match existing.data.get("spec") {
                    Some(spec) => object["spec"] = spec.clone(),
                    None => {
                        if let Some(obj) = object.as_object_mut() {
                            obj.remove("spec");
                        }
                    }
                }
                new_meta = existing_meta.clone();
            } else {
                match existing.data.get("status") {
                    Some(status) => object["status"] = status.clone(),
                    None => {
                        if let Some(obj) = object.as_object_mut() {
                            obj.remove("status");
                        }
                    }
                }
            }
        }

        if !deletion_timestamp_equal(
            &new_meta.deletion_timestamp,
            &existing_meta.deletion_timestamp,
        ) {
            return Err(Error::InvalidRequest(
                "metadata.deletionTimestamp field is immutable".to_string(),
            ));
        }

        new_meta.resource_version = Some(store.next_resource_version());
        new_meta.uid = existing_meta.uid;
        new_meta.creation_timestamp = existing_meta.creation_timestamp;
        ensure_metadata(&mut new_meta, namespace);
        object["metadata"] = serde_json::to_value(&new_meta)?;

        if should_be_deleted(&new_meta) {
            store.remove(gvr, namespace, &name);
            self.dispatch(gvr, namespace, EventType::Deleted, &object);
            debug!("Deleted object after last finalizer was removed: {}/{}", namespace, name);
            return Ok(object);
        }

        let stored = StoredObject {
            data: object.clone(),
            metadata: new_meta,
        };
        store.insert(gvr, namespace, &name, stored);
        self.dispatch(gvr, namespace, EventType::Modified, &object);

        debug!("Updated object: {}/{}", namespace, name);
        Ok(object)
    }

    /// Delete an object
    ///
    /// Objects that still carry finalizers are only marked with a deletionTimestamp.
    pub fn delete(&self, gvr: &GVR, namespace: &str, name: &str) -> Result<Value> {
        trace!("Deleting object: {} {}/{}", gvr, namespace, name);

        let mut store = self.write_store()?;
        let existing = store
            .lookup(gvr, namespace, name)
            .cloned()
            .ok_or_else(|| not_found(gvr, namespace, name))?;

        if has_finalizers(&existing.metadata) {
            if existing.metadata.deletion_timestamp.is_some() {
                return Ok(existing.data);
            }
            let mut meta = existing.metadata;
            meta.deletion_timestamp = Some(Time(chrono::Utc::now()));
            meta.resource_version = Some(store.next_resource_version());
            let mut object = existing.data;
            object["metadata"] = serde_json::to_value(&meta)?;

            store.insert(
                gvr,
                namespace,
                name,
                StoredObject {
                    data: object.clone(),
                    metadata: meta,
                },
            );
            self.dispatch(gvr, namespace, EventType::Modified, &object);

            debug!("Marked object for deletion: {}/{}", namespace, name);
            return Ok(object);
        }

        let stored = store
            .remove(gvr, namespace, name)
            .ok_or_else(|| not_found(gvr, namespace, name))?;
        self.dispatch(gvr, namespace, EventType::Deleted, &stored.data);

        debug!("Deleted object: {}/{}", namespace, name);
        Ok(stored.data)
    }

    /// List objects in one namespace, or in all namespaces when `namespace` is empty
    pub fn list(&self, gvr: &GVR, namespace: &str) -> Result<Vec<Value>> {
        trace!("Listing objects: {} in namespace: {:?}", gvr, namespace);

        let store = self.read_store()?;
        let Some(gvr_objects) = store.objects.get(gvr) else {
            return Ok(Vec::new());
        };

        let result = if namespace.is_empty() {
            gvr_objects
                .values()
                .flat_map(|ns_objects| ns_objects.values())
                .map(|stored| stored.data.clone())
                .collect()
        } else {
            gvr_objects
                .get(namespace)
                .map(|ns_objects| ns_objects.values().map(|s| s.data.clone()).collect())
                .unwrap_or_default()
        };

        Ok(result)
    }

    /// Register a watch; only mutations made after this call are delivered
    pub fn watch(
        &self,
        gvr: &GVR,
        namespace: &str,
        restrictions: ListRestrictions,
    ) -> Result<Watcher> {
        trace!("Watching objects: {} in namespace: {:?}", gvr, namespace);

        let (tx, rx) = mpsc::unbounded_channel();
        self.lock_watchers()
            .entry(gvr.clone())
            .or_default()
            .push(WatchRegistration {
                namespace: namespace.to_string(),
                restrictions,
                tx,
            });
        Ok(Watcher::new(rx))
    }

    /// Called with the store write lock held so events follow mutation order
    fn dispatch(&self, gvr: &GVR, namespace: &str, event_type: EventType, object: &Value) {
        let mut watchers = self.lock_watchers();
        let Some(registrations) = watchers.get_mut(gvr) else {
            return;
        };

        registrations.retain(|w| {
            if w.tx.is_closed() {
                return false;
            }
            if !w.namespace.is_empty() && w.namespace != namespace {
                return true;
            }
            if !w.restrictions.matches(object).unwrap_or(false) {
                return true;
            }
            let event = match event_type {
                EventType::Added => WatchEvent::Added(object.clone()),
                EventType::Modified => WatchEvent::Modified(object.clone()),
                EventType::Deleted => WatchEvent::Deleted(object.clone()),
            };
            w.tx.send(event).is_ok()
        });
    }
}

impl Default for ObjectTracker {
    fn default() -> Self {
        Self::new()
    }
}
