//! Builder for constructing fake clientsets with seeded objects and reactors

use crate::action::Action;
use crate::clientset::{register_defaults, Clientset};
use crate::client_utils::extract_gvk;
use crate::fake::Fake;
use crate::reactor::{SimpleReactor, SimpleWatchReactor};
use crate::registry::ResourceRegistry;
use crate::tracker::{ObjectTracker, GVR};
use crate::watch::Watcher;
use crate::{Error, Result};
use kube::Resource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Builder for [`Clientset`]
///
/// Seed objects are stored as-is, keeping any resourceVersion they carry. Reactors
/// registered here run before the tracker-backed defaults.
///
/// # Example
///
/// ```rust
/// use tekton_fake_client::{ClientBuilder, Run};
///
/// let mut run = Run::default();
/// run.metadata.name = Some("seeded".to_string());
/// run.metadata.namespace = Some("ci".to_string());
///
/// let cs = ClientBuilder::new()
///     .with_object(run)
///     .build()
///     .unwrap();
/// assert!(cs.tracker().list(&tekton_fake_client::runs_resource(), "ci").unwrap().len() == 1);
/// ```
pub struct ClientBuilder {
    initial_objects: Vec<Value>,
    registry: ResourceRegistry,
    with_status_subresource: Vec<GVR>,
    reactors: Vec<SimpleReactor>,
    watch_reactors: Vec<SimpleWatchReactor>,
    fixture_dir: Option<PathBuf>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            initial_objects: Vec::new(),
            registry: ResourceRegistry::new(),
            with_status_subresource: Vec::new(),
            reactors: Vec::new(),
            watch_reactors: Vec::new(),
            fixture_dir: None,
        }
    }

    pub fn with_object<K>(mut self, obj: K) -> Self
    where
        K: Resource + Serialize,
    {
        if let Ok(value) = serde_json::to_value(&obj) {
            self.initial_objects.push(value);
        }
        self
    }

    pub fn with_objects<K>(mut self, objects: impl IntoIterator<Item = K>) -> Self
    where
        K: Resource + Serialize,
    {
        for obj in objects {
            self = self.with_object(obj);
        }
        self
    }

    /// Seed untyped objects; each must carry `apiVersion` and `kind`
    pub fn with_runtime_objects(mut self, objects: Vec<Value>) -> Self {
        self.initial_objects.extend(objects);
        self
    }

    /// Make another resource type addressable through the REST bridge
    pub fn with_resource<K: Resource<DynamicType = ()>>(self) -> Self {
        self.registry.register::<K>();
        self
    }

    /// Enable the status subresource for a resource type
    ///
    /// `Run` has it enabled by default. With it enabled, updates leave the status
    /// alone and status updates leave everything else alone.
    pub fn with_status_subresource<K: Resource<DynamicType = ()>>(mut self) -> Self {
        self.with_status_subresource.push(GVR::for_resource::<K>());
        self
    }

    /// Register a reactor for `verb` on `resource` ahead of the default reactions
    ///
    /// # Example
    ///
    /// ```rust
    /// use tekton_fake_client::{ClientBuilder, Error};
    ///
    /// let cs = ClientBuilder::new()
    ///     .with_reactor("delete", "runs", |_| Err(Error::Internal("injected".into())))
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn with_reactor<F>(mut self, verb: &str, resource: &str, f: F) -> Self
    where
        F: Fn(&Action) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.reactors.push(SimpleReactor::new(verb, resource, f));
        self
    }

    pub fn with_watch_reactor<F>(mut self, resource: &str, f: F) -> Self
    where
        F: Fn(&Action) -> Result<Option<Watcher>> + Send + Sync + 'static,
    {
        self.watch_reactors.push(SimpleWatchReactor::new(resource, f));
        self
    }

    /// Base directory for relative fixture paths
    pub fn with_fixture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixture_dir = Some(dir.into());
        self
    }

    /// Load objects from a YAML fixture file
    ///
    /// A file may hold several documents separated by `---`. Objects without a
    /// namespace land in `default`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or a document is not valid YAML.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use tekton_fake_client::ClientBuilder;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let cs = ClientBuilder::new()
    ///     .with_fixture_dir("fixtures")
    ///     .load_fixture("runs.yaml")?
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn load_fixture(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let fixture_path = match &self.fixture_dir {
            Some(dir) => dir.join(path),
            None => path.as_ref().to_path_buf(),
        };

        let content = std::fs::read_to_string(&fixture_path).map_err(|e| {
            Error::Internal(format!(
                "Failed to read fixture file {:?}: {}",
                fixture_path, e
            ))
        })?;

        for document in serde_yaml::Deserializer::from_str(&content) {
            let mut value = Value::deserialize(document).map_err(|e| {
                Error::Internal(format!("Failed to parse YAML in {:?}: {}", fixture_path, e))
            })?;
            if value.is_null() {
                continue;
            }

            if let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) {
                metadata
                    .entry("namespace")
                    .or_insert_with(|| Value::String("default".to_string()));
            }

            self.initial_objects.push(value);
        }

        Ok(self)
    }

    pub fn load_fixtures<P>(mut self, paths: impl IntoIterator<Item = P>) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        for path in paths {
            self = self.load_fixture(path)?;
        }
        Ok(self)
    }

    /// # Panics
    ///
    /// Panics if the fixture file cannot be loaded or parsed.
    pub fn load_fixture_or_panic(self, path: impl AsRef<Path>) -> Self {
        self.load_fixture(path).expect("Failed to load fixture")
    }

    /// # Panics
    ///
    /// Panics if any fixture file cannot be loaded or parsed.
    pub fn load_fixtures_or_panic<P>(self, paths: impl IntoIterator<Item = P>) -> Self
    where
        P: AsRef<Path>,
    {
        self.load_fixtures(paths).expect("Failed to load fixtures")
    }

    /// # Errors
    ///
    /// Fails when a seed object has no apiVersion, kind or name, or is rejected by
    /// the tracker.
    pub fn build(self) -> Result<Clientset> {
        let tracker = ObjectTracker::new();
        register_defaults(&tracker, &self.registry);
        for gvr in self.with_status_subresource {
            tracker.add_status_subresource(gvr);
        }

        for obj in self.initial_objects {
            let gvk = extract_gvk(&obj)?;
            let gvr = self.registry.resource_for_kind(&gvk);
            let namespaced = self
                .registry
                .lookup(&gvr)
                .is_none_or(|meta| meta.namespaced);
            let namespace = match obj
                .get("metadata")
                .and_then(|m| m.get("namespace"))
                .and_then(Value::as_str)
            {
                Some(ns) if !ns.is_empty() => ns.to_string(),
                _ if namespaced => "default".to_string(),
                _ => String::new(),
            };

            tracker
                .add(&gvr, obj, &namespace)
                .map_err(|e| Error::Internal(format!("Failed to add initial object: {}", e)))?;
        }

        let fake = Fake::new();
        for reactor in self.reactors {
            fake.push_reactor(reactor);
        }
        for reactor in self.watch_reactors {
            fake.push_watch_reactor(reactor);
        }

        debug!("Built fake clientset");
        Ok(Clientset::assemble(
            fake,
            Arc::new(tracker),
            Arc::new(self.registry),
        ))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
