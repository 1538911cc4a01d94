//! Registry of the resource types the fake clientset knows about
//!
//! The REST bridge and the untyped seeding paths need to translate between URL
//! plurals and kinds; only registered resources can be addressed that way.

use crate::client_utils::pluralize;
use crate::tracker::{GVK, GVR};
use kube::core::NamespaceResourceScope;
use kube::Resource;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceMetadata {
    pub gvk: GVK,
    pub gvr: GVR,
    pub namespaced: bool,
}

#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: RwLock<HashMap<GVR, ResourceMetadata>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<GVR, ResourceMetadata>> {
        self.resources.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<GVR, ResourceMetadata>> {
        self.resources.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a statically typed resource
    pub fn register<K: Resource<DynamicType = ()>>(&self) {
        let namespaced = std::any::type_name::<K::Scope>()
            == std::any::type_name::<NamespaceResourceScope>();
        self.insert(ResourceMetadata {
            gvk: GVK::for_resource::<K>(),
            gvr: GVR::for_resource::<K>(),
            namespaced,
        });
    }

    pub fn insert(&self, metadata: ResourceMetadata) {
        self.write().insert(metadata.gvr.clone(), metadata);
    }

    pub fn lookup(&self, gvr: &GVR) -> Option<ResourceMetadata> {
        self.read().get(gvr).cloned()
    }

    pub fn lookup_by_kind(&self, gvk: &GVK) -> Option<ResourceMetadata> {
        self.read()
            .values()
            .find(|m| &m.gvk == gvk)
            .cloned()
    }

    /// Resource for a kind, falling back to the conventional plural when unregistered
    pub fn resource_for_kind(&self, gvk: &GVK) -> GVR {
        self.lookup_by_kind(gvk)
            .map(|m| m.gvr)
            .unwrap_or_else(|| {
                GVR::new(gvk.group.clone(), gvk.version.clone(), pluralize(&gvk.kind))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::Run;

    #[test]
    fn test_registry_empty() {
        let registry = ResourceRegistry::new();
        assert!(registry
            .lookup(&GVR::new("tekton.dev", "v1beta1", "runs"))
            .is_none());
    }

    #[test]
    fn test_register_run() {
        let registry = ResourceRegistry::new();
        registry.register::<Run>();

        let meta = registry
            .lookup(&GVR::new("tekton.dev", "v1beta1", "runs"))
            .unwrap();
        assert_eq!(meta.gvk, GVK::new("tekton.dev", "v1beta1", "Run"));
        assert!(meta.namespaced);
    }

    #[test]
    fn test_resource_for_unregistered_kind_is_pluralized() {
        let registry = ResourceRegistry::new();
        let gvr = registry.resource_for_kind(&GVK::new("tekton.dev", "v1beta1", "TaskRun"));
        assert_eq!(gvr.resource, "taskruns");
    }
}
