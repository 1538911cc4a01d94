//! Fake clientset wiring a [`Fake`], an [`ObjectTracker`] and the typed clients together

use crate::fake::Fake;
use crate::fixture::{object_reaction, watch_reaction};
use crate::mock_service::MockService;
use crate::registry::ResourceRegistry;
use crate::run::Run;
use crate::runs::{runs_resource, FakeRuns};
use crate::tracker::ObjectTracker;
use std::sync::Arc;

/// Entry point for tests
///
/// Every typed client handed out shares the same action log, reaction chain and store.
///
/// # Example
/// ```
/// use tekton_fake_client::{Clientset, Run, RunInterface};
/// use kube::api::{GetParams, PostParams};
///
/// # #[tokio::main]
/// # async fn main() -> tekton_fake_client::Result<()> {
/// let cs = Clientset::new();
/// let runs = cs.tekton_v1beta1().runs("default");
///
/// let mut run = Run::default();
/// run.metadata.name = Some("run-1".to_string());
/// runs.create(&run, &PostParams::default()).await?;
///
/// let fetched = runs.get("run-1", &GetParams::default()).await?;
/// assert_eq!(fetched.metadata.namespace.as_deref(), Some("default"));
/// assert_eq!(cs.fake().actions().len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Clientset {
    fake: Arc<Fake>,
    tracker: Arc<ObjectTracker>,
    registry: Arc<ResourceRegistry>,
}

impl Clientset {
    /// Empty clientset with the default reactions and `Run` registered
    pub fn new() -> Self {
        let tracker = ObjectTracker::new();
        let registry = ResourceRegistry::new();
        register_defaults(&tracker, &registry);
        Self::assemble(Fake::new(), Arc::new(tracker), Arc::new(registry))
    }

    /// Append the tracker-backed reactions to `fake`, after any reactors it already holds
    pub(crate) fn assemble(
        fake: Fake,
        tracker: Arc<ObjectTracker>,
        registry: Arc<ResourceRegistry>,
    ) -> Self {
        fake.add_reactor("*", "*", object_reaction(tracker.clone()));
        fake.add_watch_reactor("*", watch_reaction(tracker.clone()));
        Self {
            fake: Arc::new(fake),
            tracker,
            registry,
        }
    }

    pub fn tekton_v1beta1(&self) -> TektonV1beta1 {
        TektonV1beta1 {
            fake: self.fake.clone(),
        }
    }

    pub fn fake(&self) -> &Arc<Fake> {
        &self.fake
    }

    pub fn tracker(&self) -> &Arc<ObjectTracker> {
        &self.tracker
    }

    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    /// A real `kube::Client` whose requests are answered by this clientset
    ///
    /// Requests are recorded and reacted to exactly like typed client calls.
    pub fn kube_client(&self) -> kube::Client {
        kube::Client::new(MockService::new(self.clone()), "default")
    }
}

impl Default for Clientset {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn register_defaults(tracker: &ObjectTracker, registry: &ResourceRegistry) {
    registry.register::<Run>();
    tracker.add_status_subresource(runs_resource());
}

/// Clients for the `tekton.dev/v1beta1` group
#[derive(Clone)]
pub struct TektonV1beta1 {
    fake: Arc<Fake>,
}

impl TektonV1beta1 {
    pub fn runs(&self, namespace: &str) -> FakeRuns {
        FakeRuns::new(self.fake.clone(), namespace)
    }
}
