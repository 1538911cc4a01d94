//! Typed client for Tekton `Run` objects backed by a [`Fake`]

use crate::action::Action;
use crate::fake::Fake;
use crate::label_selector;
use crate::patch::PatchType;
use crate::run::{Run, RunList};
use crate::tracker::{GVK, GVR};
use crate::watch::WatchStream;
use crate::Result;
use async_trait::async_trait;
use kube::api::{DeleteParams, GetParams, ListParams, PatchParams, PostParams};
use std::sync::Arc;

/// Resource identity of runs, `tekton.dev/v1beta1/runs`
pub fn runs_resource() -> GVR {
    GVR::for_resource::<Run>()
}

/// Kind identity of runs, `tekton.dev/v1beta1/Run`
pub fn runs_kind() -> GVK {
    GVK::for_resource::<Run>()
}

/// Operations available on runs in one namespace
#[async_trait]
pub trait RunInterface: Send + Sync {
    async fn create(&self, run: &Run, pp: &PostParams) -> Result<Run>;

    async fn update(&self, run: &Run, pp: &PostParams) -> Result<Run>;

    /// Replace only the status of `run`
    async fn update_status(&self, run: &Run, pp: &PostParams) -> Result<Run>;

    async fn delete(&self, name: &str, dp: &DeleteParams) -> Result<()>;

    async fn delete_collection(&self, dp: &DeleteParams, lp: &ListParams) -> Result<()>;

    async fn get(&self, name: &str, gp: &GetParams) -> Result<Run>;

    async fn list(&self, lp: &ListParams) -> Result<RunList>;

    async fn watch(&self, lp: &ListParams) -> Result<WatchStream<Run>>;

    /// Patch the run, or the subresource named by the first entry of `subresources`
    async fn patch(
        &self,
        name: &str,
        patch_type: PatchType,
        data: &[u8],
        pp: &PatchParams,
        subresources: &[&str],
    ) -> Result<Run>;
}

/// [`RunInterface`] that records every call as an [`Action`] on a shared [`Fake`]
///
/// An empty namespace addresses runs in all namespaces.
#[derive(Clone)]
pub struct FakeRuns {
    fake: Arc<Fake>,
    ns: String,
}

impl FakeRuns {
    pub fn new(fake: Arc<Fake>, namespace: &str) -> Self {
        Self {
            fake,
            ns: namespace.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.ns
    }
}

#[async_trait]
impl RunInterface for FakeRuns {
    async fn create(&self, run: &Run, _pp: &PostParams) -> Result<Run> {
        let object = serde_json::to_value(run)?;
        self.fake.invokes(Action::create(runs_resource(), &self.ns, object))
    }

    async fn update(&self, run: &Run, _pp: &PostParams) -> Result<Run> {
        let object = serde_json::to_value(run)?;
        self.fake.invokes(Action::update(runs_resource(), &self.ns, object))
    }

    async fn update_status(&self, run: &Run, _pp: &PostParams) -> Result<Run> {
        let object = serde_json::to_value(run)?;
        self.fake.invokes(Action::update_subresource(
            runs_resource(),
            "status",
            &self.ns,
            object,
        ))
    }

    async fn delete(&self, name: &str, _dp: &DeleteParams) -> Result<()> {
        self.fake.invokes_raw(Action::delete(runs_resource(), &self.ns, name))?;
        Ok(())
    }

    async fn delete_collection(&self, _dp: &DeleteParams, lp: &ListParams) -> Result<()> {
        let action = Action::delete_collection(runs_resource(), &self.ns, lp)?;
        self.fake.invokes_raw(action)?;
        Ok(())
    }

    async fn get(&self, name: &str, _gp: &GetParams) -> Result<Run> {
        self.fake.invokes(Action::get(runs_resource(), &self.ns, name))
    }

    /// Lists runs, keeping only those matching the label selector
    ///
    /// The field selector is validated here but applied by the reactors.
    async fn list(&self, lp: &ListParams) -> Result<RunList> {
        let action = Action::list(runs_resource(), runs_kind(), &self.ns, lp)?;
        let selector = action
            .restrictions()
            .map(|r| r.labels.clone())
            .unwrap_or_else(label_selector::everything);

        let found: RunList = self.fake.invokes(action)?;
        let items = found
            .items
            .into_iter()
            .filter(|run| label_selector::matches(&selector, run.metadata.labels.as_ref()))
            .collect();

        Ok(RunList {
            metadata: found.metadata,
            items,
        })
    }

    async fn watch(&self, lp: &ListParams) -> Result<WatchStream<Run>> {
        let action = Action::watch(runs_resource(), &self.ns, lp)?;
        Ok(self.fake.invokes_watch(action)?.typed::<Run>())
    }

    async fn patch(
        &self,
        name: &str,
        patch_type: PatchType,
        data: &[u8],
        _pp: &PatchParams,
        subresources: &[&str],
    ) -> Result<Run> {
        self.fake.invokes(Action::patch_subresource(
            runs_resource(),
            &self.ns,
            name,
            patch_type,
            data,
            subresources,
        ))
    }
}
