//! In-memory fake of the Tekton `v1beta1` Run client for unit tests.
//!
//! Every call on a typed client is recorded as an [`Action`] and answered by a chain
//! of reactors, the last of which is backed by an in-memory [`ObjectTracker`].
//!
//! # Examples
//!
//! ## Typed client
//!
//! ```rust
//! use tekton_fake_client::{ClientBuilder, Run, RunInterface};
//! use kube::api::{ListParams, PostParams};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cs = ClientBuilder::new().build()?;
//! let runs = cs.tekton_v1beta1().runs("default");
//!
//! let mut run = Run::default();
//! run.metadata.name = Some("build-1".to_string());
//! run.metadata.labels = Some([("app".to_string(), "build".to_string())].into());
//! runs.create(&run, &PostParams::default()).await?;
//!
//! let list = runs.list(&ListParams::default().labels("app=build")).await?;
//! assert_eq!(list.items.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Injecting errors
//!
//! ```rust
//! use tekton_fake_client::{Clientset, Error, RunInterface};
//! use kube::api::GetParams;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cs = Clientset::new();
//! cs.fake().prepend_reactor("get", "runs", |_| {
//!     Err(Error::Internal("etcd is down".to_string()))
//! });
//!
//! let err = cs.tekton_v1beta1().runs("default")
//!     .get("anything", &GetParams::default())
//!     .await
//!     .unwrap_err();
//! assert_eq!(err.code(), 500);
//! # }
//! ```
//!
//! ## kube::Api
//!
//! ```rust
//! use tekton_fake_client::{Clientset, Run};
//! use kube::api::{Api, PostParams};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cs = Clientset::new();
//! let api: Api<Run> = Api::namespaced(cs.kube_client(), "default");
//!
//! let mut run = Run::default();
//! run.metadata.name = Some("via-api".to_string());
//! api.create(&PostParams::default(), &run).await?;
//!
//! assert_eq!(cs.fake().actions().len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod action;
mod builder;
mod client_utils;
mod clientset;
mod error;
mod fake;
pub mod field_selectors;
mod fixture;
pub mod label_selector;
mod mock_service;
pub mod patch;
pub mod reactor;
mod registry;
mod run;
mod runs;
mod tracker;
mod utils;
pub mod watch;

#[cfg(test)]
mod action_test;
#[cfg(test)]
mod field_selectors_test;
#[cfg(test)]
mod runs_test;

pub use action::{Action, ListRestrictions, Payload, Verb};
pub use builder::ClientBuilder;
pub use clientset::{Clientset, TektonV1beta1};
pub use error::{Error, Result};
pub use fake::Fake;
pub use fixture::{object_reaction, watch_reaction};
pub use patch::PatchType;
pub use registry::{ResourceMetadata, ResourceRegistry};
pub use run::{
    Condition, EmbeddedMetadata, EmbeddedRunSpec, Param, ParamValue, Run, RunList, RunRef,
    RunResult, RunSpec, RunStatus, CONDITION_SUCCEEDED, RUN_SPEC_STATUS_CANCELLED,
};
pub use runs::{runs_kind, runs_resource, FakeRuns, RunInterface};
pub use tracker::{ObjectTracker, StoredObject, GVK, GVR};
pub use watch::{fake_watcher, FakeWatcher, WatchStream, Watcher};
