//! Reactors decide how the [`Fake`](crate::Fake) answers an action
//!
//! A reaction returns `Ok(Some(value))` to handle the action, `Ok(None)` to pass it
//! on to the next reactor, or `Err(e)` to fail the call with `e`.
//!
//! # Example
//! ```
//! use tekton_fake_client::reactor::SimpleReactor;
//! use tekton_fake_client::Error;
//!
//! let reactor = SimpleReactor::new("create", "runs", |_action| {
//!     Err(Error::Internal("create disabled".to_string()))
//! });
//! ```

use crate::action::Action;
use crate::watch::Watcher;
use crate::Result;
use serde_json::Value;
use std::sync::Arc;

pub type ReactionFunc = Arc<dyn Fn(&Action) -> Result<Option<Value>> + Send + Sync>;

pub type WatchReactionFunc = Arc<dyn Fn(&Action) -> Result<Option<Watcher>> + Send + Sync>;

pub trait Reactor: Send + Sync {
    /// Whether this reactor wants to see the action at all
    fn handles(&self, action: &Action) -> bool;

    fn react(&self, action: &Action) -> Result<Option<Value>>;
}

pub trait WatchReactor: Send + Sync {
    fn handles(&self, action: &Action) -> bool;

    fn react(&self, action: &Action) -> Result<Option<Watcher>>;
}

/// Reactor selected by verb and resource name, `"*"` matching anything
pub struct SimpleReactor {
    verb: String,
    resource: String,
    reaction: ReactionFunc,
}

impl SimpleReactor {
    pub fn new<F>(verb: impl Into<String>, resource: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Action) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        Self {
            verb: verb.into(),
            resource: resource.into(),
            reaction: Arc::new(f),
        }
    }
}

impl Reactor for SimpleReactor {
    fn handles(&self, action: &Action) -> bool {
        action.matches(&self.verb, &self.resource)
    }

    fn react(&self, action: &Action) -> Result<Option<Value>> {
        (self.reaction)(action)
    }
}

/// Watch reactor selected by resource name
pub struct SimpleWatchReactor {
    resource: String,
    reaction: WatchReactionFunc,
}

impl SimpleWatchReactor {
    pub fn new<F>(resource: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Action) -> Result<Option<Watcher>> + Send + Sync + 'static,
    {
        Self {
            resource: resource.into(),
            reaction: Arc::new(f),
        }
    }
}

impl WatchReactor for SimpleWatchReactor {
    fn handles(&self, action: &Action) -> bool {
        action.matches("watch", &self.resource)
    }

    fn react(&self, action: &Action) -> Result<Option<Watcher>> {
        (self.reaction)(action)
    }
}
