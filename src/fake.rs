//! Action recorder and reaction chain shared by every fake resource client

use crate::action::Action;
use crate::reactor::{Reactor, SimpleReactor, SimpleWatchReactor, WatchReactor};
use crate::watch::Watcher;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

#[derive(Default)]
struct Inner {
    actions: Vec<Action>,
    reactors: Vec<Box<dyn Reactor>>,
    watch_reactors: Vec<Box<dyn WatchReactor>>,
}

/// Records every action and answers it with the first reactor that handles it
///
/// Invocations are serialized: the lock is held for the whole walk of the reaction
/// chain, so a reactor must not call back into the same `Fake`.
///
/// # Example
/// ```
/// use tekton_fake_client::{Action, Fake, GVR};
/// use serde_json::json;
///
/// let fake = Fake::new();
/// fake.prepend_reactor("get", "runs", |_| Ok(Some(json!({"metadata": {"name": "run-1"}}))));
///
/// let gvr = GVR::new("tekton.dev", "v1beta1", "runs");
/// let value = fake.invokes_raw(Action::get(gvr, "default", "run-1")).unwrap();
/// assert_eq!(value.unwrap()["metadata"]["name"], "run-1");
/// assert_eq!(fake.actions().len(), 1);
/// ```
#[derive(Default)]
pub struct Fake {
    inner: Mutex<Inner>,
}

impl Fake {
    /// A fake with an empty reaction chain; every action comes back unhandled
    pub fn new() -> Self {
        Self::default()
    }

    /// The log and the chain stay usable after a reactor panics mid-walk
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a reactor for `verb` on `resource`; it runs after the existing ones
    pub fn add_reactor<F>(&self, verb: &str, resource: &str, f: F)
    where
        F: Fn(&Action) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.push_reactor(SimpleReactor::new(verb, resource, f));
    }

    /// Insert a reactor in front of the chain
    pub fn prepend_reactor<F>(&self, verb: &str, resource: &str, f: F)
    where
        F: Fn(&Action) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.lock()
            .reactors
            .insert(0, Box::new(SimpleReactor::new(verb, resource, f)));
    }

    pub fn push_reactor(&self, reactor: impl Reactor + 'static) {
        self.lock().reactors.push(Box::new(reactor));
    }

    pub fn add_watch_reactor<F>(&self, resource: &str, f: F)
    where
        F: Fn(&Action) -> Result<Option<Watcher>> + Send + Sync + 'static,
    {
        self.push_watch_reactor(SimpleWatchReactor::new(resource, f));
    }

    pub fn prepend_watch_reactor<F>(&self, resource: &str, f: F)
    where
        F: Fn(&Action) -> Result<Option<Watcher>> + Send + Sync + 'static,
    {
        self.lock()
            .watch_reactors
            .insert(0, Box::new(SimpleWatchReactor::new(resource, f)));
    }

    pub fn push_watch_reactor(&self, reactor: impl WatchReactor + 'static) {
        self.lock().watch_reactors.push(Box::new(reactor));
    }

    /// Record `action` and walk the reaction chain
    ///
    /// Returns `Ok(None)` when no reactor handled the action.
    pub fn invokes_raw(&self, action: Action) -> Result<Option<Value>> {
        let mut inner = self.lock();
        trace!("Invoking action: {}", action);
        inner.actions.push(action.clone());

        for reactor in inner.reactors.iter().filter(|r| r.handles(&action)) {
            if let Some(value) = reactor.react(&action)? {
                return Ok(Some(value));
            }
        }

        debug!("No reactor handled action: {}", action);
        Ok(None)
    }

    /// Typed form of [`invokes_raw`](Self::invokes_raw)
    ///
    /// An unhandled action yields `K::default()`.
    pub fn invokes<K>(&self, action: Action) -> Result<K>
    where
        K: DeserializeOwned + Default,
    {
        match self.invokes_raw(action)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(K::default()),
        }
    }

    /// Record a watch action and ask the watch reactors for a watcher
    pub fn invokes_watch(&self, action: Action) -> Result<Watcher> {
        let mut inner = self.lock();
        trace!("Invoking watch action: {}", action);
        inner.actions.push(action.clone());

        for reactor in inner.watch_reactors.iter().filter(|r| r.handles(&action)) {
            if let Some(watcher) = reactor.react(&action)? {
                return Ok(watcher);
            }
        }

        Err(Error::NoReaction {
            verb: action.verb.to_string(),
            resource: action.resource.to_string(),
        })
    }

    /// Actions recorded so far, oldest first
    pub fn actions(&self) -> Vec<Action> {
        self.lock().actions.clone()
    }

    pub fn clear_actions(&self) {
        self.lock().actions.clear();
    }
}
