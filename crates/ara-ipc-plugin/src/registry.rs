//! Live-instance registries for refs the real plug-in issues.
//!
//! The stub cannot put plug-in refs into a generational table because it does
//! not mint them. It keeps the set of refs that were returned by a create call
//! and not yet destroyed instead, optionally with a value per ref.

use ara_ipc_core::{IpcError, ObjectKind, Result};
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug)]
pub struct LiveRegistry<R, V = ()> {
    kind: ObjectKind,
    live: HashMap<R, V>,
}

impl<R, V> LiveRegistry<R, V>
where
    R: Copy + Eq + Hash + Into<u64>,
{
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            live: HashMap::new(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Register a ref. Returns the previous value if the plug-in reused a live ref.
    pub fn insert(&mut self, r: R, value: V) -> Option<V> {
        self.live.insert(r, value)
    }

    pub fn remove(&mut self, r: R) -> Option<V> {
        self.live.remove(&r)
    }

    pub fn contains(&self, r: R) -> bool {
        self.live.contains_key(&r)
    }

    fn stale(&self, r: R) -> IpcError {
        IpcError::StaleHandle {
            kind: self.kind,
            handle: r.into(),
        }
    }

    pub fn check(&self, r: R) -> Result<()> {
        if self.contains(r) {
            Ok(())
        } else {
            Err(self.stale(r))
        }
    }

    pub fn get(&self, r: R) -> Result<&V> {
        self.live.get(&r).ok_or_else(|| self.stale(r))
    }

    /// Unregister a ref that must be live.
    pub fn take(&mut self, r: R) -> Result<V> {
        match self.live.remove(&r) {
            Some(value) => Ok(value),
            None => Err(self.stale(r)),
        }
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }
}
