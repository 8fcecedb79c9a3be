//! Explicit name registries and the clone rename map.

use super::link::Named;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Name → handle map for one kind of object.
///
/// Registries are passed by reference into resolution rather than living
/// as process-wide singletons, so independent graphs (and tests) can
/// coexist without clearing global state.
#[derive(Clone, Debug)]
pub struct Registry<T> {
    entries: HashMap<String, Rc<RefCell<T>>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: Named> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object under its current name. A later insert with
    /// the same name replaces the earlier entry.
    pub fn insert(&mut self, item: Rc<RefCell<T>>) {
        let name = item.borrow().name().to_string();
        self.entries.insert(name, item);
    }

    pub fn get(&self, name: &str) -> Option<Rc<RefCell<T>>> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rename map consulted when live references are reverted to names
/// during graph cloning: a cloned target's original name maps to the
/// clone's name.
#[derive(Clone, Debug, Default)]
pub struct Clones {
    renames: HashMap<String, String>,
}

impl Clones {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `original` was cloned as `clone`.
    pub fn record(&mut self, original: impl Into<String>, clone: impl Into<String>) {
        self.renames.insert(original.into(), clone.into());
    }

    /// The clone's name for `original`, if it was cloned.
    pub fn rename_of(&self, original: &str) -> Option<&str> {
        self.renames.get(original).map(String::as_str)
    }

    /// The name a reverted link should carry: the clone's name when the
    /// target was cloned, otherwise the original's own name.
    pub fn reverted(&self, name: &str) -> String {
        self.rename_of(name).unwrap_or(name).to_string()
    }
}
