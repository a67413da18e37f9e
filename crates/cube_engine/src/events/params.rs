//! Key-value message arguments
//!
//! Arguments are looked up by name so publishers and subscribers never depend
//! on argument order. One `Params` instance is handed by mutable reference to
//! every subscriber of a single dispatch, so subscribers can read the fields
//! the publisher supplied and write result fields for later subscribers or
//! for the publisher itself.

use std::collections::HashMap;
use std::fmt;

/// Message payload: a map from static key to a value of type `V`
#[derive(Clone, PartialEq)]
pub struct Params<V> {
    args: HashMap<&'static str, V>,
}

impl<V> Params<V> {
    /// Create an empty payload
    pub fn new() -> Self {
        Self {
            args: HashMap::new(),
        }
    }

    /// Add an argument (builder pattern)
    #[must_use]
    pub fn with(mut self, key: &'static str, value: impl Into<V>) -> Self {
        self.args.insert(key, value.into());
        self
    }

    /// Set an argument, returning the previous value if any
    pub fn set(&mut self, key: &'static str, value: impl Into<V>) -> Option<V> {
        self.args.insert(key, value.into())
    }

    /// Get an argument by key
    pub fn get(&self, key: &str) -> Option<&V> {
        self.args.get(key)
    }

    /// Get a mutable argument by key
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.args.get_mut(key)
    }

    /// Get an argument the publisher's contract guarantees
    ///
    /// # Panics
    ///
    /// Panics when the key is absent. A missing contracted key is a
    /// programming error at the call site, not a runtime condition.
    pub fn require(&self, key: &str) -> &V {
        match self.args.get(key) {
            Some(value) => value,
            None => missing_key(key),
        }
    }

    /// Mutable counterpart of [`Params::require`]
    ///
    /// # Panics
    ///
    /// Panics when the key is absent.
    pub fn require_mut(&mut self, key: &str) -> &mut V {
        match self.args.get_mut(key) {
            Some(value) => value,
            None => missing_key(key),
        }
    }

    /// Remove an argument
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.args.remove(key)
    }

    /// Whether an argument is present
    pub fn contains(&self, key: &str) -> bool {
        self.args.contains_key(key)
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Whether the payload carries no arguments
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

#[cold]
fn missing_key(key: &str) -> ! {
    panic!("message payload is missing contracted key `{key}`")
}

impl<V> Default for Params<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for Params<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.args.keys().collect();
        keys.sort();
        let mut map = f.debug_map();
        for key in keys {
            map.entry(key, &self.args[key]);
        }
        map.finish()
    }
}
