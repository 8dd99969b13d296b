//! Captured path parameters and their pooled buffers.

use std::sync::Mutex;

/// Maximum number of idle buffers kept by a [`ParamsPool`].
pub const PARAMS_POOL_IDLE_MAX: usize = 256;

/// A single captured wildcard: the wildcard name and the literal text it matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: String,
}

/// Parameters in capture order (left to right along the path).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: Vec<Param>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Vec::with_capacity(capacity),
        }
    }

    /// Value bound to `key`.
    ///
    /// A template may capture the same name twice; the later capture wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .rev()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.push(Param {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.inner.iter()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.inner.truncate(len);
    }

    /// Drop all captures while keeping the allocation.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

/// Free list of parameter buffers shared by all request tasks.
///
/// Buffers are cleared on release, so a buffer handed out by
/// [`ParamsPool::acquire`] is always empty. A buffer can only come back once its
/// owner gives it up, so it is never reused while a response still holds it.
#[derive(Debug)]
pub struct ParamsPool {
    free: Mutex<Vec<Params>>,
    buffer_capacity: usize,
}

impl ParamsPool {
    /// Create a pool whose fresh buffers preallocate `buffer_capacity` slots.
    pub fn new(buffer_capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            buffer_capacity,
        }
    }

    /// Take an empty buffer from the pool, allocating one if none is idle.
    pub fn acquire(&self) -> Params {
        let recycled = self
            .free
            .lock()
            .expect("params pool mutex poisoned")
            .pop();
        recycled.unwrap_or_else(|| Params::with_capacity(self.buffer_capacity))
    }

    /// Return a buffer for reuse.
    pub fn release(&self, mut params: Params) {
        params.clear();
        let mut free = self.free.lock().expect("params pool mutex poisoned");
        if free.len() < PARAMS_POOL_IDLE_MAX {
            free.push(params);
        }
    }

    /// Number of idle buffers.
    pub fn idle(&self) -> usize {
        self.free.lock().expect("params pool mutex poisoned").len()
    }

    /// Raise the preallocation size, e.g. after registering a template with more wildcards.
    pub(crate) fn reserve_slots(&mut self, slots: usize) {
        self.buffer_capacity = self.buffer_capacity.max(slots);
    }
}

impl Default for ParamsPool {
    fn default() -> Self {
        Self::new(0)
    }
}
