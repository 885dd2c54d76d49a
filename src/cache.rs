//! Rendered-page cache shared between the web layer and the schedule engine.
//!
//! The web side caches rendered page bodies keyed by request path. The
//! engine only ever invalidates; a stale miss just re-renders, so nothing
//! here is allowed to fail.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// In-process cache of rendered page bodies keyed by request path.
#[derive(Default)]
pub struct PageCache {
    pages: Mutex<HashMap<String, String>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a rendered body under `path`, replacing any previous entry.
    pub fn put(&self, path: &str, body: String) {
        self.lock().insert(path.to_owned(), body);
    }

    /// Fetch the cached body for `path`, if present.
    pub fn get(&self, path: &str) -> Option<String> {
        self.lock().get(path).cloned()
    }

    /// Drop cached entries matching `pattern`.
    ///
    /// A trailing `*` makes the pattern a prefix match (`"/cards*"` drops
    /// `/cards`, `/cards/3`, ...); otherwise only the exact key is dropped.
    /// Returns how many entries were removed.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let mut pages = self.lock();
        if let Some(prefix) = pattern.strip_suffix('*') {
            let before = pages.len();
            pages.retain(|path, _| !path.starts_with(prefix));
            before - pages.len()
        } else {
            usize::from(pages.remove(pattern).is_some())
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A poisoned lock only means a panic mid-insert elsewhere; the map is
    // still usable and a cache may serve slightly stale data, so recover.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
