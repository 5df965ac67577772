use crate::error::Result;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Lazily populated, process-wide metadata (file formats, option tables).
///
/// The first successful load wins and is shared by every later caller. A
/// failed load leaves the cache empty, so the next access tries again.
pub struct MetadataCache<T> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> MetadataCache<T> {
    pub const fn new() -> Self {
        Self {
            slot: parking_lot::const_mutex(None),
        }
    }

    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        let mut slot = self.slot.lock();
        if let Some(value) = slot.as_ref() {
            return Ok(Arc::clone(value));
        }
        trace!("populating metadata cache");
        let value = Arc::new(load()?);
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.lock().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl<T> Default for MetadataCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MetadataCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataCache")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
