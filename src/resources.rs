//! Ownership of generated outputs and their addressable handles.
//!
//! Every published raster gets one [`Handle`]: a `blob:iconcut/<n>` URI that
//! stays resolvable until released. The [`OutputManager`] is the registry of
//! live handles and is shared behind an `Arc`; the [`OutputSet`] returned by
//! [`OutputManager::publish`] is the scoped collection the session holds.
//!
//! A set releases its handles exactly once: on [`OutputSet::release`] or when
//! it is dropped, whichever comes first. Releasing a handle that is already
//! gone is a no-op, so overlapping releases are harmless.

use crate::pipeline::EncodedRaster;
use crate::types::TargetSize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const URI_PREFIX: &str = "blob:iconcut/";

/// An addressable reference to one output's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    id: u64,
    uri: String,
}

impl Handle {
    fn new(id: u64) -> Self {
        Self {
            id,
            uri: format!("{URI_PREFIX}{id}"),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// A published output: the requested size, its PNG bytes and its handle.
#[derive(Debug, Clone)]
pub struct GeneratedOutput {
    pub size: TargetSize,
    pub bytes: Arc<[u8]>,
    pub handle: Handle,
}

impl GeneratedOutput {
    pub fn label(&self) -> &str {
        &self.size.label
    }
}

/// Registry of live handles.
#[derive(Debug, Default)]
pub struct OutputManager {
    live: Mutex<HashMap<u64, Arc<[u8]>>>,
    next_id: AtomicU64,
}

impl OutputManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<u64, Arc<[u8]>>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire one handle per raster, in order.
    pub fn publish(self: &Arc<Self>, rasters: Vec<EncodedRaster>) -> OutputSet {
        let mut live = self.registry();
        let outputs: Vec<GeneratedOutput> = rasters
            .into_iter()
            .map(|raster| {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                let bytes: Arc<[u8]> = raster.bytes.into();
                live.insert(id, Arc::clone(&bytes));
                GeneratedOutput {
                    size: raster.size,
                    bytes,
                    handle: Handle::new(id),
                }
            })
            .collect();
        drop(live);
        log::debug!("published {} outputs", outputs.len());
        OutputSet {
            outputs,
            manager: Arc::clone(self),
            released: false,
        }
    }

    /// Release every handle in `outputs`. Already released handles are skipped.
    pub fn release_handles(&self, outputs: &[GeneratedOutput]) {
        let mut live = self.registry();
        let released = outputs
            .iter()
            .filter(|o| live.remove(&o.handle.id).is_some())
            .count();
        if released > 0 {
            log::debug!("released {released} handles, {} still live", live.len());
        }
    }

    pub fn resolve(&self, handle: &Handle) -> Option<Arc<[u8]>> {
        self.registry().get(&handle.id).cloned()
    }

    pub fn is_live(&self, handle: &Handle) -> bool {
        self.registry().contains_key(&handle.id)
    }

    pub fn live_count(&self) -> usize {
        self.registry().len()
    }
}

/// The current batch of outputs. Releases its handles once, at the latest on drop.
#[derive(Debug)]
pub struct OutputSet {
    outputs: Vec<GeneratedOutput>,
    manager: Arc<OutputManager>,
    released: bool,
}

impl OutputSet {
    pub fn outputs(&self) -> &[GeneratedOutput] {
        &self.outputs
    }

    pub fn get(&self, index: usize) -> Option<&GeneratedOutput> {
        self.outputs.get(index)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Release all handles. Calling this again does nothing.
    pub fn release(&mut self) {
        if !self.released {
            self.manager.release_handles(&self.outputs);
            self.released = true;
        }
    }
}

impl Drop for OutputSet {
    fn drop(&mut self) {
        self.release();
    }
}
