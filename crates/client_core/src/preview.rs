//! Preview handles: locally resolvable references to a selected file's bytes.
//!
//! A handle lives exactly as long as its file is part of the active selection.
//! [`PreviewSlots`] enforces that by releasing the old handle of a slot before
//! anything replaces it.

use std::{
    collections::HashMap,
    io::Write,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::upload::UploadFile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewLocator {
    Path(PathBuf),
    Memory(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewHandle {
    pub id: Uuid,
    pub filename: String,
    pub locator: PreviewLocator,
}

pub trait PreviewBackend: Send + Sync {
    fn acquire(&self, file: &UploadFile) -> Result<PreviewHandle>;
    fn release(&self, handle: PreviewHandle);
    fn live_count(&self) -> usize;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Spills each previewed file into its own temporary file, deleted on release.
#[derive(Default)]
pub struct TempFilePreviews {
    files: Mutex<HashMap<Uuid, NamedTempFile>>,
}

impl PreviewBackend for TempFilePreviews {
    fn acquire(&self, file: &UploadFile) -> Result<PreviewHandle> {
        let suffix = file
            .extension()
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let mut temp = tempfile::Builder::new()
            .prefix("preview-")
            .suffix(&suffix)
            .tempfile()
            .context("failed to create preview file")?;
        temp.write_all(file.bytes())
            .with_context(|| format!("failed to write preview for '{}'", file.filename))?;

        let id = Uuid::new_v4();
        let handle = PreviewHandle {
            id,
            filename: file.filename.clone(),
            locator: PreviewLocator::Path(temp.path().to_path_buf()),
        };
        lock(&self.files).insert(id, temp);
        Ok(handle)
    }

    fn release(&self, handle: PreviewHandle) {
        if lock(&self.files).remove(&handle.id).is_none() {
            warn!(id = %handle.id, "released unknown preview handle");
        }
    }

    fn live_count(&self) -> usize {
        lock(&self.files).len()
    }
}

/// Keeps previewed bytes in memory, addressable by `memory://<id>`.
#[derive(Default)]
pub struct MemoryPreviews {
    buffers: Mutex<HashMap<Uuid, Arc<[u8]>>>,
}

impl MemoryPreviews {
    pub fn resolve(&self, handle: &PreviewHandle) -> Option<Arc<[u8]>> {
        lock(&self.buffers).get(&handle.id).cloned()
    }
}

impl PreviewBackend for MemoryPreviews {
    fn acquire(&self, file: &UploadFile) -> Result<PreviewHandle> {
        let id = Uuid::new_v4();
        lock(&self.buffers).insert(id, file.shared_bytes());
        Ok(PreviewHandle {
            id,
            filename: file.filename.clone(),
            locator: PreviewLocator::Memory(format!("memory://{id}")),
        })
    }

    fn release(&self, handle: PreviewHandle) {
        lock(&self.buffers).remove(&handle.id);
    }

    fn live_count(&self) -> usize {
        lock(&self.buffers).len()
    }
}

/// One optional handle per selected file, index-aligned with the selection.
pub struct PreviewSlots {
    backend: Arc<dyn PreviewBackend>,
    slots: Vec<Option<PreviewHandle>>,
}

impl PreviewSlots {
    pub fn new(backend: Arc<dyn PreviewBackend>) -> Self {
        Self {
            backend,
            slots: Vec::new(),
        }
    }

    /// Releases every current handle, then acquires one per file.
    pub fn replace_all(&mut self, files: &[UploadFile]) {
        self.clear();
        self.slots = files
            .iter()
            .map(|file| match self.backend.acquire(file) {
                Ok(handle) => {
                    debug!(id = %handle.id, filename = %file.filename, "acquired preview handle");
                    Some(handle)
                }
                Err(error) => {
                    warn!(filename = %file.filename, %error, "preview unavailable");
                    None
                }
            })
            .collect();
    }

    pub fn remove(&mut self, index: usize) {
        if index >= self.slots.len() {
            return;
        }
        if let Some(handle) = self.slots.remove(index) {
            debug!(id = %handle.id, "released preview handle");
            self.backend.release(handle);
        }
    }

    pub fn clear(&mut self) {
        for handle in self.slots.drain(..).flatten() {
            debug!(id = %handle.id, "released preview handle");
            self.backend.release(handle);
        }
    }

    pub fn handles(&self) -> Vec<Option<PreviewHandle>> {
        self.slots.clone()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Drop for PreviewSlots {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
#[path = "tests/preview_tests.rs"]
mod tests;
