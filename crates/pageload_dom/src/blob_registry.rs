use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use parking_lot::RwLock;

use pageload_core::blob::BlobRegistry;
use pageload_core::BlobError;

pub const OBJECT_URL_SCHEME: &str = "blob:";

/// In memory object-URL registry.
///
/// Counts every creation and every revocation call so that tests can check handles are
/// released exactly once.
#[derive(Debug)]
pub struct InMemoryBlobRegistry {
  blobs: RwLock<HashMap<String, String>>,
  next_id: AtomicU64,
  created: AtomicUsize,
  revoked: AtomicUsize,
  supported: AtomicBool,
}

impl Default for InMemoryBlobRegistry {
  fn default() -> Self {
    Self {
      blobs: Default::default(),
      next_id: AtomicU64::new(0),
      created: AtomicUsize::new(0),
      revoked: AtomicUsize::new(0),
      supported: AtomicBool::new(true),
    }
  }
}

impl InMemoryBlobRegistry {
  /// Make every following `create_object_url` call fail
  pub fn set_supported(&self, supported: bool) {
    self.supported.store(supported, Ordering::SeqCst);
  }

  pub fn resolve(&self, url: &str) -> Option<String> {
    self.blobs.read().get(url).cloned()
  }

  pub fn created_count(&self) -> usize {
    self.created.load(Ordering::SeqCst)
  }

  pub fn revoked_count(&self) -> usize {
    self.revoked.load(Ordering::SeqCst)
  }

  pub fn live_count(&self) -> usize {
    self.blobs.read().len()
  }
}

impl BlobRegistry for InMemoryBlobRegistry {
  fn create_object_url(&self, contents: &str, _mime: &str) -> Result<String, BlobError> {
    if !self.supported.load(Ordering::SeqCst) {
      return Err(BlobError::Unsupported);
    }

    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
    let url = format!("{OBJECT_URL_SCHEME}pageload/{id}");
    self.blobs.write().insert(url.clone(), contents.to_string());
    self.created.fetch_add(1, Ordering::SeqCst);
    Ok(url)
  }

  fn revoke_object_url(&self, url: &str) {
    self.revoked.fetch_add(1, Ordering::SeqCst);
    self.blobs.write().remove(url);
  }
}
