use pageload_core::blob::BlobRegistryRef;
use pageload_core::BlobError;

/// An object URL that is revoked exactly once, by [`BlobHandle::release`] or on drop.
#[derive(Debug)]
pub(crate) struct BlobHandle {
  url: String,
  registry: BlobRegistryRef,
  released: bool,
}

impl BlobHandle {
  pub(crate) fn create(
    registry: &BlobRegistryRef,
    contents: &str,
    mime: &str,
  ) -> Result<Self, BlobError> {
    let url = registry.create_object_url(contents, mime)?;
    Ok(BlobHandle {
      url,
      registry: registry.clone(),
      released: false,
    })
  }

  pub(crate) fn url(&self) -> &str {
    &self.url
  }

  pub(crate) fn release(mut self) {
    self.revoke();
  }

  fn revoke(&mut self) {
    if !self.released {
      self.released = true;
      self.registry.revoke_object_url(&self.url);
    }
  }
}

impl Drop for BlobHandle {
  fn drop(&mut self) {
    self.revoke();
  }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use pageload_core::blob::MockBlobRegistry;
  use pageload_core::blob::JAVASCRIPT_MIME;

  use super::*;

  fn registry() -> BlobRegistryRef {
    let mut registry = MockBlobRegistry::new();
    registry
      .expect_create_object_url()
      .returning(|_, _| Ok(String::from("blob:test/1")));
    registry
      .expect_revoke_object_url()
      .withf(|url| url == "blob:test/1")
      .times(1)
      .return_const(());
    Arc::new(registry)
  }

  #[test]
  fn test_release_revokes_once() {
    let handle = BlobHandle::create(&registry(), "", JAVASCRIPT_MIME).unwrap();
    assert_eq!(handle.url(), "blob:test/1");
    handle.release();
  }

  #[test]
  fn test_drop_revokes_unreleased_handles() {
    let handle = BlobHandle::create(&registry(), "", JAVASCRIPT_MIME).unwrap();
    drop(handle);
  }
}
