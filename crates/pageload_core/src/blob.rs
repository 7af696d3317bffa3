use std::sync::Arc;

use crate::BlobError;

pub type BlobRegistryRef = Arc<dyn BlobRegistry + Send + Sync>;

pub const JAVASCRIPT_MIME: &str = "application/javascript";

/// Host registry of in-memory payloads addressable by revocable URLs
#[mockall::automock]
pub trait BlobRegistry: std::fmt::Debug {
  fn create_object_url(&self, contents: &str, mime: &str) -> Result<String, BlobError>;

  fn revoke_object_url(&self, url: &str);
}
