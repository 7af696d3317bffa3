use std::sync::Arc;

use parking_lot::Mutex;
use parking_lot::MutexGuard;

use pageload_core::blob::BlobRegistryRef;
use pageload_core::document::completion;
use pageload_core::document::DocumentRef;
use pageload_core::document::ElementEvent;
use pageload_core::document::ElementId;
use pageload_core::document::InsertionPoint;
use pageload_core::fetch::FetcherRef;
use pageload_core::types::HostCapabilities;
use pageload_core::types::Resource;
use pageload_core::types::ResourceKind;
use pageload_core::LoaderError;
use pageload_core::LoaderResult;

use crate::ResourceLocator;

pub type LoaderContextRef = Arc<LoaderContext>;

/// Host collaborators shared by every loading operation.
///
/// Built once at startup and handed to whatever needs to load resources.
#[derive(Debug)]
pub struct LoaderContext {
  pub document: DocumentRef,
  pub fetcher: FetcherRef,
  pub blobs: BlobRegistryRef,
  pub capabilities: HostCapabilities,
  reservations: Mutex<()>,
}

impl LoaderContext {
  pub fn new(
    document: DocumentRef,
    fetcher: FetcherRef,
    blobs: BlobRegistryRef,
    capabilities: HostCapabilities,
  ) -> Self {
    LoaderContext {
      document,
      fetcher,
      blobs,
      capabilities,
      reservations: Mutex::new(()),
    }
  }

  pub fn locator(&self) -> ResourceLocator<'_> {
    ResourceLocator::new(
      self.document.as_ref(),
      self.capabilities.element_queries,
    )
  }

  /// Held from the locator check until the new element is inserted, so that two loads of the
  /// same URL cannot both create an element. Never held across an await.
  pub(crate) fn reserve(&self) -> MutexGuard<'_, ()> {
    self.reservations.lock()
  }

  /// Scripts go into the body, or the head while there is no body yet
  pub fn script_parent(&self) -> InsertionPoint {
    if self.document.has_body() {
      InsertionPoint::Body
    } else {
      InsertionPoint::Head
    }
  }

  /// Waits for `element` to settle and maps its event to a load result
  pub async fn settle(
    &self,
    element: ElementId,
    kind: ResourceKind,
    url: &str,
  ) -> LoaderResult<Resource> {
    match completion(self.document.as_ref(), element).await {
      Some(ElementEvent::Load) => {
        tracing::debug!(%element, url, %kind, "Loaded");
        Ok(Resource {
          element,
          url: url.to_string(),
          kind,
        })
      }
      _ => {
        tracing::debug!(%element, url, %kind, "Failed to load");
        Err(LoaderError::load(kind, url))
      }
    }
  }
}
