use std::sync::Arc;

use pageload_core::blob::BlobRegistryRef;
use pageload_core::document::DocumentRef;
use pageload_core::fetch::FetcherRef;
use pageload_core::types::HostCapabilities;

use crate::html::seed_document;
use crate::InMemoryBlobRegistry;
use crate::InMemoryDocument;
use crate::InMemoryNetwork;

/// A document, its origin and its blob registry wired together
#[derive(Clone, Debug)]
pub struct InMemoryHost {
  pub document: InMemoryDocument,
  pub network: Arc<InMemoryNetwork>,
  pub blobs: Arc<InMemoryBlobRegistry>,
  pub capabilities: HostCapabilities,
}

impl Default for InMemoryHost {
  fn default() -> Self {
    let network = Arc::new(InMemoryNetwork::default());
    let blobs = Arc::new(InMemoryBlobRegistry::default());
    InMemoryHost {
      document: InMemoryDocument::new(network.clone(), blobs.clone()),
      network,
      blobs,
      capabilities: HostCapabilities::default(),
    }
  }
}

impl InMemoryHost {
  /// Seeds the document with the `<link>`, `<script>` and identified elements of `html`.
  ///
  /// Must be called from within a tokio runtime: seeded preloads and scripts start loading
  /// straight away.
  pub fn from_html(html: &str, network: Arc<InMemoryNetwork>) -> anyhow::Result<Self> {
    let blobs = Arc::new(InMemoryBlobRegistry::default());
    let document = InMemoryDocument::new(network.clone(), blobs.clone());
    seed_document(&document, html)?;

    Ok(InMemoryHost {
      document,
      network,
      blobs,
      capabilities: HostCapabilities::default(),
    })
  }

  pub fn with_capabilities(mut self, capabilities: HostCapabilities) -> Self {
    self.capabilities = capabilities;
    self
  }

  pub fn document_ref(&self) -> DocumentRef {
    Arc::new(self.document.clone())
  }

  pub fn fetcher_ref(&self) -> FetcherRef {
    self.network.clone()
  }

  pub fn blobs_ref(&self) -> BlobRegistryRef {
    self.blobs.clone()
  }
}
