use indexmap::IndexMap;
use serde::Serialize;

use pageload_bootstrap::BootstrapReport;
use pageload_dom::DocumentSnapshot;
use pageload_dom::InMemoryHost;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobCounts {
  pub created: usize,
  pub revoked: usize,
}

/// Everything a simulation observed, printed as JSON
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
  pub bootstrap: BootstrapReport,
  pub document: DocumentSnapshot,
  /// Requests per URL, in the order URLs were first requested
  pub requests: IndexMap<String, usize>,
  pub blobs: BlobCounts,
}

impl SimulationReport {
  pub fn new(bootstrap: BootstrapReport, host: &InMemoryHost) -> Self {
    let mut requests = IndexMap::new();
    for url in host.network.requests() {
      *requests.entry(url).or_insert(0) += 1;
    }

    SimulationReport {
      bootstrap,
      document: host.document.snapshot(),
      requests,
      blobs: BlobCounts {
        created: host.blobs.created_count(),
        revoked: host.blobs.revoked_count(),
      },
    }
  }
}
