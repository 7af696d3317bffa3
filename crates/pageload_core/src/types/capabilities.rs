use serde::Deserialize;
use serde::Serialize;

/// Features the host page offers to the loader.
///
/// Everything is available by default. Turning features off selects the slower fallbacks.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostCapabilities {
  /// Text can be fetched without inserting an element
  pub fetch: bool,
  /// In-memory script bodies can be executed through object URLs
  pub dynamic_execution: bool,
  /// Existing elements can be looked up by URL
  pub element_queries: bool,
  /// Completion can be awaited. Without it the callback loader is used.
  pub async_completion: bool,
}

impl Default for HostCapabilities {
  fn default() -> Self {
    HostCapabilities {
      fetch: true,
      dynamic_execution: true,
      element_queries: true,
      async_completion: true,
    }
  }
}
