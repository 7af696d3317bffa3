use std::time::Duration;

use tokio::time::Instant;

use pageload_core::document::Document;
use pageload_core::document::ElementId;
use pageload_core::document::Selector;
use pageload_core::LoaderError;
use pageload_core::LoaderResult;

/// Polling period used when a zero interval is requested
const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitOptions {
  pub timeout: Duration,
  pub interval: Duration,
}

impl Default for WaitOptions {
  fn default() -> Self {
    WaitOptions {
      timeout: Duration::from_millis(5000),
      interval: Duration::from_millis(100),
    }
  }
}

/// Polls the document until `selector` matches a connected element
pub async fn wait_for_element(
  document: &dyn Document,
  selector: &Selector,
  options: WaitOptions,
) -> LoaderResult<ElementId> {
  let started = Instant::now();
  let mut interval = tokio::time::interval(options.interval.max(MIN_INTERVAL));

  loop {
    interval.tick().await;
    if let Some(element) = document.query(selector) {
      return Ok(element);
    }
    if started.elapsed() >= options.timeout {
      tracing::warn!(%selector, "Timed out waiting for element");
      return Err(LoaderError::Timeout {
        selector: selector.to_string(),
      });
    }
  }
}
