use async_trait::async_trait;
use futures::future::try_join_all;

use pageload_core::blob::JAVASCRIPT_MIME;
use pageload_core::document::completion;
use pageload_core::document::ElementEvent;
use pageload_core::fetch::Fetcher;
use pageload_core::types::HostCapabilities;
use pageload_core::types::ScriptEntry;
use pageload_core::types::ScriptOptions;
use pageload_core::LoaderError;
use pageload_core::LoaderResult;

use crate::blob_handle::BlobHandle;
use crate::insert_script;
use crate::ExecutionStrategy;
use crate::LoaderContextRef;

pub const SOURCE_URL_MARKER: &str = "//# sourceURL=";

/// Appends the marker naming `src` in stack traces and developer tools
pub fn with_source_url(text: &str, src: &str) -> String {
  format!("{text}\n{SOURCE_URL_MARKER}{src}")
}

async fn fetch_text(fetcher: &(dyn Fetcher + Sync), src: &str) -> LoaderResult<String> {
  let fetch_error = |reason| LoaderError::Fetch {
    url: src.to_string(),
    reason,
  };
  let response = fetcher.fetch(src).await.map_err(fetch_error)?;
  response.into_text().map_err(fetch_error)
}

/// Fetches every script at once, then executes the bodies one at a time in list order.
///
/// Network latency overlaps while execution order stays exactly the order of the list. Fails
/// on the first fetch or execution error, leaving the fallback to the [`crate::Cascade`].
#[derive(Debug)]
pub struct ParallelFetchStrategy {
  ctx: LoaderContextRef,
}

impl ParallelFetchStrategy {
  pub fn new(ctx: LoaderContextRef) -> Self {
    ParallelFetchStrategy { ctx }
  }

  /// Fetches run as their own tasks, so a failure stops waiting on the others without
  /// cancelling them
  async fn fetch_all(&self, entries: &[ScriptEntry]) -> LoaderResult<Vec<String>> {
    let tasks = entries.iter().map(|entry| {
      let fetcher = self.ctx.fetcher.clone();
      let src = entry.src.clone();
      let task = tokio::spawn({
        let src = src.clone();
        async move { fetch_text(fetcher.as_ref(), &src).await }
      });

      async move {
        match task.await {
          Ok(result) => result,
          Err(error) => Err(LoaderError::Fetch {
            url: src,
            reason: pageload_core::FetchError::Network(error.to_string()),
          }),
        }
      }
    });

    try_join_all(tasks).await
  }

  async fn execute_fetched(&self, entry: &ScriptEntry, text: &str) -> LoaderResult<()> {
    let blocked = || LoaderError::ExecutionBlocked {
      src: entry.src.clone(),
    };
    let body = with_source_url(text, &entry.src);
    let handle = BlobHandle::create(&self.ctx.blobs, &body, JAVASCRIPT_MIME).map_err(|error| {
      tracing::debug!(src = %entry.src, %error, "Could not create object URL");
      blocked()
    })?;

    let document = self.ctx.document.as_ref();
    let script = insert_script(
      document,
      self.ctx.script_parent(),
      handle.url(),
      &ScriptOptions::ordered(),
    )?;

    let event = completion(document, script).await;
    handle.release();
    match event {
      Some(ElementEvent::Load) => Ok(()),
      _ => Err(blocked()),
    }
  }
}

#[async_trait]
impl ExecutionStrategy for ParallelFetchStrategy {
  fn name(&self) -> &'static str {
    "parallel-fetch"
  }

  fn is_available(&self, capabilities: &HostCapabilities) -> bool {
    capabilities.fetch && capabilities.dynamic_execution
  }

  async fn execute(&self, entries: &[ScriptEntry]) -> LoaderResult<()> {
    let fetched = self.fetch_all(entries).await?;
    tracing::debug!(count = fetched.len(), "Fetched scripts");

    for (entry, text) in entries.iter().zip(fetched) {
      self.execute_fetched(entry, &text).await?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;
  use std::time::Duration;

  use pageload_core::blob::MockBlobRegistry;
  use pageload_core::document::ElementId;
  use pageload_core::document::MockDocument;
  use pageload_core::DomError;
  use pageload_core::FetchError;
  use pageload_dom::ContentPolicy;
  use pageload_dom::InMemoryHost;
  use pageload_dom::Route;
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::test_utils::context;
  use crate::LoaderContext;

  fn entries(srcs: &[&str]) -> Vec<ScriptEntry> {
    srcs.iter().map(|src| ScriptEntry::from(*src)).collect()
  }

  #[tokio::test(start_paused = true)]
  async fn test_executes_in_list_order_regardless_of_arrival() {
    let host = InMemoryHost::default();
    host
      .network
      .serve_with_latency("a.js", "var a;", Duration::from_millis(300));
    host
      .network
      .serve_with_latency("b.js", "var b;", Duration::from_millis(10));
    host
      .network
      .serve_with_latency("c.js", "var c;", Duration::from_millis(100));
    let strategy = ParallelFetchStrategy::new(context(&host));

    let started = tokio::time::Instant::now();
    strategy
      .execute(&entries(&["a.js", "b.js", "c.js"]))
      .await
      .unwrap();

    assert_eq!(host.document.executed_scripts(), vec!["a.js", "b.js", "c.js"]);
    assert!(started.elapsed() < Duration::from_millis(400));
    assert_eq!(host.blobs.created_count(), 3);
    assert_eq!(host.blobs.revoked_count(), 3);
    assert_eq!(host.blobs.live_count(), 0);
  }

  #[tokio::test]
  async fn test_failed_fetch_executes_nothing() {
    let host = InMemoryHost::default();
    host.network.serve("a.js", "");
    host.network.set_route("b.js", Route::status(404));
    let strategy = ParallelFetchStrategy::new(context(&host));

    let error = strategy
      .execute(&entries(&["a.js", "b.js"]))
      .await
      .unwrap_err();

    assert_eq!(
      error,
      LoaderError::Fetch {
        url: String::from("b.js"),
        reason: FetchError::Status(404),
      }
    );
    assert!(host.document.executed_scripts().is_empty());
    assert_eq!(host.blobs.created_count(), 0);
  }

  #[tokio::test]
  async fn test_blocked_execution_releases_every_handle() {
    let host = InMemoryHost::default();
    host.network.serve("a.js", "");
    host.network.serve("b.js", "");
    host.document.set_policy(ContentPolicy {
      allow_object_url_scripts: false,
    });
    let strategy = ParallelFetchStrategy::new(context(&host));

    let error = strategy
      .execute(&entries(&["a.js", "b.js"]))
      .await
      .unwrap_err();

    assert_eq!(
      error,
      LoaderError::ExecutionBlocked {
        src: String::from("a.js")
      }
    );
    assert_eq!(host.blobs.created_count(), 1);
    assert_eq!(host.blobs.revoked_count(), 1);
  }

  #[tokio::test]
  async fn test_refusal_mid_sequence_releases_earlier_handles() {
    let host = InMemoryHost::default();
    for src in ["a.js", "b.js", "c.js"] {
      host.network.serve(src, "");
    }
    host.document.refuse_object_url_source("b.js");
    let strategy = ParallelFetchStrategy::new(context(&host));

    let error = strategy
      .execute(&entries(&["a.js", "b.js", "c.js"]))
      .await
      .unwrap_err();

    assert_eq!(
      error,
      LoaderError::ExecutionBlocked {
        src: String::from("b.js")
      }
    );
    assert_eq!(host.document.executed_scripts(), vec!["a.js"]);
    assert_eq!(host.blobs.created_count(), 2);
    assert_eq!(host.blobs.revoked_count(), 2);
    assert_eq!(host.blobs.live_count(), 0);
  }

  #[tokio::test]
  async fn test_failed_insertion_releases_the_handle() {
    let host = InMemoryHost::default();
    host.network.serve("a.js", "");

    let mut document = MockDocument::new();
    document.expect_has_body().return_const(true);
    document.expect_create_element().return_const(ElementId(1));
    document.expect_set_attribute().returning(|_, _, _| Ok(()));
    document
      .expect_append()
      .returning(|_, _| Err(DomError::MissingInsertionPoint("body")));

    let mut blobs = MockBlobRegistry::new();
    blobs
      .expect_create_object_url()
      .times(1)
      .returning(|_, _| Ok(String::from("blob:test/1")));
    blobs
      .expect_revoke_object_url()
      .withf(|url| url == "blob:test/1")
      .times(1)
      .return_const(());

    let ctx = Arc::new(LoaderContext::new(
      Arc::new(document),
      host.fetcher_ref(),
      Arc::new(blobs),
      HostCapabilities::default(),
    ));
    let strategy = ParallelFetchStrategy::new(ctx);

    assert_eq!(
      strategy.execute(&entries(&["a.js"])).await,
      Err(LoaderError::Dom(DomError::MissingInsertionPoint("body")))
    );
  }

  #[tokio::test]
  async fn test_unsupported_blobs_block_execution() {
    let host = InMemoryHost::default();
    host.network.serve("a.js", "");
    host.blobs.set_supported(false);
    let strategy = ParallelFetchStrategy::new(context(&host));

    assert_eq!(
      strategy.execute(&entries(&["a.js"])).await,
      Err(LoaderError::ExecutionBlocked {
        src: String::from("a.js")
      })
    );
  }

  #[test]
  fn test_source_url_trailer() {
    assert_eq!(
      with_source_url("var a;", "js/a.js"),
      "var a;\n//# sourceURL=js/a.js"
    );
  }
}
