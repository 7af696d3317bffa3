use std::fmt::Debug;

use async_trait::async_trait;

use pageload_core::document::DocumentRef;
use pageload_core::types::HostCapabilities;
use pageload_core::types::ScriptEntry;
use pageload_core::LoaderError;
use pageload_core::LoaderResult;

use crate::append_sequential;
use crate::load_scripts_in_order;
use crate::LoaderContextRef;
use crate::ParallelFetchStrategy;

/// One way of loading and executing an ordered list of scripts
#[async_trait]
pub trait ExecutionStrategy: Debug + Send + Sync {
  fn name(&self) -> &'static str;

  fn is_available(&self, capabilities: &HostCapabilities) -> bool;

  async fn execute(&self, entries: &[ScriptEntry]) -> LoaderResult<()>;
}

/// Element-per-script loading through [`load_scripts_in_order`]
#[derive(Debug)]
pub struct SequentialStrategy {
  ctx: LoaderContextRef,
}

impl SequentialStrategy {
  pub fn new(ctx: LoaderContextRef) -> Self {
    SequentialStrategy { ctx }
  }
}

#[async_trait]
impl ExecutionStrategy for SequentialStrategy {
  fn name(&self) -> &'static str {
    "sequential"
  }

  fn is_available(&self, capabilities: &HostCapabilities) -> bool {
    capabilities.element_queries
  }

  async fn execute(&self, entries: &[ScriptEntry]) -> LoaderResult<()> {
    load_scripts_in_order(&self.ctx, entries).await?;
    Ok(())
  }
}

/// Last resort for hosts that cannot look up existing elements
#[derive(Debug)]
pub struct RawAppendStrategy {
  document: DocumentRef,
}

impl RawAppendStrategy {
  pub fn new(document: DocumentRef) -> Self {
    RawAppendStrategy { document }
  }
}

#[async_trait]
impl ExecutionStrategy for RawAppendStrategy {
  fn name(&self) -> &'static str {
    "raw-append"
  }

  fn is_available(&self, capabilities: &HostCapabilities) -> bool {
    !capabilities.element_queries
  }

  async fn execute(&self, entries: &[ScriptEntry]) -> LoaderResult<()> {
    append_sequential(self.document.as_ref(), entries).await
  }
}

/// Tries each available strategy in priority order until one succeeds.
///
/// Every attempt receives the original list. Only the failure of the last attempted strategy
/// is returned.
#[derive(Debug)]
pub struct Cascade {
  capabilities: HostCapabilities,
  strategies: Vec<Box<dyn ExecutionStrategy>>,
}

impl Cascade {
  pub fn new(capabilities: HostCapabilities, strategies: Vec<Box<dyn ExecutionStrategy>>) -> Self {
    Cascade {
      capabilities,
      strategies,
    }
  }

  /// Parallel fetch, then sequential elements, then raw append
  pub fn standard(ctx: LoaderContextRef) -> Self {
    let capabilities = ctx.capabilities;
    Cascade::new(
      capabilities,
      vec![
        Box::new(ParallelFetchStrategy::new(ctx.clone())),
        Box::new(SequentialStrategy::new(ctx.clone())),
        Box::new(RawAppendStrategy::new(ctx.document.clone())),
      ],
    )
  }

  /// Names of the strategies this host can use, in the order they are tried
  pub fn available(&self) -> Vec<&'static str> {
    self
      .strategies
      .iter()
      .filter(|strategy| strategy.is_available(&self.capabilities))
      .map(|strategy| strategy.name())
      .collect()
  }

  /// Runs the list through the strategies, returning the name of the one that succeeded
  pub async fn run(&self, entries: &[ScriptEntry]) -> LoaderResult<&'static str> {
    // Type-erased so the iterator held across `.await` is provably `Send`
    let available: Box<dyn Iterator<Item = &Box<dyn ExecutionStrategy>> + Send + '_> = Box::new(
      self
        .strategies
        .iter()
        .filter(|strategy| strategy.is_available(&self.capabilities)),
    );
    let mut available = available.peekable();
    let mut last_error = None;

    while let Some(strategy) = available.next() {
      match strategy.execute(entries).await {
        Ok(()) => {
          tracing::debug!(strategy = strategy.name(), "Scripts executed");
          return Ok(strategy.name());
        }
        Err(error) => {
          match available.peek() {
            Some(next) => tracing::warn!(
              strategy = strategy.name(),
              next = next.name(),
              %error,
              "Script strategy failed, falling back"
            ),
            None => tracing::error!(strategy = strategy.name(), %error, "Script strategy failed"),
          }
          last_error = Some(error);
        }
      }
    }

    Err(last_error.unwrap_or(LoaderError::NoStrategyAvailable))
  }
}
