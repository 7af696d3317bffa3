use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;

use pageload_core::blob::BlobRegistryRef;
use pageload_core::document::DocumentRef;
use pageload_core::fetch::FetcherRef;
use pageload_core::types::CssOptions;
use pageload_core::types::HostCapabilities;
use pageload_core::types::LoadAllRequest;
use pageload_core::types::RequestOptions;
use pageload_core::types::Resource;
use pageload_core::types::ResourceKind;
use pageload_core::types::ResourceRequest;
use pageload_core::types::ScriptEntry;
use pageload_core::types::ScriptOptions;
use pageload_core::LoaderResult;

use crate::load_css;
use crate::load_script;
use crate::load_scripts_in_order;
use crate::CallbackLoader;
use crate::Cascade;
use crate::LoaderContext;
use crate::LoaderContextRef;

pub type LoaderRef = Arc<dyn AssetLoader>;

/// The five loading operations offered to page code
#[async_trait]
pub trait AssetLoader: Debug + Send + Sync {
  async fn load_css(&self, href: &str, options: &CssOptions) -> LoaderResult<Resource>;

  async fn load_script(&self, src: &str, options: &ScriptOptions) -> LoaderResult<Resource>;

  /// Validates every entry, then loads all stylesheets and scripts concurrently. Results are in
  /// input order, stylesheets first.
  async fn load_all(&self, request: LoadAllRequest) -> LoaderResult<Vec<Resource>>;

  async fn load_scripts_in_order(&self, entries: &[ScriptEntry]) -> LoaderResult<Vec<Resource>>;

  /// Executes the scripts in list order using the fastest strategy the host allows
  async fn load_and_execute_in_order(&self, entries: &[ScriptEntry]) -> LoaderResult<()>;
}

/// Converts every `load_all` entry into a request, stylesheets first, rejecting the first
/// malformed entry before anything loads
pub(crate) fn validate_load_all(request: LoadAllRequest) -> LoaderResult<Vec<ResourceRequest>> {
  let css = request
    .css
    .into_iter()
    .map(|entry| entry.into_request(ResourceKind::Css));
  let scripts = request
    .scripts
    .into_iter()
    .map(|entry| entry.into_request(ResourceKind::Script));
  css.chain(scripts).collect()
}

async fn load_request(ctx: &LoaderContext, request: &ResourceRequest) -> LoaderResult<Resource> {
  match &request.options {
    RequestOptions::Css(options) => load_css(ctx, &request.url, options).await,
    RequestOptions::Script(options) => load_script(ctx, &request.url, options).await,
  }
}

/// Loader for hosts with asynchronous completion, built on the document, fetcher and blob
/// registry it is given.
#[derive(Debug)]
pub struct Loader {
  ctx: LoaderContextRef,
  cascade: Cascade,
}

impl Loader {
  pub fn new(ctx: LoaderContextRef) -> Self {
    let cascade = Cascade::standard(ctx.clone());
    Loader { ctx, cascade }
  }

  pub fn with_cascade(ctx: LoaderContextRef, cascade: Cascade) -> Self {
    Loader { ctx, cascade }
  }

  pub fn context(&self) -> &LoaderContextRef {
    &self.ctx
  }
}

#[async_trait]
impl AssetLoader for Loader {
  async fn load_css(&self, href: &str, options: &CssOptions) -> LoaderResult<Resource> {
    load_css(&self.ctx, href, options).await
  }

  async fn load_script(&self, src: &str, options: &ScriptOptions) -> LoaderResult<Resource> {
    load_script(&self.ctx, src, options).await
  }

  async fn load_all(&self, request: LoadAllRequest) -> LoaderResult<Vec<Resource>> {
    let requests = validate_load_all(request)?;
    tracing::debug!(count = requests.len(), "Loading all resources");

    try_join_all(
      requests
        .iter()
        .map(|request| load_request(&self.ctx, request)),
    )
    .await
  }

  async fn load_scripts_in_order(&self, entries: &[ScriptEntry]) -> LoaderResult<Vec<Resource>> {
    load_scripts_in_order(&self.ctx, entries).await
  }

  async fn load_and_execute_in_order(&self, entries: &[ScriptEntry]) -> LoaderResult<()> {
    let strategy = self.cascade.run(entries).await?;
    tracing::info!(strategy, count = entries.len(), "Executed scripts in order");
    Ok(())
  }
}

/// Picks the loader the host can drive: [`Loader`] when elements report completion
/// asynchronously, otherwise the [`CallbackLoader`].
pub fn create_loader(
  document: DocumentRef,
  fetcher: FetcherRef,
  blobs: BlobRegistryRef,
  capabilities: HostCapabilities,
) -> LoaderRef {
  if capabilities.async_completion {
    let ctx = LoaderContext::new(document, fetcher, blobs, capabilities);
    Arc::new(Loader::new(Arc::new(ctx)))
  } else {
    tracing::debug!("Host lacks asynchronous completion, using callback loader");
    Arc::new(CallbackLoader::new(document))
  }
}
