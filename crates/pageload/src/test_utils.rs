use std::sync::Arc;

use pageload_dom::InMemoryHost;

use crate::Loader;
use crate::LoaderContext;
use crate::LoaderContextRef;

pub(crate) fn context(host: &InMemoryHost) -> LoaderContextRef {
  Arc::new(LoaderContext::new(
    host.document_ref(),
    host.fetcher_ref(),
    host.blobs_ref(),
    host.capabilities,
  ))
}

pub(crate) fn loader(host: &InMemoryHost) -> Loader {
  Loader::new(context(host))
}
