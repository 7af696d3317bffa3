use pageload_core::document::completion;
use pageload_core::document::Document;
use pageload_core::document::ElementEvent;
use pageload_core::document::InsertionPoint;
use pageload_core::types::ResourceKind;
use pageload_core::types::ScriptEntry;
use pageload_core::types::ScriptOptions;
use pageload_core::LoaderError;
use pageload_core::LoaderResult;

use crate::insert_script;

/// Appends each script and waits for it before appending the next, without looking for
/// existing elements.
///
/// A failed script does not stop the ones after it. The first failure is returned once every
/// entry has been attempted.
pub async fn append_sequential(document: &(dyn Document + Sync), entries: &[ScriptEntry]) -> LoaderResult<()> {
  let mut first_failure = None;

  for entry in entries {
    let parent = if document.has_body() {
      InsertionPoint::Body
    } else {
      InsertionPoint::Head
    };
    let options = ScriptOptions {
      is_async: Some(false),
      ..entry.opts.clone()
    };
    let script = insert_script(document, parent, &entry.src, &options)?;

    if completion(document, script).await != Some(ElementEvent::Load) {
      tracing::warn!(src = %entry.src, "Failed to load script, continuing with the next one");
      first_failure.get_or_insert_with(|| LoaderError::load(ResourceKind::Script, &entry.src));
    }
  }

  match first_failure {
    Some(error) => Err(error),
    None => Ok(()),
  }
}
