use pageload_core::document::Document;
use pageload_core::document::ElementId;
use pageload_core::document::InsertionPoint;
use pageload_core::document::LoadState;
use pageload_core::document::Tag;
use pageload_core::types::Resource;
use pageload_core::types::ResourceKind;
use pageload_core::types::ScriptEntry;
use pageload_core::types::ScriptOptions;
use pageload_core::DomError;
use pageload_core::LoaderError;
use pageload_core::LoaderResult;

use crate::LoaderContext;

/// Inserts a script element carrying `options` as attributes.
///
/// Attributes are set before insertion, so `async=false` is in place when the load starts.
pub fn insert_script(
  document: &dyn Document,
  parent: InsertionPoint,
  src: &str,
  options: &ScriptOptions,
) -> Result<ElementId, DomError> {
  let script = document.create_element(Tag::Script);
  document.set_attribute(script, "src", src)?;
  if let Some(script_type) = &options.script_type {
    document.set_attribute(script, "type", script_type)?;
  }
  if let Some(is_async) = options.is_async {
    document.set_attribute(script, "async", &is_async.to_string())?;
  }
  if let Some(defer) = options.defer {
    document.set_attribute(script, "defer", &defer.to_string())?;
  }
  if let Some(cross_origin) = &options.cross_origin {
    document.set_attribute(script, "crossorigin", cross_origin)?;
  }
  document.append(parent, script)?;
  Ok(script)
}

/// Loads a script through a `<script>` element, attaching to one already in the document.
pub async fn load_script(
  ctx: &LoaderContext,
  src: &str,
  options: &ScriptOptions,
) -> LoaderResult<Resource> {
  if src.is_empty() {
    return Err(LoaderError::MissingArgument {
      operation: "load_script",
      argument: "src",
    });
  }

  let element = {
    let _reservation = ctx.reserve();
    match ctx.locator().locate(ResourceKind::Script, src) {
      Some(existing) if existing.load_state == LoadState::Loaded => {
        tracing::debug!(src, element = %existing.element, "Script already loaded");
        return Ok(Resource {
          element: existing.element,
          url: src.to_string(),
          kind: ResourceKind::Script,
        });
      }
      Some(existing) => existing.element,
      None => insert_script(ctx.document.as_ref(), ctx.script_parent(), src, options)?,
    }
  };

  ctx.settle(element, ResourceKind::Script, src).await
}

/// Loads each entry only after the previous one has finished. Stops at the first failure.
pub async fn load_scripts_in_order(
  ctx: &LoaderContext,
  entries: &[ScriptEntry],
) -> LoaderResult<Vec<Resource>> {
  let mut resources = Vec::with_capacity(entries.len());
  for entry in entries {
    resources.push(load_script(ctx, &entry.src, &entry.opts).await?);
  }
  Ok(resources)
}
