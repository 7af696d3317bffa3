use pageload_core::document::Document;
use pageload_core::document::ElementId;
use pageload_core::document::Selector;

const SWAPPED_MARKER: &str = "data-swapped";

/// Turns a declared `<link rel="preload" as="style">` into a stylesheet.
///
/// `id_or_href` is `#id` or the link's `href`. Refused mutations are ignored. Returns the link
/// when one was found.
pub fn swap_preload_to_stylesheet(document: &dyn Document, id_or_href: &str) -> Option<ElementId> {
  let by_id = id_or_href
    .strip_prefix('#')
    .and_then(|id| document.query(&Selector::Id(id.to_string())));
  let link = by_id.or_else(|| {
    document.query(&Selector::Link {
      href: id_or_href.to_string(),
      rel: Some(String::from("preload")),
    })
  })?;

  let is_style_preload = document.get_attribute(link, "rel").as_deref() == Some("preload")
    && document.get_attribute(link, "as").as_deref() == Some("style");
  if is_style_preload {
    if let Err(error) = document.set_attribute(link, "rel", "stylesheet") {
      tracing::debug!(id_or_href, %error, "Could not swap preload");
    }
  }

  if document.get_attribute(link, SWAPPED_MARKER).is_none() {
    if let Err(error) = document.set_attribute(link, SWAPPED_MARKER, "1") {
      tracing::debug!(id_or_href, %error, "Could not mark preload as swapped");
    }
  }

  Some(link)
}
