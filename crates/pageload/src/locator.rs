use pageload_core::document::Document;
use pageload_core::document::ElementId;
use pageload_core::document::LoadState;
use pageload_core::document::Selector;
use pageload_core::types::ResourceKind;

/// An element already referencing a URL the loader was asked for
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExistingResource {
  pub element: ElementId,
  pub rel: Option<String>,
  pub preload_as: Option<String>,
  pub load_state: LoadState,
  pub has_stylesheet: bool,
}

impl ExistingResource {
  pub fn is_parsed_stylesheet(&self) -> bool {
    self.rel.as_deref() == Some("stylesheet") && self.has_stylesheet
  }

  pub fn is_style_preload(&self) -> bool {
    self.rel.as_deref() == Some("preload") && self.preload_as.as_deref() == Some("style")
  }
}

/// Finds elements that already reference a URL so loads attach to them instead of issuing a
/// second request.
pub struct ResourceLocator<'a> {
  document: &'a dyn Document,
  enabled: bool,
}

impl<'a> ResourceLocator<'a> {
  /// A disabled locator never finds anything
  pub fn new(document: &'a dyn Document, enabled: bool) -> Self {
    ResourceLocator { document, enabled }
  }

  pub fn locate(&self, kind: ResourceKind, url: &str) -> Option<ExistingResource> {
    if !self.enabled {
      return None;
    }

    let element = match kind {
      // An applied stylesheet wins over a preload for the same URL
      ResourceKind::Css => self
        .document
        .query(&Selector::Link {
          href: url.to_string(),
          rel: Some(String::from("stylesheet")),
        })
        .or_else(|| {
          self.document.query(&Selector::Link {
            href: url.to_string(),
            rel: None,
          })
        })?,
      ResourceKind::Script => self.document.query(&Selector::Script {
        src: url.to_string(),
      })?,
    };

    Some(ExistingResource {
      element,
      rel: self.document.get_attribute(element, "rel"),
      preload_as: self.document.get_attribute(element, "as"),
      load_state: self.document.load_state(element),
      has_stylesheet: self.document.has_stylesheet(element),
    })
  }
}
