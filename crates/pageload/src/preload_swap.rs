use pageload_core::document::Document;
use pageload_core::document::ElementId;
use pageload_core::document::InsertionPoint;
use pageload_core::document::Tag;
use pageload_core::DomError;

/// Lifecycle of a stylesheet that is fetched through a preload link. Ordered, and a link only
/// ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreloadState {
  Absent,
  Preloading,
  Swapped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapOutcome {
  /// The link itself now has `rel="stylesheet"`
  Swapped,
  /// The document refused to change `rel`, so a new stylesheet link was inserted instead
  Replaced(ElementId),
  /// There is no link to swap
  NothingToSwap,
}

/// One `<link>` tracking one CSS URL through [`PreloadState`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreloadLink {
  href: String,
  element: Option<ElementId>,
  state: PreloadState,
}

impl PreloadLink {
  pub fn absent(href: impl Into<String>) -> Self {
    PreloadLink {
      href: href.into(),
      element: None,
      state: PreloadState::Absent,
    }
  }

  /// Derives the state of an existing link from its `rel`
  pub fn observe(document: &dyn Document, element: ElementId) -> Self {
    let href = document.get_attribute(element, "href").unwrap_or_default();
    let state = match document.get_attribute(element, "rel").as_deref() {
      Some("stylesheet") => PreloadState::Swapped,
      Some("preload") => PreloadState::Preloading,
      _ => PreloadState::Absent,
    };

    PreloadLink {
      href,
      element: Some(element),
      state,
    }
  }

  /// Creates and inserts `<link rel="preload" as="style">` for the URL
  pub fn insert(document: &dyn Document, href: impl Into<String>) -> Result<Self, DomError> {
    let mut link = PreloadLink::absent(href);
    link.begin(document)?;
    Ok(link)
  }

  pub fn href(&self) -> &str {
    &self.href
  }

  pub fn element(&self) -> Option<ElementId> {
    self.element
  }

  pub fn state(&self) -> PreloadState {
    self.state
  }

  /// `Absent -> Preloading`. Does nothing for a link that already exists.
  pub fn begin(&mut self, document: &dyn Document) -> Result<ElementId, DomError> {
    if let Some(element) = self.element {
      return Ok(element);
    }

    let element = document.create_element(Tag::Link);
    document.set_attribute(element, "rel", "preload")?;
    document.set_attribute(element, "as", "style")?;
    document.set_attribute(element, "href", &self.href)?;
    document.append(InsertionPoint::Head, element)?;
    tracing::debug!(href = %self.href, %element, "Inserted preload link");

    self.element = Some(element);
    self.advance(PreloadState::Preloading);
    Ok(element)
  }

  /// `Preloading -> Swapped`. Safe to call any number of times, before or after the preload
  /// has finished loading.
  pub fn swap(&mut self, document: &dyn Document) -> Result<SwapOutcome, DomError> {
    let Some(element) = self.element else {
      return Ok(SwapOutcome::NothingToSwap);
    };

    match document.set_attribute(element, "rel", "stylesheet") {
      Ok(()) => {
        self.advance(PreloadState::Swapped);
        Ok(SwapOutcome::Swapped)
      }
      Err(DomError::ReadOnlyAttribute { .. }) => {
        let replacement = document.create_element(Tag::Link);
        document.set_attribute(replacement, "rel", "stylesheet")?;
        document.set_attribute(replacement, "href", &self.href)?;
        document.append(InsertionPoint::Head, replacement)?;
        tracing::debug!(
          href = %self.href,
          %element,
          %replacement,
          "Preload link is read-only, inserted a stylesheet link instead"
        );

        self.element = Some(replacement);
        self.advance(PreloadState::Swapped);
        Ok(SwapOutcome::Replaced(replacement))
      }
      Err(error) => Err(error),
    }
  }

  fn advance(&mut self, next: PreloadState) {
    self.state = self.state.max(next);
  }
}
