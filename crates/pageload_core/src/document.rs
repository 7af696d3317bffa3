use std::fmt::Display;
use std::sync::Arc;

use futures::channel::oneshot;
use serde::Deserialize;
use serde::Serialize;

use crate::DomError;

/// Document abstraction instance
///
/// This should be the host page for non-testing environments and `InMemoryDocument` for testing.
pub type DocumentRef = Arc<dyn Document + Send + Sync>;

/// Callback fired once with the element's load or error event
pub type Listener = Box<dyn FnOnce(ElementEvent) + Send>;

/// Callback fired once parsing finishes
pub type ContentLoadedCallback = Box<dyn FnOnce() + Send>;

#[derive(Clone, Copy, Debug, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ElementId(pub u64);

impl Display for ElementId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "#{}", self.0)
  }
}

#[derive(Clone, Debug, Deserialize, Hash, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Tag {
  Link,
  Script,
  Other(String),
}

impl Tag {
  pub fn name(&self) -> &str {
    match self {
      Tag::Link => "link",
      Tag::Script => "script",
      Tag::Other(name) => name,
    }
  }
}

impl From<&str> for Tag {
  fn from(name: &str) -> Self {
    match name {
      "link" => Tag::Link,
      "script" => Tag::Script,
      other => Tag::Other(other.to_string()),
    }
  }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InsertionPoint {
  Head,
  Body,
}

impl InsertionPoint {
  pub fn name(&self) -> &'static str {
    match self {
      InsertionPoint::Head => "head",
      InsertionPoint::Body => "body",
    }
  }
}

/// Connected-element lookups the loader needs
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
  Id(String),
  Link { href: String, rel: Option<String> },
  Script { src: String },
}

impl Display for Selector {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Selector::Id(id) => write!(f, "#{id}"),
      Selector::Link { href, rel: None } => write!(f, r#"link[href="{href}"]"#),
      Selector::Link {
        href,
        rel: Some(rel),
      } => write!(f, r#"link[rel="{rel}"][href="{href}"]"#),
      Selector::Script { src } => write!(f, r#"script[src="{src}"]"#),
    }
  }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadState {
  /// Nothing has been requested for this element
  Idle,
  Pending,
  Loaded,
  Failed,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementEvent {
  Load,
  Error,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadyState {
  Loading,
  Interactive,
  Complete,
}

/// Trait abstracting the page the loader inserts resources into.
///
/// Inserting a `<link>` with `rel="preload"` or `rel="stylesheet"`, or a `<script>` with a `src`,
/// makes the document start loading it. Implementations settle each element exactly once and
/// report the outcome through listeners.
///
/// A listener added after the element settled fires immediately with the settled event.
#[mockall::automock]
pub trait Document: std::fmt::Debug {
  /// First connected element matching the selector
  fn query(&self, selector: &Selector) -> Option<ElementId>;

  /// Create a detached element
  fn create_element(&self, tag: Tag) -> ElementId;

  fn get_attribute(&self, element: ElementId, name: &str) -> Option<String>;

  fn set_attribute(&self, element: ElementId, name: &str, value: &str) -> Result<(), DomError>;

  fn append(&self, parent: InsertionPoint, element: ElementId) -> Result<(), DomError>;

  fn has_body(&self) -> bool;

  fn load_state(&self, element: ElementId) -> LoadState;

  /// Whether a link has a parsed, applied stylesheet
  fn has_stylesheet(&self, element: ElementId) -> bool;

  fn add_listener(&self, element: ElementId, listener: Listener);

  fn ready_state(&self) -> ReadyState;

  /// Run `callback` once parsing finishes, or immediately if it already has
  fn on_content_loaded(&self, callback: ContentLoadedCallback);
}

/// Waits for the first load or error event of `element`.
///
/// Resolves to `None` when the document drops the listener without firing it.
pub async fn completion(document: &(dyn Document + Sync), element: ElementId) -> Option<ElementEvent> {
  let (tx, rx) = oneshot::channel();
  document.add_listener(
    element,
    Box::new(move |event| {
      let _ = tx.send(event);
    }),
  );
  rx.await.ok()
}

/// Waits for `DOMContentLoaded`, returning immediately when the document is already parsed.
pub async fn content_loaded(document: &(dyn Document + Sync)) {
  if document.ready_state() != ReadyState::Loading {
    return;
  }

  let (tx, rx) = oneshot::channel();
  document.on_content_loaded(Box::new(move || {
    let _ = tx.send(());
  }));
  let _ = rx.await;
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_selector_display() {
    assert_eq!(Selector::Id(String::from("main")).to_string(), "#main");
    assert_eq!(
      Selector::Link {
        href: String::from("/style.css"),
        rel: Some(String::from("preload")),
      }
      .to_string(),
      r#"link[rel="preload"][href="/style.css"]"#
    );
    assert_eq!(
      Selector::Script {
        src: String::from("a.js")
      }
      .to_string(),
      r#"script[src="a.js"]"#
    );
  }

  #[tokio::test]
  async fn test_completion_resolves_with_first_event() {
    let mut document = MockDocument::new();
    document
      .expect_add_listener()
      .times(1)
      .returning(|_, listener| listener(ElementEvent::Error));

    let event = completion(&document, ElementId(3)).await;
    assert_eq!(event, Some(ElementEvent::Error));
  }

  #[tokio::test]
  async fn test_completion_resolves_none_when_listener_is_dropped() {
    let mut document = MockDocument::new();
    document.expect_add_listener().returning(|_, _| {});

    assert_eq!(completion(&document, ElementId(1)).await, None);
  }

  #[tokio::test]
  async fn test_content_loaded_skips_parsed_documents() {
    let mut document = MockDocument::new();
    document
      .expect_ready_state()
      .return_const(ReadyState::Complete);
    document.expect_on_content_loaded().never();

    content_loaded(&document).await;
  }
}
