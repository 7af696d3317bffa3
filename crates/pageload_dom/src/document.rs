use std::collections::BTreeMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;

use pageload_core::document::Document;
use pageload_core::document::ElementEvent;
use pageload_core::document::ElementId;
use pageload_core::document::InsertionPoint;
use pageload_core::document::Listener;
use pageload_core::document::LoadState;
use pageload_core::document::ReadyState;
use pageload_core::document::Selector;
use pageload_core::document::Tag;
use pageload_core::DomError;

use crate::InMemoryBlobRegistry;
use crate::InMemoryNetwork;
use crate::OBJECT_URL_SCHEME;

const SOURCE_URL_MARKER: &str = "//# sourceURL=";

/// Restrictions the page applies to script execution
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentPolicy {
  pub allow_object_url_scripts: bool,
}

impl Default for ContentPolicy {
  fn default() -> Self {
    ContentPolicy {
      allow_object_url_scripts: true,
    }
  }
}

struct Pending<T>(Vec<T>);

impl<T> Default for Pending<T> {
  fn default() -> Self {
    Pending(Vec::new())
  }
}

impl<T> std::fmt::Debug for Pending<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Pending({})", self.0.len())
  }
}

#[derive(Debug)]
enum FetchOutcome {
  Succeeded { body: String },
  Failed,
}

#[derive(Debug)]
struct ElementRecord {
  tag: Tag,
  attributes: IndexMap<String, String>,
  read_only: HashSet<String>,
  parent: Option<InsertionPoint>,
  load_state: LoadState,
  /// Fetched `async=false` script waiting for the scripts inserted before it
  queued: Option<FetchOutcome>,
  stylesheet: bool,
  listeners: Pending<Listener>,
}

impl ElementRecord {
  fn new(tag: Tag) -> Self {
    ElementRecord {
      tag,
      attributes: IndexMap::new(),
      read_only: HashSet::new(),
      parent: None,
      load_state: LoadState::Idle,
      queued: None,
      stylesheet: false,
      listeners: Pending::default(),
    }
  }

  fn attribute(&self, name: &str) -> Option<&str> {
    self.attributes.get(name).map(|value| value.as_str())
  }

  fn matches(&self, selector: &Selector) -> bool {
    match selector {
      Selector::Id(id) => self.attribute("id") == Some(id.as_str()),
      Selector::Link { href, rel } => {
        self.tag == Tag::Link
          && self.attribute("href") == Some(href.as_str())
          && rel
            .as_ref()
            .map_or(true, |rel| self.attribute("rel") == Some(rel.as_str()))
      }
      Selector::Script { src } => {
        self.tag == Tag::Script && self.attribute("src") == Some(src.as_str())
      }
    }
  }

  fn is_ordered_script(&self) -> bool {
    self.tag == Tag::Script && self.attribute("async") == Some("false")
  }

  /// URL the element starts loading once connected, if any
  fn load_target(&self) -> Option<String> {
    match self.tag {
      Tag::Link => match self.attribute("rel") {
        Some("preload") | Some("stylesheet") => self.attribute("href").map(String::from),
        _ => None,
      },
      Tag::Script => self.attribute("src").map(String::from),
      Tag::Other(_) => None,
    }
  }
}

#[derive(Debug)]
struct DocumentState {
  next_id: u64,
  elements: BTreeMap<ElementId, ElementRecord>,
  head: Vec<ElementId>,
  body: Option<Vec<ElementId>>,
  ready_state: ReadyState,
  content_loaded: Pending<Box<dyn FnOnce() + Send>>,
  ordered_scripts: VecDeque<ElementId>,
  executed: Vec<String>,
  policy: ContentPolicy,
  refused_sources: HashSet<String>,
}

impl Default for DocumentState {
  fn default() -> Self {
    DocumentState {
      next_id: 1,
      elements: BTreeMap::new(),
      head: Vec::new(),
      body: Some(Vec::new()),
      ready_state: ReadyState::Complete,
      content_loaded: Pending::default(),
      ordered_scripts: VecDeque::new(),
      executed: Vec::new(),
      policy: ContentPolicy::default(),
      refused_sources: HashSet::new(),
    }
  }
}

impl DocumentState {
  fn connected(&self) -> impl Iterator<Item = ElementId> + '_ {
    self
      .head
      .iter()
      .chain(self.body.iter().flatten())
      .copied()
  }

  fn record(&self, element: ElementId) -> Result<&ElementRecord, DomError> {
    self
      .elements
      .get(&element)
      .ok_or(DomError::UnknownElement(element.0))
  }

  fn record_mut(&mut self, element: ElementId) -> Result<&mut ElementRecord, DomError> {
    self
      .elements
      .get_mut(&element)
      .ok_or(DomError::UnknownElement(element.0))
  }

  /// Marks the element pending and returns what has to be fetched for it
  fn begin_load(&mut self, element: ElementId) -> Option<LoadJob> {
    let record = self.elements.get_mut(&element)?;
    if record.load_state != LoadState::Idle || record.parent.is_none() {
      return None;
    }

    let url = record.load_target()?;
    record.load_state = LoadState::Pending;
    let ordered = record.is_ordered_script();
    let tag = record.tag.clone();
    if ordered {
      self.ordered_scripts.push_back(element);
    }

    Some(LoadJob { element, url, tag })
  }

  /// Settles an element and hands back the listeners to notify
  fn settle(&mut self, element: ElementId, event: ElementEvent) -> Vec<(Listener, ElementEvent)> {
    let Some(record) = self.elements.get_mut(&element) else {
      return Vec::new();
    };

    record.load_state = match event {
      ElementEvent::Load => LoadState::Loaded,
      ElementEvent::Error => LoadState::Failed,
    };
    if event == ElementEvent::Load
      && record.tag == Tag::Link
      && record.attribute("rel") == Some("stylesheet")
    {
      record.stylesheet = true;
    }

    std::mem::take(&mut record.listeners.0)
      .into_iter()
      .map(|listener| (listener, event))
      .collect()
  }

  fn execute(&mut self, element: ElementId, outcome: FetchOutcome) -> Vec<(Listener, ElementEvent)> {
    match outcome {
      FetchOutcome::Succeeded { body } => {
        let src = self
          .elements
          .get(&element)
          .and_then(|record| record.attribute("src"))
          .unwrap_or_default()
          .to_string();
        let source = source_url(&body).unwrap_or(src);
        tracing::trace!(%element, %source, "Executing script");
        self.executed.push(source);
        self.settle(element, ElementEvent::Load)
      }
      FetchOutcome::Failed => self.settle(element, ElementEvent::Error),
    }
  }

  /// Executes queued `async=false` scripts in insertion order, stopping at the first one that is
  /// still being fetched
  fn drain_ordered_scripts(&mut self) -> Vec<(Listener, ElementEvent)> {
    let mut notifications = Vec::new();
    while let Some(element) = self.ordered_scripts.front().copied() {
      let outcome = self
        .elements
        .get_mut(&element)
        .and_then(|record| record.queued.take());
      let Some(outcome) = outcome else {
        break;
      };
      self.ordered_scripts.pop_front();
      notifications.extend(self.execute(element, outcome));
    }
    notifications
  }
}

fn source_url(body: &str) -> Option<String> {
  body
    .lines()
    .rev()
    .find_map(|line| line.trim().strip_prefix(SOURCE_URL_MARKER))
    .map(|url| url.trim().to_string())
}

fn notify(notifications: Vec<(Listener, ElementEvent)>) {
  for (listener, event) in notifications {
    listener(event);
  }
}

#[derive(Debug)]
struct LoadJob {
  element: ElementId,
  url: String,
  tag: Tag,
}

#[derive(Debug)]
struct DocumentInner {
  state: Mutex<DocumentState>,
  network: Arc<InMemoryNetwork>,
  blobs: Arc<InMemoryBlobRegistry>,
}

/// In memory implementation of the `Document` trait, for testing purposes.
///
/// Loads run on tokio tasks, so elements settle asynchronously after insertion the way they do
/// in a browser. Scripts record their execution in [`InMemoryDocument::executed_scripts`],
/// using the trailing `//# sourceURL=` comment as their name when present.
#[derive(Clone, Debug)]
pub struct InMemoryDocument {
  inner: Arc<DocumentInner>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSnapshot {
  pub id: ElementId,
  pub tag: String,
  pub attributes: IndexMap<String, String>,
  pub load_state: LoadState,
  pub stylesheet: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
  pub head: Vec<ElementSnapshot>,
  pub body: Option<Vec<ElementSnapshot>>,
  pub executed_scripts: Vec<String>,
}

impl InMemoryDocument {
  pub fn new(network: Arc<InMemoryNetwork>, blobs: Arc<InMemoryBlobRegistry>) -> Self {
    InMemoryDocument {
      inner: Arc::new(DocumentInner {
        state: Mutex::new(DocumentState::default()),
        network,
        blobs,
      }),
    }
  }

  /// Drop the body, as if scripts ran before the parser reached it
  pub fn remove_body(&self) {
    self.inner.state.lock().body = None;
  }

  pub fn set_policy(&self, policy: ContentPolicy) {
    self.inner.state.lock().policy = policy;
  }

  /// Refuse the object-URL script whose `//# sourceURL=` names `source`, leaving others alone
  pub fn refuse_object_url_source(&self, source: &str) {
    self
      .inner
      .state
      .lock()
      .refused_sources
      .insert(source.to_string());
  }

  /// Refuse future writes of `name` on `element`
  pub fn lock_attribute(&self, element: ElementId, name: &str) {
    if let Some(record) = self.inner.state.lock().elements.get_mut(&element) {
      record.read_only.insert(name.to_string());
    }
  }

  pub fn begin_parsing(&self) {
    self.inner.state.lock().ready_state = ReadyState::Loading;
  }

  /// Moves to `Interactive` and fires the `DOMContentLoaded` callbacks
  pub fn finish_parsing(&self) {
    let callbacks = {
      let mut state = self.inner.state.lock();
      if state.ready_state != ReadyState::Loading {
        return;
      }
      state.ready_state = ReadyState::Interactive;
      std::mem::take(&mut state.content_loaded.0)
    };

    for callback in callbacks {
      callback();
    }
  }

  pub fn query_all(&self, selector: &Selector) -> Vec<ElementId> {
    let state = self.inner.state.lock();
    state
      .connected()
      .filter(|element| {
        state
          .elements
          .get(element)
          .is_some_and(|record| record.matches(selector))
      })
      .collect()
  }

  pub fn executed_scripts(&self) -> Vec<String> {
    self.inner.state.lock().executed.clone()
  }

  pub fn children(&self, parent: InsertionPoint) -> Vec<ElementId> {
    let state = self.inner.state.lock();
    match parent {
      InsertionPoint::Head => state.head.clone(),
      InsertionPoint::Body => state.body.clone().unwrap_or_default(),
    }
  }

  pub fn snapshot(&self) -> DocumentSnapshot {
    let state = self.inner.state.lock();
    let describe = |elements: &Vec<ElementId>| -> Vec<ElementSnapshot> {
      elements
        .iter()
        .filter_map(|element| {
          let record = state.elements.get(element)?;
          Some(ElementSnapshot {
            id: *element,
            tag: record.tag.name().to_string(),
            attributes: record.attributes.clone(),
            load_state: record.load_state,
            stylesheet: record.stylesheet,
          })
        })
        .collect()
    };

    DocumentSnapshot {
      head: describe(&state.head),
      body: state.body.as_ref().map(describe),
      executed_scripts: state.executed.clone(),
    }
  }

  fn spawn(&self, job: LoadJob) {
    let document = self.clone();
    tokio::spawn(async move { document.run(job).await });
  }

  async fn run(&self, job: LoadJob) {
    let LoadJob { element, url, tag } = job;
    let outcome = self.retrieve(&tag, &url).await;

    let notifications = {
      let mut state = self.inner.state.lock();
      match tag {
        Tag::Script => {
          let ordered = state.ordered_scripts.contains(&element);
          if ordered {
            if let Ok(record) = state.record_mut(element) {
              record.queued = Some(outcome);
            }
            state.drain_ordered_scripts()
          } else {
            state.execute(element, outcome)
          }
        }
        _ => match outcome {
          FetchOutcome::Succeeded { .. } => state.settle(element, ElementEvent::Load),
          FetchOutcome::Failed => state.settle(element, ElementEvent::Error),
        },
      }
    };

    notify(notifications);
  }

  async fn retrieve(&self, tag: &Tag, url: &str) -> FetchOutcome {
    if url.starts_with(OBJECT_URL_SCHEME) {
      let allowed = self.inner.state.lock().policy.allow_object_url_scripts;
      if *tag == Tag::Script && !allowed {
        tracing::debug!(url, "Object URL script refused by content policy");
        return FetchOutcome::Failed;
      }

      let Some(body) = self.inner.blobs.resolve(url) else {
        return FetchOutcome::Failed;
      };
      let refused = *tag == Tag::Script
        && source_url(&body)
          .is_some_and(|source| self.inner.state.lock().refused_sources.contains(&source));
      if refused {
        tracing::debug!(url, "Object URL script refused by content policy");
        return FetchOutcome::Failed;
      }
      return FetchOutcome::Succeeded { body };
    }

    match self.inner.network.request(url).await {
      Ok(response) if response.is_success() => FetchOutcome::Succeeded {
        body: response.text,
      },
      Ok(response) => {
        tracing::debug!(url, status = response.status, "Element load failed");
        FetchOutcome::Failed
      }
      Err(error) => {
        tracing::debug!(url, %error, "Element load failed");
        FetchOutcome::Failed
      }
    }
  }
}

impl Document for InMemoryDocument {
  fn query(&self, selector: &Selector) -> Option<ElementId> {
    let state = self.inner.state.lock();
    let found = state.connected().find(|element| {
      state
        .elements
        .get(element)
        .is_some_and(|record| record.matches(selector))
    });
    found
  }

  fn create_element(&self, tag: Tag) -> ElementId {
    let mut state = self.inner.state.lock();
    let element = ElementId(state.next_id);
    state.next_id += 1;
    state.elements.insert(element, ElementRecord::new(tag));
    element
  }

  fn get_attribute(&self, element: ElementId, name: &str) -> Option<String> {
    let state = self.inner.state.lock();
    state
      .elements
      .get(&element)
      .and_then(|record| record.attribute(name))
      .map(String::from)
  }

  fn set_attribute(&self, element: ElementId, name: &str, value: &str) -> Result<(), DomError> {
    let job = {
      let mut state = self.inner.state.lock();
      let record = state.record_mut(element)?;
      if record.read_only.contains(name) {
        return Err(DomError::ReadOnlyAttribute {
          name: name.to_string(),
        });
      }
      if record.attribute(name) == Some(value) {
        return Ok(());
      }

      record
        .attributes
        .insert(name.to_string(), value.to_string());

      // A finished preload is already in the cache, so the sheet applies without a new request
      let promoted = record.tag == Tag::Link && name == "rel" && value == "stylesheet";
      if promoted && record.load_state == LoadState::Loaded {
        record.stylesheet = true;
      }

      if promoted {
        state.begin_load(element)
      } else {
        None
      }
    };

    if let Some(job) = job {
      self.spawn(job);
    }
    Ok(())
  }

  fn append(&self, parent: InsertionPoint, element: ElementId) -> Result<(), DomError> {
    let job = {
      let mut state = self.inner.state.lock();
      if parent == InsertionPoint::Body && state.body.is_none() {
        return Err(DomError::MissingInsertionPoint("body"));
      }

      let previous = state.record(element)?.parent;
      match previous {
        Some(InsertionPoint::Head) => state.head.retain(|child| *child != element),
        Some(InsertionPoint::Body) => {
          if let Some(body) = state.body.as_mut() {
            body.retain(|child| *child != element);
          }
        }
        None => {}
      }

      state.record_mut(element)?.parent = Some(parent);
      match parent {
        InsertionPoint::Head => state.head.push(element),
        InsertionPoint::Body => {
          if let Some(body) = state.body.as_mut() {
            body.push(element);
          }
        }
      }

      state.begin_load(element)
    };

    if let Some(job) = job {
      self.spawn(job);
    }
    Ok(())
  }

  fn has_body(&self) -> bool {
    self.inner.state.lock().body.is_some()
  }

  fn load_state(&self, element: ElementId) -> LoadState {
    self
      .inner
      .state
      .lock()
      .elements
      .get(&element)
      .map_or(LoadState::Idle, |record| record.load_state)
  }

  fn has_stylesheet(&self, element: ElementId) -> bool {
    self
      .inner
      .state
      .lock()
      .elements
      .get(&element)
      .is_some_and(|record| record.stylesheet)
  }

  fn add_listener(&self, element: ElementId, listener: Listener) {
    let settled = {
      let mut state = self.inner.state.lock();
      let Some(record) = state.elements.get_mut(&element) else {
        return;
      };

      match record.load_state {
        LoadState::Loaded => Some((listener, ElementEvent::Load)),
        LoadState::Failed => Some((listener, ElementEvent::Error)),
        LoadState::Idle | LoadState::Pending => {
          record.listeners.0.push(listener);
          None
        }
      }
    };

    if let Some((listener, event)) = settled {
      listener(event);
    }
  }

  fn ready_state(&self) -> ReadyState {
    self.inner.state.lock().ready_state
  }

  fn on_content_loaded(&self, callback: Box<dyn FnOnce() + Send>) {
    let callback = {
      let mut state = self.inner.state.lock();
      if state.ready_state == ReadyState::Loading {
        state.content_loaded.0.push(callback);
        return;
      }
      callback
    };

    callback();
  }
}
