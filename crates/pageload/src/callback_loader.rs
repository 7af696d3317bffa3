use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::channel::oneshot;
use parking_lot::Mutex;

use pageload_core::document::DocumentRef;
use pageload_core::document::ElementEvent;
use pageload_core::document::ElementId;
use pageload_core::document::InsertionPoint;
use pageload_core::document::Tag;
use pageload_core::types::CssOptions;
use pageload_core::types::LoadAllRequest;
use pageload_core::types::RequestOptions;
use pageload_core::types::Resource;
use pageload_core::types::ResourceKind;
use pageload_core::types::ScriptEntry;
use pageload_core::types::ScriptOptions;
use pageload_core::DomError;
use pageload_core::LoaderError;
use pageload_core::LoaderResult;

use crate::insert_script;
use crate::loader::validate_load_all;
use crate::AssetLoader;

type Callback<T> = Box<dyn FnOnce(LoaderResult<T>) + Send>;

/// Loader for hosts that can only report completion through element callbacks.
///
/// Every call inserts a new element. There is no lookup of existing elements, no preload swap
/// and no parallel fetch.
#[derive(Clone, Debug)]
pub struct CallbackLoader {
  document: DocumentRef,
}

impl CallbackLoader {
  pub fn new(document: DocumentRef) -> Self {
    CallbackLoader { document }
  }

  pub fn load_css_with(
    &self,
    href: &str,
    callback: impl FnOnce(LoaderResult<Resource>) + Send + 'static,
  ) {
    if href.is_empty() {
      return callback(Err(LoaderError::MissingArgument {
        operation: "load_css",
        argument: "href",
      }));
    }

    match self.insert_stylesheet(href) {
      Ok(link) => self.on_settled(link, ResourceKind::Css, href, callback),
      Err(error) => callback(Err(error.into())),
    }
  }

  pub fn load_script_with(
    &self,
    src: &str,
    options: &ScriptOptions,
    callback: impl FnOnce(LoaderResult<Resource>) + Send + 'static,
  ) {
    if src.is_empty() {
      return callback(Err(LoaderError::MissingArgument {
        operation: "load_script",
        argument: "src",
      }));
    }

    let parent = if self.document.has_body() {
      InsertionPoint::Body
    } else {
      InsertionPoint::Head
    };
    match insert_script(self.document.as_ref(), parent, src, options) {
      Ok(script) => self.on_settled(script, ResourceKind::Script, src, callback),
      Err(error) => callback(Err(error.into())),
    }
  }

  /// Starts each script from the completion callback of the one before it
  pub fn load_scripts_in_order_with(
    &self,
    entries: Vec<ScriptEntry>,
    callback: impl FnOnce(LoaderResult<Vec<Resource>>) + Send + 'static,
  ) {
    self.next_in_order(
      VecDeque::from(entries),
      Vec::new(),
      Box::new(callback),
    );
  }

  pub fn load_all_with(
    &self,
    request: LoadAllRequest,
    callback: impl FnOnce(LoaderResult<Vec<Resource>>) + Send + 'static,
  ) {
    let requests = match validate_load_all(request) {
      Ok(requests) => requests,
      Err(error) => return callback(Err(error)),
    };

    let total = requests.len();
    if total == 0 {
      return callback(Ok(Vec::new()));
    }

    let gather = Arc::new(Mutex::new(Gather {
      slots: vec![None; total],
      remaining: total,
      callback: Some(Box::new(callback)),
    }));
    for (index, request) in requests.iter().enumerate() {
      let gather = gather.clone();
      let settle = move |result| Gather::settle(&gather, index, result);
      match &request.options {
        RequestOptions::Css(_) => self.load_css_with(&request.url, settle),
        RequestOptions::Script(options) => self.load_script_with(&request.url, options, settle),
      }
    }
  }

  fn insert_stylesheet(&self, href: &str) -> Result<ElementId, DomError> {
    let document = self.document.as_ref();
    let link = document.create_element(Tag::Link);
    document.set_attribute(link, "rel", "stylesheet")?;
    document.set_attribute(link, "href", href)?;
    document.append(InsertionPoint::Head, link)?;
    Ok(link)
  }

  fn on_settled(
    &self,
    element: ElementId,
    kind: ResourceKind,
    url: &str,
    callback: impl FnOnce(LoaderResult<Resource>) + Send + 'static,
  ) {
    let url = url.to_string();
    self.document.add_listener(
      element,
      Box::new(move |event| {
        callback(match event {
          ElementEvent::Load => Ok(Resource { element, url, kind }),
          ElementEvent::Error => Err(LoaderError::load(kind, url)),
        })
      }),
    );
  }

  fn next_in_order(
    &self,
    mut remaining: VecDeque<ScriptEntry>,
    mut loaded: Vec<Resource>,
    callback: Callback<Vec<Resource>>,
  ) {
    let Some(entry) = remaining.pop_front() else {
      return callback(Ok(loaded));
    };

    let loader = self.clone();
    self.load_script_with(&entry.src, &entry.opts, move |result| match result {
      Ok(resource) => {
        loaded.push(resource);
        loader.next_in_order(remaining, loaded, callback);
      }
      Err(error) => callback(Err(error)),
    });
  }
}

/// Collects `load_all` results into their input positions
struct Gather {
  slots: Vec<Option<Resource>>,
  remaining: usize,
  callback: Option<Callback<Vec<Resource>>>,
}

impl Gather {
  fn settle(gather: &Mutex<Gather>, index: usize, result: LoaderResult<Resource>) {
    let finished = {
      let mut gather = gather.lock();
      match result {
        Ok(resource) => {
          gather.slots[index] = Some(resource);
          gather.remaining -= 1;
          if gather.remaining == 0 {
            let resources = gather.slots.drain(..).flatten().collect();
            gather.callback.take().map(|callback| (callback, Ok(resources)))
          } else {
            None
          }
        }
        Err(error) => gather.callback.take().map(|callback| (callback, Err(error))),
      }
    };

    if let Some((callback, result)) = finished {
      callback(result);
    }
  }
}

fn bridge<T: Send + 'static>() -> (
  impl FnOnce(LoaderResult<T>) + Send + 'static,
  oneshot::Receiver<LoaderResult<T>>,
) {
  let (tx, rx) = oneshot::channel();
  let callback = move |result| {
    let _ = tx.send(result);
  };
  (callback, rx)
}

#[async_trait]
impl AssetLoader for CallbackLoader {
  async fn load_css(&self, href: &str, _options: &CssOptions) -> LoaderResult<Resource> {
    let (callback, rx) = bridge();
    self.load_css_with(href, callback);
    rx.await.unwrap_or(Err(LoaderError::Abandoned))
  }

  async fn load_script(&self, src: &str, options: &ScriptOptions) -> LoaderResult<Resource> {
    let (callback, rx) = bridge();
    self.load_script_with(src, options, callback);
    rx.await.unwrap_or(Err(LoaderError::Abandoned))
  }

  async fn load_all(&self, request: LoadAllRequest) -> LoaderResult<Vec<Resource>> {
    let (callback, rx) = bridge();
    self.load_all_with(request, callback);
    rx.await.unwrap_or(Err(LoaderError::Abandoned))
  }

  async fn load_scripts_in_order(&self, entries: &[ScriptEntry]) -> LoaderResult<Vec<Resource>> {
    let (callback, rx) = bridge();
    self.load_scripts_in_order_with(entries.to_vec(), callback);
    rx.await.unwrap_or(Err(LoaderError::Abandoned))
  }

  async fn load_and_execute_in_order(&self, entries: &[ScriptEntry]) -> LoaderResult<()> {
    self.load_scripts_in_order(entries).await?;
    Ok(())
  }
}
