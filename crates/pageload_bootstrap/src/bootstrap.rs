use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;

use pageload::append_sequential;
use pageload::LoaderRef;
use pageload_core::document::content_loaded;
use pageload_core::document::DocumentRef;
use pageload_core::types::script_entries;
use pageload_core::types::CssOptions;
use pageload_core::types::ScriptEntry;
use pageload_core::LoaderResult;

use crate::swap_preload_to_stylesheet;
use crate::BootstrapConfig;
use crate::InitializerOutcome;
use crate::Initializers;

/// How the configured scripts ended up being executed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptPath {
  /// The loader's ordered execution succeeded
  Ordered,
  /// Ordered execution failed and the loader's one-by-one loading succeeded
  Sequential,
  /// No loader was available, scripts were appended directly
  RawAppend,
  Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CssOutcome {
  pub href: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapReport {
  /// Preload targets that matched a link in the page
  pub swapped: Vec<String>,
  /// Only filled in by [`Bootstrap::run_to_completion`]
  pub css: Vec<CssOutcome>,
  pub scripts: ScriptPath,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub script_error: Option<String>,
  pub initializers: Vec<InitializerOutcome>,
}

/// Runs the page startup sequence against one document and loader
#[derive(Debug)]
pub struct Bootstrap {
  config: BootstrapConfig,
  document: DocumentRef,
  loader: Option<LoaderRef>,
  initializers: Initializers,
}

impl Bootstrap {
  pub fn new(config: BootstrapConfig, document: DocumentRef) -> Self {
    Bootstrap {
      config,
      document,
      loader: None,
      initializers: Initializers::default(),
    }
  }

  pub fn with_loader(mut self, loader: LoaderRef) -> Self {
    self.loader = Some(loader);
    self
  }

  pub fn with_initializers(mut self, initializers: Initializers) -> Self {
    self.initializers = initializers;
    self
  }

  pub fn config(&self) -> &BootstrapConfig {
    &self.config
  }

  /// Starts [`Bootstrap::run`] on its own task when the config asks for it
  pub fn auto_start(self: Arc<Self>) -> Option<JoinHandle<BootstrapReport>> {
    if !self.config.auto_init {
      tracing::debug!("Auto init disabled");
      return None;
    }
    Some(tokio::spawn(async move { self.run().await }))
  }

  /// Stylesheet loads are started but not awaited
  pub async fn run(&self) -> BootstrapReport {
    let (report, _css) = self.start().await;
    report
  }

  /// Like [`Bootstrap::run`], then waits for the stylesheet loads and records their outcome
  pub async fn run_to_completion(&self) -> BootstrapReport {
    let (mut report, css) = self.start().await;
    for (href, task) in css {
      let error = match task.await {
        Ok(Ok(())) => None,
        Ok(Err(error)) => Some(error.to_string()),
        Err(error) => Some(error.to_string()),
      };
      report.css.push(CssOutcome { href, error });
    }
    report
  }

  async fn start(&self) -> (BootstrapReport, Vec<(String, JoinHandle<LoaderResult<()>>)>) {
    content_loaded(self.document.as_ref()).await;
    tracing::info!(
      css = self.config.css_files.len(),
      scripts = self.config.script_list.len(),
      "Bootstrapping page"
    );

    let swapped = self
      .config
      .css_files
      .iter()
      .map(|href| self.config.preload_target(href))
      .filter(|target| swap_preload_to_stylesheet(self.document.as_ref(), target).is_some())
      .collect();

    let css = self.start_css();
    let (scripts, script_error) = self.execute_scripts().await;
    let initializers = match scripts {
      ScriptPath::Failed => Vec::new(),
      _ => self.initializers.run_all(),
    };

    let report = BootstrapReport {
      swapped,
      css: Vec::new(),
      scripts,
      script_error,
      initializers,
    };
    (report, css)
  }

  fn start_css(&self) -> Vec<(String, JoinHandle<LoaderResult<()>>)> {
    let Some(loader) = &self.loader else {
      return Vec::new();
    };

    self
      .config
      .css_files
      .iter()
      .map(|href| {
        let loader = loader.clone();
        let task = tokio::spawn({
          let href = href.clone();
          async move {
            let result = loader.load_css(&href, &CssOptions::default()).await;
            if let Err(error) = &result {
              tracing::warn!(%href, %error, "Stylesheet failed to load");
            }
            result.map(|_| ())
          }
        });
        (href.clone(), task)
      })
      .collect()
  }

  async fn execute_scripts(&self) -> (ScriptPath, Option<String>) {
    let scripts = match script_entries(self.config.script_list.clone()) {
      Ok(scripts) => scripts,
      Err(error) => {
        tracing::error!(%error, "Invalid script list");
        return (ScriptPath::Failed, Some(error.to_string()));
      }
    };

    match &self.loader {
      Some(loader) => self.execute_with_loader(loader, &scripts).await,
      None => {
        if let Err(error) = append_sequential(self.document.as_ref(), &scripts).await {
          tracing::warn!(%error, "Some scripts failed to load");
          return (ScriptPath::RawAppend, Some(error.to_string()));
        }
        (ScriptPath::RawAppend, None)
      }
    }
  }

  async fn execute_with_loader(
    &self,
    loader: &LoaderRef,
    scripts: &[ScriptEntry],
  ) -> (ScriptPath, Option<String>) {
    let error = match loader.load_and_execute_in_order(scripts).await {
      Ok(()) => return (ScriptPath::Ordered, None),
      Err(error) => error,
    };
    tracing::error!(%error, "Ordered execution failed, falling back");

    match loader.load_scripts_in_order(scripts).await {
      Ok(_) => (ScriptPath::Sequential, Some(error.to_string())),
      Err(fallback_error) => {
        tracing::error!(error = %fallback_error, "Fallback script loading failed");
        (ScriptPath::Failed, Some(fallback_error.to_string()))
      }
    }
  }
}
