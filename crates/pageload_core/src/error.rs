use thiserror::Error;

use crate::types::ResourceKind;

pub type LoaderResult<T> = std::result::Result<T, LoaderError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoaderError {
  #[error("{operation}: missing {argument}")]
  MissingArgument {
    operation: &'static str,
    argument: &'static str,
  },

  #[error("Invalid {kind} entry: {entry}")]
  InvalidEntry { kind: ResourceKind, entry: String },

  #[error("Failed to load {kind}: {url}")]
  Load { kind: ResourceKind, url: String },

  #[error("Failed to fetch {url} ({reason})")]
  Fetch { url: String, reason: FetchError },

  #[error("Execution failed for {src}")]
  ExecutionBlocked { src: String },

  #[error("{}", .0)]
  Dom(#[from] DomError),

  #[error("No script loading strategy is available on this host")]
  NoStrategyAvailable,

  #[error("Timeout waiting for element: {selector}")]
  Timeout { selector: String },

  #[error("Completion callback was dropped before it was called")]
  Abandoned,
}

impl LoaderError {
  pub fn load(kind: ResourceKind, url: impl Into<String>) -> Self {
    LoaderError::Load {
      kind,
      url: url.into(),
    }
  }
}

/// Mutation or insertion refused by the document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
  #[error("Attribute `{name}` cannot be modified on this element")]
  ReadOnlyAttribute { name: String },

  #[error("Unknown element {0}")]
  UnknownElement(u64),

  #[error("Document has no {0} to insert into")]
  MissingInsertionPoint(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
  #[error("status {0}")]
  Status(u16),

  #[error("network error: {0}")]
  Network(String),

  #[error("fetch is not supported by this host")]
  Unsupported,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobError {
  #[error("object URLs are not supported by this host")]
  Unsupported,

  #[error("{0}")]
  Rejected(String),
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_load_error_messages() {
    assert_eq!(
      LoaderError::load(ResourceKind::Css, "/style.css").to_string(),
      "Failed to load CSS: /style.css"
    );
    assert_eq!(
      LoaderError::load(ResourceKind::Script, "js/app.js").to_string(),
      "Failed to load script: js/app.js"
    );
  }

  #[test]
  fn test_fetch_error_message_includes_status() {
    let error = LoaderError::Fetch {
      url: String::from("b.js"),
      reason: FetchError::Status(404),
    };
    assert_eq!(error.to_string(), "Failed to fetch b.js (status 404)");
  }

  #[test]
  fn test_missing_argument_message() {
    let error = LoaderError::MissingArgument {
      operation: "load_css",
      argument: "href",
    };
    assert_eq!(error.to_string(), "load_css: missing href");
  }
}
