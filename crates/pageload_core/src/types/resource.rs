use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

use crate::document::ElementId;

use super::ScriptEntry;
use super::ScriptOptions;

#[derive(Clone, Copy, Debug, Deserialize, Hash, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
  Css,
  Script,
}

impl Display for ResourceKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ResourceKind::Css => f.write_str("CSS"),
      ResourceKind::Script => f.write_str("script"),
    }
  }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CssOptions {
  /// Fetch through a `<link rel="preload" as="style">` and swap it once loaded
  pub preload: bool,
}

impl Default for CssOptions {
  fn default() -> Self {
    CssOptions { preload: true }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestOptions {
  Css(CssOptions),
  Script(ScriptOptions),
}

/// A single stylesheet or script to load. The URL is the identity of the request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRequest {
  pub url: String,
  pub kind: ResourceKind,
  pub options: RequestOptions,
}

impl ResourceRequest {
  pub fn css(url: impl Into<String>, options: CssOptions) -> Self {
    ResourceRequest {
      url: url.into(),
      kind: ResourceKind::Css,
      options: RequestOptions::Css(options),
    }
  }

  pub fn script(url: impl Into<String>, options: ScriptOptions) -> Self {
    ResourceRequest {
      url: url.into(),
      kind: ResourceKind::Script,
      options: RequestOptions::Script(options),
    }
  }
}

impl From<ScriptEntry> for ResourceRequest {
  fn from(entry: ScriptEntry) -> Self {
    ResourceRequest::script(entry.src, entry.opts)
  }
}

/// The element that satisfied a load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
  pub element: ElementId,
  pub url: String,
  pub kind: ResourceKind,
}
