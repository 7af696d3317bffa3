use serde::Deserialize;
use serde::Serialize;

use crate::LoaderError;

use super::CssOptions;
use super::ResourceKind;
use super::ResourceRequest;
use super::ScriptEntry;
use super::ScriptOptions;

/// A list entry as a caller writes it: a bare URL or an object carrying one.
///
/// Anything else deserialises into `Invalid` and is rejected when converted.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceEntry {
  Url(String),
  Object(EntryObject),
  Invalid(serde_json::Value),
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryObject {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub href: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub src: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub preload: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub opts: Option<ScriptOptions>,
}

impl ResourceEntry {
  pub fn into_request(self, kind: ResourceKind) -> Result<ResourceRequest, LoaderError> {
    match kind {
      ResourceKind::Css => self.into_css_request(),
      ResourceKind::Script => self.into_script_entry().map(ResourceRequest::from),
    }
  }

  pub fn into_css_request(self) -> Result<ResourceRequest, LoaderError> {
    match self {
      ResourceEntry::Url(url) => Ok(ResourceRequest::css(url, CssOptions::default())),
      ResourceEntry::Object(EntryObject {
        href: Some(url), preload, ..
      })
      | ResourceEntry::Object(EntryObject {
        href: None,
        src: Some(url),
        preload,
        ..
      }) => Ok(ResourceRequest::css(
        url,
        CssOptions {
          preload: preload.unwrap_or(true),
        },
      )),
      entry => Err(entry.invalid(ResourceKind::Css)),
    }
  }

  pub fn into_script_entry(self) -> Result<ScriptEntry, LoaderError> {
    match self {
      ResourceEntry::Url(src) => Ok(ScriptEntry::from(src)),
      ResourceEntry::Object(EntryObject {
        src: Some(src),
        opts,
        ..
      }) => Ok(ScriptEntry::new(src, opts.unwrap_or_default())),
      entry => Err(entry.invalid(ResourceKind::Script)),
    }
  }

  fn invalid(&self, kind: ResourceKind) -> LoaderError {
    LoaderError::InvalidEntry {
      kind,
      entry: serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self)),
    }
  }
}

impl From<&str> for ResourceEntry {
  fn from(url: &str) -> Self {
    ResourceEntry::Url(url.to_string())
  }
}

impl From<ScriptEntry> for ResourceEntry {
  fn from(entry: ScriptEntry) -> Self {
    ResourceEntry::Object(EntryObject {
      src: Some(entry.src),
      opts: Some(entry.opts),
      ..Default::default()
    })
  }
}

/// Input to `load_all`
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadAllRequest {
  pub css: Vec<ResourceEntry>,
  pub scripts: Vec<ResourceEntry>,
}

/// Converts every entry up-front so that a malformed list fails before anything loads.
pub fn script_entries(entries: Vec<ResourceEntry>) -> Result<Vec<ScriptEntry>, LoaderError> {
  entries
    .into_iter()
    .map(ResourceEntry::into_script_entry)
    .collect()
}
