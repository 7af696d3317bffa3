use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptOptions {
  #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
  pub script_type: Option<String>,

  #[serde(rename = "async", skip_serializing_if = "Option::is_none")]
  pub is_async: Option<bool>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub defer: Option<bool>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub cross_origin: Option<String>,
}

impl ScriptOptions {
  /// Options for scripts that must run in insertion order
  pub fn ordered() -> Self {
    ScriptOptions {
      is_async: Some(false),
      ..Default::default()
    }
  }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptEntry {
  pub src: String,
  #[serde(default)]
  pub opts: ScriptOptions,
}

impl ScriptEntry {
  pub fn new(src: impl Into<String>, opts: ScriptOptions) -> Self {
    ScriptEntry {
      src: src.into(),
      opts,
    }
  }
}

impl From<&str> for ScriptEntry {
  fn from(src: &str) -> Self {
    ScriptEntry::new(src, ScriptOptions::default())
  }
}

impl From<String> for ScriptEntry {
  fn from(src: String) -> Self {
    ScriptEntry::new(src, ScriptOptions::default())
  }
}
