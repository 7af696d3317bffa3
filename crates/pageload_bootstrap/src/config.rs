use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use pageload_core::types::ResourceEntry;
use pageload_core::types::ScriptEntry;
use pageload_core::types::ScriptOptions;

/// What a page bootstraps with.
///
/// Keys missing from a config file keep their default value. Nested values are replaced whole,
/// never merged.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BootstrapConfig {
  pub css_files: Vec<String>,
  /// Stylesheet URL to the id of the preload link the page declares for it
  pub preload_ids: IndexMap<String, String>,
  pub script_list: Vec<ResourceEntry>,
  pub auto_init: bool,
}

impl Default for BootstrapConfig {
  fn default() -> Self {
    let script_list = [
      "js/library.js",
      "js/reviews.js",
      "js/menu-data.js",
      "js/menu.js",
      "js/app.js",
    ]
    .into_iter()
    .map(|src| ResourceEntry::from(ScriptEntry::new(src, ScriptOptions::ordered())))
    .collect();

    BootstrapConfig {
      css_files: vec![String::from("/style.css"), String::from("/response.css")],
      preload_ids: IndexMap::from([
        (String::from("/style.css"), String::from("css-main-preload")),
        (
          String::from("/response.css"),
          String::from("css-responsive-preload"),
        ),
      ]),
      script_list,
      auto_init: true,
    }
  }
}

impl BootstrapConfig {
  pub fn from_json(source: &str) -> serde_json::Result<Self> {
    serde_json::from_str(source)
  }

  /// `#id` when the page declares a preload id for `href`, otherwise `href` itself
  pub fn preload_target(&self, href: &str) -> String {
    match self.preload_ids.get(href) {
      Some(id) => format!("#{id}"),
      None => href.to_string(),
    }
  }
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn test_missing_keys_keep_defaults() {
    let config = BootstrapConfig::from_json(r#"{ "cssFiles": ["/theme.css"] }"#).unwrap();

    assert_eq!(config.css_files, vec![String::from("/theme.css")]);
    assert_eq!(config.preload_ids, BootstrapConfig::default().preload_ids);
    assert_eq!(config.script_list.len(), 5);
    assert!(config.auto_init);
  }

  #[test]
  fn test_nested_values_are_replaced_whole() {
    let config =
      BootstrapConfig::from_json(r#"{ "preloadIds": { "/theme.css": "theme" }, "autoInit": false }"#)
        .unwrap();

    assert_eq!(
      config.preload_ids,
      IndexMap::from([(String::from("/theme.css"), String::from("theme"))])
    );
    assert_eq!(config.preload_target("/style.css"), "/style.css");
    assert_eq!(config.preload_target("/theme.css"), "#theme");
    assert!(!config.auto_init);
  }

  #[test]
  fn test_default_scripts_run_in_order() {
    let scripts =
      pageload_core::types::script_entries(BootstrapConfig::default().script_list).unwrap();

    assert_eq!(scripts[0].src, "js/library.js");
    assert_eq!(scripts[4].src, "js/app.js");
    assert!(scripts
      .iter()
      .all(|entry| entry.opts.is_async == Some(false)));
  }
}
