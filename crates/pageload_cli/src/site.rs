//! Builds the in-memory origin a simulation runs against.
use std::fs;
use std::path::Path;

use anyhow::Context;
use indexmap::IndexSet;

use pageload_bootstrap::BootstrapConfig;
use pageload_core::document::Tag;
use pageload_core::fetch::Fetcher;
use pageload_core::types::script_entries;
use pageload_dom::html::parse_elements;
use pageload_dom::InMemoryNetwork;
use pageload_dom::Route;

/// Serves every file under `root`, reachable both as `/path` and as the page-relative `path`.
///
/// Returns the number of files served.
pub fn serve_directory(network: &InMemoryNetwork, root: &Path) -> anyhow::Result<usize> {
  let pattern = root.join("**").join("*");
  let pattern = pattern.to_string_lossy();
  let mut served = 0;

  for entry in glob::glob(&pattern)? {
    let path = entry?;
    if !path.is_file() {
      continue;
    }

    let relative = path
      .strip_prefix(root)
      .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;
    let url = relative
      .components()
      .map(|component| component.as_os_str().to_string_lossy())
      .collect::<Vec<_>>()
      .join("/");
    let bytes = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let body = String::from_utf8_lossy(&bytes).to_string();

    network.serve(&format!("/{url}"), body.clone());
    network.serve(&url, body);
    served += 1;
  }

  tracing::debug!(served, root = %root.display(), "Serving directory");
  Ok(served)
}

/// Every URL the page or the bootstrap will ask for, in first-seen order
pub fn referenced_urls(html: &str, config: &BootstrapConfig) -> anyhow::Result<IndexSet<String>> {
  let mut urls = IndexSet::new();

  for element in parse_elements(html)? {
    let attribute = |name: &str| {
      element
        .attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.clone())
    };
    let url = match element.tag {
      Tag::Link => match attribute("rel").as_deref() {
        Some("preload") | Some("stylesheet") => attribute("href"),
        _ => None,
      },
      Tag::Script => attribute("src"),
      Tag::Other(_) => None,
    };
    urls.extend(url);
  }

  urls.extend(config.css_files.iter().cloned());
  urls.extend(
    script_entries(config.script_list.clone())?
      .into_iter()
      .map(|entry| entry.src),
  );
  Ok(urls)
}

/// Fetches each URL from a live origin once and serves the responses from memory
pub async fn snapshot_origin<'a>(
  network: &InMemoryNetwork,
  fetcher: &dyn Fetcher,
  urls: impl IntoIterator<Item = &'a String>,
) {
  for url in urls {
    let route = match fetcher.fetch(url).await {
      Ok(response) => Route {
        body: response.text,
        ..Route::status(response.status)
      },
      Err(error) => {
        tracing::warn!(%url, %error, "Could not snapshot resource");
        Route::unreachable()
      }
    };
    network.set_route(url, route);
  }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use pageload_core::fetch::FetchResponse;
  use pageload_core::fetch::MockFetcher;
  use pageload_core::FetchError;
  use pretty_assertions::assert_eq;

  use super::*;

  #[tokio::test]
  async fn test_serves_files_by_absolute_and_relative_path() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("js")).unwrap();
    fs::write(root.path().join("style.css"), "body {}").unwrap();
    fs::write(root.path().join("js/app.js"), "var app;").unwrap();
    let network = InMemoryNetwork::default();

    assert_eq!(serve_directory(&network, root.path()).unwrap(), 2);
    assert_eq!(
      network.request("/style.css").await,
      Ok(FetchResponse::ok("body {}"))
    );
    assert_eq!(
      network.request("js/app.js").await,
      Ok(FetchResponse::ok("var app;"))
    );
  }

  #[test]
  fn test_referenced_urls_combine_page_and_config() {
    let html = r#"
      <link rel="preload" as="style" href="/style.css">
      <link rel="icon" href="/favicon.ico">
      <script src="js/loader.js"></script>
    "#;

    let urls = referenced_urls(html, &BootstrapConfig::default()).unwrap();

    assert_eq!(
      urls.into_iter().collect::<Vec<_>>(),
      vec![
        "/style.css",
        "js/loader.js",
        "/response.css",
        "js/library.js",
        "js/reviews.js",
        "js/menu-data.js",
        "js/menu.js",
        "js/app.js",
      ]
    );
  }

  #[tokio::test]
  async fn test_snapshot_keeps_status_and_marks_failures_unreachable() {
    let mut fetcher = MockFetcher::new();
    fetcher
      .expect_fetch()
      .withf(|url| url == "/style.css")
      .returning(|_| {
        Ok(FetchResponse {
          status: 500,
          text: String::from("oops"),
        })
      });
    fetcher
      .expect_fetch()
      .withf(|url| url == "js/app.js")
      .returning(|_| Err(FetchError::Network(String::from("refused"))));
    let network = Arc::new(InMemoryNetwork::default());
    let urls = [String::from("/style.css"), String::from("js/app.js")];

    snapshot_origin(&network, &fetcher, &urls).await;

    assert_eq!(network.request("/style.css").await.unwrap().status, 500);
    assert!(network.request("js/app.js").await.is_err());
  }
}
