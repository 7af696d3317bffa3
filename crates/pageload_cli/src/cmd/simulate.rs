use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use url::Url;

use pageload::create_loader;
use pageload_bootstrap::Bootstrap;
use pageload_bootstrap::BootstrapConfig;
use pageload_core::types::HostCapabilities;
use pageload_dom::ContentPolicy;
use pageload_dom::InMemoryHost;
use pageload_dom::InMemoryNetwork;
use pageload_http::HttpFetcher;

use crate::report::SimulationReport;
use crate::site;

#[derive(Debug, Parser)]
pub struct SimulateCommand {
  /// HTML page to seed the document with [default: <root>/index.html]
  #[arg(long)]
  pub html: Option<PathBuf>,
  /// Bootstrap config as JSON. Missing keys keep their defaults
  #[arg(long, env = "PAGELOAD_CONFIG")]
  pub config: Option<PathBuf>,
  /// Directory served as the page's origin
  #[arg(long, default_value = ".")]
  pub root: PathBuf,
  /// Snapshot the referenced resources from a live origin instead of serving `root`
  #[arg(long)]
  pub origin: Option<Url>,
  /// Delay responses for one URL, as `url=ms`. May be repeated
  #[arg(long = "latency", value_parser = parse_latency)]
  pub latencies: Vec<(String, Duration)>,
  /// Refuse to execute scripts from object URLs, as a strict content security policy does
  #[arg(long)]
  pub block_dynamic_execution: bool,
  /// Host without a fetch API
  #[arg(long)]
  pub no_fetch: bool,
  /// Host that cannot query existing elements
  #[arg(long)]
  pub no_element_queries: bool,
  /// Host that only reports completion through element callbacks
  #[arg(long)]
  pub callback_host: bool,
  /// Run scripts before the parser has reached the body
  #[arg(long)]
  pub no_body: bool,
}

fn parse_latency(value: &str) -> Result<(String, Duration), String> {
  let (url, millis) = value
    .rsplit_once('=')
    .ok_or_else(|| format!("expected <url>=<ms>, got {value}"))?;
  let millis = millis
    .parse::<u64>()
    .map_err(|error| format!("invalid latency {millis}: {error}"))?;
  Ok((url.to_string(), Duration::from_millis(millis)))
}

impl SimulateCommand {
  fn capabilities(&self) -> HostCapabilities {
    HostCapabilities {
      fetch: !self.no_fetch,
      element_queries: !self.no_element_queries,
      async_completion: !self.callback_host,
      ..Default::default()
    }
  }

  fn read_config(&self) -> anyhow::Result<BootstrapConfig> {
    let Some(path) = &self.config else {
      return Ok(BootstrapConfig::default());
    };
    let source =
      fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    BootstrapConfig::from_json(&source)
      .with_context(|| format!("Invalid bootstrap config {}", path.display()))
  }
}

pub async fn main(cmd: SimulateCommand) -> anyhow::Result<()> {
  let report = simulate(&cmd).await?;
  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(())
}

pub async fn simulate(cmd: &SimulateCommand) -> anyhow::Result<SimulationReport> {
  let html_path = cmd
    .html
    .clone()
    .unwrap_or_else(|| cmd.root.join("index.html"));
  let html = fs::read_to_string(&html_path)
    .with_context(|| format!("Failed to read {}", html_path.display()))?;
  let config = cmd.read_config()?;

  let network = Arc::new(InMemoryNetwork::default());
  match &cmd.origin {
    Some(origin) => {
      let fetcher = HttpFetcher::new(origin.clone());
      let urls = site::referenced_urls(&html, &config)?;
      site::snapshot_origin(&network, &fetcher, &urls).await;
    }
    None => {
      site::serve_directory(&network, &cmd.root)?;
    }
  }
  for (url, latency) in &cmd.latencies {
    network.set_latency(url, *latency);
  }

  let capabilities = cmd.capabilities();
  let host = InMemoryHost::from_html(&html, network)?.with_capabilities(capabilities);
  if cmd.block_dynamic_execution {
    host.document.set_policy(ContentPolicy {
      allow_object_url_scripts: false,
    });
  }
  if cmd.no_body {
    host.document.remove_body();
  }

  let loader = create_loader(
    host.document_ref(),
    host.fetcher_ref(),
    host.blobs_ref(),
    capabilities,
  );
  let bootstrap = Bootstrap::new(config, host.document_ref()).with_loader(loader);
  tracing::info!(html = %html_path.display(), "Simulating page bootstrap");
  let report = bootstrap.run_to_completion().await;

  Ok(SimulationReport::new(report, &host))
}

#[cfg(test)]
mod test {
  use std::path::Path;

  use pageload_bootstrap::ScriptPath;
  use pretty_assertions::assert_eq;

  use super::*;

  const PAGE: &str = r#"<!doctype html>
<html>
  <head>
    <link id="css-main-preload" rel="preload" as="style" href="/style.css">
    <link id="css-responsive-preload" rel="preload" as="style" href="/response.css">
  </head>
  <body><div id="menu"></div></body>
</html>"#;

  fn site() -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("index.html"), PAGE).unwrap();
    fs::write(root.path().join("style.css"), "body {}").unwrap();
    fs::write(root.path().join("response.css"), "@media {}").unwrap();
    fs::create_dir_all(root.path().join("js")).unwrap();
    for name in ["library", "reviews", "menu-data", "menu", "app"] {
      fs::write(root.path().join(format!("js/{name}.js")), "").unwrap();
    }
    root
  }

  fn command(root: &Path, args: &[&str]) -> SimulateCommand {
    let root = root.to_string_lossy();
    let mut argv = vec!["simulate", "--root", root.as_ref()];
    argv.extend_from_slice(args);
    SimulateCommand::parse_from(argv)
  }

  #[test]
  fn test_parse_latency() {
    assert_eq!(
      parse_latency("js/app.js=250"),
      Ok((String::from("js/app.js"), Duration::from_millis(250)))
    );
    assert!(parse_latency("js/app.js").is_err());
    assert!(parse_latency("js/app.js=soon").is_err());
  }

  #[tokio::test]
  async fn test_simulates_the_default_bootstrap() {
    let root = site();
    let cmd = command(root.path(), &["--latency", "js/library.js=200"]);

    let report = simulate(&cmd).await.unwrap();

    assert_eq!(report.bootstrap.scripts, ScriptPath::Ordered);
    assert_eq!(
      report.document.executed_scripts,
      vec![
        "js/library.js",
        "js/reviews.js",
        "js/menu-data.js",
        "js/menu.js",
        "js/app.js"
      ]
    );
    assert_eq!(report.requests.get("/style.css"), Some(&1));
    assert_eq!(report.blobs.created, report.blobs.revoked);
  }

  #[tokio::test]
  async fn test_missing_script_is_reported() {
    let root = site();
    fs::remove_file(root.path().join("js/menu.js")).unwrap();
    let cmd = command(root.path(), &[]);

    let report = simulate(&cmd).await.unwrap();

    assert_eq!(report.bootstrap.scripts, ScriptPath::Failed);
    assert_eq!(
      report.document.executed_scripts,
      vec!["js/library.js", "js/reviews.js", "js/menu-data.js"]
    );
    assert_eq!(report.blobs.created, 0);
  }

  #[tokio::test]
  async fn test_hosts_without_element_queries_append_directly() {
    let root = site();
    let cmd = command(
      root.path(),
      &["--no-element-queries", "--block-dynamic-execution"],
    );

    let report = simulate(&cmd).await.unwrap();

    assert_eq!(report.bootstrap.scripts, ScriptPath::Ordered);
    assert_eq!(report.document.executed_scripts.len(), 5);
  }

  #[test]
  fn test_missing_html_is_an_error() {
    let root = tempfile::tempdir().unwrap();
    let cmd = command(root.path(), &[]);

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let error = runtime.block_on(simulate(&cmd)).unwrap_err();
    assert!(error.to_string().starts_with("Failed to read"));
  }
}
