use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use pageload_bootstrap::BootstrapConfig;

use crate::site::referenced_urls;

#[derive(Debug, Parser)]
pub struct ResourcesCommand {
  /// HTML page to scan
  pub html: PathBuf,
  /// Bootstrap config as JSON. Missing keys keep their defaults
  #[arg(long, env = "PAGELOAD_CONFIG")]
  pub config: Option<PathBuf>,
}

pub fn main(cmd: ResourcesCommand) -> anyhow::Result<()> {
  let html = fs::read_to_string(&cmd.html)
    .with_context(|| format!("Failed to read {}", cmd.html.display()))?;
  let config = match &cmd.config {
    Some(path) => BootstrapConfig::from_json(&fs::read_to_string(path)?)?,
    None => BootstrapConfig::default(),
  };

  for url in referenced_urls(&html, &config)? {
    println!("{url}");
  }
  Ok(())
}
