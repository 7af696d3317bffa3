#![deny(unused_crate_dependencies)]

mod cmd;
mod report;
mod site;

use clap::Parser;
use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum PageloadCommandType {
  /// Bootstrap a page against an in-memory browser and print what happened
  Simulate(cmd::simulate::SimulateCommand),
  /// List the stylesheets and scripts a page and config reference
  Resources(cmd::resources::ResourcesCommand),
}

#[derive(Parser, Debug)]
#[command(name = "pageload", version)]
pub struct PageloadCommand {
  #[clap(subcommand)]
  pub command: PageloadCommandType,
  /// [possible values: "stderr", "file"]
  #[arg(env = "PAGELOAD_TRACING_MODE")]
  pub _tracing_mode: Option<String>,
  /// [possible values: "error", "warn", "info", "debug", "trace"]
  #[arg(env = "RUST_LOG")]
  pub _rust_log: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  pageload_monitoring::initialize_from_env()?;

  let args = PageloadCommand::parse();
  let result = match args.command {
    PageloadCommandType::Simulate(cmd) => cmd::simulate::main(cmd).await,
    PageloadCommandType::Resources(cmd) => cmd::resources::main(cmd),
  };

  pageload_monitoring::close_monitoring();
  result
}
