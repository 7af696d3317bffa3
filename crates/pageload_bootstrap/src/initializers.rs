use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;

use serde::Serialize;

type Initializer = Box<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Page setup functions to call once scripts have executed
#[derive(Default)]
pub struct Initializers {
  entries: Vec<(String, Initializer)>,
}

impl std::fmt::Debug for Initializers {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_list()
      .entries(self.entries.iter().map(|(name, _)| name))
      .finish()
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializerOutcome {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl Initializers {
  pub fn register(
    &mut self,
    name: impl Into<String>,
    initializer: impl Fn() -> anyhow::Result<()> + Send + Sync + 'static,
  ) -> &mut Self {
    self.entries.push((name.into(), Box::new(initializer)));
    self
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Runs every initializer in registration order. A failing or panicking initializer is
  /// logged and the rest still run.
  pub fn run_all(&self) -> Vec<InitializerOutcome> {
    self
      .entries
      .iter()
      .map(|(name, initializer)| {
        let error = match catch_unwind(AssertUnwindSafe(initializer)) {
          Ok(Ok(())) => None,
          Ok(Err(error)) => Some(format!("{error:#}")),
          Err(panic) => Some(panic_message(panic.as_ref())),
        };
        if let Some(error) = &error {
          tracing::warn!(initializer = %name, %error, "Initializer failed");
        }

        InitializerOutcome {
          name: name.clone(),
          error,
        }
      })
      .collect()
  }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
  if let Some(message) = panic.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = panic.downcast_ref::<String>() {
    message.clone()
  } else {
    String::from("initializer panicked")
  }
}
