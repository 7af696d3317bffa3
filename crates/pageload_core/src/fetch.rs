use std::sync::Arc;

use async_trait::async_trait;

use crate::FetchError;

pub type FetcherRef = Arc<dyn Fetcher + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResponse {
  pub status: u16,
  pub text: String,
}

impl FetchResponse {
  pub fn ok(text: impl Into<String>) -> Self {
    FetchResponse {
      status: 200,
      text: text.into(),
    }
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Body text of a 2xx response
  pub fn into_text(self) -> Result<String, FetchError> {
    if self.is_success() {
      Ok(self.text)
    } else {
      Err(FetchError::Status(self.status))
    }
  }
}

/// Retrieves resource text without touching the document
///
/// Non-2xx responses are returned as `Ok`; only transport failures are errors.
#[mockall::automock]
#[async_trait]
pub trait Fetcher: std::fmt::Debug {
  async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;
}
