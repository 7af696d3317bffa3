use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use parking_lot::RwLock;

use pageload_core::fetch::FetchResponse;
use pageload_core::fetch::Fetcher;
use pageload_core::FetchError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
  pub status: u16,
  pub body: String,
  pub latency: Duration,
  /// Fail at the transport level instead of responding
  pub unreachable: bool,
}

impl Route {
  pub fn ok(body: impl Into<String>) -> Self {
    Route {
      status: 200,
      body: body.into(),
      latency: Duration::ZERO,
      unreachable: false,
    }
  }

  pub fn status(status: u16) -> Self {
    Route {
      status,
      body: String::new(),
      latency: Duration::ZERO,
      unreachable: false,
    }
  }

  pub fn unreachable() -> Self {
    Route {
      unreachable: true,
      ..Route::status(0)
    }
  }

  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }
}

/// In memory origin serving fixed routes, for testing purposes.
///
/// Unknown URLs respond with 404. Every request is recorded, whether it came from `fetch` or
/// from an element inserted into an `InMemoryDocument`.
#[derive(Debug, Default)]
pub struct InMemoryNetwork {
  routes: RwLock<HashMap<String, Route>>,
  requests: Mutex<Vec<String>>,
}

impl InMemoryNetwork {
  pub fn serve(&self, url: &str, body: impl Into<String>) {
    self.set_route(url, Route::ok(body));
  }

  pub fn serve_with_latency(&self, url: &str, body: impl Into<String>, latency: Duration) {
    self.set_route(url, Route::ok(body).with_latency(latency));
  }

  pub fn set_route(&self, url: &str, route: Route) {
    self.routes.write().insert(url.to_string(), route);
  }

  pub fn set_latency(&self, url: &str, latency: Duration) {
    if let Some(route) = self.routes.write().get_mut(url) {
      route.latency = latency;
    }
  }

  pub fn requests(&self) -> Vec<String> {
    self.requests.lock().clone()
  }

  pub fn request_count(&self, url: &str) -> usize {
    self
      .requests
      .lock()
      .iter()
      .filter(|requested| requested.as_str() == url)
      .count()
  }

  pub async fn request(&self, url: &str) -> Result<FetchResponse, FetchError> {
    self.requests.lock().push(url.to_string());
    let route = self.routes.read().get(url).cloned();
    let Some(route) = route else {
      tracing::trace!(url, "No route");
      return Ok(FetchResponse {
        status: 404,
        text: String::from("Not Found"),
      });
    };

    if !route.latency.is_zero() {
      tokio::time::sleep(route.latency).await;
    }

    if route.unreachable {
      return Err(FetchError::Network(format!("{url} is unreachable")));
    }

    Ok(FetchResponse {
      status: route.status,
      text: route.body,
    })
  }
}

#[async_trait]
impl Fetcher for InMemoryNetwork {
  async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
    self.request(url).await
  }
}
