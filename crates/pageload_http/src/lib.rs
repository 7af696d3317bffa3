use async_trait::async_trait;
use url::Url;

use pageload_core::fetch::FetchResponse;
use pageload_core::fetch::Fetcher;
use pageload_core::FetchError;

/// Fetches resources from a real origin. Relative URLs resolve against `base`, the way a page
/// resolves them against its own location.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
  client: reqwest::Client,
  base: Url,
}

impl HttpFetcher {
  pub fn new(base: Url) -> Self {
    Self::with_client(reqwest::Client::new(), base)
  }

  pub fn with_client(client: reqwest::Client, base: Url) -> Self {
    HttpFetcher { client, base }
  }

  pub fn resolve(&self, url: &str) -> Result<Url, FetchError> {
    self
      .base
      .join(url)
      .map_err(|error| FetchError::Network(format!("invalid url {url}: {error}")))
  }
}

#[async_trait]
impl Fetcher for HttpFetcher {
  async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
    let target = self.resolve(url)?;
    tracing::debug!(%target, "Fetching");

    let response = self
      .client
      .get(target)
      .send()
      .await
      .map_err(|error| FetchError::Network(error.to_string()))?;
    let status = response.status().as_u16();
    let text = response
      .text()
      .await
      .map_err(|error| FetchError::Network(error.to_string()))?;

    Ok(FetchResponse { status, text })
  }
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;
  use tokio::io::AsyncReadExt;
  use tokio::io::AsyncWriteExt;
  use tokio::net::TcpListener;

  use super::*;

  /// Serves `/site/js/app.js` and answers 404 for everything else
  async fn serve() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    tokio::spawn(async move {
      loop {
        let Ok((mut stream, _)) = listener.accept().await else {
          return;
        };
        tokio::spawn(async move {
          let mut buffer = vec![0; 4096];
          let read = stream.read(&mut buffer).await.unwrap();
          let request = String::from_utf8_lossy(&buffer[..read]);
          let path = request.split_whitespace().nth(1).unwrap_or("/");

          let (status, body) = match path {
            "/site/js/app.js" => ("200 OK", "var app;"),
            _ => ("404 Not Found", "missing"),
          };
          let response = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
          );
          stream.write_all(response.as_bytes()).await.unwrap();
        });
      }
    });

    Url::parse(&format!("http://{address}/site/")).unwrap()
  }

  fn fetcher(base: Url) -> HttpFetcher {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    HttpFetcher::with_client(client, base)
  }

  #[test]
  fn test_resolves_against_the_page_location() {
    let fetcher = fetcher(Url::parse("https://example.com/menu/index.html").unwrap());

    assert_eq!(
      fetcher.resolve("js/app.js").unwrap().as_str(),
      "https://example.com/menu/js/app.js"
    );
    assert_eq!(
      fetcher.resolve("/style.css").unwrap().as_str(),
      "https://example.com/style.css"
    );
  }

  #[tokio::test]
  async fn test_fetches_text_and_status() {
    let fetcher = fetcher(serve().await);

    assert_eq!(
      fetcher.fetch("js/app.js").await,
      Ok(FetchResponse::ok("var app;"))
    );

    let missing = fetcher.fetch("/style.css").await.unwrap();
    assert_eq!(missing.status, 404);
    assert_eq!(missing.into_text(), Err(FetchError::Status(404)));
  }

  #[tokio::test]
  async fn test_connection_failures_are_network_errors() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    let fetcher = fetcher(Url::parse(&format!("http://{address}/")).unwrap());

    assert!(matches!(
      fetcher.fetch("a.js").await,
      Err(FetchError::Network(_))
    ));
  }
}
