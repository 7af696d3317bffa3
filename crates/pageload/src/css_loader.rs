use pageload_core::document::ElementId;
use pageload_core::document::InsertionPoint;
use pageload_core::document::Tag;
use pageload_core::types::CssOptions;
use pageload_core::types::Resource;
use pageload_core::types::ResourceKind;
use pageload_core::LoaderError;
use pageload_core::LoaderResult;

use crate::LoaderContext;
use crate::PreloadLink;
use crate::SwapOutcome;

enum CssWait {
  /// Settles once the element fires load or error
  Element(ElementId),
  /// A preload we inserted, to be swapped after it loads
  Preload(PreloadLink),
}

/// Loads a stylesheet, reusing any link already in the document for the same URL.
///
/// Resolves only once the URL is an active stylesheet.
pub async fn load_css(
  ctx: &LoaderContext,
  href: &str,
  options: &CssOptions,
) -> LoaderResult<Resource> {
  if href.is_empty() {
    return Err(LoaderError::MissingArgument {
      operation: "load_css",
      argument: "href",
    });
  }

  let wait = {
    let _reservation = ctx.reserve();
    let document = ctx.document.as_ref();

    match ctx.locator().locate(ResourceKind::Css, href) {
      Some(existing) if existing.is_parsed_stylesheet() => {
        tracing::debug!(href, element = %existing.element, "Stylesheet already applied");
        return Ok(css_resource(existing.element, href));
      }
      Some(existing) if existing.is_style_preload() => {
        let mut link = PreloadLink::observe(document, existing.element);
        match link.swap(document)? {
          SwapOutcome::Replaced(replacement) => CssWait::Element(replacement),
          SwapOutcome::Swapped | SwapOutcome::NothingToSwap => CssWait::Element(existing.element),
        }
      }
      Some(existing) => CssWait::Element(existing.element),
      None if options.preload => CssWait::Preload(PreloadLink::insert(document, href)?),
      None => {
        let element = document.create_element(Tag::Link);
        document.set_attribute(element, "rel", "stylesheet")?;
        document.set_attribute(element, "href", href)?;
        document.append(InsertionPoint::Head, element)?;
        CssWait::Element(element)
      }
    }
  };

  match wait {
    CssWait::Element(element) => ctx.settle(element, ResourceKind::Css, href).await,
    CssWait::Preload(mut link) => {
      let Some(preload) = link.element() else {
        return Err(LoaderError::load(ResourceKind::Css, href));
      };
      ctx.settle(preload, ResourceKind::Css, href).await?;

      let outcome = {
        let _reservation = ctx.reserve();
        link.swap(ctx.document.as_ref())?
      };
      match outcome {
        SwapOutcome::Replaced(replacement) => {
          ctx.settle(replacement, ResourceKind::Css, href).await
        }
        SwapOutcome::Swapped | SwapOutcome::NothingToSwap => Ok(css_resource(preload, href)),
      }
    }
  }
}

fn css_resource(element: ElementId, href: &str) -> Resource {
  Resource {
    element,
    url: href.to_string(),
    kind: ResourceKind::Css,
  }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;
  use std::time::Duration;

  use pageload_core::document::completion;
  use pageload_core::document::Document;
  use pageload_core::document::ElementEvent;
  use pageload_core::document::LoadState;
  use pageload_core::document::Selector;
  use pageload_dom::InMemoryHost;
  use pageload_dom::InMemoryNetwork;
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::test_utils::context;

  fn link_selector(href: &str) -> Selector {
    Selector::Link {
      href: href.to_string(),
      rel: None,
    }
  }

  #[tokio::test]
  async fn test_rejects_empty_href() {
    let host = InMemoryHost::default();
    let ctx = context(&host);

    assert_eq!(
      load_css(&ctx, "", &CssOptions::default()).await,
      Err(LoaderError::MissingArgument {
        operation: "load_css",
        argument: "href"
      })
    );
  }

  #[tokio::test]
  async fn test_preloads_then_swaps_to_stylesheet() {
    let host = InMemoryHost::default();
    host.network.serve("/style.css", "body {}");
    let ctx = context(&host);

    let resource = load_css(&ctx, "/style.css", &CssOptions::default())
      .await
      .unwrap();

    assert_eq!(resource.url, "/style.css");
    assert_eq!(resource.kind, ResourceKind::Css);
    assert_eq!(
      host.document.get_attribute(resource.element, "rel"),
      Some(String::from("stylesheet"))
    );
    assert!(host.document.has_stylesheet(resource.element));
    assert_eq!(host.network.request_count("/style.css"), 1);
  }

  #[tokio::test]
  async fn test_without_preload_inserts_a_stylesheet_link() {
    let host = InMemoryHost::default();
    host.network.serve("/style.css", "");
    let ctx = context(&host);

    let resource = load_css(&ctx, "/style.css", &CssOptions { preload: false })
      .await
      .unwrap();

    assert!(host.document.has_stylesheet(resource.element));
    assert_eq!(host.document.get_attribute(resource.element, "as"), None);
  }

  #[tokio::test]
  async fn test_failed_stylesheet_rejects_with_url() {
    let host = InMemoryHost::default();
    let ctx = context(&host);

    let error = load_css(&ctx, "/missing.css", &CssOptions::default())
      .await
      .unwrap_err();

    assert_eq!(error.to_string(), "Failed to load CSS: /missing.css");
  }

  #[tokio::test]
  async fn test_applied_stylesheet_resolves_without_a_request() {
    let host = InMemoryHost::default();
    host.network.serve("/style.css", "");
    let ctx = context(&host);
    let first = load_css(&ctx, "/style.css", &CssOptions { preload: false })
      .await
      .unwrap();

    let second = load_css(&ctx, "/style.css", &CssOptions::default())
      .await
      .unwrap();

    assert_eq!(first, second);
    assert_eq!(host.network.request_count("/style.css"), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_swaps_a_preload_parsed_from_the_page() {
    let network = Arc::new(InMemoryNetwork::default());
    network.serve_with_latency("/style.css", "", Duration::from_millis(50));
    let host = InMemoryHost::from_html(
      r#"<head><link rel="preload" as="style" href="/style.css"></head>"#,
      network.clone(),
    )
    .unwrap();
    let ctx = context(&host);
    let preload = host.document.query(&link_selector("/style.css")).unwrap();

    let resource = load_css(&ctx, "/style.css", &CssOptions::default())
      .await
      .unwrap();

    assert_eq!(resource.element, preload);
    assert!(host.document.has_stylesheet(preload));
    assert_eq!(host.document.query_all(&link_selector("/style.css")).len(), 1);
    assert_eq!(network.request_count("/style.css"), 1);
  }

  #[tokio::test]
  async fn test_swaps_a_preload_that_already_loaded() {
    let network = Arc::new(InMemoryNetwork::default());
    network.serve("/style.css", "body {}");
    let host = InMemoryHost::from_html(
      r#"<head><link rel="preload" as="style" href="/style.css"></head>"#,
      network.clone(),
    )
    .unwrap();
    let preload = host.document.query(&link_selector("/style.css")).unwrap();
    assert_eq!(
      completion(&host.document, preload).await,
      Some(ElementEvent::Load)
    );
    assert!(!host.document.has_stylesheet(preload));
    let ctx = context(&host);

    let resource = load_css(&ctx, "/style.css", &CssOptions::default())
      .await
      .unwrap();

    assert_eq!(resource.element, preload);
    assert_eq!(
      host.document.get_attribute(preload, "rel"),
      Some(String::from("stylesheet"))
    );
    assert!(host.document.has_stylesheet(preload));
    assert_eq!(host.document.query_all(&link_selector("/style.css")).len(), 1);
    assert_eq!(network.request_count("/style.css"), 1);
  }

  #[tokio::test]
  async fn test_read_only_preload_falls_back_to_a_new_stylesheet() {
    let network = Arc::new(InMemoryNetwork::default());
    network.serve("/style.css", "");
    let host = InMemoryHost::from_html(
      r#"<head><link id="css-main-preload" rel="preload" as="style" href="/style.css"></head>"#,
      network,
    )
    .unwrap();
    let preload = host
      .document
      .query(&Selector::Id(String::from("css-main-preload")))
      .unwrap();
    host.document.lock_attribute(preload, "rel");
    let ctx = context(&host);

    let resource = load_css(&ctx, "/style.css", &CssOptions::default())
      .await
      .unwrap();

    assert_ne!(resource.element, preload);
    assert_eq!(host.document.load_state(resource.element), LoadState::Loaded);
    assert!(host.document.has_stylesheet(resource.element));
  }

  #[tokio::test(start_paused = true)]
  async fn test_concurrent_loads_share_one_link() {
    let host = InMemoryHost::default();
    host
      .network
      .serve_with_latency("/style.css", "", Duration::from_millis(30));
    let ctx = context(&host);

    let options = CssOptions::default();
    let (a, b) = tokio::join!(
      load_css(&ctx, "/style.css", &options),
      load_css(&ctx, "/style.css", &options),
    );

    assert_eq!(a.unwrap().element, b.unwrap().element);
    assert_eq!(host.document.query_all(&link_selector("/style.css")).len(), 1);
    assert_eq!(host.network.request_count("/style.css"), 1);
  }
}
