//! Seeds an [`InMemoryDocument`] from an HTML page, so that the loader sees the same preload
//! links and scripts a browser would have parsed before any loader code runs.
use std::io::BufReader;

use anyhow::Error;
use html5ever::tendril::TendrilSink;
use html5ever::ParseOpts;
use markup5ever::{expanded_name, local_name, namespace_url, ns, Attribute, ExpandedName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use pageload_core::document::Document;
use pageload_core::document::InsertionPoint;
use pageload_core::document::Tag;

use crate::InMemoryDocument;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedElement {
  pub tag: Tag,
  pub attributes: Vec<(String, String)>,
  pub parent: InsertionPoint,
}

pub fn parse_html(bytes: &[u8]) -> Result<RcDom, Error> {
  let mut bytes = BufReader::new(bytes);
  let options = ParseOpts::default();
  let dom = RcDom::default();
  let dom = html5ever::parse_document(dom, options)
    .from_utf8()
    .read_from(&mut bytes)?;
  Ok(dom)
}

struct Attrs<'a> {
  attributes: &'a [Attribute],
}

impl<'a> Attrs<'a> {
  fn new(attributes: &'a [Attribute]) -> Self {
    Self { attributes }
  }

  fn get(&self, name: ExpandedName) -> Option<String> {
    self
      .attributes
      .iter()
      .find(|attr| attr.name.expanded() == name)
      .map(|attr| attr.value.to_string())
  }

  fn pairs(&self) -> Vec<(String, String)> {
    self
      .attributes
      .iter()
      .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
      .collect()
  }
}

trait DomVisitor {
  fn visit_node(&mut self, node: &Handle, parent: InsertionPoint) -> InsertionPoint;
}

/// Visits nodes in document order. The visitor decides which insertion point the node's
/// children belong to.
fn walk(node: Handle, parent: InsertionPoint, visitor: &mut impl DomVisitor) {
  let children_parent = visitor.visit_node(&node, parent);
  let children = node.children.borrow();
  for child in children.iter() {
    walk(child.clone(), children_parent, visitor);
  }
}

#[derive(Default)]
struct CollectElements {
  elements: Vec<ParsedElement>,
}

impl DomVisitor for CollectElements {
  fn visit_node(&mut self, node: &Handle, parent: InsertionPoint) -> InsertionPoint {
    let NodeData::Element { name, attrs, .. } = &node.data else {
      return parent;
    };

    let attrs = attrs.borrow();
    let attrs = Attrs::new(&attrs);
    let tag = match name.expanded() {
      expanded_name!(html "head") => return InsertionPoint::Head,
      expanded_name!(html "body") => return InsertionPoint::Body,
      expanded_name!(html "link") => Tag::Link,
      expanded_name!(html "script") => Tag::Script,
      _ if attrs.get(expanded_name!("", "id")).is_some() => Tag::Other(name.local.to_string()),
      _ => return parent,
    };

    self.elements.push(ParsedElement {
      tag,
      attributes: attrs.pairs(),
      parent,
    });
    parent
  }
}

/// Links, scripts and any element carrying an `id`, in document order
pub fn parse_elements(html: &str) -> Result<Vec<ParsedElement>, Error> {
  let dom = parse_html(html.as_bytes())?;
  let mut visitor = CollectElements::default();
  walk(dom.document.clone(), InsertionPoint::Head, &mut visitor);
  Ok(visitor.elements)
}

pub fn seed_document(document: &InMemoryDocument, html: &str) -> Result<(), Error> {
  for parsed in parse_elements(html)? {
    let element = document.create_element(parsed.tag);
    for (name, value) in parsed.attributes {
      document.set_attribute(element, &name, &value)?;
    }
    document.append(parsed.parent, element)?;
  }
  tracing::debug!("Seeded document from HTML");
  Ok(())
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use pageload_core::document::completion;
  use pageload_core::document::ElementEvent;
  use pageload_core::document::Selector;
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::InMemoryBlobRegistry;
  use crate::InMemoryNetwork;

  const PAGE: &str = r#"
<html>
  <head>
    <link id="css-main-preload" rel="preload" as="style" href="/style.css">
    <link rel="icon" href="/favicon.ico">
  </head>
  <body>
    <div id="menu"></div>
    <p>Hello</p>
    <script src="js/app.js"></script>
  </body>
</html>
  "#;

  fn pairs(values: &[(&str, &str)]) -> Vec<(String, String)> {
    values
      .iter()
      .map(|(name, value)| (name.to_string(), value.to_string()))
      .collect()
  }

  #[test]
  fn test_parse_elements_in_document_order() {
    let elements = parse_elements(PAGE).unwrap();

    assert_eq!(
      elements,
      vec![
        ParsedElement {
          tag: Tag::Link,
          attributes: pairs(&[
            ("id", "css-main-preload"),
            ("rel", "preload"),
            ("as", "style"),
            ("href", "/style.css"),
          ]),
          parent: InsertionPoint::Head,
        },
        ParsedElement {
          tag: Tag::Link,
          attributes: pairs(&[("rel", "icon"), ("href", "/favicon.ico")]),
          parent: InsertionPoint::Head,
        },
        ParsedElement {
          tag: Tag::Other(String::from("div")),
          attributes: pairs(&[("id", "menu")]),
          parent: InsertionPoint::Body,
        },
        ParsedElement {
          tag: Tag::Script,
          attributes: pairs(&[("src", "js/app.js")]),
          parent: InsertionPoint::Body,
        },
      ]
    );
  }

  #[tokio::test]
  async fn test_seeded_preloads_start_loading() {
    let network = Arc::new(InMemoryNetwork::default());
    network.serve("/style.css", "body {}");
    network.serve("js/app.js", "");
    let document = InMemoryDocument::new(network.clone(), Arc::new(InMemoryBlobRegistry::default()));

    seed_document(&document, PAGE).unwrap();

    let preload = document
      .query(&Selector::Id(String::from("css-main-preload")))
      .unwrap();
    assert_eq!(
      completion(&document, preload).await,
      Some(ElementEvent::Load)
    );
    assert!(!document.has_stylesheet(preload));
    assert_eq!(network.request_count("/style.css"), 1);
    assert_eq!(network.request_count("/favicon.ico"), 0);
  }
}
