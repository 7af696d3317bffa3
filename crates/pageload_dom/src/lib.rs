//! In-memory host for the pageload asset loader.
//!
//! [`InMemoryDocument`] models the parts of a browser page the loader relies on: element
//! insertion, `rel` swaps on links, load/error events, ordered execution of `async=false`
//! scripts and object-URL scripts. Network traffic goes through [`InMemoryNetwork`], which
//! records every request so tests can assert on deduplication.
pub use blob_registry::*;
pub use document::*;
pub use host::*;
pub use network::*;

mod blob_registry;
mod document;
mod host;
pub mod html;
mod network;
