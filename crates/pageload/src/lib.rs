//! Promise-style asset loading for a page.
//!
//! Stylesheets go through a preload link that is swapped to an active stylesheet once loaded.
//! Scripts are fetched in parallel and executed one at a time in the order given, falling back
//! to slower strategies through a [`Cascade`] when the host blocks the faster ones.
pub use callback_loader::*;
pub use cascade::*;
pub use context::*;
pub use css_loader::*;
pub use loader::*;
pub use locator::*;
pub use pipeline::*;
pub use preload_swap::*;
pub use raw_append::*;
pub use script_loader::*;
pub use wait_for::*;

pub use pageload_core::types;
pub use pageload_core::LoaderError;
pub use pageload_core::LoaderResult;

mod blob_handle;
mod callback_loader;
mod cascade;
mod context;
mod css_loader;
mod loader;
mod locator;
mod pipeline;
mod preload_swap;
mod raw_append;
mod script_loader;
#[cfg(test)]
mod test_utils;
mod wait_for;
