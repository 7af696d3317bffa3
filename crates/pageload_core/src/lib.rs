pub mod blob;
pub mod document;
pub mod error;
pub mod fetch;
pub mod types;

pub use error::*;
