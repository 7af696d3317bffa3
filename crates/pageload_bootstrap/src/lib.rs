pub use bootstrap::*;
pub use config::*;
pub use initializers::*;
pub use swap::*;

mod bootstrap;
mod config;
mod initializers;
mod swap;
