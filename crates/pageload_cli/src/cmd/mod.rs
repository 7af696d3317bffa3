pub mod resources;
pub mod simulate;
