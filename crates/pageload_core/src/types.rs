pub use self::capabilities::*;
pub use self::entry::*;
pub use self::resource::*;
pub use self::script_entry::*;

mod capabilities;
mod entry;
mod resource;
mod script_entry;
