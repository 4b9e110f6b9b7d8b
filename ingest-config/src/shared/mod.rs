mod base;
mod case;
mod retry;

pub use base::*;
pub use case::*;
pub use retry::*;
