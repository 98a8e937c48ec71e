pub use error::*;
pub use merge::*;
pub use minefield::*;
pub use types::*;

mod error;
mod merge;
mod minefield;
mod types;
