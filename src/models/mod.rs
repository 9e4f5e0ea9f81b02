pub mod artifact;
pub mod enums;

pub use artifact::*;
pub use enums::*;
