pub use self::{core::*, placement::*};

pub mod core;
pub mod placement;
