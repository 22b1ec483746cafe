pub use self::{board::*, piece::*, skill::*};

pub(crate) mod board;
pub(crate) mod piece;
pub(crate) mod skill;
