pub mod arith;
pub mod cell;
pub mod compiler;
pub mod dict;
pub mod error;
pub mod lex;
pub mod stack;
pub mod state;
pub mod storage;
pub mod word;
#[cfg(feature = "stdio")]
pub mod repl;

pub mod prelude {
    pub type Xstate = crate::state::State;
    pub type Xcell = crate::cell::Cell;
    pub use crate::error::{Xerr, Xresult, Xresult1};
}
