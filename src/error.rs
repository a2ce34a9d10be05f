use crate::cell::Xstr;

use std::fmt;

#[derive(PartialEq, Clone)]
pub enum Xerr {
    UnknownWord(Xstr),
    InputIncomplete,
    InvalidNumber,
    ExpectingName,
    StackUnderflow,
    ControlStackUnderflow,
    TypeError,
    DivisionByZero,
    ControlFlowError,
    CompileOnlyWord,
    NestedDefinition,
    NotCompiling,
    OutOfBounds { name: Xstr, size: usize, offset: usize },
    BadArrayLength,
    ForgetNotFound(Xstr),
    CantForgetPrimitive(Xstr),
    IOError { filename: Xstr, reason: Xstr },
    InternalError,
    // Stop interpreter execution
    Exit(isize),
}

impl fmt::Debug for Xerr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Xerr::UnknownWord(s) => write!(f, "{} ?", s),
            Xerr::InputIncomplete => f.write_str("unexpected end of input"),
            Xerr::InvalidNumber => f.write_str("InvalidNumber"),
            Xerr::ExpectingName => f.write_str("expecting name"),
            Xerr::StackUnderflow => f.write_str("StackUnderflow"),
            Xerr::ControlStackUnderflow => f.write_str("ControlStackUnderflow"),
            Xerr::TypeError => f.write_str("TypeError"),
            Xerr::DivisionByZero => f.write_str("division by zero"),
            Xerr::ControlFlowError => f.write_str("ControlFlowError"),
            Xerr::CompileOnlyWord => f.write_str("word is only valid inside a definition"),
            Xerr::NestedDefinition => f.write_str("definition already in progress"),
            Xerr::NotCompiling => f.write_str("no definition in progress"),
            Xerr::OutOfBounds { name, size, offset } => {
                write!(f, "'{}' size: {} index: {}", name, size, offset)
            }
            Xerr::BadArrayLength => f.write_str("array size must be at least 1"),
            Xerr::ForgetNotFound(s) => write!(f, "didn't find word \"{}\" to forget", s),
            Xerr::CantForgetPrimitive(s) => write!(f, "cannot forget primitive {}", s),
            Xerr::IOError { filename, reason } => write!(f, "{}: {}", filename, reason),
            Xerr::InternalError => f.write_str("InternalError"),
            Xerr::Exit(code) => write!(f, "Exit({})", code),
        }
    }
}

pub type Xresult = Xresult1<()>;

pub type Xresult1<T> = Result<T, Xerr>;

pub const OK: Xresult = Ok(());
