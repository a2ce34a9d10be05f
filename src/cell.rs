use crate::error::{Xerr, Xresult1};
use crate::word::Word;

use std::fmt;
use std::rc::Rc;

pub type Xstr = arcstr::ArcStr;
pub type Xint = i64;
pub type Xword = Rc<Word>;
pub type Xbody = rpds::Vector<Xword>;

#[derive(Clone)]
pub enum Cell {
    Int(Xint),
    Str(Xstr),
    Word(Xword),
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(n) => write!(f, "{}", n),
            Cell::Str(s) => write!(f, "{:?}", s.as_str()),
            Cell::Word(w) => write!(f, "word:{}", w.name()),
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Int(a), Cell::Int(b)) => a == b,
            (Cell::Str(a), Cell::Str(b)) => a == b,
            (Cell::Word(a), Cell::Word(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl Cell {
    pub fn to_int(&self) -> Xresult1<Xint> {
        match self {
            Cell::Int(i) => Ok(*i),
            _ => Err(Xerr::TypeError),
        }
    }

    pub fn to_flag(&self) -> Xresult1<bool> {
        self.to_int().map(|i| i != 0)
    }

    pub fn to_xstr(&self) -> Xresult1<Xstr> {
        match self {
            Cell::Str(s) => Ok(s.clone()),
            _ => Err(Xerr::TypeError),
        }
    }

    pub fn to_word(&self) -> Xresult1<Xword> {
        match self {
            Cell::Word(w) => Ok(w.clone()),
            _ => Err(Xerr::TypeError),
        }
    }

    /// Render the value the way `.` prints it.
    pub fn format_in_base(&self, base: u32) -> String {
        match self {
            Cell::Int(n) => format_int(*n, base),
            Cell::Str(s) => s.to_string(),
            Cell::Word(w) => w.name().to_string(),
        }
    }
}

fn format_int(n: Xint, base: u32) -> String {
    match base {
        2 if n < 0 => format!("-{:b}", n.unsigned_abs()),
        2 => format!("{:b}", n),
        16 if n < 0 => format!("-{:X}", n.unsigned_abs()),
        16 => format!("{:X}", n),
        _ => format!("{}", n),
    }
}

impl From<Xint> for Cell {
    fn from(x: Xint) -> Self {
        Cell::Int(x)
    }
}

impl From<i32> for Cell {
    fn from(x: i32) -> Self {
        Cell::Int(x as Xint)
    }
}

impl From<usize> for Cell {
    fn from(x: usize) -> Self {
        Cell::Int(x as Xint)
    }
}

impl From<isize> for Cell {
    fn from(x: isize) -> Self {
        Cell::Int(x as Xint)
    }
}

impl From<bool> for Cell {
    fn from(x: bool) -> Self {
        if x {
            TRUE
        } else {
            FALSE
        }
    }
}

impl From<&str> for Cell {
    fn from(x: &str) -> Self {
        Cell::Str(Xstr::from(x))
    }
}

impl From<String> for Cell {
    fn from(x: String) -> Self {
        Cell::Str(Xstr::from(x))
    }
}

impl From<Xstr> for Cell {
    fn from(x: Xstr) -> Self {
        Cell::Str(x)
    }
}

impl From<Xword> for Cell {
    fn from(x: Xword) -> Self {
        Cell::Word(x)
    }
}

pub const ZERO: Cell = Cell::Int(0);
pub const ONE: Cell = Cell::Int(1);
pub const TRUE: Cell = ONE;
pub const FALSE: Cell = ZERO;
