use crate::cell::*;
use crate::error::*;
use crate::state::State;

use std::fmt;

pub type XfnType = fn(&mut State) -> Xresult;

#[derive(Clone, Copy)]
pub struct XfnPtr(pub XfnType);

impl PartialEq for XfnPtr {
    fn eq(&self, other: &Self) -> bool {
        (self.0 as usize) == (other.0 as usize)
    }
}

impl fmt::Debug for XfnPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0 as usize)
    }
}

#[derive(Debug)]
pub struct Primitive {
    pub name: Xstr,
    pub immediate: bool,
    pub xf: XfnPtr,
}

#[derive(Debug)]
pub struct Compiled {
    pub name: Xstr,
    pub immediate: bool,
    pub body: Xbody,
}

/// Named run of `size` heap cells starting at `addr`.
#[derive(Debug)]
pub struct Storage {
    pub name: Xstr,
    pub addr: usize,
    pub size: usize,
}

impl Storage {
    pub fn is_array(&self) -> bool {
        self.size > 1
    }
}

/// Every executable unit of the interpreter. Control-flow markers are
/// anonymous and only ever live inside a compiled body; their payloads are
/// relative displacements resolved by the compiler.
#[derive(Debug)]
pub enum Word {
    Primitive(Primitive),
    Compiled(Compiled),
    Literal(Cell),
    Storage(Storage),
    If { else_rel: isize, then_rel: isize },
    Else { then_rel: isize },
    Do,
    Loop(isize),
    PlusLoop(isize),
    End(isize),
    Leave,
}

impl Word {
    pub fn primitive(name: &str, xf: XfnType, immediate: bool) -> Self {
        Word::Primitive(Primitive {
            name: Xstr::from(name),
            immediate,
            xf: XfnPtr(xf),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Word::Primitive(p) => p.name.as_str(),
            Word::Compiled(c) => c.name.as_str(),
            Word::Storage(s) => s.name.as_str(),
            _ => "",
        }
    }

    pub fn is_immediate(&self) -> bool {
        match self {
            Word::Primitive(p) => p.immediate,
            Word::Compiled(c) => c.immediate,
            _ => false,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Word::Primitive(_))
    }

    pub fn describe(&self) -> String {
        format!(
            "Name: \"{}\", Primitive: {}, Immediate: {}",
            self.name(),
            self.is_primitive(),
            self.is_immediate()
        )
    }
}

/// Execute a word and return the increment the enclosing body must apply to
/// its instruction index. Errors abort the whole chain of enclosing bodies.
pub fn execute(w: &Xword, xs: &mut State) -> Xresult1<isize> {
    match w.as_ref() {
        Word::Primitive(p) => {
            (p.xf.0)(xs)?;
            Ok(1)
        }
        Word::Compiled(c) => {
            run_body(&c.body, xs)?;
            Ok(1)
        }
        Word::Literal(val) => {
            xs.push_data(val.clone());
            Ok(1)
        }
        Word::Storage(_) => {
            xs.push_control(Cell::Word(w.clone()));
            Ok(1)
        }
        Word::If { else_rel, then_rel } => {
            if xs.pop_data()?.to_flag()? {
                Ok(1)
            } else if *else_rel != 0 {
                Ok(*else_rel)
            } else {
                Ok(*then_rel)
            }
        }
        Word::Else { then_rel } => Ok(*then_rel),
        Word::Do => {
            xs.data_stack().require(2)?;
            let start = xs.pop_data()?.to_int()?;
            let limit = xs.pop_data()?.to_int()?;
            xs.push_control(Cell::Int(limit));
            xs.push_control(Cell::Int(start));
            Ok(1)
        }
        Word::Loop(rel) => {
            let (index, limit) = loop_state(xs)?;
            match index.checked_add(1) {
                Some(next) => step_loop(xs, next, next >= limit, *rel),
                None => step_loop(xs, index, true, *rel),
            }
        }
        Word::PlusLoop(rel) => {
            let (index, limit) = loop_state(xs)?;
            let inc = xs.pop_data()?.to_int()?;
            // stepping past the integer range ends the loop
            match index.checked_add(inc) {
                Some(next) if inc >= 0 => step_loop(xs, next, next >= limit, *rel),
                Some(next) => step_loop(xs, next, next <= limit, *rel),
                None => step_loop(xs, index, true, *rel),
            }
        }
        Word::End(rel) => {
            if xs.pop_data()?.to_flag()? {
                Ok(1)
            } else {
                Ok(*rel)
            }
        }
        Word::Leave => {
            xs.control_stack().require(2)?;
            xs.pop_control()?;
            let limit = xs.top_control()?.clone();
            xs.push_control(limit);
            Ok(1)
        }
    }
}

/// Walk a compiled body from index 0, applying the increment returned by
/// each sub-word until the index runs off the end.
pub fn run_body(body: &Xbody, xs: &mut State) -> Xresult {
    let len = body.len() as isize;
    let mut ip: isize = 0;
    while ip < len {
        let w = body.get(ip as usize).ok_or(Xerr::InternalError)?;
        ip += execute(w, xs)?;
        if ip < 0 {
            return Err(Xerr::InternalError);
        }
    }
    OK
}

// index on top, limit below it
fn loop_state(xs: &State) -> Xresult1<(Xint, Xint)> {
    let cs = xs.control_stack();
    cs.require(2)?;
    let index = cs.get(0).ok_or(Xerr::ControlStackUnderflow)?.to_int()?;
    let limit = cs.get(1).ok_or(Xerr::ControlStackUnderflow)?.to_int()?;
    Ok((index, limit))
}

fn step_loop(xs: &mut State, index: Xint, done: bool, rel: isize) -> Xresult1<isize> {
    xs.pop_control()?;
    if done {
        xs.pop_control()?;
        Ok(1)
    } else {
        xs.push_control(Cell::Int(index));
        Ok(rel)
    }
}
