use crate::arith::add_cells;
use crate::cell::*;
use crate::error::*;
use crate::state::State;
use crate::word::*;

use std::rc::Rc;

pub fn load(xs: &mut State) -> Xresult {
    xs.defword("variable", core_word_variable)?;
    xs.defword("array", core_word_array)?;
    xs.defword("@", core_word_fetch)?;
    xs.defword("!", core_word_store)?;
    xs.defword("+!", core_word_plus_store)?;
    OK
}

fn define_storage(xs: &mut State, size: usize) -> Xresult {
    let name = xs.next_name()?;
    let addr = xs.alloc_cells(size)?;
    xs.dict_insert(Rc::new(Word::Storage(Storage {
        name: Xstr::from(name),
        addr,
        size,
    })));
    OK
}

fn core_word_variable(xs: &mut State) -> Xresult {
    define_storage(xs, 1)
}

fn core_word_array(xs: &mut State) -> Xresult {
    let size = xs.pop_data()?.to_int()?;
    if size < 1 || size > isize::MAX as Xint {
        return Err(Xerr::BadArrayLength);
    }
    define_storage(xs, size as usize)
}

// Storage handle from the control stack, resolved to an absolute heap address.
fn storage_address(xs: &mut State) -> Xresult1<usize> {
    let w = xs.pop_control()?.to_word()?;
    let s = match w.as_ref() {
        Word::Storage(s) => s,
        _ => return Err(Xerr::TypeError),
    };
    if !s.is_array() {
        return Ok(s.addr);
    }
    let offset = xs.pop_data()?.to_int()?.unsigned_abs() as usize;
    if offset < s.size {
        Ok(s.addr + offset)
    } else {
        Err(Xerr::OutOfBounds {
            name: s.name.clone(),
            size: s.size,
            offset,
        })
    }
}

fn core_word_fetch(xs: &mut State) -> Xresult {
    let addr = storage_address(xs)?;
    let val = xs.heap_cell(addr)?.clone();
    xs.push_data(val);
    OK
}

fn core_word_store(xs: &mut State) -> Xresult {
    let addr = storage_address(xs)?;
    let val = xs.pop_data()?;
    *xs.heap_cell_mut(addr)? = val;
    OK
}

fn core_word_plus_store(xs: &mut State) -> Xresult {
    let addr = storage_address(xs)?;
    let val = xs.pop_data()?;
    let sum = add_cells(xs.heap_cell(addr)?, &val)?;
    *xs.heap_cell_mut(addr)? = sum;
    OK
}
