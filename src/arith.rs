use crate::cell::*;
use crate::error::*;
use crate::state::State;

use std::cmp::Ordering;

// second-from-top is the left operand
fn pop_pair(xs: &mut State) -> Xresult1<(Cell, Cell)> {
    xs.data_stack().require(2)?;
    let b = xs.pop_data()?;
    let a = xs.pop_data()?;
    Ok((a, b))
}

fn arithmetic_ops_int(xs: &mut State, ops_int: fn(Xint, Xint) -> Xint) -> Xresult {
    let (a, b) = pop_pair(xs)?;
    let c = ops_int(a.to_int()?, b.to_int()?);
    xs.push_data(Cell::Int(c));
    OK
}

fn arithmetic_ops_checked(xs: &mut State, ops_int: fn(Xint, Xint) -> Xint) -> Xresult {
    let (a, b) = pop_pair(xs)?;
    let (a, b) = (a.to_int()?, b.to_int()?);
    if b == 0 {
        return Err(Xerr::DivisionByZero);
    }
    xs.push_data(Cell::Int(ops_int(a, b)));
    OK
}

fn unary_ops_int(xs: &mut State, ops_int: fn(Xint) -> Xint) -> Xresult {
    let a = xs.pop_data()?.to_int()?;
    xs.push_data(Cell::Int(ops_int(a)));
    OK
}

fn compare(a: &Cell, b: &Cell) -> Xresult1<Ordering> {
    match (a, b) {
        (Cell::Int(a), Cell::Int(b)) => Ok(a.cmp(b)),
        (Cell::Str(a), Cell::Str(b)) => Ok(a.as_str().cmp(b.as_str())),
        _ => Err(Xerr::TypeError),
    }
}

fn compare_ops(xs: &mut State, pred: fn(Ordering) -> bool) -> Xresult {
    let (a, b) = pop_pair(xs)?;
    let ord = compare(&a, &b)?;
    xs.push_data(Cell::from(pred(ord)));
    OK
}

fn test_ops(xs: &mut State, pred: fn(Xint) -> bool) -> Xresult {
    let a = xs.pop_data()?.to_int()?;
    xs.push_data(Cell::from(pred(a)));
    OK
}

fn select_ops(xs: &mut State, keep_left: fn(Ordering) -> bool) -> Xresult {
    let (a, b) = pop_pair(xs)?;
    let ord = compare(&a, &b)?;
    xs.push_data(if keep_left(ord) { a } else { b });
    OK
}

pub fn load(xs: &mut State) -> Xresult {
    xs.defword("<", |xs| compare_ops(xs, Ordering::is_lt))?;
    xs.defword("=", |xs| compare_ops(xs, Ordering::is_eq))?;
    xs.defword(">", |xs| compare_ops(xs, Ordering::is_gt))?;
    xs.defword("0<", |xs| test_ops(xs, |a| a < 0))?;
    xs.defword("0=", |xs| test_ops(xs, |a| a == 0))?;
    xs.defword("0>", |xs| test_ops(xs, |a| a > 0))?;
    xs.defword("not", |xs| test_ops(xs, |a| a == 0))?;
    xs.defword("true", |xs| {
        xs.push_data(TRUE);
        OK
    })?;
    xs.defword("false", |xs| {
        xs.push_data(FALSE);
        OK
    })?;
    xs.defword("+", core_word_add)?;
    xs.defword("-", |xs| arithmetic_ops_int(xs, Xint::wrapping_sub))?;
    xs.defword("1+", |xs| unary_ops_int(xs, |a| a.wrapping_add(1)))?;
    xs.defword("1-", |xs| unary_ops_int(xs, |a| a.wrapping_sub(1)))?;
    xs.defword("2+", |xs| unary_ops_int(xs, |a| a.wrapping_add(2)))?;
    xs.defword("2-", |xs| unary_ops_int(xs, |a| a.wrapping_sub(2)))?;
    xs.defword("*", |xs| arithmetic_ops_int(xs, Xint::wrapping_mul))?;
    xs.defword("/", |xs| arithmetic_ops_checked(xs, Xint::wrapping_div))?;
    xs.defword("mod", |xs| arithmetic_ops_checked(xs, Xint::wrapping_rem))?;
    xs.defword("max", |xs| select_ops(xs, Ordering::is_ge))?;
    xs.defword("min", |xs| select_ops(xs, Ordering::is_le))?;
    xs.defword("abs", |xs| unary_ops_int(xs, Xint::wrapping_abs))?;
    xs.defword("and", |xs| arithmetic_ops_int(xs, std::ops::BitAnd::bitand))?;
    xs.defword("or", |xs| arithmetic_ops_int(xs, std::ops::BitOr::bitor))?;
    xs.defword("xor", |xs| arithmetic_ops_int(xs, std::ops::BitXor::bitxor))?;
    OK
}

/// Integer addition or string concatenation.
pub fn add_cells(a: &Cell, b: &Cell) -> Xresult1<Cell> {
    match (a, b) {
        (Cell::Int(a), Cell::Int(b)) => Ok(Cell::Int(a.wrapping_add(*b))),
        (Cell::Str(a), Cell::Str(b)) => {
            let mut s = String::with_capacity(a.len() + b.len());
            s.push_str(a);
            s.push_str(b);
            Ok(Cell::from(s))
        }
        _ => Err(Xerr::TypeError),
    }
}

fn core_word_add(xs: &mut State) -> Xresult {
    let (a, b) = pop_pair(xs)?;
    let c = add_cells(&a, &b)?;
    xs.push_data(c);
    OK
}
