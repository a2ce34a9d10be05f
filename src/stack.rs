use crate::cell::Cell;
use crate::error::*;

/// LIFO of values. The same type backs the data stack and the control stack,
/// they only differ in the error reported on underflow.
#[derive(Clone)]
pub struct Stack {
    items: Vec<Cell>,
    underflow: Xerr,
}

impl Stack {
    pub fn new(underflow: Xerr) -> Self {
        Self {
            items: Vec::new(),
            underflow,
        }
    }

    pub fn push(&mut self, val: Cell) {
        self.items.push(val);
    }

    pub fn pop(&mut self) -> Xresult1<Cell> {
        self.items.pop().ok_or_else(|| self.underflow.clone())
    }

    pub fn peek(&self) -> Xresult1<&Cell> {
        self.items.last().ok_or_else(|| self.underflow.clone())
    }

    /// Value at `idx` positions below the top.
    pub fn get(&self, idx: usize) -> Option<&Cell> {
        self.items.iter().rev().nth(idx)
    }

    pub fn require(&self, n: usize) -> Xresult {
        if self.items.len() >= n {
            OK
        } else {
            Err(self.underflow.clone())
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn swap(&mut self) -> Xresult {
        self.require(2)?;
        let len = self.items.len();
        self.items.swap(len - 1, len - 2);
        OK
    }

    pub fn over(&mut self) -> Xresult {
        self.require(2)?;
        let val = self.items[self.items.len() - 2].clone();
        self.push(val);
        OK
    }

    pub fn rot(&mut self) -> Xresult {
        self.require(3)?;
        let len = self.items.len();
        let val = self.items.remove(len - 3);
        self.push(val);
        OK
    }

    /// Bottom to top.
    pub fn iter(&self) -> std::slice::Iter<'_, Cell> {
        self.items.iter()
    }
}
