use crate::cell::*;
use crate::error::*;

use std::rc::Rc;

/// Words in definition order. Lookups scan newest to oldest so a later
/// definition shadows an earlier one with the same name.
#[derive(Default, Clone)]
pub struct Dictionary {
    words: Vec<Xword>,
}

impl Dictionary {
    pub fn add(&mut self, w: Xword) -> usize {
        let idx = self.words.len();
        self.words.push(w);
        idx
    }

    pub fn search(&self, name: &str) -> Option<&Xword> {
        self.words.iter().rfind(|w| w.name() == name)
    }

    fn position(&self, w: &Xword) -> Option<usize> {
        self.words.iter().rposition(|x| Rc::ptr_eq(x, w))
    }

    /// Remove `w` and everything defined after it. Nothing is removed when
    /// the range holds a primitive.
    pub fn truncate(&mut self, w: &Xword) -> Xresult {
        let name = Xstr::from(w.name());
        let at = self
            .position(w)
            .ok_or_else(|| Xerr::ForgetNotFound(name.clone()))?;
        if let Some(p) = self.words[at..].iter().find(|x| x.is_primitive()) {
            return Err(Xerr::CantForgetPrimitive(Xstr::from(p.name())));
        }
        self.words.truncate(at);
        OK
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Xword> {
        self.words.iter().rev()
    }
}
