use crate::cell::*;
use crate::error::*;
use crate::state::State;
use crate::word::*;

use std::rc::Rc;

/// Pending structure while a body is being assembled. Indices are body
/// positions; they never reach the run-time control stack.
#[derive(Clone, Debug, PartialEq)]
enum Flow {
    If(usize),
    Else { if_org: usize, else_org: usize },
    Do(usize),
    Begin(usize),
}

/// A compiled word under construction, together with its own stack of
/// unresolved control structures.
#[derive(Clone)]
pub struct Builder {
    name: Xstr,
    body: Xbody,
    flow: Vec<Flow>,
}

impl Builder {
    pub fn new(name: Xstr) -> Self {
        Self {
            name,
            body: Xbody::new(),
            flow: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn origin(&self) -> usize {
        self.body.len()
    }

    pub fn emit(&mut self, w: Xword) {
        self.body.push_back_mut(w);
    }

    fn emit_marker(&mut self, w: Word) -> usize {
        let at = self.origin();
        self.emit(Rc::new(w));
        at
    }

    fn backpatch(&mut self, at: usize, w: Word) -> Xresult {
        if self.body.set_mut(at, Rc::new(w)) {
            OK
        } else {
            Err(Xerr::InternalError)
        }
    }

    fn marker_at(&self, at: usize) -> Xresult1<&Word> {
        self.body
            .get(at)
            .map(|w| w.as_ref())
            .ok_or(Xerr::InternalError)
    }

    fn pop_flow(&mut self) -> Xresult1<Flow> {
        self.flow.pop().ok_or(Xerr::ControlFlowError)
    }

    pub fn has_pending_flow(&self) -> bool {
        !self.flow.is_empty()
    }

    pub fn compile_if(&mut self) -> Xresult {
        let at = self.emit_marker(Word::If {
            else_rel: 0,
            then_rel: 0,
        });
        self.flow.push(Flow::If(at));
        OK
    }

    pub fn compile_else(&mut self) -> Xresult {
        let if_org = match self.flow.last() {
            Some(Flow::If(org)) => *org,
            _ => return Err(Xerr::ControlFlowError),
        };
        let else_org = self.emit_marker(Word::Else { then_rel: 0 });
        // false branch starts right after else
        let else_rel = jump_offset(if_org, else_org + 1);
        self.backpatch(if_org, Word::If { else_rel, then_rel: 0 })?;
        self.flow.push(Flow::Else { if_org, else_org });
        OK
    }

    pub fn compile_then(&mut self) -> Xresult {
        let then_org = self.origin();
        let if_org = match self.pop_flow()? {
            Flow::Else { if_org, else_org } => {
                let then_rel = jump_offset(else_org, then_org);
                self.backpatch(else_org, Word::Else { then_rel })?;
                match self.pop_flow()? {
                    Flow::If(org) if org == if_org => org,
                    _ => return Err(Xerr::ControlFlowError),
                }
            }
            Flow::If(org) => org,
            _ => return Err(Xerr::ControlFlowError),
        };
        let else_rel = match self.marker_at(if_org)? {
            Word::If { else_rel, .. } => *else_rel,
            _ => return Err(Xerr::InternalError),
        };
        let then_rel = jump_offset(if_org, then_org);
        self.backpatch(if_org, Word::If { else_rel, then_rel })
    }

    pub fn compile_do(&mut self) -> Xresult {
        self.emit_marker(Word::Do);
        let body_org = self.origin();
        self.flow.push(Flow::Do(body_org));
        OK
    }

    fn close_do(&mut self) -> Xresult1<isize> {
        match self.pop_flow()? {
            Flow::Do(body_org) => Ok(jump_offset(self.origin(), body_org)),
            _ => Err(Xerr::ControlFlowError),
        }
    }

    pub fn compile_loop(&mut self) -> Xresult {
        let rel = self.close_do()?;
        self.emit_marker(Word::Loop(rel));
        OK
    }

    pub fn compile_plus_loop(&mut self) -> Xresult {
        let rel = self.close_do()?;
        self.emit_marker(Word::PlusLoop(rel));
        OK
    }

    pub fn compile_begin(&mut self) -> Xresult {
        let body_org = self.origin();
        self.flow.push(Flow::Begin(body_org));
        OK
    }

    pub fn compile_end(&mut self) -> Xresult {
        match self.pop_flow()? {
            Flow::Begin(body_org) => {
                let rel = jump_offset(self.origin(), body_org);
                self.emit_marker(Word::End(rel));
                OK
            }
            _ => Err(Xerr::ControlFlowError),
        }
    }

    pub fn compile_leave(&mut self) -> Xresult {
        self.emit_marker(Word::Leave);
        OK
    }

    /// Freeze the body into a dictionary-ready word.
    pub fn finish(self) -> Xresult1<Word> {
        if self.has_pending_flow() {
            return Err(Xerr::ControlFlowError);
        }
        Ok(Word::Compiled(Compiled {
            name: self.name,
            immediate: false,
            body: self.body,
        }))
    }
}

pub fn jump_offset(origin: usize, dest: usize) -> isize {
    if origin > dest {
        -((origin - dest) as isize)
    } else {
        (dest - origin) as isize
    }
}

pub fn load(xs: &mut State) -> Xresult {
    xs.def_immediate(":", core_word_def_begin)?;
    xs.def_immediate(";", core_word_def_end)?;
    xs.def_immediate("if", |xs| xs.builder_mut()?.compile_if())?;
    xs.def_immediate("else", |xs| xs.builder_mut()?.compile_else())?;
    xs.def_immediate("then", |xs| xs.builder_mut()?.compile_then())?;
    xs.def_immediate("do", |xs| xs.builder_mut()?.compile_do())?;
    xs.def_immediate("loop", |xs| xs.builder_mut()?.compile_loop())?;
    xs.def_immediate("+loop", |xs| xs.builder_mut()?.compile_plus_loop())?;
    xs.def_immediate("begin", |xs| xs.builder_mut()?.compile_begin())?;
    xs.def_immediate("end", |xs| xs.builder_mut()?.compile_end())?;
    xs.def_immediate("leave", |xs| xs.builder_mut()?.compile_leave())?;
    xs.defword("i", core_word_counter_i)?;
    xs.defword("j", core_word_counter_j)?;
    OK
}

fn core_word_def_begin(xs: &mut State) -> Xresult {
    if xs.is_compiling() {
        return Err(Xerr::NestedDefinition);
    }
    let name = xs.next_name()?;
    xs.start_definition(Builder::new(Xstr::from(name)));
    OK
}

fn core_word_def_end(xs: &mut State) -> Xresult {
    let builder = xs.take_builder().ok_or(Xerr::NotCompiling)?;
    let w = builder.finish()?;
    xs.dict_insert(Rc::new(w));
    OK
}

fn core_word_counter_i(xs: &mut State) -> Xresult {
    let index = xs.top_control()?.clone();
    xs.push_data(index);
    OK
}

fn core_word_counter_j(xs: &mut State) -> Xresult {
    xs.control_stack().require(4)?;
    let index = xs.pop_control()?;
    let limit = xs.pop_control()?;
    let outer = xs.top_control()?.clone();
    xs.push_data(outer);
    xs.push_control(limit);
    xs.push_control(index);
    OK
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(src: &[&str]) -> Xresult1<Builder> {
        let mut b = Builder::new(Xstr::from("t"));
        for w in src {
            match *w {
                "if" => b.compile_if()?,
                "else" => b.compile_else()?,
                "then" => b.compile_then()?,
                "do" => b.compile_do()?,
                "loop" => b.compile_loop()?,
                "+loop" => b.compile_plus_loop()?,
                "begin" => b.compile_begin()?,
                "end" => b.compile_end()?,
                "leave" => b.compile_leave()?,
                _ => b.emit(Rc::new(Word::Literal(Cell::from(*w)))),
            }
        }
        Ok(b)
    }

    fn markers(b: &Builder) -> Vec<String> {
        b.body
            .iter()
            .map(|w| match w.as_ref() {
                Word::Literal(val) => format!("{:?}", val),
                w => format!("{:?}", w),
            })
            .collect()
    }

    #[test]
    fn test_jump_offset() {
        assert_eq!(2, jump_offset(2, 4));
        assert_eq!(-2, jump_offset(4, 2));
        assert_eq!(0, jump_offset(3, 3));
    }

    #[test]
    fn test_if_then_offsets() {
        let b = compile(&["if", "a", "b", "then", "c"]).unwrap();
        assert_eq!(
            vec!["If { else_rel: 0, then_rel: 3 }", "\"a\"", "\"b\"", "\"c\""],
            markers(&b)
        );
    }

    #[test]
    fn test_if_else_then_offsets() {
        let b = compile(&["x", "if", "a", "else", "b", "c", "then"]).unwrap();
        assert_eq!(
            vec![
                "\"x\"",
                "If { else_rel: 3, then_rel: 5 }",
                "\"a\"",
                "Else { then_rel: 3 }",
                "\"b\"",
                "\"c\"",
            ],
            markers(&b)
        );
        assert!(!b.has_pending_flow());
    }

    #[test]
    fn test_nested_if() {
        let b = compile(&["if", "if", "a", "then", "else", "b", "then"]).unwrap();
        assert_eq!(
            vec![
                "If { else_rel: 4, then_rel: 5 }",
                "If { else_rel: 0, then_rel: 2 }",
                "\"a\"",
                "Else { then_rel: 2 }",
                "\"b\"",
            ],
            markers(&b)
        );
    }

    #[test]
    fn test_loop_offsets() {
        let b = compile(&["do", "a", "b", "loop"]).unwrap();
        assert_eq!(vec!["Do", "\"a\"", "\"b\"", "Loop(-2)"], markers(&b));
        let b = compile(&["do", "a", "+loop"]).unwrap();
        assert_eq!(vec!["Do", "\"a\"", "PlusLoop(-1)"], markers(&b));
        let b = compile(&["begin", "a", "end"]).unwrap();
        assert_eq!(vec!["\"a\"", "End(-1)"], markers(&b));
        let b = compile(&["do", "loop"]).unwrap();
        assert_eq!(vec!["Do", "Loop(0)"], markers(&b));
        let b = compile(&["do", "leave", "do", "a", "loop", "loop"]).unwrap();
        assert_eq!(
            vec!["Do", "Leave", "Do", "\"a\"", "Loop(-1)", "Loop(-4)"],
            markers(&b)
        );
    }

    #[test]
    fn test_malformed() {
        assert_eq!(Err(Xerr::ControlFlowError), compile(&["then"]).map(|_| ()));
        assert_eq!(Err(Xerr::ControlFlowError), compile(&["else"]).map(|_| ()));
        assert_eq!(Err(Xerr::ControlFlowError), compile(&["loop"]).map(|_| ()));
        assert_eq!(Err(Xerr::ControlFlowError), compile(&["end"]).map(|_| ()));
        assert_eq!(Err(Xerr::ControlFlowError), compile(&["begin", "loop"]).map(|_| ()));
        assert_eq!(Err(Xerr::ControlFlowError), compile(&["do", "end"]).map(|_| ()));
        assert_eq!(Err(Xerr::ControlFlowError), compile(&["do", "then"]).map(|_| ()));
        assert_eq!(
            Err(Xerr::ControlFlowError),
            compile(&["if", "else", "else"]).map(|_| ())
        );
        assert_eq!(
            Err(Xerr::ControlFlowError),
            compile(&["if", "do", "then"]).map(|_| ())
        );
        let b = compile(&["if", "a"]).unwrap();
        assert_eq!(Err(Xerr::ControlFlowError), b.finish().map(|_| ()));
        let b = compile(&["do"]).unwrap();
        assert_eq!(Err(Xerr::ControlFlowError), b.finish().map(|_| ()));
    }

    #[test]
    fn test_definition() {
        let mut xs = State::boot().unwrap();
        xs.interpret_line(": square dup * ;").unwrap();
        xs.interpret_line("5 square").unwrap();
        assert_eq!(Ok(Cell::Int(25)), xs.pop_data());
        assert!(!xs.is_compiling());
        assert_eq!(Err(Xerr::NotCompiling), xs.interpret_line(";"));
        assert_eq!(Err(Xerr::ExpectingName), xs.interpret_line(":"));
        assert!(!xs.is_compiling());
    }

    #[test]
    fn test_multiline_definition() {
        let mut xs = State::boot().unwrap();
        xs.interpret_line(": f").unwrap();
        assert!(xs.is_compiling());
        xs.interpret_line("  1 if 10").unwrap();
        xs.interpret_line("  else 20 then ;").unwrap();
        assert!(!xs.is_compiling());
        xs.interpret_line("f").unwrap();
        assert_eq!(Ok(Cell::Int(10)), xs.pop_data());
    }

    #[test]
    fn test_nested_definition() {
        let mut xs = State::boot().unwrap();
        assert_eq!(Err(Xerr::NestedDefinition), xs.interpret_line(": f : g ;"));
        assert!(!xs.is_compiling());
        assert!(xs.dict_search("f").is_none());
    }

    #[test]
    fn test_if_else_then() {
        let mut xs = State::boot().unwrap();
        xs.interpret_line(": t if 111 else 222 then ;").unwrap();
        xs.interpret_line("1 t").unwrap();
        assert_eq!(Ok(Cell::Int(111)), xs.pop_data());
        xs.interpret_line("0 t").unwrap();
        assert_eq!(Ok(Cell::Int(222)), xs.pop_data());
        xs.interpret_line("-5 t").unwrap();
        assert_eq!(Ok(Cell::Int(111)), xs.pop_data());
        assert!(xs.data_stack().is_empty());
        xs.interpret_line(": u if 1 then 2 ;").unwrap();
        xs.interpret_line("0 u").unwrap();
        assert_eq!(Ok(Cell::Int(2)), xs.pop_data());
        assert!(xs.data_stack().is_empty());
        assert_eq!(Err(Xerr::TypeError), xs.interpret_line("\"s\" u"));
    }

    #[test]
    fn test_nested_if_runtime() {
        let mut xs = State::boot().unwrap();
        xs.interpret_line(": sign dup 0< if drop -1 else 0> if 1 else 0 then then ;")
            .unwrap();
        xs.interpret_line("-7 sign 7 sign 0 sign").unwrap();
        assert_eq!(Ok(Cell::Int(0)), xs.pop_data());
        assert_eq!(Ok(Cell::Int(1)), xs.pop_data());
        assert_eq!(Ok(Cell::Int(-1)), xs.pop_data());
    }

    #[test]
    fn test_do_loop() {
        let mut xs = State::boot().unwrap();
        xs.capture_stdout();
        xs.interpret_line(": test 0 do i . loop ;").unwrap();
        xs.interpret_line("5 test").unwrap();
        assert_eq!(Some("01234"), xs.console());
        assert!(xs.control_stack().is_empty());
        // executes at least once
        xs.clear_console();
        xs.interpret_line("0 test").unwrap();
        assert_eq!(Some("0"), xs.console());
    }

    #[test]
    fn test_plus_loop() {
        let mut xs = State::boot().unwrap();
        xs.capture_stdout();
        xs.interpret_line(": down do i . -1 +loop ;").unwrap();
        xs.interpret_line("-1 10 down").unwrap();
        assert_eq!(Some("109876543210"), xs.console());
        xs.clear_console();
        xs.interpret_line(": up do i . 3 +loop ;").unwrap();
        xs.interpret_line("10 0 up").unwrap();
        assert_eq!(Some("0369"), xs.console());
        assert!(xs.control_stack().is_empty());
    }

    #[test]
    fn test_loop_at_integer_limit() {
        let mut xs = State::boot().unwrap();
        xs.interpret_line(": t do loop ;").unwrap();
        xs.interpret_line("9223372036854775807 9223372036854775807 t").unwrap();
        assert!(xs.control_stack().is_empty());
        xs.interpret_line(": up5 do i 5 +loop ;").unwrap();
        xs.interpret_line("9223372036854775807 9223372036854775806 up5").unwrap();
        assert_eq!(Ok(Cell::Int(9223372036854775806)), xs.pop_data());
        assert!(xs.data_stack().is_empty());
        assert!(xs.control_stack().is_empty());
        xs.interpret_line(": down5 do i -5 +loop ;").unwrap();
        xs.interpret_line("-9223372036854775808 -9223372036854775807 down5").unwrap();
        assert_eq!(Ok(Cell::Int(-9223372036854775807)), xs.pop_data());
        assert!(xs.data_stack().is_empty());
        assert!(xs.control_stack().is_empty());
    }

    #[test]
    fn test_empty_loop_body() {
        let mut xs = State::boot().unwrap();
        xs.interpret_line(": spin do loop ;").unwrap();
        xs.interpret_line("100 0 spin").unwrap();
        assert!(xs.control_stack().is_empty());
        assert!(xs.data_stack().is_empty());
    }

    #[test]
    fn test_nested_loops() {
        let mut xs = State::boot().unwrap();
        xs.interpret_line(": grid 3 1 do 2 0 do j i loop loop ;").unwrap();
        xs.interpret_line("grid").unwrap();
        let v: Vec<Cell> = xs.data_stack().iter().cloned().collect();
        let expected: Vec<Cell> = [1, 0, 1, 1, 2, 0, 2, 1].iter().map(|x| Cell::Int(*x)).collect();
        assert_eq!(expected, v);
        assert!(xs.control_stack().is_empty());
    }

    #[test]
    fn test_j_requires_two_loops() {
        let mut xs = State::boot().unwrap();
        assert_eq!(Err(Xerr::ControlStackUnderflow), xs.interpret_line("i"));
        xs.interpret_line(": bad 3 0 do j loop ;").unwrap();
        assert_eq!(Err(Xerr::ControlStackUnderflow), xs.interpret_line("bad"));
    }

    #[test]
    fn test_begin_end() {
        let mut xs = State::boot().unwrap();
        xs.interpret_line(": count begin 1+ dup 5 = end ;").unwrap();
        xs.interpret_line("0 count").unwrap();
        assert_eq!(Ok(Cell::Int(5)), xs.pop_data());
        assert!(xs.data_stack().is_empty());
    }

    #[test]
    fn test_leave() {
        let mut xs = State::boot().unwrap();
        xs.capture_stdout();
        xs.interpret_line(": t 10 0 do i . i 3 = if leave then loop ;").unwrap();
        xs.interpret_line("t").unwrap();
        assert_eq!(Some("0123"), xs.console());
        assert!(xs.control_stack().is_empty());
        xs.clear_console();
        xs.interpret_line(": t2 -10 0 do i . i -2 = if leave then -1 +loop ;").unwrap();
        xs.interpret_line("t2").unwrap();
        assert_eq!(Some("0-1-2"), xs.console());
        assert!(xs.control_stack().is_empty());
    }

    #[test]
    fn test_nonlocal_leave() {
        let mut xs = State::boot().unwrap();
        xs.capture_stdout();
        xs.interpret_line(": quit-loop leave ;").unwrap();
        xs.interpret_line(": t 10 0 do i . i 1 = if quit-loop then loop ;").unwrap();
        xs.interpret_line("t").unwrap();
        assert_eq!(Some("01"), xs.console());
        assert!(xs.control_stack().is_empty());
    }

    #[test]
    fn test_compile_only() {
        let mut xs = State::boot().unwrap();
        assert_eq!(Err(Xerr::CompileOnlyWord), xs.interpret_line("1 if 2 then"));
        assert_eq!(Err(Xerr::CompileOnlyWord), xs.interpret_line("do"));
    }

    #[test]
    fn test_malformed_discards_word() {
        let mut xs = State::boot().unwrap();
        assert_eq!(Err(Xerr::ControlFlowError), xs.interpret_line(": f 1 if 2 ;"));
        assert!(!xs.is_compiling());
        assert!(xs.dict_search("f").is_none());
        assert_eq!(Err(Xerr::ControlFlowError), xs.interpret_line(": g then ;"));
        assert!(!xs.is_compiling());
        assert!(xs.dict_search("g").is_none());
        assert_eq!(Err(Xerr::ControlFlowError), xs.interpret_line(": h begin loop ;"));
        assert!(xs.dict_search("h").is_none());
    }
}
