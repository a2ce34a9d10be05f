use crate::cell::*;
use crate::compiler::Builder;
use crate::dict::Dictionary;
use crate::error::*;
use crate::lex::*;
use crate::stack::Stack;
use crate::word::*;

use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub struct TokenLocation {
    pub token: String,
    pub line: usize,
    pub col: usize,
    pub filename: String,
    pub whole_line: String,
}

impl fmt::Debug for TokenLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:{}:{}", self.filename, self.line + 1, self.col + 1)?;
        writeln!(f, "{}", self.whole_line)?;
        writeln!(f, "{:->1$}", '^', self.col + 1)
    }
}

#[derive(Clone)]
pub struct ErrorContext {
    pub err: Xerr,
    pub location: Option<TokenLocation>,
}

#[derive(Clone)]
pub struct State {
    dict: Dictionary,
    heap: Vec<Cell>,
    data: Stack,
    control: Stack,
    builder: Option<Builder>,
    base: u32,
    source: Option<Lex>,
    source_name: String,
    line: usize,
    nesting: usize,
    error_reported: bool,
    console: Option<String>,
    last_error: Option<ErrorContext>,
    pub(crate) about_to_stop: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            dict: Dictionary::default(),
            heap: Vec::new(),
            data: Stack::new(Xerr::StackUnderflow),
            control: Stack::new(Xerr::ControlStackUnderflow),
            builder: None,
            base: 10,
            source: None,
            source_name: "<console>".to_string(),
            line: 0,
            nesting: 0,
            error_reported: false,
            console: None,
            last_error: None,
            about_to_stop: false,
        }
    }
}

impl State {
    pub fn boot() -> Xresult1<State> {
        let mut xs = State::default();
        #[cfg(not(feature = "stdio"))]
        {
            xs.console = Some(String::new());
        }
        xs.load_core()?;
        crate::compiler::load(&mut xs)?;
        crate::arith::load(&mut xs)?;
        crate::storage::load(&mut xs)?;
        Ok(xs)
    }

    fn load_core(&mut self) -> Xresult {
        self.defword("dup", |xs| {
            let val = xs.data.peek()?.clone();
            xs.push_data(val);
            OK
        })?;
        self.defword("drop", |xs| xs.pop_data().map(|_| ()))?;
        self.defword("swap", |xs| xs.data.swap())?;
        self.defword("over", |xs| xs.data.over())?;
        self.defword("rot", |xs| xs.data.rot())?;
        self.defword("depth", |xs| {
            let n = xs.data.len();
            xs.push_data(Cell::from(n));
            OK
        })?;
        self.defword(">r", |xs| {
            let val = xs.pop_data()?;
            xs.push_control(val);
            OK
        })?;
        self.defword("r>", |xs| {
            let val = xs.pop_control()?;
            xs.push_data(val);
            OK
        })?;
        self.defword("r@", |xs| {
            let val = xs.top_control()?.clone();
            xs.push_data(val);
            OK
        })?;
        self.defword(".", core_word_print)?;
        self.defword("cr", |xs| {
            xs.print("\n");
            OK
        })?;
        self.defword("spaces", core_word_spaces)?;
        self.defword("binary", |xs| xs.set_base(2))?;
        self.defword("decimal", |xs| xs.set_base(10))?;
        self.defword("hex", |xs| xs.set_base(16))?;
        self.defword("constant", core_word_constant)?;
        self.defword("words", core_word_words)?;
        self.defword("wordsd", core_word_words_detailed)?;
        self.def_immediate("forget", core_word_forget)?;
        self.def_immediate("'", core_word_tick)?;
        self.defword("execute", core_word_execute)?;
        self.def_immediate("(", core_word_comment)?;
        self.defword("load", core_word_load)?;
        self.defword("random", core_word_random)?;
        self.defword("bye", core_word_bye)?;
        OK
    }

    fn dict_add_word(&mut self, name: &str, f: XfnType, immediate: bool) -> Xresult1<usize> {
        Ok(self.dict.add(Rc::new(Word::primitive(name, f, immediate))))
    }

    pub fn defword(&mut self, name: &str, f: XfnType) -> Xresult1<usize> {
        self.dict_add_word(name, f, false)
    }

    pub fn def_immediate(&mut self, name: &str, f: XfnType) -> Xresult1<usize> {
        self.dict_add_word(name, f, true)
    }

    pub fn dict_insert(&mut self, w: Xword) -> usize {
        self.dict.add(w)
    }

    pub fn dict_search(&self, name: &str) -> Option<&Xword> {
        self.dict.search(name)
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    /// Reserve `size` zero-initialized heap cells, returning the first address.
    pub fn alloc_cells(&mut self, size: usize) -> Xresult1<usize> {
        let addr = self.heap.len();
        self.heap
            .try_reserve(size)
            .map_err(|_| Xerr::BadArrayLength)?;
        self.heap.resize(addr + size, ZERO);
        Ok(addr)
    }

    pub fn heap_cell(&self, addr: usize) -> Xresult1<&Cell> {
        self.heap.get(addr).ok_or(Xerr::InternalError)
    }

    pub fn heap_cell_mut(&mut self, addr: usize) -> Xresult1<&mut Cell> {
        self.heap.get_mut(addr).ok_or(Xerr::InternalError)
    }

    pub fn is_compiling(&self) -> bool {
        self.builder.is_some()
    }

    pub fn start_definition(&mut self, b: Builder) {
        self.builder = Some(b);
    }

    pub fn take_builder(&mut self) -> Option<Builder> {
        self.builder.take()
    }

    pub fn builder_mut(&mut self) -> Xresult1<&mut Builder> {
        self.builder.as_mut().ok_or(Xerr::CompileOnlyWord)
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn set_base(&mut self, base: u32) -> Xresult {
        match base {
            2 | 10 | 16 => {
                self.base = base;
                OK
            }
            _ => Err(Xerr::InvalidNumber),
        }
    }

    pub fn format_cell(&self, val: &Cell) -> String {
        val.format_in_base(self.base)
    }

    pub fn push_data(&mut self, data: Cell) {
        self.data.push(data);
    }

    pub fn pop_data(&mut self) -> Xresult1<Cell> {
        self.data.pop()
    }

    pub fn data_stack(&self) -> &Stack {
        &self.data
    }

    pub fn data_stack_mut(&mut self) -> &mut Stack {
        &mut self.data
    }

    pub fn push_control(&mut self, val: Cell) {
        self.control.push(val);
    }

    pub fn pop_control(&mut self) -> Xresult1<Cell> {
        self.control.pop()
    }

    pub fn top_control(&self) -> Xresult1<&Cell> {
        self.control.peek()
    }

    pub fn control_stack(&self) -> &Stack {
        &self.control
    }

    pub fn control_stack_mut(&mut self) -> &mut Stack {
        &mut self.control
    }

    fn next_token(&mut self) -> Xresult1<Tok> {
        match self.source.as_mut() {
            Some(src) => src.next(),
            None => Ok(Tok::EndOfInput),
        }
    }

    /// Read the next word token from the current line.
    pub fn next_name(&mut self) -> Xresult1<String> {
        match self.next_token()? {
            Tok::Word(name) => Ok(name),
            _ => Err(Xerr::ExpectingName),
        }
    }

    /// Interpret or compile every token of `line`. A failure aborts the rest
    /// of the line and discards any definition in progress.
    pub fn interpret_line(&mut self, line: &str) -> Xresult {
        if self.nesting == 0 {
            self.error_reported = false;
        }
        self.nesting += 1;
        let saved = self.source.replace(Lex::from_str(line));
        let res = self.interpret_source();
        if let Err(e) = &res {
            self.builder = None;
            self.report_error(e);
        }
        self.source = saved;
        self.nesting -= 1;
        res
    }

    fn interpret_source(&mut self) -> Xresult {
        loop {
            match self.next_token()? {
                Tok::EndOfInput => break OK,
                Tok::Str(s) => self.dispatch_value(Cell::from(s)),
                Tok::Word(name) => self.dispatch_word(&name)?,
            }
        }
    }

    fn dispatch_value(&mut self, val: Cell) {
        match self.builder.as_mut() {
            Some(b) => b.emit(Rc::new(Word::Literal(val))),
            None => self.push_data(val),
        }
    }

    fn dispatch_word(&mut self, name: &str) -> Xresult {
        if let Some(w) = self.dict.search(name).cloned() {
            if self.is_compiling() && !w.is_immediate() {
                self.builder_mut()?.emit(w);
                OK
            } else {
                execute(&w, self).map(|_| ())
            }
        } else if let Some(n) = parse_number(name, self.base) {
            self.dispatch_value(Cell::Int(n));
            OK
        } else {
            Err(Xerr::UnknownWord(Xstr::from(name)))
        }
    }

    /// Interpret a file line by line, stopping at the first failed line.
    pub fn load_file(&mut self, path: &str) -> Xresult {
        if self.nesting == 0 {
            self.error_reported = false;
        }
        let buf = std::fs::read_to_string(path).map_err(|e| Xerr::IOError {
            filename: Xstr::from(path),
            reason: Xstr::from(e.to_string()),
        });
        let buf = match buf {
            Ok(buf) => buf,
            Err(e) => {
                self.report_error(&e);
                return Err(e);
            }
        };
        let saved_name = std::mem::replace(&mut self.source_name, path.to_string());
        let saved_line = self.line;
        let mut res = OK;
        for (n, line) in buf.lines().enumerate() {
            self.line = n;
            res = self.interpret_line(line);
            if res.is_err() {
                break;
            }
        }
        self.source_name = saved_name;
        self.line = saved_line;
        res
    }

    fn current_location(&self) -> Option<TokenLocation> {
        let src = self.source.as_ref()?;
        let (token, _) = src.last_token()?;
        Some(TokenLocation {
            token: token.to_string(),
            line: self.line,
            col: src.last_column()?,
            filename: self.source_name.clone(),
            whole_line: src.buffer().trim_end().to_string(),
        })
    }

    fn report_error(&mut self, err: &Xerr) {
        if self.error_reported {
            return;
        }
        self.error_reported = true;
        if let Xerr::Exit(_) = err {
            return;
        }
        let location = self.current_location();
        let msg = match &location {
            Some(loc) => format!("error: {:?}\n{:?}", err, loc),
            None => format!("error: {:?}", err),
        };
        self.log_error(msg);
        self.last_error = Some(ErrorContext {
            err: err.clone(),
            location,
        });
    }

    pub fn last_error(&self) -> &Option<ErrorContext> {
        &self.last_error
    }

    pub fn log_error(&mut self, mut msg: String) {
        if !msg.ends_with('\n') {
            msg.push('\n');
        }
        #[cfg(feature = "stdio")]
        if self.console.is_none() {
            eprint!("{}", msg);
            return;
        }
        if let Some(out) = self.console.as_mut() {
            out.push_str(&msg);
        }
    }

    pub fn print(&mut self, msg: &str) {
        #[cfg(not(feature = "stdio"))]
        if let Some(out) = self.console.as_mut() {
            out.push_str(msg);
        }
        #[cfg(feature = "stdio")]
        if let Some(out) = self.console.as_mut() {
            out.push_str(msg)
        } else {
            use std::io::Write;
            print!("{}", msg);
            let _ = std::io::stdout().flush();
        }
    }

    pub fn capture_stdout(&mut self) {
        if self.console.is_none() {
            self.console = Some(String::new());
        }
    }

    pub fn console(&self) -> Option<&str> {
        self.console.as_deref()
    }

    pub fn clear_console(&mut self) {
        if let Some(out) = self.console.as_mut() {
            out.clear();
        }
    }

    pub fn is_about_to_stop(&self) -> bool {
        self.about_to_stop
    }
}

const MAX_SPACES: Xint = 4096;

fn core_word_print(xs: &mut State) -> Xresult {
    let val = xs.pop_data()?;
    let s = xs.format_cell(&val);
    xs.print(&s);
    OK
}

fn core_word_spaces(xs: &mut State) -> Xresult {
    let n = xs.pop_data()?.to_int()?;
    if n > MAX_SPACES {
        return Err(Xerr::InvalidNumber);
    }
    let s = " ".repeat(n.max(0) as usize);
    xs.print(&s);
    OK
}

fn core_word_constant(xs: &mut State) -> Xresult {
    let val = xs.pop_data()?;
    let name = xs.next_name()?;
    let mut b = Builder::new(Xstr::from(name));
    b.emit(Rc::new(Word::Literal(val)));
    let w = b.finish()?;
    xs.dict_insert(Rc::new(w));
    OK
}

fn core_word_words(xs: &mut State) -> Xresult {
    let mut buf = String::from("Words:\n");
    for w in xs.dict.iter() {
        buf.push_str(w.name());
        buf.push(' ');
    }
    buf.push('\n');
    xs.print(&buf);
    OK
}

fn core_word_words_detailed(xs: &mut State) -> Xresult {
    let mut buf = String::from("Words:\n");
    for w in xs.dict.iter() {
        buf.push_str(&w.describe());
        buf.push('\n');
    }
    xs.print(&buf);
    OK
}

fn core_word_forget(xs: &mut State) -> Xresult {
    let name = xs.next_name()?;
    let w = xs
        .dict
        .search(&name)
        .cloned()
        .ok_or_else(|| Xerr::ForgetNotFound(Xstr::from(name)))?;
    xs.dict.truncate(&w)
}

fn core_word_tick(xs: &mut State) -> Xresult {
    // while compiling the following name is compiled as a plain reference
    if xs.is_compiling() {
        return OK;
    }
    let name = xs.next_name()?;
    let w = xs
        .dict
        .search(&name)
        .cloned()
        .ok_or_else(|| Xerr::UnknownWord(Xstr::from(name)))?;
    xs.push_data(Cell::Word(w));
    OK
}

fn core_word_execute(xs: &mut State) -> Xresult {
    let w = xs.pop_data()?.to_word()?;
    execute(&w, xs).map(|_| ())
}

fn core_word_comment(xs: &mut State) -> Xresult {
    loop {
        match xs.next_token()? {
            Tok::Word(w) if w == ")" => break OK,
            Tok::EndOfInput => break Err(Xerr::InputIncomplete),
            _ => (),
        }
    }
}

fn core_word_load(xs: &mut State) -> Xresult {
    let path = xs.pop_data()?.to_xstr()?;
    xs.load_file(path.as_str())
}

fn random_below(n: u64) -> Xresult1<u64> {
    let zone = u64::MAX - (u64::MAX % n);
    loop {
        let mut buf = [0u8; 8];
        getrandom::getrandom(&mut buf).map_err(|_| Xerr::InternalError)?;
        let x = u64::from_le_bytes(buf);
        if x < zone {
            break Ok(x % n);
        }
    }
}

fn core_word_random(xs: &mut State) -> Xresult {
    let n = xs.pop_data()?.to_int()?;
    if n <= 0 {
        return Err(Xerr::InvalidNumber);
    }
    let x = random_below(n as u64)?;
    xs.push_data(Cell::Int(x as Xint));
    OK
}

fn core_word_bye(xs: &mut State) -> Xresult {
    xs.about_to_stop = true;
    Err(Xerr::Exit(0))
}
