use crate::cell::{Xint, Xstr};
use crate::error::*;

#[derive(Debug, PartialEq)]
pub enum Tok {
    EndOfInput,
    Word(String),
    Str(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub pos: usize,
    pub len: usize,
}

/// Splits one line of text into word tokens and `"`-quoted string tokens.
/// Anything in the control character range, space included, separates tokens.
#[derive(Clone, Debug)]
pub struct Lex {
    buffer: Xstr,
    pos: usize,
    last: Option<Location>,
}

impl Lex {
    pub fn new(buffer: Xstr) -> Self {
        Self {
            buffer,
            pos: 0,
            last: None,
        }
    }

    pub fn from_str(s: &str) -> Self {
        Self::new(Xstr::from(s))
    }

    pub fn buffer(&self) -> &str {
        self.buffer.as_str()
    }

    pub fn last_token(&self) -> Option<(&str, &Location)> {
        self.last.as_ref().map(|loc| {
            let start = loc.pos;
            let end = start + loc.len;
            (&self.buffer[start..end], loc)
        })
    }

    /// Zero based column of the last token, counted in characters.
    pub fn last_column(&self) -> Option<usize> {
        self.last
            .as_ref()
            .map(|loc| self.buffer[..loc.pos].chars().count())
    }

    fn is_whitespace(c: char) -> bool {
        c <= ' '
    }

    fn peek(&self) -> Option<char> {
        self.buffer[self.pos..].chars().next()
    }

    fn take(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespaces(&mut self) -> Option<char> {
        loop {
            let c = self.peek()?;
            if Self::is_whitespace(c) {
                self.take();
            } else {
                break Some(c);
            }
        }
    }

    fn parse_word(&mut self) -> Tok {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if Self::is_whitespace(c) || c == '"' {
                break;
            }
            self.take();
        }
        self.last = Some(Location {
            pos: start,
            len: self.pos - start,
        });
        Tok::Word(self.buffer[start..self.pos].to_string())
    }

    fn parse_string(&mut self) -> Xresult1<Tok> {
        let start = self.pos;
        let body = start + 1;
        match memchr::memchr(b'"', self.buffer[body..].as_bytes()) {
            Some(n) => {
                self.pos = body + n + 1;
                self.last = Some(Location {
                    pos: start,
                    len: self.pos - start,
                });
                Ok(Tok::Str(self.buffer[body..body + n].to_string()))
            }
            None => {
                self.last = Some(Location {
                    pos: start,
                    len: self.buffer.len() - start,
                });
                Err(Xerr::InputIncomplete)
            }
        }
    }

    pub fn next(&mut self) -> Xresult1<Tok> {
        match self.skip_whitespaces() {
            None => Ok(Tok::EndOfInput),
            Some('"') => self.parse_string(),
            Some(_) => Ok(self.parse_word()),
        }
    }
}

/// Parse a token as an integer in the given radix, with an optional sign.
pub fn parse_number(word: &str, base: u32) -> Option<Xint> {
    Xint::from_str_radix(word, base).ok()
}

// tests ---------------------------------------------------------------------

#[test]
fn test_lex_ws() {
    let mut lex = Lex::from_str("\n\t");
    assert_eq!(Ok(Tok::EndOfInput), lex.next());
    assert_eq!(None, lex.last_token());
    let mut lex = Lex::from_str(" abcde \x01123");
    lex.next().unwrap();
    let (s, loc) = lex.last_token().unwrap();
    assert_eq!(s, "abcde");
    assert_eq!(loc.len, 5);
    assert_eq!(Some(1), lex.last_column());
    assert_eq!(Ok(Tok::Word("123".to_string())), lex.next());
    assert_eq!(Some(8), lex.last_column());
    assert_eq!(Ok(Tok::EndOfInput), lex.next());
}

#[test]
fn test_lex_words() {
    let mut lex = Lex::from_str(": sq dup * ; +loop 1+ 'x");
    let mut words = Vec::new();
    while let Tok::Word(w) = lex.next().unwrap() {
        words.push(w);
    }
    assert_eq!(vec![":", "sq", "dup", "*", ";", "+loop", "1+", "'x"], words);
}

#[test]
fn test_lex_str() {
    let mut lex = Lex::from_str(" \"hello world\" x\"y z\"");
    assert_eq!(Ok(Tok::Str("hello world".to_string())), lex.next());
    assert_eq!(Ok(Tok::Word("x".to_string())), lex.next());
    assert_eq!(Ok(Tok::Str("y z".to_string())), lex.next());
    assert_eq!(Ok(Tok::EndOfInput), lex.next());
    let mut lex = Lex::from_str("\"\"");
    assert_eq!(Ok(Tok::Str(String::new())), lex.next());
    let mut lex = Lex::from_str("1 \" xx ");
    lex.next().unwrap();
    assert_eq!(Err(Xerr::InputIncomplete), lex.next());
    assert_eq!("\" xx ", lex.last_token().unwrap().0);
}

#[test]
fn test_lex_unicode() {
    let mut lex = Lex::from_str("ü \"ñ\" x");
    assert_eq!(Ok(Tok::Word("ü".to_string())), lex.next());
    assert_eq!(Ok(Tok::Str("ñ".to_string())), lex.next());
    assert_eq!(Ok(Tok::Word("x".to_string())), lex.next());
    assert_eq!(Some(6), lex.last_column());
}

#[test]
fn test_parse_number() {
    assert_eq!(Some(10), parse_number("10", 10));
    assert_eq!(Some(-10), parse_number("-10", 10));
    assert_eq!(Some(5), parse_number("+5", 10));
    assert_eq!(Some(255), parse_number("ff", 16));
    assert_eq!(Some(255), parse_number("FF", 16));
    assert_eq!(Some(5), parse_number("101", 2));
    assert_eq!(None, parse_number("2", 2));
    assert_eq!(None, parse_number("ff", 10));
    assert_eq!(None, parse_number("-", 10));
    assert_eq!(None, parse_number("1+", 10));
}
