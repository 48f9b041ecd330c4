//! Character cursor over a raw query string
//!
//! There is no token buffer: the parser pulls characters straight from the
//! scanner and records byte offsets into the original string. Percent-encoded
//! delimiters (`%26` for `&`, ...) are ordinary characters here, which is what
//! keeps them from being mistaken for structure.

use crate::utils::encoding;

/// Characters that end a column or value run
pub const DELIMITERS: &[char] = &['&', '|', '(', ')', '=', '!', '>', '<'];

/// A run of characters read up to a delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run<'a> {
    /// Raw text with surrounding literal whitespace removed
    pub raw: &'a str,
    /// Offset of the first non-whitespace character (run start when blank)
    pub offset: usize,
}

impl<'a> Run<'a> {
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// The rawurl-decoded text of the run
    pub fn decoded(&self) -> String {
        encoding::decode(self.raw).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Look one character past [`Scanner::peek`]
    pub fn peek_second(&self) -> Option<char> {
        self.remaining().chars().nth(1)
    }

    pub fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Consume `expected` if it is next
    pub fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.advance();
        }
    }

    /// Read characters up to (not including) the next delimiter or end of input
    pub fn read_run(&mut self, delimiters: &[char]) -> Run<'a> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if delimiters.contains(&ch) {
                break;
            }
            self.advance();
        }

        let text = &self.input[start..self.pos];
        let leading = text.len() - text.trim_start().len();
        let raw = text.trim();
        Run {
            raw,
            offset: if raw.is_empty() { start } else { start + leading },
        }
    }
}
