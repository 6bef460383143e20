//! Glob pattern compiler.
//!
//! Translates a small shell-style glob dialect into an anchored [`Regex`].
//!
//! | Glob        | Regex      | Meaning                                  |
//! |-------------|------------|------------------------------------------|
//! | `/`, `//`   | `/+`       | one or more separators                   |
//! | `?`         | `[^/]`     | one character within a path element      |
//! | `*`         | `[^/]*`    | any run within a path element            |
//! | `**`        | `.*`       | any run, crossing separators             |
//! | `[ab]`      | `[ab]`     | character class, `[^ab]` negates         |
//! | `{a,b}`     | `(?:a\|b)` | alternation, may nest                    |
//!
//! Everything else matches literally. A backslash outside a character class
//! is rejected; inside one, a letter or digit escape such as `\d` keeps its
//! regex meaning. Patterns are converted to NFD before compiling, so subjects
//! must be passed through [`normalize`](crate::scanner::path_utils::normalize).
//! A pattern that already starts with `^` is taken as a raw regular
//! expression.
//!
//! # Example
//!
//! ```
//! use dedupe::rules::glob::Pattern;
//!
//! let pattern = Pattern::compile("**/*.{jpg,png}").unwrap();
//! assert!(pattern.is_match("photos/2024/a.jpg"));
//! assert!(!pattern.is_match("photos/2024/a.jpeg"));
//! ```

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use regex::Regex;
use thiserror::Error;

use crate::scanner::path_utils::normalize_str;

const RX_SLASH: &str = "/+";
const RX_QUESTION: &str = "[^/]";
const RX_STAR: &str = "[^/]*";
const RX_STAR_STAR: &str = ".*";

/// Errors produced while compiling a glob.
#[derive(Debug, Error)]
pub enum GlobError {
    /// A backslash appeared outside a character class.
    #[error("unexpected character '\\' at offset {offset}")]
    UnexpectedBackslash { offset: usize },

    /// Input ended inside `[...]`.
    #[error("unterminated character class [ab...]")]
    UnterminatedClass,

    /// Input ended with `{` groups still open.
    #[error("unbalanced braces: expected depth=0, got depth={depth}")]
    UnbalancedBraces { depth: usize },

    /// The generated expression was rejected by the regex engine.
    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// Compiler states. Each state consumes the construct it names and
/// hands control back to [`State::Ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Done,
    Ready,
    Slash,
    OpenBracket,
    Question,
    Star,
    OpenBrace,
    Comma,
    CloseBrace,
}

struct Compiler<'a> {
    input: Peekable<Chars<'a>>,
    offset: usize,
    output: String,
    depth: usize,
}

impl<'a> Compiler<'a> {
    fn new(input: &'a str) -> Self {
        let mut output = String::with_capacity(input.len() * 2 + 2);
        output.push('^');
        Self {
            input: input.chars().peekable(),
            offset: 0,
            output,
            depth: 0,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    fn consume(&mut self) -> Option<char> {
        let ch = self.input.next()?;
        self.offset += ch.len_utf8();
        Some(ch)
    }

    fn run(mut self) -> Result<String, GlobError> {
        let mut state = State::Ready;
        while state != State::Done {
            state = self.step(state)?;
        }
        Ok(self.output)
    }

    fn step(&mut self, state: State) -> Result<State, GlobError> {
        match state {
            State::Done => Ok(State::Done),
            State::Ready => self.on_ready(),
            State::Slash => Ok(self.on_slash()),
            State::OpenBracket => self.on_bracket(),
            State::Question => Ok(self.on_simple(RX_QUESTION)),
            State::Star => Ok(self.on_star()),
            State::OpenBrace => {
                self.depth += 1;
                Ok(self.on_simple("(?:"))
            }
            State::Comma => Ok(self.on_simple("|")),
            State::CloseBrace => {
                self.depth -= 1;
                Ok(self.on_simple(")"))
            }
        }
    }

    fn on_ready(&mut self) -> Result<State, GlobError> {
        let Some(ch) = self.peek() else {
            if self.depth > 0 {
                return Err(GlobError::UnbalancedBraces { depth: self.depth });
            }
            self.output.push('$');
            return Ok(State::Done);
        };

        let next = match ch {
            '\\' => {
                return Err(GlobError::UnexpectedBackslash {
                    offset: self.offset,
                })
            }
            '/' => State::Slash,
            '*' => State::Star,
            '?' => State::Question,
            '[' => State::OpenBracket,
            '{' => State::OpenBrace,
            ',' if self.depth > 0 => State::Comma,
            '}' if self.depth > 0 => State::CloseBrace,
            _ => {
                self.consume();
                let mut buf = [0u8; 4];
                self.output.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
                State::Ready
            }
        };
        Ok(next)
    }

    /// Consume one character and emit a fixed fragment.
    fn on_simple(&mut self, fragment: &str) -> State {
        self.consume();
        self.output.push_str(fragment);
        State::Ready
    }

    fn on_slash(&mut self) -> State {
        self.consume();
        while self.peek() == Some('/') {
            self.consume();
        }
        self.output.push_str(RX_SLASH);
        State::Ready
    }

    fn on_star(&mut self) -> State {
        self.consume();
        if self.peek() == Some('*') {
            self.consume();
            self.output.push_str(RX_STAR_STAR);
        } else {
            self.output.push_str(RX_STAR);
        }
        State::Ready
    }

    fn on_bracket(&mut self) -> Result<State, GlobError> {
        self.consume();
        self.output.push('[');
        if self.peek() == Some('^') {
            self.consume();
            self.output.push('^');
        }

        let mut in_escape = false;
        let mut after_dash = false;
        loop {
            let ch = self.consume().ok_or(GlobError::UnterminatedClass)?;
            if in_escape {
                // `\d`, `\s`, `\n` and friends keep their regex meaning.
                if ch.is_ascii_alphanumeric() {
                    self.output.push('\\');
                    self.output.push(ch);
                } else {
                    let mut buf = [0u8; 4];
                    self.output.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
                }
                in_escape = false;
                after_dash = false;
                continue;
            }
            match ch {
                '\\' => in_escape = true,
                ']' => {
                    self.output.push(']');
                    return Ok(State::Ready);
                }
                // Nested classes and set operators in the regex syntax.
                '[' | '&' | '~' => {
                    self.output.push('\\');
                    self.output.push(ch);
                }
                // `--` is class difference in the regex syntax.
                '-' if after_dash => self.output.push_str("\\-"),
                _ => self.output.push(ch),
            }
            after_dash = ch == '-';
        }
    }
}

/// Translate a glob into regex source without compiling it.
///
/// The input is converted to NFD first. Input starting with `^` is
/// returned unchanged.
///
/// # Errors
///
/// Returns [`GlobError`] for a stray backslash, an unterminated class or
/// unbalanced braces. No partial output is returned.
pub fn translate(glob: &str) -> Result<String, GlobError> {
    let input = normalize_str(glob);
    if input.starts_with('^') {
        return Ok(input);
    }
    Compiler::new(&input).run()
}

/// A compiled glob.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a glob into a matcher.
    ///
    /// # Errors
    ///
    /// Returns [`GlobError`] when the glob is malformed or the generated
    /// expression does not compile.
    pub fn compile(glob: &str) -> Result<Self, GlobError> {
        let regex = Regex::new(&translate(glob)?)?;
        Ok(Self {
            source: glob.to_string(),
            regex,
        })
    }

    /// Test an already-normalized subject.
    #[must_use]
    pub fn is_match(&self, subject: &str) -> bool {
        self.regex.is_match(subject)
    }

    /// The glob this pattern was compiled from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The compiled expression.
    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
