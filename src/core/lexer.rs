//! ST-003: Tokenizer.
//!
//! Splits template text into literal, `{{ expr }}`, `{% tag %}` and
//! `{# comment #}` tokens. Delimiters may span lines and close at the first
//! matching closer. Tokens cover the input with no gaps or overlaps.

use regex::{Match, Matches, Regex};
use std::sync::LazyLock;

static DELIMITED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{.*?\}\}|\{%.*?%\}|\{#.*?#\}").expect("delimiter pattern is valid")
});

/// Token payload. Expression and tag text are the trimmed inner contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind<'a> {
    Literal(&'a str),
    Expression(&'a str),
    Tag(&'a str),
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    /// Exact source slice, delimiters included.
    pub raw: &'a str,
    /// 1-based line of the token's first character.
    pub line: usize,
}

/// Lazy token stream over one template. Construct again to restart.
pub struct Tokenizer<'a> {
    source: &'a str,
    matches: Matches<'static, 'a>,
    pending: Option<Match<'a>>,
    pos: usize,
    line: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            matches: DELIMITED.find_iter(source),
            pending: None,
            pos: 0,
            line: 1,
        }
    }

    fn advance(&mut self, end: usize) -> (&'a str, usize) {
        let raw = &self.source[self.pos..end];
        let line = self.line;
        self.line += raw.bytes().filter(|&b| b == b'\n').count();
        self.pos = end;
        (raw, line)
    }

    fn literal(&mut self, end: usize) -> Token<'a> {
        let (raw, line) = self.advance(end);
        Token {
            kind: TokenKind::Literal(raw),
            raw,
            line,
        }
    }

    fn delimited(&mut self, m: Match<'a>) -> Token<'a> {
        let (raw, line) = self.advance(m.end());
        let inner = raw[2..raw.len() - 2].trim();
        let kind = match &raw[..2] {
            "{{" => TokenKind::Expression(inner),
            "{%" => TokenKind::Tag(inner),
            _ => TokenKind::Comment,
        };
        Token { kind, raw, line }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if let Some(m) = self.pending.take() {
            return Some(self.delimited(m));
        }
        match self.matches.next() {
            Some(m) if m.start() > self.pos => {
                self.pending = Some(m);
                Some(self.literal(m.start()))
            }
            Some(m) => Some(self.delimited(m)),
            None if self.pos < self.source.len() => Some(self.literal(self.source.len())),
            None => None,
        }
    }
}

/// Tokenize `source`.
pub fn tokenize(source: &str) -> Tokenizer<'_> {
    Tokenizer::new(source)
}
