//! Tokens, the arena they live in, and the cursor that walks over them.
//!
//! A [`TokenStream`] is append-only while the lexer builds it and immutable afterwards.
//! Everything that looks at tokens does so through a [`Reader`], which is just an index
//! into the arena plus a flag saying whether line breaks count as significant.
//! Because of that a [`Checkpoint`] is a plain copy and rolling back is free.

use std::{fmt, ops::Range};

/// What kind of thing a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    /// Beginning of the stream. Always the first token.
    Bos,
    /// A registered word-like literal.
    Keyword,
    /// Punctuation; either registered or a lone character.
    Symbol,
    /// A run of alphanumerics and underscores, including plain numbers.
    Identifier,
    /// Reported by the matcher for an `INTEGER` match, never produced by the lexer.
    Integer,
    /// Reported by the matcher for a `NUMBER` match, never produced by the lexer.
    Number,
    /// Reported by the matcher for a `STRING` match, never produced by the lexer.
    String,
    /// A line break.
    Line,
    /// Blanks and line continuations.
    Space,
    /// Line comments, and the payload between two quotes.
    Comment,
    /// End of the stream. Always the last token.
    Eof,
}

impl TokenClass {
    pub fn name(self) -> &'static str {
        match self {
            TokenClass::Bos => "beginning of input",
            TokenClass::Keyword => "keyword",
            TokenClass::Symbol => "symbol",
            TokenClass::Identifier => "identifier",
            TokenClass::Integer => "integer",
            TokenClass::Number => "number",
            TokenClass::String => "string",
            TokenClass::Line => "end of line",
            TokenClass::Space => "whitespace",
            TokenClass::Comment => "comment",
            TokenClass::Eof => "end of input",
        }
    }
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub class: TokenClass,
    pub text: String,
    /// Byte offsets into the lexed source.
    pub span: Range<usize>,
    /// 1-based.
    pub line: usize,
    /// 1-based, counted in chars.
    pub column: usize,
}

impl Token {
    pub fn is_symbol(&self) -> bool {
        self.class == TokenClass::Symbol
    }

    pub fn is_keyword(&self) -> bool {
        self.class == TokenClass::Keyword
    }

    pub fn is_identifier(&self) -> bool {
        self.class == TokenClass::Identifier
    }

    pub fn is_eof(&self) -> bool {
        self.class == TokenClass::Eof
    }

    pub fn is_line(&self) -> bool {
        self.class == TokenClass::Line
    }

    pub fn is_comment(&self) -> bool {
        self.class == TokenClass::Comment
    }

    pub fn has_text(&self, text: &str) -> bool {
        self.text == text
    }

    /// Can a reader step over this without looking at it?
    pub fn is_skippable(&self, skip_lines: bool) -> bool {
        match self.class {
            TokenClass::Bos | TokenClass::Space | TokenClass::Comment => true,
            TokenClass::Line => skip_lines,
            _ => false,
        }
    }
}

/// Human-readable rendering for error messages: `` `text` `` or the class name for
/// tokens without meaningful text.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class {
            TokenClass::Bos | TokenClass::Eof | TokenClass::Line => f.write_str(self.class.name()),
            _ => write!(f, "`{}`", self.text),
        }
    }
}

/// Arena of tokens. Index 0 is always [`TokenClass::Bos`], the last one always
/// [`TokenClass::Eof`].
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(matches!(tokens.first(), Some(t) if t.class == TokenClass::Bos));
        debug_assert!(matches!(tokens.last(), Some(t) if t.class == TokenClass::Eof));
        Self { tokens }
    }

    pub fn get(&self, position: usize) -> Option<&Token> {
        self.tokens.get(position)
    }

    /// The token at the position, or the end-of-input marker if it's past the end.
    pub fn get_or_eof(&self, position: usize) -> &Token {
        self.tokens
            .get(position)
            .unwrap_or_else(|| &self.tokens[self.tokens.len() - 1])
    }

    pub(crate) fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    /// The significant tokens, without the stream markers, whitespace or comments.
    pub fn significant(&self) -> impl Iterator<Item = &Token> {
        self.tokens
            .iter()
            .filter(|t| !t.is_skippable(true) && !t.is_eof())
    }

    pub fn reader(&self) -> Reader<'_> {
        Reader::new(self)
    }
}

/// Saved reader state. Seeking back to one of these is all a rollback ever needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    position: usize,
    skip_lines: bool,
}

impl Checkpoint {
    pub fn position(&self) -> usize {
        self.position
    }
}

/// Cursor over a [`TokenStream`].
#[derive(Debug, Clone)]
pub struct Reader<'s> {
    stream: &'s TokenStream,
    position: usize,
    skip_lines: bool,
}

impl<'s> Reader<'s> {
    pub fn new(stream: &'s TokenStream) -> Self {
        Self {
            stream,
            position: 0,
            skip_lines: true,
        }
    }

    pub fn stream(&self) -> &'s TokenStream {
        self.stream
    }

    /// Index of the raw token under the cursor.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn skip_lines(&self) -> bool {
        self.skip_lines
    }

    pub fn set_skip_lines(&mut self, skip_lines: bool) {
        self.skip_lines = skip_lines;
    }

    /// Index of the next significant token, without moving.
    pub fn significant_position(&self) -> usize {
        let mut position = self.position;
        while position + 1 < self.stream.len()
            && self.stream.get_or_eof(position).is_skippable(self.skip_lines)
        {
            position += 1;
        }
        position
    }

    /// Peek at the next significant token.
    pub fn get_or_eof(&self) -> &'s Token {
        self.stream.get_or_eof(self.significant_position())
    }

    /// Skip to the next significant token, return it and step past it.
    /// At the end of input this keeps returning the end marker without moving.
    pub fn read_or_eof(&mut self) -> &'s Token {
        self.position = self.significant_position();
        let token = self.stream.get_or_eof(self.position);
        if !token.is_eof() {
            self.position += 1;
        }
        token
    }

    /// Peek at the very next token, significant or not.
    pub fn peek_adjacent(&self) -> &'s Token {
        self.stream.get_or_eof(self.position)
    }

    /// Return the very next token and step past it, skipping nothing.
    pub fn read_adjacent(&mut self) -> &'s Token {
        let token = self.peek_adjacent();
        self.consume();
        token
    }

    /// Step past one raw token.
    pub fn consume(&mut self) {
        if self.position + 1 < self.stream.len() {
            self.position += 1;
        }
    }

    /// Is there nothing significant left?
    pub fn at_eof(&self) -> bool {
        self.get_or_eof().is_eof()
    }

    pub fn from_current(&self) -> Checkpoint {
        Checkpoint {
            position: self.position,
            skip_lines: self.skip_lines,
        }
    }

    pub fn seek_to(&mut self, checkpoint: Checkpoint) {
        self.position = checkpoint.position;
        self.skip_lines = checkpoint.skip_lines;
    }
}

#[cfg(test)]
fn stream(source: &str) -> TokenStream {
    crate::lex::Lexer::new().with_symbols(["="]).tokenize(source)
}

#[test]
fn reader_skips_insignificant_tokens() {
    let tokens = stream("a  =\n b");
    let mut reader = tokens.reader();

    assert!(reader.read_or_eof().has_text("a"));
    assert!(reader.read_or_eof().has_text("="));
    assert!(reader.read_or_eof().has_text("b"));
    assert!(reader.read_or_eof().is_eof());
    // stays put at the end
    assert!(reader.read_or_eof().is_eof());
}

#[test]
fn reader_honors_line_mode() {
    let tokens = stream("a\nb");
    let mut reader = tokens.reader();
    reader.set_skip_lines(false);

    assert!(reader.read_or_eof().has_text("a"));
    assert!(reader.read_or_eof().is_line());
    assert!(reader.read_or_eof().has_text("b"));
}

#[test]
fn checkpoints_restore_position_and_mode() {
    let tokens = stream("a b c");
    let mut reader = tokens.reader();
    reader.read_or_eof();
    let saved = reader.from_current();

    reader.set_skip_lines(false);
    reader.read_or_eof();
    reader.read_or_eof();
    assert!(reader.at_eof());

    reader.seek_to(saved);
    assert!(reader.skip_lines());
    assert!(reader.read_or_eof().has_text("b"));
}

#[test]
fn adjacent_reads_do_not_skip() {
    let tokens = stream("a =");
    let mut reader = tokens.reader();
    reader.read_or_eof();

    assert_eq!(reader.peek_adjacent().class, TokenClass::Space);
    assert_eq!(reader.read_adjacent().class, TokenClass::Space);
    assert!(reader.read_adjacent().has_text("="));
}
