//! Turning text into a [`TokenStream`].
//!
//! The lexer knows nothing about any particular language. It is told which symbols and
//! keywords exist, which characters quote strings and what starts a line comment; the
//! grammar compiler configures one for grammar files and another for whatever language
//! a compiled grammar describes.

use crate::token::{Token, TokenClass, TokenStream};

/// Characters that open (and close) a quoted string unless told otherwise.
pub const DEFAULT_QUOTES: [char; 3] = ['"', '\'', '`'];

#[derive(Debug, Clone)]
pub struct Lexer {
    symbols: Vec<String>,
    keywords: Vec<String>,
    quotes: Vec<char>,
    line_comment: Option<String>,
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexer {
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
            keywords: Vec::new(),
            quotes: DEFAULT_QUOTES.to_vec(),
            line_comment: None,
        }
    }

    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols.extend(symbols.into_iter().map(Into::into));
        sort_longest_first(&mut self.symbols);
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
        sort_longest_first(&mut self.keywords);
        self
    }

    /// Replace the set of quote characters.
    pub fn with_quotes<I: IntoIterator<Item = char>>(mut self, quotes: I) -> Self {
        self.quotes = quotes.into_iter().collect();
        self
    }

    pub fn with_line_comment<S: Into<String>>(mut self, prefix: S) -> Self {
        let prefix = prefix.into();
        self.line_comment = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Lex the whole source. This never fails: anything unrecognized becomes a
    /// one-character symbol and it's up to whoever reads the tokens to complain.
    pub fn tokenize(&self, source: &str) -> TokenStream {
        let mut state = State {
            source,
            tokens: vec![Token {
                class: TokenClass::Bos,
                text: String::new(),
                span: 0..0,
                line: 1,
                column: 1,
            }],
            line: 1,
            line_start: 0,
        };

        let mut pos = 0;
        while pos < source.len() {
            let rest = &source[pos..];
            pos = self.lex_one(&mut state, pos, rest);
        }

        state.push(TokenClass::Eof, source.len(), source.len());
        log::trace!("lexed {} tokens", state.tokens.len());
        TokenStream::new(state.tokens)
    }

    /// Lex one token (or, for quoted strings, the whole string) and return where to
    /// continue from.
    fn lex_one(&self, state: &mut State<'_>, pos: usize, rest: &str) -> usize {
        if let Some(len) = newline_len(rest) {
            state.push(TokenClass::Line, pos, pos + len);
            state.newline(pos + len);
            return pos + len;
        }
        if let Some(after) = rest.strip_prefix('\\') {
            if let Some(len) = newline_len(after) {
                // line continuation
                let end = pos + 1 + len;
                state.push(TokenClass::Space, pos, end);
                state.newline(end);
                return end;
            }
        }
        if rest.starts_with(is_blank) {
            let len = rest.find(|c| !is_blank(c)).unwrap_or(rest.len());
            state.push(TokenClass::Space, pos, pos + len);
            return pos + len;
        }
        if let Some(prefix) = &self.line_comment {
            if rest.starts_with(prefix.as_str()) {
                let len = rest.find(&['\r', '\n'][..]).unwrap_or(rest.len());
                state.push(TokenClass::Comment, pos, pos + len);
                return pos + len;
            }
        }

        let first = match rest.chars().next() {
            Some(c) => c,
            None => return pos,
        };

        if self.quotes.contains(&first) {
            return self.lex_quoted(state, pos, first);
        }

        if let Some(keyword) = self
            .keywords
            .iter()
            .find(|kw| rest.starts_with(kw.as_str()) && ends_on_boundary(kw, &rest[kw.len()..]))
        {
            state.push(TokenClass::Keyword, pos, pos + keyword.len());
            return pos + keyword.len();
        }
        if let Some(symbol) = self.symbols.iter().find(|s| rest.starts_with(s.as_str())) {
            state.push(TokenClass::Symbol, pos, pos + symbol.len());
            return pos + symbol.len();
        }
        if is_word(first) {
            let len = rest.find(|c| !is_word(c)).unwrap_or(rest.len());
            state.push(TokenClass::Identifier, pos, pos + len);
            return pos + len;
        }

        state.push(TokenClass::Symbol, pos, pos + first.len_utf8());
        pos + first.len_utf8()
    }

    /// Opening quote, payload as a comment, closing quote if there is one on this line.
    fn lex_quoted(&self, state: &mut State<'_>, pos: usize, quote: char) -> usize {
        let open_end = pos + quote.len_utf8();
        state.push(TokenClass::Symbol, pos, open_end);

        let source = state.source;
        let mut chars = source[open_end..].char_indices();
        let mut payload_end = source.len();
        let mut closed = false;
        while let Some((idx, c)) = chars.next() {
            match c {
                '\\' => {
                    // an escaped newline still ends the string
                    if let Some((next_idx, next)) = chars.next() {
                        if next == '\n' || next == '\r' {
                            payload_end = open_end + next_idx;
                            break;
                        }
                    }
                }
                '\n' | '\r' => {
                    payload_end = open_end + idx;
                    break;
                }
                c if c == quote => {
                    payload_end = open_end + idx;
                    closed = true;
                    break;
                }
                _ => {}
            }
        }

        if payload_end > open_end {
            state.push(TokenClass::Comment, open_end, payload_end);
        }
        if closed {
            let close_end = payload_end + quote.len_utf8();
            state.push(TokenClass::Symbol, payload_end, close_end);
            close_end
        } else {
            payload_end
        }
    }
}

struct State<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    line: usize,
    line_start: usize,
}

impl State<'_> {
    fn push(&mut self, class: TokenClass, start: usize, end: usize) {
        let column = self.source[self.line_start..start].chars().count() + 1;
        self.tokens.push(Token {
            class,
            text: self.source[start..end].to_owned(),
            span: start..end,
            line: self.line,
            column,
        });
    }

    fn newline(&mut self, line_start: usize) {
        self.line += 1;
        self.line_start = line_start;
    }
}

/// Longest first so greedy matching prefers `==` over `=`; ties broken alphabetically.
/// Empty strings are dropped, they would never advance the lexer.
pub fn sort_longest_first(strings: &mut Vec<String>) {
    strings.retain(|s| !s.is_empty());
    strings.sort_unstable_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    strings.dedup();
}

pub fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_blank(c: char) -> bool {
    c == '\r' || (c != '\n' && c.is_whitespace())
}

fn newline_len(s: &str) -> Option<usize> {
    if s.starts_with("\r\n") {
        Some(2)
    } else if s.starts_with('\n') {
        Some(1)
    } else {
        None
    }
}

/// A word-like keyword must not run on into more word characters.
fn ends_on_boundary(keyword: &str, after: &str) -> bool {
    match (keyword.chars().last(), after.chars().next()) {
        (Some(last), Some(next)) => !(is_word(last) && is_word(next)),
        _ => true,
    }
}

#[cfg(test)]
fn classes(tokens: &TokenStream) -> Vec<(TokenClass, &str)> {
    tokens
        .iter()
        .map(|t| (t.class, t.text.as_str()))
        .collect()
}

#[test]
fn longest_symbol_wins() {
    let lexer = Lexer::new().with_symbols(["=", "==", "<"]);
    let tokens = lexer.tokenize("a==b=c");
    let significant = tokens.significant().map(|t| t.text.as_str()).collect::<Vec<_>>();
    assert_eq!(significant, ["a", "==", "b", "=", "c"]);
}

#[test]
fn keywords_respect_word_boundaries() {
    let lexer = Lexer::new().with_keywords(["if"]);
    let tokens = lexer.tokenize("if iffy");
    assert_eq!(
        classes(&tokens),
        [
            (TokenClass::Bos, ""),
            (TokenClass::Keyword, "if"),
            (TokenClass::Space, " "),
            (TokenClass::Identifier, "iffy"),
            (TokenClass::Eof, ""),
        ]
    );
}

#[test]
fn quoted_strings_split_into_delimiters_and_payload() {
    let tokens = Lexer::new().tokenize(r#"x "a\"b" ''"#);
    assert_eq!(
        classes(&tokens)[2..],
        [
            (TokenClass::Space, " "),
            (TokenClass::Symbol, "\""),
            (TokenClass::Comment, r#"a\"b"#),
            (TokenClass::Symbol, "\""),
            (TokenClass::Space, " "),
            (TokenClass::Symbol, "'"),
            (TokenClass::Symbol, "'"),
            (TokenClass::Eof, ""),
        ]
    );
}

#[test]
fn unterminated_string_stops_at_line_end() {
    let tokens = Lexer::new().tokenize("\"abc\nd");
    assert_eq!(
        classes(&tokens)[1..],
        [
            (TokenClass::Symbol, "\""),
            (TokenClass::Comment, "abc"),
            (TokenClass::Line, "\n"),
            (TokenClass::Identifier, "d"),
            (TokenClass::Eof, ""),
        ]
    );
}

#[test]
fn comments_and_continuations() {
    let tokens = Lexer::new().with_line_comment("#").tokenize("a # hi\nb \\\nc");
    let lines = tokens
        .iter()
        .filter(|t| t.is_identifier())
        .map(|t| (t.text.as_str(), t.line, t.column))
        .collect::<Vec<_>>();
    assert_eq!(lines, [("a", 1, 1), ("b", 2, 1), ("c", 3, 1)]);
    assert_eq!(tokens.iter().filter(|t| t.is_line()).count(), 1);
    assert!(tokens.iter().any(|t| t.is_comment() && t.has_text("# hi")));
}

#[test]
fn numbers_are_identifiers_and_punctuation() {
    let tokens = Lexer::new().tokenize("0x1A.2p+3");
    let significant = tokens
        .significant()
        .map(|t| (t.class, t.text.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        significant,
        [
            (TokenClass::Identifier, "0x1A"),
            (TokenClass::Symbol, "."),
            (TokenClass::Identifier, "2p"),
            (TokenClass::Symbol, "+"),
            (TokenClass::Identifier, "3"),
        ]
    );
}

#[test]
fn sorting_is_longest_then_alphabetical() {
    let mut strings = vec!["=".to_owned(), "<=".to_owned(), "==".to_owned(), "=".to_owned()];
    sort_longest_first(&mut strings);
    assert_eq!(strings, ["<=", "==", "="]);
}
