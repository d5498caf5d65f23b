//! Matching a single terminal node against the reader.

use super::{number, Matched};
use crate::{
    grammar::{KeywordClass, Node, Syntax},
    lex::DEFAULT_QUOTES,
    token::{Reader, Token, TokenClass},
};

/// A terminal didn't match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Miss {
    /// Raw token index where it went wrong.
    pub position: usize,
    pub message: String,
}

impl Miss {
    pub fn new<S: Into<String>>(position: usize, message: S) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

pub(crate) type TerminalResult = Result<Matched, Miss>;

/// Try the terminal node. On a miss the reader is left wherever it got to; rewinding is
/// the caller's business.
pub(crate) fn match_terminal(reader: &mut Reader<'_>, node: &Node) -> TerminalResult {
    let adjacent = node.modifiers.adjacent;
    match &node.syntax {
        Syntax::Literal(literal) => {
            let (position, token) = next(reader, adjacent);
            let wordlike = matches!(
                token.class,
                TokenClass::Symbol | TokenClass::Keyword | TokenClass::Identifier
            );
            if wordlike && token.has_text(literal) {
                Ok(single(position, token, token.class))
            } else {
                Err(Miss::new(
                    position,
                    format!("expected `{}` but found {}", literal, token),
                ))
            }
        }
        Syntax::Class(class) => match class {
            KeywordClass::Number => number::scan_number(reader, adjacent),
            KeywordClass::String => scan_string(reader, adjacent),
            KeywordClass::Id => by_class(reader, adjacent, *class, |token| {
                token.is_identifier() && !token.text.starts_with(|c: char| c.is_ascii_digit())
            }),
            KeywordClass::Integer => by_class(reader, adjacent, *class, number::is_integer),
            KeywordClass::Keyword => by_class(reader, adjacent, *class, Token::is_keyword),
            KeywordClass::Symbol => by_class(reader, adjacent, *class, Token::is_symbol),
            KeywordClass::Eof => by_class(reader, adjacent, *class, Token::is_eof),
            KeywordClass::Eol => by_class(reader, adjacent, *class, Token::is_line),
        },
        Syntax::Ref(_) | Syntax::Or { .. } => Err(Miss::new(
            reader.position(),
            format!("`{}` is not a terminal", node),
        )),
    }
}

/// Read the next token, skipping insignificant ones unless `adjacent`.
/// Returns it along with its raw index.
pub(crate) fn next<'s>(reader: &mut Reader<'s>, adjacent: bool) -> (usize, &'s Token) {
    if adjacent {
        // nothing can be adjacent to the start of the input
        if reader.peek_adjacent().class == TokenClass::Bos {
            reader.consume();
        }
        (reader.position(), reader.read_adjacent())
    } else {
        (reader.significant_position(), reader.read_or_eof())
    }
}

/// A single token satisfying `hit`.
fn by_class(
    reader: &mut Reader<'_>,
    adjacent: bool,
    class: KeywordClass,
    hit: impl Fn(&Token) -> bool,
) -> TerminalResult {
    let (position, token) = next(reader, adjacent);
    if !hit(token) {
        return Err(Miss::new(
            position,
            format!("expected {} but found {}", class.description(), token),
        ));
    }
    let matched = match class {
        KeywordClass::Integer => TokenClass::Integer,
        _ => token.class,
    };
    Ok(single(position, token, matched))
}

fn single(position: usize, token: &Token, class: TokenClass) -> Matched {
    Matched {
        class,
        text: token.text.clone(),
        span: token.span.clone(),
        position,
    }
}

/// Opening quote, an optional payload, and the same quote again, with nothing in between.
///
/// The lexer only ends a payload at its own quote, so a different closing quote is part
/// of the payload and the string reads as unterminated.
fn scan_string(reader: &mut Reader<'_>, adjacent: bool) -> TerminalResult {
    let (position, open) = next(reader, adjacent);
    if !(open.is_symbol() && is_quote(&open.text)) {
        return Err(Miss::new(
            position,
            format!("expected a string but found {}", open),
        ));
    }

    let mut text = String::new();
    if reader.peek_adjacent().is_comment() {
        text = reader.read_adjacent().text.clone();
    }

    let close_position = reader.position();
    let close = reader.read_adjacent();
    if close.is_symbol() && close.has_text(&open.text) {
        Ok(Matched {
            class: TokenClass::String,
            text,
            span: open.span.start..close.span.end,
            position,
        })
    } else {
        Err(Miss::new(
            close_position,
            format!("unterminated string, expected a closing `{}`", open.text),
        ))
    }
}

fn is_quote(text: &str) -> bool {
    let mut chars = text.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if DEFAULT_QUOTES.contains(&c))
}
