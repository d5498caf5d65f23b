//! `NUMBER` and `INTEGER`.
//!
//! The lexer doesn't know about numbers, so `0x1A.2p+3` arrives as `0x1A`, `.`, `2p`, `+`,
//! `3`. The scanner walks those tokens (which must touch each other) and reassembles the
//! lexeme, checking the shape as it goes:
//!
//! - an integer part, required; `0x`/`0X` makes everything base 16
//! - optionally a `.` and a fractional part
//! - optionally an exponent: `e`/`E` for decimal, `p`/`P` for hex, with an optional sign
//!   and decimal digits
//!
//! Hex numbers with a fractional part need the exponent.

use std::ops::Range;

use super::{
    terminal::{next, Miss, TerminalResult},
    Matched,
};
use crate::token::{Reader, Token, TokenClass};

/// `INTEGER`: one identifier token made only of digits of its base.
pub(crate) fn is_integer(token: &Token) -> bool {
    if !token.is_identifier() {
        return false;
    }
    match hex_digits(&token.text) {
        Some(digits) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()),
        None => token.text.chars().all(|c| c.is_ascii_digit()),
    }
}

fn hex_digits(word: &str) -> Option<&str> {
    word.strip_prefix("0x").or_else(|| word.strip_prefix("0X"))
}

/// How a run of mantissa digits ended.
enum Digits<'a> {
    /// Ran out of characters.
    End,
    /// Hit the exponent marker; this is what followed it.
    Exponent(&'a str),
}

struct Scanner<'r, 's> {
    reader: &'r mut Reader<'s>,
    start: usize,
    position: usize,
    /// Raw index of the token read last.
    last: usize,
    hex: bool,
    text: String,
    end: usize,
}

pub(crate) fn scan_number(reader: &mut Reader<'_>, adjacent: bool) -> TerminalResult {
    let (position, first) = next(reader, adjacent);
    if !first.is_identifier() || !first.text.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(Miss::new(
            position,
            format!("expected a number but found {}", first),
        ));
    }

    let (hex, integer) = match hex_digits(&first.text) {
        Some(digits) => (true, digits),
        None => (false, first.text.as_str()),
    };
    let mut scanner = Scanner {
        reader,
        start: first.span.start,
        position,
        last: position,
        hex,
        text: first.text.clone(),
        end: first.span.end,
    };
    scanner.scan(integer)?;

    let span = scanner.span();
    Ok(Matched {
        class: TokenClass::Number,
        text: scanner.text,
        span,
        position,
    })
}

impl<'r, 's> Scanner<'r, 's> {
    fn scan(&mut self, integer: &str) -> Result<(), Miss> {
        match self.mantissa(integer, self.position, "the integer part")? {
            Digits::Exponent(rest) => return self.exponent(rest),
            Digits::End => {}
        }

        if !self.next_is(".") {
            return Ok(());
        }
        self.take();

        let (position, fraction) = self.read();
        if !fraction.is_identifier() {
            return Err(Miss::new(
                position,
                format!("expected digits after `.` but found {}", fraction),
            ));
        }
        self.push(fraction);
        match self.mantissa(&fraction.text, position, "the fractional part")? {
            Digits::Exponent(rest) => self.exponent(rest),
            Digits::End if self.hex => Err(Miss::new(
                position,
                "invalid hex float format: expected a `p` exponent after the fractional part",
            )),
            Digits::End => self.no_trailing_dot("unexpected second `.` in number"),
        }
    }

    /// Digits of the current base, up to an exponent marker. There must be at least one.
    fn mantissa<'w>(&self, word: &'w str, position: usize, what: &str) -> Result<Digits<'w>, Miss> {
        let hex = self.hex;
        let mut digits = 0;
        for (idx, c) in word.char_indices() {
            if (hex && (c == 'p' || c == 'P')) || (!hex && (c == 'e' || c == 'E')) {
                if digits == 0 {
                    break;
                }
                return Ok(Digits::Exponent(&word[idx + 1..]));
            }
            let valid = if hex {
                c.is_ascii_hexdigit()
            } else {
                c.is_ascii_digit()
            };
            if !valid {
                return Err(Miss::new(
                    position,
                    format!(
                        "invalid digit `{}` in {} of a {} number",
                        c,
                        what,
                        if hex { "hex" } else { "decimal" }
                    ),
                ));
            }
            digits += 1;
        }
        if digits == 0 {
            return Err(Miss::new(
                position,
                format!(
                    "expected {} digits in {}",
                    if hex { "hex" } else { "decimal" },
                    what
                ),
            ));
        }
        Ok(Digits::End)
    }

    /// The marker is already consumed; `rest` is whatever followed it in the same token.
    fn exponent(&mut self, rest: &str) -> Result<(), Miss> {
        if rest.is_empty() {
            let sign = self.reader.peek_adjacent();
            if sign.is_symbol() && (sign.has_text("+") || sign.has_text("-")) {
                self.take();
            }
            let (position, digits) = self.read();
            if !(digits.is_identifier() && all_decimal(&digits.text)) {
                return Err(Miss::new(
                    position,
                    format!("expected exponent digits but found {}", digits),
                ));
            }
            self.push(digits);
        } else if !all_decimal(rest) {
            return Err(Miss::new(
                self.last,
                format!("invalid exponent `{}`", rest),
            ));
        }
        self.no_trailing_dot("unexpected `.` after the exponent")
    }

    fn no_trailing_dot(&self, message: &str) -> Result<(), Miss> {
        if self.next_is(".") {
            Err(Miss::new(self.reader.position(), message))
        } else {
            Ok(())
        }
    }

    fn next_is(&self, text: &str) -> bool {
        let token = self.reader.peek_adjacent();
        token.is_symbol() && token.has_text(text)
    }

    /// Consume the adjacent token and add it to the lexeme.
    fn take(&mut self) {
        let (_, token) = self.read();
        self.push(token);
    }

    fn read(&mut self) -> (usize, &'s Token) {
        self.last = self.reader.position();
        (self.last, self.reader.read_adjacent())
    }

    fn push(&mut self, token: &Token) {
        self.text.push_str(&token.text);
        self.end = token.span.end;
    }

    fn span(&self) -> Range<usize> {
        self.start..self.end
    }
}

fn all_decimal(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
fn scan(source: &str) -> TerminalResult {
    let tokens = crate::lex::Lexer::new().tokenize(source);
    let mut reader = tokens.reader();
    scan_number(&mut reader, false)
}

#[test]
fn decimal_numbers() {
    assert_eq!(scan("42").unwrap().text, "42");
    assert_eq!(scan("3.25").unwrap().text, "3.25");
    assert_eq!(scan("1e10").unwrap().text, "1e10");
    assert_eq!(scan("6.02e+23").unwrap().text, "6.02e+23");
    assert_eq!(scan("1E-5").unwrap().text, "1E-5");
}

#[test]
fn hex_numbers() {
    assert_eq!(scan("0xff").unwrap().text, "0xff");
    assert_eq!(scan("0x1p4").unwrap().text, "0x1p4");

    let float = scan("0x1A.2p+3").unwrap();
    assert_eq!(float.text, "0x1A.2p+3");
    assert_eq!(float.class, TokenClass::Number);
    assert_eq!(float.span, 0..9);

    let miss = scan("0x1A.2").unwrap_err();
    assert!(miss.message.contains("invalid hex float format"));
    assert!(scan("0x").is_err());
    assert!(scan("0xfg").is_err());
}

#[test]
fn malformed_numbers() {
    // BOS 1 . 2 . 3
    let miss = scan("1.2.3").unwrap_err();
    assert_eq!(miss.position, 4);
    assert!(miss.message.contains("second `.`"));

    assert!(scan("1.").unwrap_err().message.contains("after `.`"));
    assert!(scan("1e+").unwrap_err().message.contains("exponent digits"));
    assert!(scan("12ab").is_err());
    assert!(scan("abc").is_err());
}

#[test]
fn numbers_must_be_contiguous() {
    // the space ends the number before the fraction
    let tokens = crate::lex::Lexer::new().tokenize("1 .5");
    let mut reader = tokens.reader();
    assert_eq!(scan_number(&mut reader, false).unwrap().text, "1");
    assert!(reader.read_or_eof().has_text("."));

    assert!(scan("1. 5").is_err());
}

#[test]
fn integers() {
    let tokens = crate::lex::Lexer::new().tokenize("17 0x1F 0x 1.5 x1");
    let verdicts: Vec<_> = tokens
        .iter()
        .filter(|t| t.is_identifier())
        .map(is_integer)
        .collect();
    // `1.5` lexes as `1`, `.`, `5`
    assert_eq!(verdicts, [true, true, false, true, true, false]);
}
