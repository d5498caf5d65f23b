//! # Matching
//!
//! A [`Matcher`] runs a compiled [`RuleTable`](crate::grammar::RuleTable) against the tokens
//! under a [`Reader`](crate::token::Reader), starting at `ROOT`.
//!
//! Rules are not matched by calling functions recursively. Every rule reference and every
//! alternation pushes a frame onto an explicit stack, and when a frame runs out of elements
//! or fails, its result is handed to the frame below it in the same step. That keeps the
//! nesting depth a plain number we can check against [`MatchOptions::recursion_limit`]
//! instead of something that blows the native stack.
//!
//! Whoever drives the match gets told what happens through [`Semantics`]: every rule
//! entered and left, every token consumed, and every time the reader is wound back because
//! a branch was abandoned. Each of those may be accepted, rejected (which counts as that
//! element not matching) or turned into a fatal error.
mod execute;
mod number;
mod terminal;

pub use execute::Matcher;

use std::{fmt, ops::Range};

use derivative::Derivative;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{diagnostic::Diagnostic, token::TokenClass, MatchError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Most frames that may be on the stack at once, `ROOT` included.
    pub recursion_limit: usize,
    /// Whether `ROOT` has to be followed by the end of input.
    pub require_eof: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            recursion_limit: 1000,
            require_eof: true,
        }
    }
}

/// What a [`Semantics`] thinks of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(i8)]
pub enum Verdict {
    /// Stop matching altogether.
    Fatal = -1,
    /// Treat the element as not matching, and roll back.
    Reject = 0,
    Accept = 1,
}

/// A token consumed by a terminal. For `NUMBER` and `STRING` this spans several raw tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched {
    pub class: TokenClass,
    /// For strings, the text between the quotes.
    pub text: String,
    pub span: Range<usize>,
    /// Index of the first raw token.
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<'e> {
    Enter { rule: &'e str },
    Leave { rule: &'e str },
    Token(&'e Matched),
    /// The reader went back to this position; anything consumed after it was undone.
    Rewind { position: usize },
}

/// What a [`Semantics`] gets to see while handling an event.
#[derive(Debug)]
pub struct MatchingContext<'m> {
    scopes: &'m [&'m str],
    position: usize,
    token: Option<&'m Matched>,
    error: Option<String>,
}

impl<'m> MatchingContext<'m> {
    pub(crate) fn new(scopes: &'m [&'m str], position: usize, token: Option<&'m Matched>) -> Self {
        Self {
            scopes,
            position,
            token,
            error: None,
        }
    }

    /// Names of the rules being matched, outermost (`ROOT`) first.
    pub fn scopes(&self) -> &[&'m str] {
        self.scopes
    }

    /// The innermost rule.
    pub fn scope(&self) -> Option<&'m str> {
        self.scopes.last().copied()
    }

    /// Raw token index of the reader.
    pub fn position(&self) -> usize {
        self.position
    }

    /// The token being handed over, for [`Event::Token`].
    pub fn token(&self) -> Option<&'m Matched> {
        self.token
    }

    /// Explain a [`Verdict::Reject`] or [`Verdict::Fatal`].
    pub fn set_error<S: Into<String>>(&mut self, message: S) {
        self.error = Some(message.into());
    }

    pub(crate) fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }
}

/// Receives events while a match runs.
pub trait Semantics {
    fn on_event(&mut self, ctx: &mut MatchingContext<'_>, event: &Event<'_>) -> Verdict;
}

impl<S: Semantics + ?Sized> Semantics for &mut S {
    fn on_event(&mut self, ctx: &mut MatchingContext<'_>, event: &Event<'_>) -> Verdict {
        (**self).on_event(ctx, event)
    }
}

/// Semantics that accepts everything; for when only the outcome matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Semantics for AcceptAll {
    fn on_event(&mut self, _: &mut MatchingContext<'_>, _: &Event<'_>) -> Verdict {
        Verdict::Accept
    }
}

/// Semantics backed by a closure. See [`from_fn`].
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct FromFn<F> {
    #[derivative(Debug(format_with = "closure_formatter"))]
    func: F,
}

fn closure_formatter<F>(_: &F, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    write!(f, "fn(...)")
}

/// Wrap a closure as [`Semantics`].
pub fn from_fn<F>(func: F) -> FromFn<F>
where
    F: FnMut(&mut MatchingContext<'_>, &Event<'_>) -> Verdict,
{
    FromFn { func }
}

impl<F> Semantics for FromFn<F>
where
    F: FnMut(&mut MatchingContext<'_>, &Event<'_>) -> Verdict,
{
    fn on_event(&mut self, ctx: &mut MatchingContext<'_>, event: &Event<'_>) -> Verdict {
        (self.func)(ctx, event)
    }
}

/// Semantics that accepts everything and writes down what happened, one line per event,
/// indented by how deep in the rules it was.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    lines: Vec<String>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl Semantics for Trace {
    fn on_event(&mut self, ctx: &mut MatchingContext<'_>, event: &Event<'_>) -> Verdict {
        // scopes already include the rule on enter and still include it on leave
        let depth = ctx.scopes().len();
        let line = match event {
            Event::Enter { rule } => format!("{}{} {{", "  ".repeat(depth.saturating_sub(1)), rule),
            Event::Leave { rule } => format!("{}}} {}", "  ".repeat(depth.saturating_sub(1)), rule),
            Event::Token(matched) => format!(
                "{}{} {:?} @{}",
                "  ".repeat(depth),
                matched.class,
                matched.text,
                matched.position
            ),
            Event::Rewind { position } => {
                format!("{}<- back to token {}", "  ".repeat(depth), position)
            }
        };
        self.lines.push(line);
        Verdict::Accept
    }
}

/// How a match ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Success,
    /// Nothing matched; the diagnostic is the furthest any branch got.
    Failure(Diagnostic),
    /// Something unrecoverable happened and matching stopped on the spot.
    Fatal(Diagnostic),
}

impl MatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MatchOutcome::Success)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, MatchOutcome::Fatal(_))
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            MatchOutcome::Success => None,
            MatchOutcome::Failure(diagnostic) | MatchOutcome::Fatal(diagnostic) => Some(diagnostic),
        }
    }

    pub fn into_result(self) -> Result<(), MatchError> {
        match self {
            MatchOutcome::Success => Ok(()),
            MatchOutcome::Failure(diagnostic) => Err(MatchError::Failure(diagnostic)),
            MatchOutcome::Fatal(diagnostic) => Err(MatchError::Fatal(diagnostic)),
        }
    }
}

#[test]
fn verdicts_round_trip_through_i8() {
    use std::convert::TryFrom;

    assert_eq!(i8::from(Verdict::Fatal), -1);
    assert_eq!(Verdict::try_from(0i8).unwrap(), Verdict::Reject);
    assert!(Verdict::try_from(2i8).is_err());
}

#[test]
fn traces_nest_by_rule() {
    let grammar = crate::Grammar::compile("ROOT := Item\nItem := ID", "test.grammar").unwrap();
    let mut trace = Trace::new();
    let outcome = grammar.parse(&grammar.lexer(), "x", MatchOptions::default(), &mut trace);

    assert!(outcome.is_success());
    assert_eq!(
        trace.lines(),
        [
            "ROOT {",
            "  Item {",
            "    identifier \"x\" @1",
            "  } Item",
            "} ROOT",
        ]
    );
}
