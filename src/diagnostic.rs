//! Reporting why a match failed.
//!
//! A backtracking matcher tries lots of things that fail, and the last failure is rarely
//! the interesting one. So every local failure is offered to a [`MostReach`], which only
//! keeps it if it happened further into the input than anything before it. When the whole
//! match fails, that furthest failure is what gets reported.

use std::ops::Range;

use ariadne::{CharSet, Label, Report, ReportKind};
use thiserror::Error;

use crate::token::TokenStream;

/// The deepest failure seen so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MostReach {
    /// Raw token index the failure happened at.
    pub position: usize,
    pub message: String,
    /// Innermost rule at the time.
    pub rule: String,
}

impl MostReach {
    /// Keep `candidate` if it got strictly further than what's stored.
    pub fn offer(reach: &mut Option<MostReach>, candidate: MostReach) -> bool {
        match reach {
            Some(current) if candidate.position <= current.position => false,
            _ => {
                log::trace!(
                    "furthest failure now at {}: {}",
                    candidate.position,
                    candidate.message
                );
                *reach = Some(candidate);
                true
            }
        }
    }
}

/// A located, user-facing explanation of a failed match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub position: usize,
    /// Byte range of the offending token.
    pub span: Range<usize>,
    /// 1-based.
    pub line: usize,
    /// 1-based.
    pub column: usize,
    pub message: String,
    pub rule: String,
    /// What the abandoned alternatives said, one line each.
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub(crate) fn at(tokens: &TokenStream, reach: MostReach) -> Self {
        let token = tokens.get_or_eof(reach.position);
        Self {
            position: reach.position,
            span: token.span.clone(),
            line: token.line,
            column: token.column,
            message: reach.message,
            rule: reach.rule,
            notes: Vec::new(),
        }
    }

    pub(crate) fn with_notes<S: AsRef<str>>(mut self, notes: S) -> Self {
        let notes = notes.as_ref();
        if notes != self.message {
            self.notes = notes.lines().map(str::to_owned).collect();
        }
        self
    }
}

/// A failed match as an error value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("{}:{}: {}", .0.line, .0.column, .0.message)]
    Failure(Diagnostic),
    #[error("{}:{}: fatal: {}", .0.line, .0.column, .0.message)]
    Fatal(Diagnostic),
}

impl MatchError {
    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            MatchError::Failure(diagnostic) | MatchError::Fatal(diagnostic) => diagnostic,
        }
    }

    pub fn report(&self, source_name: &str) -> Report<(String, Range<usize>)> {
        let diagnostic = self.diagnostic();
        let mut report = Report::build(ReportKind::Error, source_name, diagnostic.span.start)
            .with_config(ariadne::Config::default().with_char_set(CharSet::Ascii))
            .with_message(match self {
                MatchError::Failure(_) => "input does not match the grammar",
                MatchError::Fatal(_) => "matching was aborted",
            })
            .with_label(
                Label::new((source_name.to_owned(), diagnostic.span.clone()))
                    .with_message(&diagnostic.message),
            );

        let mut note = format!("while matching rule `{}`", diagnostic.rule);
        for line in &diagnostic.notes {
            note.push('\n');
            note.push_str(line);
        }
        report = report.with_note(note);

        report.finish()
    }
}

#[test]
fn only_strictly_further_failures_are_kept() {
    let failure = |position, message: &str| MostReach {
        position,
        message: message.to_owned(),
        rule: "ROOT".to_owned(),
    };

    let mut reach = None;
    assert!(MostReach::offer(&mut reach, failure(3, "first")));
    assert!(!MostReach::offer(&mut reach, failure(3, "same place")));
    assert!(!MostReach::offer(&mut reach, failure(1, "earlier")));
    assert!(MostReach::offer(&mut reach, failure(5, "later")));
    assert_eq!(reach.unwrap().message, "later");
}
