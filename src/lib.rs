//! # binred
//!
//! Describe a language with a small EBNF-like grammar, then check text against it.
//!
//! ```text
//! ROOT := pair* EOF
//! pair := ID "=" [ NUMBER | STRING ] ";"!
//! ```
//!
//! A [`Grammar`] is compiled once from its source. It knows the rules and every literal
//! they mention, which is enough to build a [`Lexer`](lex::Lexer) for the described
//! language. Matching walks the rules over the lexed tokens with an explicit stack and
//! reports what it saw to a [`Semantics`], which can veto things as it goes.

mod diagnostic;
pub mod grammar;
pub mod lex;
pub mod matcher;
mod repl;
pub mod token;

pub use diagnostic::{Diagnostic, MatchError, MostReach};
pub use grammar::{GrammarError, GrammarErrorInfo, RuleTable};
pub use matcher::{
    from_fn, AcceptAll, Event, MatchOptions, MatchOutcome, Matched, Matcher, MatchingContext,
    Semantics, Trace, Verdict,
};

use lex::Lexer;

/// A compiled grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) rules: RuleTable,
    /// Punctuation literals, longest first.
    pub(crate) symbols: Vec<String>,
    /// Word-like literals, longest first.
    pub(crate) keywords: Vec<String>,
}

impl Grammar {
    /// Compile grammar source. `source_name` is only used for error reports.
    pub fn compile(source: &str, source_name: &str) -> Result<Self, GrammarError> {
        grammar::compile(source, source_name)
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// A lexer for the language this grammar describes.
    pub fn lexer(&self) -> Lexer {
        Lexer::new()
            .with_symbols(self.symbols.iter().cloned())
            .with_keywords(self.keywords.iter().cloned())
    }

    pub fn matcher(&self) -> Matcher<'_> {
        Matcher::new(&self.rules)
    }

    /// Lex `text` with `lexer` and match all of it.
    pub fn parse<S: Semantics + ?Sized>(
        &self,
        lexer: &Lexer,
        text: &str,
        options: MatchOptions,
        semantics: &mut S,
    ) -> MatchOutcome {
        let tokens = lexer.tokenize(text);
        let mut reader = tokens.reader();
        self.matcher()
            .with_options(options)
            .run(&mut reader, semantics)
    }
}

#[test]
fn literals_feed_the_lexer() {
    let grammar = Grammar::compile(
        r#"ROOT := "let" ID "=" [ "==" ID | NUMBER ] ";""#,
        "test.grammar",
    )
    .unwrap();
    assert_eq!(grammar.symbols(), ["==", ";", "="]);
    assert_eq!(grammar.keywords(), ["let"]);

    let lexer = grammar.lexer();
    let tokens = lexer.tokenize("let x == y;");
    let texts: Vec<_> = tokens.significant().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, ["let", "x", "==", "y", ";"]);

    let outcome = grammar.parse(&lexer, "let x = 5;", MatchOptions::default(), &mut AcceptAll);
    assert!(outcome.is_success());
    let outcome = grammar.parse(&lexer, "let x = ;", MatchOptions::default(), &mut AcceptAll);
    assert!(outcome.into_result().is_err());
}
