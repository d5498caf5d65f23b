use std::{fmt::Debug, ops::Range};

use ariadne::{CharSet, Label, Report, ReportKind};
use thiserror::Error;

use super::{KeywordClass, Modifiers, Node, RuleTable, Syntax};
use crate::{
    lex::{self, Lexer},
    token::{Reader, Token, TokenClass},
    Grammar,
};

/// Error when compiling a grammar.
#[derive(Error)]
#[error("{source:}")]
pub struct GrammarError {
    source: GrammarErrorInfo,
    span: Range<usize>,
    line: usize,
    column: usize,
    report: Report<(String, Range<usize>)>,
}

impl GrammarError {
    fn new(source_name: &str, err: GrammarErrorLimited) -> GrammarError {
        let GrammarErrorLimited { data, offender } = err;
        let span = offender.span.clone();

        let mut report = Report::build(ReportKind::Error, source_name, span.start)
            .with_config(ariadne::Config::default().with_char_set(CharSet::Ascii))
            .with_message(data.to_string());

        let all = (source_name.to_owned(), span.clone());

        match &data {
            GrammarErrorInfo::ExpectedRuleName { .. } => {
                report = report
                    .with_label(Label::new(all).with_message("a rule name should go here"))
                    .with_note("rules look like `name := element element ...`");
            }
            GrammarErrorInfo::ExpectedDefine { name, .. } => {
                report = report
                    .with_label(Label::new(all).with_message("expected `:=` here"))
                    .with_note(format!("try `{} := ...`", name));
            }
            GrammarErrorInfo::UnterminatedLiteral { quote } => {
                report = report
                    .with_label(Label::new(all).with_message(format!(
                        "this {:?} expects a {:?} to close it on the same line, but there wasn't one",
                        quote, quote
                    )))
                    .with_note(format!("try putting a {:?} at the end", quote));
            }
            GrammarErrorInfo::EmptyLiteral => {
                report = report.with_label(
                    Label::new(all).with_message("an empty literal can never match a token"),
                );
            }
            GrammarErrorInfo::UnexpectedEndOfAlternation => {
                report = report
                    .with_label(Label::new(all).with_message("this `[` is never closed"))
                    .with_note("try putting a `]` at the end");
            }
            GrammarErrorInfo::EmptyBranch { index } => {
                report = report
                    .with_label(
                        Label::new(all)
                            .with_message(format!("alternative {} has nothing in it", index)),
                    )
                    .with_note("make the whole alternation optional with `?` instead");
            }
            GrammarErrorInfo::EmptyRule { .. } => {
                report = report.with_label(
                    Label::new(all).with_message("expected at least one element after `:=`"),
                );
            }
            GrammarErrorInfo::Redefinition { previous_line, .. } => {
                report = report
                    .with_label(Label::new(all).with_message("this name is already taken"))
                    .with_note(format!("it was first defined on line {}", previous_line));
            }
            GrammarErrorInfo::DuplicateModifier(modifier) => {
                report = report
                    .with_label(
                        Label::new(all)
                            .with_message(format!("{:?} was already applied here", modifier)),
                    )
                    .with_note("each modifier may appear once per element");
            }
            GrammarErrorInfo::OnceEachOutsideAlternation => {
                report = report
                    .with_label(Label::new(all).with_message("this `$` has no `[ ... ]` before it"));
            }
            GrammarErrorInfo::UnexpectedToken { .. } => {
                report = report.with_label(
                    Label::new(all).with_message("this doesn't start an element"),
                );
            }
        }

        GrammarError {
            report: report.finish(),
            source: data,
            span,
            line: offender.line,
            column: offender.column,
        }
    }

    pub fn report(&self) -> &Report<(String, Range<usize>)> {
        &self.report
    }

    /// Get a reference to the grammar error's source.
    pub fn source(&self) -> &GrammarErrorInfo {
        &self.source
    }

    /// Byte range of the offending token in the grammar source.
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// 1-based line and column of the offending token.
    pub fn location(&self) -> (usize, usize) {
        (self.line, self.column)
    }
}

impl Debug for GrammarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrammarError")
            .field("source", &self.source)
            .field("line", &self.line)
            .field("column", &self.column)
            .finish()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarErrorInfo {
    #[error("expected a rule name but found {found}")]
    ExpectedRuleName { found: String },
    #[error("expected `:=` after the rule name `{name}` but found {found}")]
    ExpectedDefine { name: String, found: String },
    #[error("unterminated literal")]
    UnterminatedLiteral { quote: char },
    #[error("empty literal")]
    EmptyLiteral,
    #[error("unexpected end of alternation")]
    UnexpectedEndOfAlternation,
    #[error("empty alternative")]
    EmptyBranch { index: usize },
    #[error("rule `{name}` has no elements")]
    EmptyRule { name: String },
    #[error("redefinition of rule `{name}`")]
    Redefinition { name: String, previous_line: usize },
    #[error("duplicate modifier {0:?}")]
    DuplicateModifier(char),
    #[error("`$` only applies to alternations")]
    OnceEachOutsideAlternation,
    #[error("unexpected {found}")]
    UnexpectedToken { found: String },
}

struct GrammarErrorLimited {
    data: GrammarErrorInfo,
    offender: Token,
}

type CompileResult<T> = Result<T, GrammarErrorLimited>;

const SYMBOLS: [&str; 9] = [":=", "?", "[", "]", "*", "|", "$", "!", "~"];
const QUOTES: [char; 2] = ['"', '\''];

/// The lexer used to read grammar files themselves.
fn grammar_lexer() -> Lexer {
    Lexer::new()
        .with_symbols(SYMBOLS)
        .with_keywords(KeywordClass::ALL.iter().map(|class| class.tag()))
        .with_quotes(QUOTES)
        .with_line_comment("#")
}

/// Compile grammar source into a [`Grammar`].
pub fn compile(source: &str, source_name: &str) -> Result<Grammar, GrammarError> {
    let tokens = grammar_lexer().tokenize(source);
    let mut reader = tokens.reader();
    reader.set_skip_lines(false);

    let mut builder = Builder {
        reader,
        rules: RuleTable::new(),
        symbols: Vec::new(),
        keywords: Vec::new(),
    };
    builder
        .write_rules()
        .map_err(|err| GrammarError::new(source_name, err))?;

    let Builder {
        rules,
        mut symbols,
        mut keywords,
        ..
    } = builder;
    lex::sort_longest_first(&mut symbols);
    lex::sort_longest_first(&mut keywords);

    log::debug!(
        "compiled {} rules from {} ({} symbols, {} keywords)",
        rules.len(),
        source_name,
        symbols.len(),
        keywords.len()
    );
    Ok(Grammar {
        rules,
        symbols,
        keywords,
    })
}

/// Where a sequence of elements stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    /// At the end of the line.
    Line,
    /// At a `|` or `]`.
    Bracket,
}

struct Builder<'s> {
    reader: Reader<'s>,
    rules: RuleTable,
    symbols: Vec<String>,
    keywords: Vec<String>,
}

impl<'s> Builder<'s> {
    fn write_rules(&mut self) -> CompileResult<()> {
        loop {
            let name = self.reader.read_or_eof();
            match name.class {
                TokenClass::Line => continue,
                TokenClass::Eof => return Ok(()),
                TokenClass::Identifier if !name.text.starts_with(|c: char| c.is_ascii_digit()) => {}
                _ => {
                    return Err(limited(
                        GrammarErrorInfo::ExpectedRuleName {
                            found: name.to_string(),
                        },
                        name,
                    ))
                }
            }

            let define = self.reader.read_or_eof();
            if !(define.is_symbol() && define.has_text(":=")) {
                return Err(limited(
                    GrammarErrorInfo::ExpectedDefine {
                        name: name.text.clone(),
                        found: define.to_string(),
                    },
                    define,
                ));
            }

            let nodes = self.write_sequence(Context::Line)?;
            if nodes.is_empty() {
                return Err(limited(
                    GrammarErrorInfo::EmptyRule {
                        name: name.text.clone(),
                    },
                    define,
                ));
            }

            let span = name.span.start..self.last_end();
            log::trace!("rule {} has {} elements", name.text, nodes.len());
            if let Err(previous) = self.rules.insert(name.text.clone(), nodes, span) {
                let previous_span = self.rules.span(previous);
                let previous_line = self
                    .reader
                    .stream()
                    .iter()
                    .find(|t| t.span.start == previous_span.start)
                    .map_or(0, |t| t.line);
                return Err(limited(
                    GrammarErrorInfo::Redefinition {
                        name: name.text.clone(),
                        previous_line,
                    },
                    name,
                ));
            }
        }
    }

    /// Read elements until the end of the context, leaving the terminator unread.
    fn write_sequence(&mut self, context: Context) -> CompileResult<Vec<Node>> {
        let mut nodes = Vec::new();
        loop {
            let next = self.reader.get_or_eof();
            let closes_bracket = next.is_symbol() && (next.has_text("|") || next.has_text("]"));
            match context {
                Context::Line if next.is_line() || next.is_eof() => return Ok(nodes),
                Context::Bracket if closes_bracket => return Ok(nodes),
                Context::Bracket if next.is_eof() => {
                    return Err(limited(GrammarErrorInfo::UnexpectedEndOfAlternation, next))
                }
                _ => {}
            }
            nodes.push(self.write_element()?);
        }
    }

    fn write_element(&mut self) -> CompileResult<Node> {
        let mut modifiers = Modifiers::default();
        let mut token = self.reader.read_or_eof();
        let start = token.span.start;
        if token.is_symbol() && token.has_text("~") {
            modifiers.adjacent = true;
            token = self.reader.read_or_eof();
        }

        let mut syntax = match token.class {
            TokenClass::Symbol if token.text.starts_with(&QUOTES[..]) => self.write_literal(token)?,
            TokenClass::Symbol if token.has_text("[") => self.write_alternation()?,
            TokenClass::Keyword => match KeywordClass::from_tag(&token.text) {
                Some(class) => Syntax::Class(class),
                None => return Err(unexpected(token)),
            },
            TokenClass::Identifier => Syntax::Ref(token.text.clone()),
            _ => return Err(unexpected(token)),
        };

        self.write_suffixes(&mut syntax, &mut modifiers)?;

        Ok(Node {
            syntax,
            modifiers,
            span: start..self.last_end(),
        })
    }

    /// `?`, `*`, `!` and `$`, each at most once, in any order.
    fn write_suffixes(&mut self, syntax: &mut Syntax, modifiers: &mut Modifiers) -> CompileResult<()> {
        loop {
            let next = self.reader.get_or_eof();
            if !next.is_symbol() {
                return Ok(());
            }
            let (flag, modifier) = match next.text.as_str() {
                "?" => (&mut modifiers.optional, '?'),
                "*" => (&mut modifiers.repeat, '*'),
                "!" => (&mut modifiers.fatal, '!'),
                "$" => match syntax {
                    Syntax::Or { once_each, .. } => (once_each, '$'),
                    _ => return Err(limited(GrammarErrorInfo::OnceEachOutsideAlternation, next)),
                },
                _ => return Ok(()),
            };
            if *flag {
                return Err(limited(GrammarErrorInfo::DuplicateModifier(modifier), next));
            }
            *flag = true;
            self.reader.read_or_eof();
        }
    }

    /// The opening quote is already read.
    fn write_literal(&mut self, open: &Token) -> CompileResult<Syntax> {
        let quote = open.text.chars().next().unwrap_or('"');
        let payload = self.reader.read_adjacent();
        if payload.is_symbol() && payload.has_text(&open.text) {
            return Err(limited(GrammarErrorInfo::EmptyLiteral, payload));
        }
        if !payload.is_comment() {
            return Err(limited(GrammarErrorInfo::UnterminatedLiteral { quote }, open));
        }
        let close = self.reader.read_adjacent();
        if !(close.is_symbol() && close.has_text(&open.text)) {
            return Err(limited(GrammarErrorInfo::UnterminatedLiteral { quote }, open));
        }

        let text = unescape(&payload.text);
        self.register(&text);
        Ok(Syntax::Literal(text))
    }

    /// The opening bracket is already read.
    fn write_alternation(&mut self) -> CompileResult<Syntax> {
        let outer_mode = self.reader.skip_lines();
        self.reader.set_skip_lines(true);

        let mut branches = Vec::new();
        loop {
            let branch = self.write_sequence(Context::Bracket)?;
            let separator = self.reader.read_or_eof();
            if branch.is_empty() {
                return Err(limited(
                    GrammarErrorInfo::EmptyBranch {
                        index: branches.len(),
                    },
                    separator,
                ));
            }
            branches.push(branch);
            if separator.has_text("]") {
                break;
            }
        }

        self.reader.set_skip_lines(outer_mode);
        Ok(Syntax::Or {
            branches,
            once_each: false,
        })
    }

    /// Make the literal known to the lexer of the described language.
    fn register(&mut self, text: &str) {
        if is_symbolic(text) {
            self.symbols.push(text.to_owned());
        } else {
            self.keywords.push(text.to_owned());
        }
    }

    fn last_end(&self) -> usize {
        let position = self.reader.position();
        self.reader
            .stream()
            .get(position.saturating_sub(1))
            .map_or(0, |t| t.span.end)
    }
}

fn limited(data: GrammarErrorInfo, offender: &Token) -> GrammarErrorLimited {
    GrammarErrorLimited {
        data,
        offender: offender.clone(),
    }
}

fn unexpected(token: &Token) -> GrammarErrorLimited {
    limited(
        GrammarErrorInfo::UnexpectedToken {
            found: token.to_string(),
        },
        token,
    )
}

/// Every character is printable and neither a letter nor a digit.
fn is_symbolic(text: &str) -> bool {
    text.chars()
        .all(|c| !c.is_alphanumeric() && !c.is_whitespace() && !c.is_control() && c != '_')
}

/// Resolve backslash escapes in a literal. Unknown escapes keep the escaped character.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
fn compile_err(source: &str) -> GrammarErrorInfo {
    match compile(source, "<test>") {
        Ok(grammar) => panic!("expected an error, got {}", grammar.rules()),
        Err(e) => e.source().clone(),
    }
}

#[test]
fn compiles_rules_and_modifiers() {
    let grammar = compile(
        "# a comment\nROOT := \"let\" ~ID? value* \"=\"!\nvalue := [ NUMBER | STRING ]$*?\n",
        "<test>",
    )
    .unwrap();

    let root = grammar.rules().get("ROOT").unwrap();
    assert_eq!(root.len(), 4);
    assert_eq!(root[0].syntax, Syntax::Literal("let".to_owned()));
    assert_eq!(
        root[1].modifiers,
        Modifiers {
            optional: true,
            adjacent: true,
            ..Modifiers::default()
        }
    );
    assert!(root[2].modifiers.repeat);
    assert!(root[3].modifiers.fatal);

    let value = grammar.rules().get("value").unwrap();
    match &value[0].syntax {
        Syntax::Or {
            branches,
            once_each,
        } => {
            assert_eq!(branches.len(), 2);
            assert!(once_each);
        }
        other => panic!("expected an alternation, got {:?}", other),
    }
    assert!(value[0].modifiers.repeat && value[0].modifiers.optional);

    assert_eq!(grammar.keywords(), ["let"]);
    assert_eq!(grammar.symbols(), ["="]);
}

#[test]
fn literals_are_registered_longest_first() {
    let grammar = compile("ROOT := '=' \"==\" '<=' \"if\" \"else\" '='", "<test>").unwrap();
    assert_eq!(grammar.symbols(), ["<=", "==", "="]);
    assert_eq!(grammar.keywords(), ["else", "if"]);
}

#[test]
fn alternations_may_span_lines() {
    let grammar = compile("ROOT := [ \"a\"\n  | \"b\"\n]\nother := ID", "<test>").unwrap();
    assert_eq!(grammar.rules().len(), 2);
    assert_eq!(
        grammar.rules().to_string(),
        "ROOT := [ \"a\" | \"b\" ]\nother := ID\n"
    );
}

#[test]
fn compile_errors() {
    assert_eq!(
        compile_err("ROOT := \"abc\n"),
        GrammarErrorInfo::UnterminatedLiteral { quote: '"' }
    );
    assert_eq!(compile_err("ROOT := ''"), GrammarErrorInfo::EmptyLiteral);
    assert_eq!(
        compile_err("ROOT := [ \"a\" | \"b\""),
        GrammarErrorInfo::UnexpectedEndOfAlternation
    );
    assert_eq!(
        compile_err("ROOT := [ \"a\" | ]"),
        GrammarErrorInfo::EmptyBranch { index: 1 }
    );
    assert_eq!(
        compile_err("ROOT := ID\nROOT := NUMBER"),
        GrammarErrorInfo::Redefinition {
            name: "ROOT".to_owned(),
            previous_line: 1
        }
    );
    assert_eq!(
        compile_err("ROOT := ID?*?"),
        GrammarErrorInfo::DuplicateModifier('?')
    );
    assert_eq!(
        compile_err("ROOT := ID$"),
        GrammarErrorInfo::OnceEachOutsideAlternation
    );
    assert_eq!(
        compile_err("ROOT :="),
        GrammarErrorInfo::EmptyRule {
            name: "ROOT".to_owned()
        }
    );
    assert_eq!(
        compile_err("ROOT ID"),
        GrammarErrorInfo::ExpectedDefine {
            name: "ROOT".to_owned(),
            found: "`ID`".to_owned()
        }
    );
}

#[test]
fn errors_point_at_the_offending_line() {
    let err = compile("ROOT := ID\n\nthing := ]", "<test>").unwrap_err();
    assert_eq!(err.location(), (3, 10));
    assert_eq!(
        err.source(),
        &GrammarErrorInfo::UnexpectedToken {
            found: "`]`".to_owned()
        }
    );
}

#[test]
fn symbolic_literals() {
    assert!(is_symbolic("=="));
    assert!(is_symbolic("->"));
    assert!(!is_symbolic("a+"));
    assert!(!is_symbolic("u8"));
}
