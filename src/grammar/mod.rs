//! # Grammars
//!
//! A grammar is a list of rules, one per line:
//!
//! ```text
//! # comments start with a hash
//! ROOT   := decl* EOF
//! decl   := "cargo" ID "{" field* "}"
//! field  := type ID [ "=" NUMBER | "=" STRING ]? ";"!
//! type   := [ "u8" | "u16" | "u32" | ID ]
//! ```
//!
//! ## Elements
//!
//! - `"text"` or `'text'`: a literal. Literals made only of punctuation become symbols of
//!   the described language, anything else becomes a keyword.
//! - `ID`, `INTEGER`, `NUMBER`, `STRING`, `KEYWORD`, `SYMBOL`, `EOF`, `EOL`: a class of token.
//! - a bare name: a reference to another rule.
//! - `[ a b | c | ... ]`: ordered alternatives; the first one that matches wins.
//!   A trailing `$` means each alternative may be taken at most once while the
//!   alternation repeats. Alternatives may span several lines.
//!
//! ## Modifiers
//!
//! Suffixes, each at most once and in any order:
//!
//! - `?` optional: matching nothing is fine.
//! - `*` repeat: match as many times as possible, at least once unless also `?`.
//! - `!` fatal: if this doesn't match, stop everything instead of backtracking.
//!
//! And one prefix, `~` adjacent: the token must directly follow the previous one, without
//! whitespace or comments in between.
//!
//! Matching always starts at the rule called `ROOT`.
mod compile;

pub use compile::{GrammarError, GrammarErrorInfo};
pub(crate) use compile::compile;

use std::{fmt, ops::Range};

use bimap::BiHashMap;
use itertools::Itertools;

/// Name of the rule matching starts at.
pub const ROOT: &str = "ROOT";

/// The predicate named by a bare uppercase tag in a grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordClass {
    Id,
    Integer,
    Number,
    String,
    Keyword,
    Symbol,
    Eof,
    Eol,
}

impl KeywordClass {
    pub const ALL: [KeywordClass; 8] = [
        KeywordClass::Id,
        KeywordClass::Integer,
        KeywordClass::Number,
        KeywordClass::String,
        KeywordClass::Keyword,
        KeywordClass::Symbol,
        KeywordClass::Eof,
        KeywordClass::Eol,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            KeywordClass::Id => "ID",
            KeywordClass::Integer => "INTEGER",
            KeywordClass::Number => "NUMBER",
            KeywordClass::String => "STRING",
            KeywordClass::Keyword => "KEYWORD",
            KeywordClass::Symbol => "SYMBOL",
            KeywordClass::Eof => "EOF",
            KeywordClass::Eol => "EOL",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|class| class.tag() == tag)
    }

    /// What to call it in an error message.
    pub fn description(self) -> &'static str {
        match self {
            KeywordClass::Id => "an identifier",
            KeywordClass::Integer => "an integer",
            KeywordClass::Number => "a number",
            KeywordClass::String => "a string",
            KeywordClass::Keyword => "a keyword",
            KeywordClass::Symbol => "a symbol",
            KeywordClass::Eof => "end of input",
            KeywordClass::Eol => "end of line",
        }
    }
}

/// Flags every node carries. They never change after compiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub optional: bool,
    pub repeat: bool,
    pub fatal: bool,
    pub adjacent: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Syntax {
    /// Match a token with exactly this text.
    Literal(String),
    /// Match a token satisfying the class predicate.
    Class(KeywordClass),
    /// Match the named rule.
    Ref(String),
    /// Match the first branch that matches.
    Or {
        branches: Vec<Vec<Node>>,
        once_each: bool,
    },
}

/// One element of a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub syntax: Syntax,
    pub modifiers: Modifiers,
    /// Where this came from in the grammar source.
    pub span: Range<usize>,
}

/// Writes the node back out in grammar syntax.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.adjacent {
            f.write_str("~")?;
        }
        match &self.syntax {
            Syntax::Literal(text) => {
                let quote = if text.contains('"') { '\'' } else { '"' };
                write!(f, "{}{}{}", quote, text, quote)?;
            }
            Syntax::Class(class) => f.write_str(class.tag())?,
            Syntax::Ref(name) => f.write_str(name)?,
            Syntax::Or {
                branches,
                once_each,
            } => {
                let branches = branches
                    .iter()
                    .map(|branch| branch.iter().join(" "))
                    .join(" | ");
                write!(f, "[ {} ]", branches)?;
                if *once_each {
                    f.write_str("$")?;
                }
            }
        }
        if self.modifiers.optional {
            f.write_str("?")?;
        }
        if self.modifiers.repeat {
            f.write_str("*")?;
        }
        if self.modifiers.fatal {
            f.write_str("!")?;
        }
        Ok(())
    }
}

/// Handle of a rule inside its [`RuleTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(usize);

#[derive(Debug, Clone)]
struct Rule {
    nodes: Vec<Node>,
    span: Range<usize>,
}

/// Rule name to sequence of nodes. Built once by the compiler, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    names: BiHashMap<String, RuleId>,
    /// In definition order.
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. If the name is taken, the existing rule's id comes back as the error.
    pub fn insert<S: Into<String>>(
        &mut self,
        name: S,
        nodes: Vec<Node>,
        span: Range<usize>,
    ) -> Result<RuleId, RuleId> {
        let name = name.into();
        if let Some(&existing) = self.names.get_by_left(&name) {
            return Err(existing);
        }
        let id = RuleId(self.rules.len());
        self.rules.push(Rule { nodes, span });
        self.names.insert(name, id);
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Option<RuleId> {
        self.names.get_by_left(name).copied()
    }

    pub fn name(&self, id: RuleId) -> &str {
        self.names
            .get_by_right(&id)
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }

    pub fn nodes(&self, id: RuleId) -> &[Node] {
        &self.rules[id.0].nodes
    }

    /// Where the rule was defined in the grammar source.
    pub fn span(&self, id: RuleId) -> Range<usize> {
        self.rules[id.0].span.clone()
    }

    pub fn get(&self, name: &str) -> Option<&[Node]> {
        self.id(name).map(|id| self.nodes(id))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_left(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in the order they were defined.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Node])> + '_ {
        (0..self.rules.len()).map(move |idx| {
            let id = RuleId(idx);
            (self.name(id), self.nodes(id))
        })
    }

    /// Call `visit` on every node of every rule, nested ones included.
    pub fn visit<F: FnMut(&str, &Node)>(&self, mut visit: F) {
        for (name, nodes) in self.iter() {
            let mut todo = nodes.iter().collect_vec();
            while let Some(node) = todo.pop() {
                visit(name, node);
                if let Syntax::Or { branches, .. } = &node.syntax {
                    todo.extend(branches.iter().flatten());
                }
            }
        }
    }

    /// `(referencing rule, missing rule)` for every reference to a rule that doesn't exist.
    pub fn undefined_refs(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.visit(|name, node| {
            if let Syntax::Ref(target) = &node.syntax {
                if !self.contains(target) {
                    out.push((name.to_owned(), target.to_owned()));
                }
            }
        });
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Does anything care about line breaks?
    pub fn uses_eol(&self) -> bool {
        let mut found = false;
        self.visit(|_, node| found |= node.syntax == Syntax::Class(KeywordClass::Eol));
        found
    }
}

/// Writes the table back out as grammar source.
impl fmt::Display for RuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, nodes) in self.iter() {
            writeln!(f, "{} := {}", name, nodes.iter().join(" "))?;
        }
        Ok(())
    }
}

#[test]
fn references_and_line_mode() {
    let grammar = crate::Grammar::compile(
        "ROOT := item* EOL\nitem := [ ID | missing ]\nother := gone missing",
        "<test>",
    )
    .unwrap();
    let rules = grammar.rules();

    assert_eq!(
        rules.undefined_refs(),
        [
            ("item".to_owned(), "missing".to_owned()),
            ("other".to_owned(), "gone".to_owned()),
            ("other".to_owned(), "missing".to_owned()),
        ]
    );
    assert!(rules.uses_eol());
    assert_eq!(rules.id("item").map(|id| rules.name(id)), Some("item"));
    assert_eq!(rules.iter().map(|(name, _)| name).collect_vec(), ["ROOT", "item", "other"]);
}
