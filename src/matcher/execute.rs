use std::{collections::HashSet, fmt};

use super::{
    terminal::match_terminal, Event, MatchOptions, MatchOutcome, MatchingContext, Semantics,
    Verdict,
};
use crate::{
    diagnostic::{Diagnostic, MostReach},
    grammar::{Node, RuleTable, Syntax, ROOT},
    token::{Checkpoint, Reader},
};

/// Runs a rule table against token readers.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'g> {
    rules: &'g RuleTable,
    options: MatchOptions,
}

impl<'g> Matcher<'g> {
    pub fn new(rules: &'g RuleTable) -> Self {
        Self {
            rules,
            options: MatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Match `ROOT` starting wherever the reader is.
    ///
    /// Afterwards the reader is just past whatever `ROOT` consumed, or back where it
    /// started if the match failed.
    pub fn run<S: Semantics + ?Sized>(
        &self,
        reader: &mut Reader<'_>,
        semantics: &mut S,
    ) -> MatchOutcome {
        reader.set_skip_lines(!self.rules.uses_eol());
        log::debug!(
            "matching {} rules from token {} (line mode: {})",
            self.rules.len(),
            reader.position(),
            !reader.skip_lines()
        );

        let mut run = Run {
            rules: self.rules,
            options: self.options,
            reader,
            semantics,
            frames: Vec::new(),
            scopes: Vec::new(),
            reach: None,
        };
        let finished = run.execute();
        run.conclude(finished)
    }
}

/// Unrecoverable; unwinds everything.
#[derive(Debug)]
struct Abort(String);

#[derive(Debug)]
enum Finished {
    Matched,
    /// `ROOT` failed with this.
    Failed(String),
}

type Step = Result<Option<Finished>, Abort>;

/// Why a frame is on the stack.
#[derive(Debug)]
enum Origin<'g> {
    Root,
    Rule(&'g str),
    Or {
        branches: &'g [Vec<Node>],
        branch: usize,
        /// What each abandoned branch failed with.
        errors: Vec<String>,
    },
}

impl fmt::Display for Origin<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Root => f.write_str(ROOT),
            Origin::Rule(name) => f.write_str(name),
            Origin::Or { branch, .. } => write!(f, "alternative {}", branch),
        }
    }
}

#[derive(Debug)]
struct Frame<'g> {
    origin: Origin<'g>,
    sequence: &'g [Node],
    cursor: usize,
    /// Times the element under the cursor has matched so far.
    passes: usize,
    /// Branches the alternation under the cursor has already been through, for `$`.
    taken: HashSet<usize>,
    /// Reader before the current attempt at the element under the cursor.
    attempt: Checkpoint,
    /// Reader when the frame (or its current branch) started.
    entry: Checkpoint,
}

impl<'g> Frame<'g> {
    fn new(origin: Origin<'g>, sequence: &'g [Node], entry: Checkpoint) -> Self {
        Self {
            origin,
            sequence,
            cursor: 0,
            passes: 0,
            taken: HashSet::new(),
            attempt: entry,
            entry,
        }
    }

    fn current(&self) -> Option<&'g Node> {
        self.sequence.get(self.cursor)
    }

    fn advance(&mut self) {
        self.cursor += 1;
        self.passes = 0;
        self.taken.clear();
    }
}

struct Run<'g, 'r, 's, S: ?Sized> {
    rules: &'g RuleTable,
    options: MatchOptions,
    reader: &'r mut Reader<'s>,
    semantics: &'r mut S,

    frames: Vec<Frame<'g>>,
    /// Rule names, mirroring the rule frames.
    scopes: Vec<&'g str>,
    reach: Option<MostReach>,
}

impl<'g, S: Semantics + ?Sized> Run<'g, '_, '_, S> {
    fn execute(&mut self) -> Result<Finished, Abort> {
        let root = self
            .rules
            .get(ROOT)
            .ok_or_else(|| Abort(format!("the grammar has no `{}` rule", ROOT)))?;
        let entry = self.reader.from_current();
        self.push(Frame::new(Origin::Root, root, entry))?;
        self.scopes.push(ROOT);

        let mut done = match self.emit(&Event::Enter { rule: ROOT })? {
            Some(message) => self.fail(message)?,
            None => None,
        };
        loop {
            if let Some(finished) = done {
                return Ok(finished);
            }
            done = match self.top()?.current() {
                Some(node) => self.step(node)?,
                None => self.finish()?,
            };
        }
    }

    /// Attempt the element under the cursor of the top frame.
    fn step(&mut self, node: &'g Node) -> Step {
        let attempt = self.reader.from_current();
        self.top()?.attempt = attempt;

        match &node.syntax {
            Syntax::Literal(_) | Syntax::Class(_) => self.terminal(node, attempt),
            Syntax::Ref(name) => {
                let name = name.as_str();
                let nodes = self
                    .rules
                    .get(name)
                    .ok_or_else(|| Abort(format!("undefined rule `{}`", name)))?;
                self.push(Frame::new(Origin::Rule(name), nodes, attempt))?;
                self.scopes.push(name);
                match self.emit(&Event::Enter { rule: name })? {
                    Some(message) => {
                        self.offer_here(message.clone());
                        self.fail(message)
                    }
                    None => Ok(None),
                }
            }
            Syntax::Or { branches, .. } => match branches.first() {
                Some(first) => {
                    let origin = Origin::Or {
                        branches: &branches[..],
                        branch: 0,
                        errors: Vec::new(),
                    };
                    self.push(Frame::new(origin, first, attempt))?;
                    Ok(None)
                }
                None => self.absorb_or_fail(node, "empty alternation".to_owned()),
            },
        }
    }

    fn terminal(&mut self, node: &'g Node, attempt: Checkpoint) -> Step {
        let message = match match_terminal(self.reader, node) {
            Ok(matched) => {
                log::trace!("`{}` matched {:?}", node, matched.text);
                match self.emit(&Event::Token(&matched))? {
                    None => return self.matched(node),
                    Some(message) => {
                        self.offer(matched.position, message.clone());
                        self.rewind(attempt)?;
                        message
                    }
                }
            }
            Err(miss) => {
                log::trace!("`{}` missed: {}", node, miss.message);
                self.offer(miss.position, miss.message.clone());
                // the semantics never saw anything, so no rewind event
                self.reader.seek_to(attempt);
                miss.message
            }
        };
        self.absorb_or_fail(node, message)
    }

    /// The element under the cursor of the top frame matched.
    fn matched(&mut self, node: &Node) -> Step {
        let position = self.reader.position();
        let frame = self.top()?;
        if node.modifiers.repeat {
            if position == frame.attempt.position() {
                return Err(Abort(format!(
                    "`{}` repeats without consuming any input",
                    node
                )));
            }
            frame.passes += 1;
        } else {
            frame.advance();
        }
        Ok(None)
    }

    /// The element under the cursor of the top frame did not match, and the reader is
    /// back where the attempt started. Hands the message back if this fails the frame.
    fn absorb(&mut self, node: &Node, message: String) -> Result<Option<String>, Abort> {
        let frame = self.top()?;
        if (node.modifiers.repeat && frame.passes > 0) || node.modifiers.optional {
            frame.advance();
            Ok(None)
        } else if node.modifiers.fatal {
            Err(Abort(message))
        } else {
            Ok(Some(message))
        }
    }

    fn absorb_or_fail(&mut self, node: &Node, message: String) -> Step {
        match self.absorb(node, message)? {
            Some(message) => self.fail(message),
            None => Ok(None),
        }
    }

    /// The top frame failed. An alternation moves on to its next branch; anything else is
    /// popped and its parent gets to deal with it, and so on down the stack.
    fn fail(&mut self, mut message: String) -> Step {
        loop {
            let frame = self.top()?;
            let entry = frame.entry;
            if let Origin::Or {
                branches,
                branch,
                errors,
            } = &mut frame.origin
            {
                let branches: &'g [Vec<Node>] = *branches;
                errors.push(format!("[{}] {}", branch, message));
                if let Some(next) = branches.get(*branch + 1) {
                    *branch += 1;
                    log::trace!("trying alternative {}", branch);
                    frame.sequence = next;
                    frame.cursor = 0;
                    frame.passes = 0;
                    frame.taken.clear();
                    frame.attempt = entry;
                    self.rewind(entry)?;
                    return Ok(None);
                }
            }

            let frame = self.pop()?;
            self.rewind(frame.entry)?;
            message = match frame.origin {
                Origin::Root => return Ok(Some(Finished::Failed(message))),
                Origin::Rule(_) => {
                    self.scopes.pop();
                    message
                }
                Origin::Or { errors, .. } => {
                    format!("no alternative matched:\n{}", errors.join("\n"))
                }
            };

            let node = self.current()?;
            match self.absorb(node, message)? {
                Some(unabsorbed) => message = unabsorbed,
                None => return Ok(None),
            }
        }
    }

    /// The top frame ran out of elements.
    fn finish(&mut self) -> Step {
        let rule = match &self.top()?.origin {
            Origin::Root => Some(ROOT),
            Origin::Rule(name) => Some(*name),
            Origin::Or { .. } => None,
        };
        if let Some(rule) = rule {
            if let Some(message) = self.emit(&Event::Leave { rule })? {
                self.offer_here(message.clone());
                return self.fail(message);
            }
        }

        let frame = self.pop()?;
        match frame.origin {
            Origin::Root => return Ok(Some(Finished::Matched)),
            Origin::Rule(_) => {
                self.scopes.pop();
            }
            Origin::Or { branch, .. } => {
                let node = self.current()?;
                let once_each = matches!(node.syntax, Syntax::Or { once_each: true, .. });
                if once_each && !self.top()?.taken.insert(branch) {
                    let message = format!("alternative index {} is already set", branch);
                    self.rewind(frame.entry)?;
                    self.offer_here(message.clone());
                    return self.absorb_or_fail(node, message);
                }
            }
        }
        let node = self.current()?;
        self.matched(node)
    }

    fn push(&mut self, frame: Frame<'g>) -> Result<(), Abort> {
        if self.frames.len() >= self.options.recursion_limit {
            return Err(Abort(format!(
                "recursion limit of {} exceeded",
                self.options.recursion_limit
            )));
        }
        log::trace!(
            "push {} at depth {}, token {}",
            frame.origin,
            self.frames.len(),
            frame.entry.position()
        );
        self.frames.push(frame);
        Ok(())
    }

    fn pop(&mut self) -> Result<Frame<'g>, Abort> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| Abort("frame stack is empty".to_owned()))?;
        log::trace!("pop {} at depth {}", frame.origin, self.frames.len());
        Ok(frame)
    }

    fn top(&mut self) -> Result<&mut Frame<'g>, Abort> {
        self.frames
            .last_mut()
            .ok_or_else(|| Abort("frame stack is empty".to_owned()))
    }

    /// The element under the cursor of the top frame.
    fn current(&self) -> Result<&'g Node, Abort> {
        self.frames
            .last()
            .and_then(Frame::current)
            .ok_or_else(|| Abort("no element under the cursor".to_owned()))
    }

    fn scope(&self) -> &'g str {
        self.scopes.last().copied().unwrap_or(ROOT)
    }

    fn offer(&mut self, position: usize, message: String) {
        let rule = self.scope().to_owned();
        MostReach::offer(
            &mut self.reach,
            MostReach {
                position,
                message,
                rule,
            },
        );
    }

    fn offer_here(&mut self, message: String) {
        let position = self.reader.significant_position();
        self.offer(position, message);
    }

    /// Seek back, telling the semantics if anything it saw got undone.
    fn rewind(&mut self, checkpoint: Checkpoint) -> Result<(), Abort> {
        let undone = self.reader.position() > checkpoint.position();
        self.reader.seek_to(checkpoint);
        if undone {
            // nothing to reject about a rewind
            self.emit(&Event::Rewind {
                position: checkpoint.position(),
            })?;
        }
        Ok(())
    }

    /// Hand an event to the semantics. A rejection comes back as its message.
    fn emit(&mut self, event: &Event<'_>) -> Result<Option<String>, Abort> {
        let token = match event {
            Event::Token(matched) => Some(*matched),
            _ => None,
        };
        let mut ctx = MatchingContext::new(&self.scopes, self.reader.position(), token);
        match self.semantics.on_event(&mut ctx, event) {
            Verdict::Accept => Ok(None),
            Verdict::Reject => Ok(Some(
                ctx.take_error()
                    .unwrap_or_else(|| format!("{} was rejected", describe(event))),
            )),
            Verdict::Fatal => Err(Abort(
                ctx.take_error()
                    .unwrap_or_else(|| format!("{} aborted the match", describe(event))),
            )),
        }
    }

    fn conclude(mut self, finished: Result<Finished, Abort>) -> MatchOutcome {
        let tokens = self.reader.stream();
        match finished {
            Err(Abort(message)) => {
                log::debug!("match aborted: {}", message);
                let reach = MostReach {
                    position: self.reader.significant_position(),
                    message,
                    rule: self.scope().to_owned(),
                };
                MatchOutcome::Fatal(Diagnostic::at(tokens, reach))
            }
            Ok(Finished::Matched) if self.options.require_eof && !self.reader.at_eof() => {
                let position = self.reader.significant_position();
                let message = format!(
                    "expected end of input but found {}",
                    self.reader.get_or_eof()
                );
                self.offer(position, message);
                log::debug!("match stopped before the end of input");
                MatchOutcome::Failure(self.furthest(None))
            }
            Ok(Finished::Matched) => {
                log::debug!("match succeeded at token {}", self.reader.position());
                MatchOutcome::Success
            }
            Ok(Finished::Failed(message)) => {
                log::debug!("match failed");
                MatchOutcome::Failure(self.furthest(Some(message)))
            }
        }
    }

    /// The deepest failure, with whatever `ROOT` failed with as notes.
    fn furthest(&mut self, notes: Option<String>) -> Diagnostic {
        let tokens = self.reader.stream();
        let reach = match self.reach.take() {
            Some(reach) => reach,
            None => MostReach {
                position: self.reader.significant_position(),
                message: notes.clone().unwrap_or_default(),
                rule: ROOT.to_owned(),
            },
        };
        let diagnostic = Diagnostic::at(tokens, reach);
        match notes {
            Some(notes) => diagnostic.with_notes(notes),
            None => diagnostic,
        }
    }
}

fn describe(event: &Event<'_>) -> String {
    match event {
        Event::Enter { rule } => format!("entering `{}`", rule),
        Event::Leave { rule } => format!("leaving `{}`", rule),
        Event::Token(matched) => format!("`{}`", matched.text),
        Event::Rewind { position } => format!("rewinding to token {}", position),
    }
}

#[cfg(test)]
use super::{from_fn, AcceptAll};

#[cfg(test)]
use crate::Grammar;

#[cfg(test)]
struct Outcome {
    outcome: MatchOutcome,
    /// Raw reader position afterwards.
    position: usize,
    /// Text of the next significant token afterwards.
    next: String,
}

#[cfg(test)]
fn run_with<S: Semantics>(
    grammar: &str,
    input: &str,
    options: MatchOptions,
    semantics: &mut S,
) -> Outcome {
    let grammar = Grammar::compile(grammar, "test.grammar").unwrap();
    let tokens = grammar.lexer().tokenize(input);
    let mut reader = tokens.reader();
    let outcome = Matcher::new(grammar.rules())
        .with_options(options)
        .run(&mut reader, semantics);
    Outcome {
        outcome,
        position: reader.position(),
        next: reader.get_or_eof().text.clone(),
    }
}

#[cfg(test)]
fn run(grammar: &str, input: &str) -> MatchOutcome {
    run_with(grammar, input, MatchOptions::default(), &mut AcceptAll).outcome
}

#[cfg(test)]
fn partial() -> MatchOptions {
    MatchOptions {
        require_eof: false,
        ..MatchOptions::default()
    }
}

/// Events as short strings: `+rule`, `-rule`, token text, `<position`.
#[cfg(test)]
fn record(events: &mut Vec<String>, event: &Event<'_>) {
    events.push(match event {
        Event::Enter { rule } => format!("+{}", rule),
        Event::Leave { rule } => format!("-{}", rule),
        Event::Token(matched) => matched.text.clone(),
        Event::Rewind { position } => format!("<{}", position),
    });
}

#[test]
fn single_literal() {
    let grammar = r#"ROOT := "x""#;
    assert_eq!(run(grammar, "x"), MatchOutcome::Success);

    let mut events = Vec::new();
    let outcome = run_with(
        grammar,
        "x",
        MatchOptions::default(),
        &mut from_fn(|_: &mut MatchingContext<'_>, event: &Event<'_>| {
            record(&mut events, event);
            Verdict::Accept
        }),
    );
    assert!(outcome.outcome.is_success());
    assert_eq!(events, ["+ROOT", "x", "-ROOT"]);

    let diagnostic = run(grammar, "y").diagnostic().cloned().unwrap();
    assert!(diagnostic.message.contains("`x`"), "{}", diagnostic.message);
    assert_eq!(diagnostic.position, 1);
}

#[test]
fn sequences_and_rules() {
    let grammar = r#"
ROOT := Pair* EOF
Pair := ID "=" NUMBER ";"?
"#;
    assert!(run(grammar, "a = 1; b = 2.5e3\nc = 0x10").is_success());

    let diagnostic = run(grammar, "a = 1; b = ;").diagnostic().cloned().unwrap();
    assert_eq!(diagnostic.rule, "Pair");
    assert!(diagnostic.message.contains("number"), "{}", diagnostic.message);
}

#[test]
fn failed_optional_consumes_nothing() {
    let outcome = run_with(r#"ROOT := "a"?"#, "b", partial(), &mut AcceptAll);
    assert!(outcome.outcome.is_success());
    assert_eq!(outcome.position, 0);
    assert_eq!(outcome.next, "b");
}

#[test]
fn repeat_stops_at_the_first_mismatch() {
    let outcome = run_with(r#"ROOT := "a"*"#, "a a a b a", partial(), &mut AcceptAll);
    assert!(outcome.outcome.is_success());
    assert_eq!(outcome.next, "b");

    // without `?` at least one pass is needed
    assert!(!run(r#"ROOT := "a"* EOF"#, "").is_success());
    assert!(run(r#"ROOT := "a"*? EOF"#, "").is_success());
}

#[test]
fn first_alternative_wins() {
    let mut events = Vec::new();
    let outcome = run_with(
        r#"ROOT := [ "a" | "a" "b" ]"#,
        "a",
        MatchOptions::default(),
        &mut from_fn(|_: &mut MatchingContext<'_>, event: &Event<'_>| {
            record(&mut events, event);
            Verdict::Accept
        }),
    );
    assert!(outcome.outcome.is_success());
    // the second branch was never started, so nothing got rewound
    assert_eq!(events, ["+ROOT", "a", "-ROOT"]);
}

#[test]
fn later_alternatives_after_a_rewind() {
    let mut events = Vec::new();
    let outcome = run_with(
        r#"ROOT := [ "a" "b" | "a" "c" ]"#,
        "a c",
        MatchOptions::default(),
        &mut from_fn(|_: &mut MatchingContext<'_>, event: &Event<'_>| {
            record(&mut events, event);
            Verdict::Accept
        }),
    );
    assert!(outcome.outcome.is_success());
    assert_eq!(events, ["+ROOT", "a", "<0", "a", "c", "-ROOT"]);
}

#[test]
fn once_each_alternatives() {
    let grammar = r#"ROOT := [ "a" | "b" ]$*"#;
    assert!(run(grammar, "a b").is_success());
    assert!(run(grammar, "b a").is_success());

    let diagnostic = run(grammar, "a a").diagnostic().cloned().unwrap();
    assert_eq!(diagnostic.message, "alternative index 0 is already set");
    // BOS a _ a
    assert_eq!(diagnostic.position, 3);

    // without `$` repeats are fine
    assert!(run(r#"ROOT := [ "a" | "b" ]*"#, "a a b a").is_success());
}

#[test]
fn recursion_limit() {
    let mut entered = 0;
    let outcome = run_with(
        "ROOT := A\nA := A",
        "",
        MatchOptions {
            recursion_limit: 5,
            ..MatchOptions::default()
        },
        &mut from_fn(|_: &mut MatchingContext<'_>, event: &Event<'_>| {
            if let Event::Enter { .. } = event {
                entered += 1;
            }
            Verdict::Accept
        }),
    );

    assert!(outcome.outcome.is_fatal());
    let diagnostic = outcome.outcome.diagnostic().unwrap();
    assert_eq!(diagnostic.message, "recursion limit of 5 exceeded");
    assert_eq!(diagnostic.rule, "A");
    assert_eq!(entered, 5);
}

#[test]
fn deep_recursion_is_not_native() {
    let grammar = r#"
ROOT := List
List := "(" List? ")"
"#;
    let depth = 5000;
    let input = format!("{}{}", "(".repeat(depth), ")".repeat(depth));
    let outcome = run_with(
        grammar,
        &input,
        MatchOptions {
            recursion_limit: depth + 2,
            ..MatchOptions::default()
        },
        &mut AcceptAll,
    );
    assert!(outcome.outcome.is_success());

    assert!(run(grammar, &input).is_fatal());
}

#[test]
fn furthest_failure_is_reported() {
    let outcome = run(r#"ROOT := [ "a" "b" "c" | "a" "b" "d" ]"#, "a b x");
    let diagnostic = outcome.diagnostic().cloned().unwrap();
    assert!(!outcome.is_fatal());
    // BOS a _ b _ x
    assert_eq!(diagnostic.position, 5);
    assert_eq!(diagnostic.message, "expected `c` but found `x`");
    assert_eq!(
        diagnostic.notes,
        [
            "no alternative matched:",
            "[0] expected `c` but found `x`",
            "[1] expected `d` but found `x`",
        ]
    );
}

#[test]
fn fatal_elements_abort() {
    let grammar = r#"
ROOT := [ Call | ID ]
Call := ID "(" ")"!
"#;
    assert!(run(grammar, "f()").is_success());
    assert!(run(grammar, "f").is_success());

    let outcome = run(grammar, "f(x");
    assert!(outcome.is_fatal());
    assert_eq!(
        outcome.diagnostic().unwrap().message,
        "expected `)` but found `x`"
    );
}

#[test]
fn zero_width_repeat_is_fatal() {
    let outcome = run("ROOT := Maybe*\nMaybe := \"x\"?", "y");
    assert!(outcome.is_fatal());
    assert!(outcome
        .diagnostic()
        .unwrap()
        .message
        .contains("without consuming"));
}

#[test]
fn missing_rules_are_fatal() {
    let outcome = run("ROOT := Nowhere", "x");
    assert!(outcome.is_fatal());
    assert_eq!(
        outcome.diagnostic().unwrap().message,
        "undefined rule `Nowhere`"
    );

    assert!(run(r#"Start := "x""#, "x").is_fatal());
}

#[test]
fn trailing_input() {
    let grammar = r#"ROOT := "a""#;
    let diagnostic = run(grammar, "a a").diagnostic().cloned().unwrap();
    assert_eq!(diagnostic.message, "expected end of input but found `a`");

    let outcome = run_with(grammar, "a a", partial(), &mut AcceptAll);
    assert!(outcome.outcome.is_success());
    assert_eq!(outcome.next, "a");
}

#[test]
fn line_mode() {
    let grammar = "ROOT := Line*\nLine := ID* EOL";
    assert!(run(grammar, "a b\nc\n").is_success());
    // the last line has no break
    assert!(!run(grammar, "a b\nc").is_success());
}

#[test]
fn rejected_tokens_roll_back() {
    let mut events = Vec::new();
    let outcome = run_with(
        "ROOT := ID*",
        "a b stop c",
        partial(),
        &mut from_fn(|ctx: &mut MatchingContext<'_>, event: &Event<'_>| {
            record(&mut events, event);
            match ctx.token() {
                Some(token) if token.text == "stop" => {
                    ctx.set_error("stop word");
                    Verdict::Reject
                }
                _ => Verdict::Accept,
            }
        }),
    );

    assert!(outcome.outcome.is_success());
    assert_eq!(outcome.next, "stop");
    assert_eq!(events, ["+ROOT", "a", "b", "stop", "<4", "-ROOT"]);

    let rejecting = |ctx: &mut MatchingContext<'_>, _: &Event<'_>| match ctx.token() {
        Some(token) if token.text == "stop" => {
            ctx.set_error("stop word");
            Verdict::Reject
        }
        _ => Verdict::Accept,
    };
    let outcome = run_with(
        "ROOT := ID*",
        "a stop",
        MatchOptions::default(),
        &mut from_fn(rejecting),
    );
    assert_eq!(outcome.outcome.diagnostic().unwrap().message, "stop word");
}

#[test]
fn rejected_rules_fail() {
    let grammar = r#"
ROOT := [ Keyword | Name ]
Keyword := ID
Name := ID
"#;
    let mut scopes = Vec::new();
    let outcome = run_with(
        grammar,
        "x",
        MatchOptions::default(),
        &mut from_fn(|ctx: &mut MatchingContext<'_>, event: &Event<'_>| match event {
            Event::Leave { rule: "Keyword" } => Verdict::Reject,
            Event::Token(_) => {
                scopes.push(ctx.scopes().join("/"));
                Verdict::Accept
            }
            _ => Verdict::Accept,
        }),
    );
    assert!(outcome.outcome.is_success());
    assert_eq!(scopes, ["ROOT/Keyword", "ROOT/Name"]);
}

#[test]
fn fatal_verdicts_abort() {
    let outcome = run_with(
        "ROOT := Item*\nItem := ID",
        "a b c",
        MatchOptions::default(),
        &mut from_fn(|ctx: &mut MatchingContext<'_>, event: &Event<'_>| match event {
            Event::Token(matched) if matched.text == "b" => {
                ctx.set_error("b is not allowed here");
                Verdict::Fatal
            }
            _ => Verdict::Accept,
        }),
    );
    assert!(outcome.outcome.is_fatal());
    let diagnostic = outcome.outcome.diagnostic().unwrap();
    assert_eq!(diagnostic.message, "b is not allowed here");
    assert_eq!(diagnostic.rule, "Item");
}

#[test]
fn strings_and_adjacency() {
    let grammar = r#"ROOT := [ STRING | ID ~"!" ]*"#;
    assert!(run(grammar, r#""hello" 'world' shout!"#).is_success());
    assert!(!run(grammar, "shout !").is_success());
    assert!(!run(grammar, r#""open"#).is_success());
}

#[test]
fn mismatched_quotes_fail_locally() {
    for input in &[r#""a'"#, r#"'a""#, "`a'"] {
        let outcome = run("ROOT := STRING", input);
        assert!(!outcome.is_success(), "{}", input);
        assert!(!outcome.is_fatal(), "{}", input);
        let message = &outcome.diagnostic().unwrap().message;
        assert!(message.contains("unterminated string"), "{}", message);
    }
}

#[test]
fn spaced_keywords_are_one_token() {
    assert!(run(r#"ROOT := "a b" ID"#, "a b c").is_success());
    assert!(!run(r#"ROOT := "a b""#, "a c").is_success());
}

#[test]
fn class_terminals() {
    assert!(run("ROOT := ID INTEGER SYMBOL", "x 0x1F +").is_success());
    let grammar = r#"
ROOT := KEYWORD ID "="
Declaration := "let"
"#;
    assert!(run(grammar, "let x =").is_success());

    let outcome = run("ROOT := ID", "9lives");
    assert_eq!(
        outcome.diagnostic().unwrap().message,
        "expected an identifier but found `9lives`"
    );
}
