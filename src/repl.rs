use super::{lex::Lexer, Grammar, MatchOptions, Trace};
use termwiz::lineedit::{line_editor_terminal, LineEditor, LineEditorHost, NopLineEditorHost};

const PS1: &str = "> ";
const PS2: &str = ". ";
const SOURCE_NAME: &str = "<repl>";

impl Grammar {
    /// Match whatever gets typed in, until end of input.
    ///
    /// A line ending in `\` continues on the next one, and so does input that only failed
    /// because it ran out. An empty line forces a verdict.
    pub fn repl(
        &self,
        lexer: &Lexer,
        options: MatchOptions,
        show_events: bool,
    ) -> termwiz::Result<()> {
        let mut continuing = false;

        let mut terminal = line_editor_terminal()?;
        let mut editor = LineEditor::new(&mut terminal);
        let mut host = NopLineEditorHost::default();

        let mut input = String::new();
        let mut trace = Trace::new();

        loop {
            editor.set_prompt(if continuing { PS2 } else { PS1 });

            let line = match editor.read_line(&mut host)? {
                Some(line) => line,
                None => return Ok(()),
            };
            if !continuing && line.trim().is_empty() {
                continue;
            }
            input.push_str(&line);
            input.push('\n');
            host.history().add(&line);

            if line.ends_with('\\') {
                continuing = true;
                continue;
            }

            trace.clear();
            let tokens = lexer.tokenize(&input);
            let outcome = self
                .matcher()
                .with_options(options)
                .run(&mut tokens.reader(), &mut trace);

            // we might get the rest later; wait for it
            let ran_out = outcome
                .diagnostic()
                .map_or(false, |d| tokens.get_or_eof(d.position).is_eof());
            if ran_out && !outcome.is_fatal() && !line.trim().is_empty() {
                continuing = true;
                continue;
            }
            continuing = false;

            if show_events {
                for line in trace.lines() {
                    println!("{}", line);
                }
            }
            match outcome.into_result() {
                Ok(()) => println!("ok\n"),
                Err(ono) => {
                    let printed = ono.report(SOURCE_NAME).eprint(ariadne::sources(
                        std::iter::once((SOURCE_NAME.to_owned(), input.clone())),
                    ));
                    if let Err(err) = printed {
                        log::warn!("couldn't print the report: {}", err);
                    }
                }
            }

            input.clear();
        }
    }
}
