use std::fs;

use anyhow::{bail, Context};
use binred::{grammar::ROOT, Grammar, MatchOptions, Trace};

const USAGE: &str = "\
usage: binred --grammar <file> [options] [input files...]

options:
  --comment <prefix>       treat <prefix> as a line comment in the inputs
  --recursion-limit <n>    most rules that may be nested at once (default 1000)
  --allow-trailing         don't require ROOT to consume the whole input
  --events                 print every matching event
  --repl                   match lines typed at the terminal (default without inputs)
";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        print!("{}", USAGE);
        return Ok(());
    }

    let root = std::env::current_dir()?;

    let grammar_stub: String = args
        .value_from_str("--grammar")
        .with_context(|| format!("a grammar is required\n\n{}", USAGE))?;
    let comment: Option<String> = args.opt_value_from_str("--comment")?;
    let recursion_limit: Option<usize> = args.opt_value_from_str("--recursion-limit")?;
    let options = MatchOptions {
        recursion_limit: recursion_limit.unwrap_or(MatchOptions::default().recursion_limit),
        require_eof: !args.contains("--allow-trailing"),
    };
    let show_events = args.contains("--events");
    let do_repl = args.contains("--repl");

    let grammar_path = root.join(grammar_stub);
    let grammar_name = grammar_path.to_string_lossy().into_owned();
    let grammar_source = fs::read_to_string(&grammar_path)
        .with_context(|| format!("couldn't read the grammar at {}", grammar_name))?;

    let grammar = match Grammar::compile(&grammar_source, &grammar_name) {
        Ok(it) => it,
        Err(ono) => {
            ono.report().eprint(ariadne::sources(std::iter::once((
                grammar_name.clone(),
                &grammar_source,
            ))))?;
            bail!("couldn't compile {}", grammar_name);
        }
    };
    for (rule, missing) in grammar.rules().undefined_refs() {
        log::warn!("rule `{}` refers to `{}`, which is never defined", rule, missing);
    }
    if !grammar.rules().contains(ROOT) {
        log::warn!("{} has no `{}` rule, so nothing can match", grammar_name, ROOT);
    }

    let mut lexer = grammar.lexer();
    if let Some(comment) = comment {
        lexer = lexer.with_line_comment(comment);
    }

    let mut had_any_files = false;
    let mut failures = 0;
    let mut trace = Trace::new();
    while let Some(path_stub) = args.opt_free_from_str::<String>()? {
        had_any_files = true;

        let path = root.join(path_stub);
        let name = path.to_string_lossy().into_owned();
        let source =
            fs::read_to_string(&path).with_context(|| format!("couldn't read {}", name))?;

        trace.clear();
        let outcome = grammar.parse(&lexer, &source, options, &mut trace);
        if show_events {
            for line in trace.lines() {
                println!("{}", line);
            }
        }

        match outcome.into_result() {
            Ok(()) => println!("{}: ok", name),
            Err(ono) => {
                failures += 1;
                ono.report(&name)
                    .eprint(ariadne::sources(std::iter::once((name.clone(), &source))))?;
            }
        }
    }

    if do_repl || !had_any_files {
        grammar.repl(&lexer, options, show_events)?;
    }

    if failures > 0 {
        bail!("{} input(s) did not match", failures);
    }
    Ok(())
}
