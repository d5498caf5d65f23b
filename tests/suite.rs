use std::{
    fs,
    path::{Path, PathBuf},
};

use binred::{AcceptAll, Grammar, MatchOptions, MatchOutcome};

/// Every directory under `tests/fixtures` holds a `grammar` and inputs sorted by how
/// matching them should end: `pass/`, `fail/` and `fatal/`. An input `foo.txt` may come
/// with a `foo.expect` holding text the diagnostic message has to contain.
#[test]
fn suite() {
    let root = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

    let mut fixtures = children(Path::new(root))
        .into_iter()
        .filter(|path| path.is_dir())
        .collect::<Vec<_>>();
    fixtures.sort_unstable();
    assert!(!fixtures.is_empty(), "no fixtures in {}", root);

    let mut problems = Vec::new();
    for fixture in fixtures {
        let grammar_name = fixture.join("grammar").to_string_lossy().into_owned();
        let source = fs::read_to_string(&grammar_name).unwrap();
        let grammar = match Grammar::compile(&source, &grammar_name) {
            Ok(it) => it,
            Err(e) => {
                e.report()
                    .eprint(ariadne::sources(std::iter::once((grammar_name, source))))
                    .unwrap();
                panic!();
            }
        };
        let lexer = grammar.lexer().with_line_comment("//");

        for bucket in &["pass", "fail", "fatal"] {
            let mut inputs = children(&fixture.join(bucket))
                .into_iter()
                .filter(|path| path.extension().map_or(false, |ext| ext == "txt"))
                .collect::<Vec<_>>();
            inputs.sort_unstable();

            for input in inputs {
                let name = input.to_string_lossy().into_owned();
                let text = fs::read_to_string(&input).unwrap();
                let outcome = grammar.parse(&lexer, &text, MatchOptions::default(), &mut AcceptAll);

                let verdict = match &outcome {
                    MatchOutcome::Success => "pass",
                    MatchOutcome::Failure(_) => "fail",
                    MatchOutcome::Fatal(_) => "fatal",
                };
                if verdict != *bucket {
                    if let Err(e) = outcome.clone().into_result() {
                        e.report(&name)
                            .eprint(ariadne::sources(std::iter::once((name.clone(), text))))
                            .unwrap();
                    }
                    problems.push(format!("{}: expected {} but got {}", name, bucket, verdict));
                    continue;
                }

                let expect = input.with_extension("expect");
                if let (Ok(expected), Some(diagnostic)) =
                    (fs::read_to_string(&expect), outcome.diagnostic())
                {
                    let expected = expected.trim();
                    if !diagnostic.message.contains(expected) {
                        problems.push(format!(
                            "{}: expected a message containing {:?} but got {:?}",
                            name, expected, diagnostic.message
                        ));
                    }
                }
            }
        }
    }

    assert!(problems.is_empty(), "\n{}", problems.join("\n"));
}

fn children(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries.map(|entry| entry.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}
