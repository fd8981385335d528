use kanon::grammar::{Grammar, GrammarDef, GrammarDefError};
use kanon::lr1::Automaton;
use kanon_tests::grammars;

fn smoketest_grammar(f: impl FnOnce(&mut GrammarDef<'_>) -> Result<(), GrammarDefError>) {
    let grammar = Grammar::define(f).unwrap();
    eprintln!("grammar:\n{}", grammar);
    eprintln!();
    let automaton = Automaton::generate(&grammar).unwrap();
    eprintln!("automaton:\n---\n{}", automaton.display(&grammar));
}

#[test]
fn smoketest_g_single() {
    smoketest_grammar(grammars::g_single);
}

#[test]
fn smoketest_g_arithmetic() {
    smoketest_grammar(grammars::g_arithmetic);
}

#[test]
fn smoketest_g_proc() {
    smoketest_grammar(grammars::g_proc);
}
