//! Demo driver: parses the toy procedure language against the generated
//! tables and prints the action trace and the parse tree.

use anyhow::Context as _;
use clap::Parser;
use kanon::grammar::{
    Grammar, GrammarDefError, NonterminalID, TerminalID,
    SymbolID::{N, T},
};
use kanon::lr1::{Automaton, ParseTables};
use kanon_runtime::engine::{ParseEngine, ParseError};
use kanon_runtime::tree::{ParseNode, TreeBuilder};
use logos::Logos;
use std::{fs, path::PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Print the grammar and the generated automaton before parsing.
    #[arg(long)]
    dump_automaton: bool,

    /// Print the token stream produced by the lexer.
    #[arg(long)]
    dump_tokens: bool,

    /// The source file to parse.
    input: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    let source = fs::read_to_string(&args.input)
        .with_context(|| anyhow::anyhow!("failed to read {}", args.input.display()))?;

    let grammar = demo_grammar().context("failed to define the demo grammar")?;
    let automaton = Automaton::generate(&grammar).context("failed to build the parse tables")?;

    if args.dump_automaton {
        println!("{}", grammar);
        println!("{}", automaton.display(&grammar));
    }

    let tokens = lex(&grammar, &source)?;
    if args.dump_tokens {
        for (i, (id, lexeme)) in tokens.iter().enumerate() {
            println!("{:>4}: {} `{}'", i, grammar.terminals[id], lexeme);
        }
    }

    let tables = automaton.tables(&grammar);

    let engine = ParseEngine::new(tables);
    match engine.parse(tokens.iter().map(|(t, _)| *t)) {
        Ok(parse) => {
            for (i, entry) in parse.trace.iter().enumerate() {
                println!("{:>4}. {}", i + 1, tables.display_trace_entry(*entry));
            }
            let symbols: Vec<_> = parse
                .symbols
                .iter()
                .map(|s| tables.display_symbol(*s).to_string())
                .collect();
            println!("final symbols: {}", symbols.join(" "));
        }
        Err(err) => {
            for (i, entry) in err.trace.iter().enumerate() {
                println!("{:>4}. {}", i + 1, tables.display_trace_entry(*entry));
            }
            return Err(syntax_error(&grammar, &tokens, err));
        }
    }

    let builder = TreeBuilder::new(tables);
    let tree = builder
        .parse(tokens.iter().map(|(t, v)| (*t, v.clone())))
        .map_err(|err| syntax_error(&grammar, &tokens, err))?;

    println!();
    print_tree(&grammar, &tree, 0);

    Ok(())
}

/// The bundled procedure-language grammar:
/// a declaration followed by a one-parameter procedure whose body is a list
/// of assignment, if/elsif/else and printf statements.
fn demo_grammar() -> Result<Grammar, GrammarDefError> {
    Grammar::define(|g| {
        let id = g.terminal("id")?;
        let colon = g.terminal("COLON")?;
        let integer = g.terminal("integer")?;
        let semi = g.terminal("SEMI")?;
        let procedure = g.terminal("procedure")?;
        let lparen = g.terminal("LPAREN")?;
        let rparen = g.terminal("RPAREN")?;
        let assign = g.terminal("ASSIGN")?;
        let num = g.terminal("num")?;
        let kw_if = g.terminal("if")?;
        let kw_then = g.terminal("then")?;
        let kw_elsif = g.terminal("elsif")?;
        let kw_else = g.terminal("else")?;
        let kw_end = g.terminal("end")?;
        let kw_and = g.terminal("and")?;
        let eq = g.terminal("EQ")?;
        let printf = g.terminal("printf")?;
        let string = g.terminal("str")?;

        let p = g.nonterminal("P")?;
        let decl = g.nonterminal("Decl")?;
        let param = g.nonterminal("Param")?;
        let proc = g.nonterminal("Proc")?;
        let stmts = g.nonterminal("S")?;
        let stmt = g.nonterminal("St")?;
        let assign_stmt = g.nonterminal("A")?;
        let if_stmt = g.nonterminal("I")?;
        let cond = g.nonterminal("C")?;
        let cmp = g.nonterminal("Cmp")?;
        let printf_stmt = g.nonterminal("F")?;
        let ty = g.nonterminal("T")?;

        g.start_symbol(p)?;

        g.rule(p, [N(decl), N(proc)])?;
        g.rule(decl, [T(id), T(colon), N(ty), T(semi)])?;
        g.rule(param, [T(id), T(colon), N(ty)])?;
        g.rule(
            proc,
            [
                T(procedure),
                T(id),
                T(lparen),
                N(param),
                T(rparen),
                N(stmts),
                T(kw_end),
                T(id),
            ],
        )?;
        g.rule(stmts, [N(stmt)])?;
        g.rule(stmts, [N(stmts), N(stmt)])?;
        g.rule(stmt, [N(assign_stmt), T(semi)])?;
        g.rule(stmt, [N(if_stmt), T(semi)])?;
        g.rule(stmt, [N(printf_stmt), T(semi)])?;
        g.rule(assign_stmt, [T(id), T(assign), T(num)])?;
        g.rule(
            if_stmt,
            [
                T(kw_if),
                N(cond),
                T(kw_then),
                N(stmts),
                T(kw_elsif),
                N(cond),
                T(kw_then),
                N(stmts),
                T(kw_else),
                N(stmts),
                T(kw_end),
                T(kw_if),
            ],
        )?;
        g.rule(cond, [N(cmp), T(kw_and), N(cmp)])?;
        g.rule(cmp, [T(id), T(eq), T(num)])?;
        g.rule(printf_stmt, [T(printf), T(lparen), T(string), T(rparen)])?;
        g.rule(ty, [T(integer)])?;

        Ok(())
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Logos)]
#[logos(skip r"[ \t\r\n]+")]
enum Tok {
    #[regex(r"[Pp]rocedure")]
    Procedure,
    #[regex(r"[Ii]f")]
    If,
    #[token("then")]
    Then,
    #[regex(r"[Ee]lsif")]
    Elsif,
    #[token("else")]
    Else,
    #[token("end")]
    End,
    #[token("integer")]
    Integer,
    #[token("printf")]
    Printf,
    #[token("and")]
    And,
    #[token(":=")]
    Assign,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("=")]
    Eq,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[0-9]+")]
    Num,
    #[regex(r#""[^"]*""#)]
    Str,
}

fn terminal_name(tok: Tok) -> &'static str {
    match tok {
        Tok::Procedure => "procedure",
        Tok::If => "if",
        Tok::Then => "then",
        Tok::Elsif => "elsif",
        Tok::Else => "else",
        Tok::End => "end",
        Tok::Integer => "integer",
        Tok::Printf => "printf",
        Tok::And => "and",
        Tok::Assign => "ASSIGN",
        Tok::Colon => "COLON",
        Tok::Semi => "SEMI",
        Tok::LParen => "LPAREN",
        Tok::RParen => "RPAREN",
        Tok::Eq => "EQ",
        Tok::Ident => "id",
        Tok::Num => "num",
        Tok::Str => "str",
    }
}

fn lex(grammar: &Grammar, source: &str) -> anyhow::Result<Vec<(TerminalID, String)>> {
    let mut tokens = vec![];
    let mut lexer = Tok::lexer(source);
    while let Some(tok) = lexer.next() {
        let tok = tok.map_err(|()| {
            anyhow::anyhow!("unrecognized input at byte {}", lexer.span().start)
        })?;
        let id = grammar
            .terminal_id(terminal_name(tok))
            .context("the lexer produced a token outside the grammar's vocabulary")?;
        tokens.push((id, lexer.slice().to_owned()));
    }
    Ok(tokens)
}

fn syntax_error(
    grammar: &Grammar,
    tokens: &[(TerminalID, String)],
    err: ParseError<ParseTables<'_>>,
) -> anyhow::Error {
    let offending = match err.lookahead {
        Some(t) => match tokens.get(err.position) {
            Some((_, lexeme)) => format!("{} `{}'", grammar.terminals[&t], lexeme),
            None => grammar.terminals[&t].to_string(),
        },
        None => "the end of input".to_owned(),
    };
    anyhow::anyhow!(
        "{} at input position {} (state {}): unexpected {}",
        err.kind,
        err.position,
        err.state,
        offending
    )
}

fn print_tree(grammar: &Grammar, node: &ParseNode<TerminalID, NonterminalID, String>, depth: usize) {
    match node {
        ParseNode::Leaf { symbol, value } => {
            println!(
                "{:indent$}{}: {}",
                "",
                grammar.terminals[symbol],
                value,
                indent = depth * 2
            );
        }
        ParseNode::Branch { symbol, children } => {
            println!(
                "{:indent$}{}",
                "",
                grammar.nonterminals[symbol],
                indent = depth * 2
            );
            for child in children {
                print_tree(grammar, child, depth + 1);
            }
        }
    }
}
