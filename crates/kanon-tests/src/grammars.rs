//! Grammar definitions shared by the integration tests.

use kanon::grammar::{GrammarDef, GrammarDefError, SymbolID::*};

/// `S := a`, plus a terminal that no rule consumes.
pub fn g_single(g: &mut GrammarDef<'_>) -> Result<(), GrammarDefError> {
    let a = g.terminal("a")?;
    let _b = g.terminal("b")?;

    let s = g.nonterminal("S")?;

    g.start_symbol(s)?;

    g.rule(s, [T(a)])?;

    Ok(())
}

pub fn g_arithmetic(g: &mut GrammarDef<'_>) -> Result<(), GrammarDefError> {
    // declare terminal symbols.
    let lparen = g.terminal("LPAREN")?;
    let rparen = g.terminal("RPAREN")?;
    let plus = g.terminal("PLUS")?;
    let star = g.terminal("STAR")?;
    let num = g.terminal("NUM")?;

    // declare nonterminal symbols.
    let expr = g.nonterminal("EXPR")?;
    let term = g.nonterminal("TERM")?;
    let factor = g.nonterminal("FACTOR")?;

    g.start_symbol(expr)?;

    // declare syntax rules.
    g.rule(expr, [N(expr), T(plus), N(term)])?;
    g.rule(expr, [N(term)])?;

    g.rule(term, [N(term), T(star), N(factor)])?;
    g.rule(term, [N(factor)])?;

    g.rule(factor, [T(num)])?;
    g.rule(factor, [T(lparen), N(expr), T(rparen)])?;

    Ok(())
}

/// The procedure-language grammar: a declaration followed by a
/// one-parameter procedure whose body is a list of assignment,
/// if/elsif/else and printf statements.
pub fn g_proc(g: &mut GrammarDef<'_>) -> Result<(), GrammarDefError> {
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
}
