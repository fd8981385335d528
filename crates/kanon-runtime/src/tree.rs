//! Concrete parse tree construction.

use crate::definition::{ParseAction, ParserDef};
use crate::engine::{ParseError, ParseErrorKind, TraceEntry};
use std::fmt;

/// A node of the concrete syntax tree built during the table walk.
///
/// Leaves carry the lexeme value supplied with the shifted token; interior
/// nodes are labeled with the nonterminal the children were reduced to.
pub enum ParseNode<TTerminal, TNonterminal, V> {
    Leaf {
        symbol: TTerminal,
        value: V,
    },
    Branch {
        symbol: TNonterminal,
        children: Vec<ParseNode<TTerminal, TNonterminal, V>>,
    },
}

impl<TTerminal, TNonterminal, V> ParseNode<TTerminal, TNonterminal, V> {
    /// Collect the terminal leaves in left-to-right order.
    pub fn leaves(&self) -> Vec<(&TTerminal, &V)> {
        let mut out = vec![];
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<(&'a TTerminal, &'a V)>) {
        match self {
            Self::Leaf { symbol, value } => out.push((symbol, value)),
            Self::Branch { children, .. } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

impl<TTerminal, TNonterminal, V> fmt::Debug for ParseNode<TTerminal, TNonterminal, V>
where
    TTerminal: fmt::Debug,
    TNonterminal: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf { symbol, value } => f
                .debug_struct("Leaf")
                .field("symbol", symbol)
                .field("value", value)
                .finish(),
            Self::Branch { symbol, children } => f
                .debug_struct("Branch")
                .field("symbol", symbol)
                .field("children", children)
                .finish(),
        }
    }
}

/// The tree-building variant of the parse engine.
///
/// It performs the same table walk as [`ParseEngine`](crate::engine::ParseEngine)
/// but keeps a stack of tree nodes instead of bare symbols, and fails with
/// the same [`ParseError`] as the plain walk.
#[derive(Debug)]
pub struct TreeBuilder<D>
where
    D: ParserDef,
{
    def: D,
}

impl<D> TreeBuilder<D>
where
    D: ParserDef,
{
    /// Create a tree builder using the specified parser definition.
    pub fn new(def: D) -> Self {
        Self { def }
    }

    /// Walk the token stream and build the concrete syntax tree.
    ///
    /// Each token pairs a terminal symbol with the lexeme value stored in
    /// the corresponding leaf. On acceptance the returned root is the node
    /// of the grammar's start symbol.
    pub fn parse<V, I>(
        &self,
        tokens: I,
    ) -> Result<ParseNode<D::Terminal, D::Nonterminal, V>, ParseError<D>>
    where
        I: IntoIterator<Item = (D::Terminal, V)>,
    {
        let mut input = tokens.into_iter();
        let mut states = vec![self.def.initial_state()];
        let mut nodes: Vec<ParseNode<D::Terminal, D::Nonterminal, V>> = vec![];
        let mut trace = vec![];
        let mut position = 0;
        let mut lookahead = input.next();

        loop {
            let current = *states.last().unwrap();
            let action = match self.def.action(current, lookahead.as_ref().map(|(t, _)| *t)) {
                Some(action) => action,
                None => {
                    return Err(ParseError {
                        kind: ParseErrorKind::MissingAction,
                        state: current,
                        lookahead: lookahead.map(|(t, _)| t),
                        position,
                        trace,
                    })
                }
            };

            match action {
                ParseAction::Shift(next) => {
                    let (symbol, value) = lookahead
                        .take()
                        .expect("the end of input must not be shifted");
                    nodes.push(ParseNode::Leaf { symbol, value });
                    states.push(next);
                    trace.push(TraceEntry::Shift { next });
                    lookahead = input.next();
                    position += 1;
                }

                ParseAction::Reduce(rule, left, arity) => {
                    states.truncate(states.len() - arity);
                    // split_off keeps the children in left-to-right order
                    let children = nodes.split_off(nodes.len() - arity);
                    nodes.push(ParseNode::Branch { symbol: left, children });

                    let uncovered = *states.last().unwrap();
                    match self.def.goto(uncovered, left) {
                        Some(next) => states.push(next),
                        None => {
                            return Err(ParseError {
                                kind: ParseErrorKind::MissingGoto,
                                state: uncovered,
                                lookahead: lookahead.map(|(t, _)| t),
                                position,
                                trace,
                            })
                        }
                    }
                    trace.push(TraceEntry::Reduce { rule, left, arity });
                }

                ParseAction::Accept => {
                    let root = nodes.pop().expect("empty node stack on acceptance");
                    debug_assert!(nodes.is_empty());
                    return Ok(root);
                }
            }
        }
    }
}
