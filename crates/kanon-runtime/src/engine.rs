//! The table-driven LR(1) parse engine.

use crate::definition::{ParseAction, ParserDef};
use std::fmt;

/// A grammar symbol left on the parse stack.
pub enum Symbol<D>
where
    D: ParserDef,
{
    T(D::Terminal),
    N(D::Nonterminal),
}

impl<D> fmt::Debug for Symbol<D>
where
    D: ParserDef,
    D::Terminal: fmt::Debug,
    D::Nonterminal: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T(t) => f.debug_tuple("T").field(t).finish(),
            Self::N(n) => f.debug_tuple("N").field(n).finish(),
        }
    }
}

impl<D: ParserDef> Clone for Symbol<D> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<D: ParserDef> Copy for Symbol<D> {}

/// One step taken by the engine while consuming the input.
pub enum TraceEntry<D>
where
    D: ParserDef,
{
    Shift { next: D::State },
    Reduce { rule: D::Rule, left: D::Nonterminal, arity: usize },
    Accept,
}

impl<D> fmt::Debug for TraceEntry<D>
where
    D: ParserDef,
    D::State: fmt::Debug,
    D::Rule: fmt::Debug,
    D::Nonterminal: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift { next } => f.debug_struct("Shift").field("next", next).finish(),
            Self::Reduce { rule, left, arity } => f
                .debug_struct("Reduce")
                .field("rule", rule)
                .field("left", left)
                .field("arity", arity)
                .finish(),
            Self::Accept => f.debug_struct("Accept").finish(),
        }
    }
}

impl<D: ParserDef> Clone for TraceEntry<D> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<D: ParserDef> Copy for TraceEntry<D> {}

/// The result of a successful table walk: the final symbol stack and the
/// full sequence of actions that produced it.
pub struct Parse<D>
where
    D: ParserDef,
{
    pub symbols: Vec<Symbol<D>>,
    pub trace: Vec<TraceEntry<D>>,
}

impl<D> fmt::Debug for Parse<D>
where
    D: ParserDef,
    D::State: fmt::Debug,
    D::Terminal: fmt::Debug,
    D::Rule: fmt::Debug,
    D::Nonterminal: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parse")
            .field("symbols", &self.symbols)
            .field("trace", &self.trace)
            .finish()
    }
}

/// The kind of failure encountered during a table walk.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ParseErrorKind {
    /// No action is registered for the current state and lookahead symbol.
    /// This is a syntax error in the input.
    #[error("no action for the current state and lookahead symbol")]
    MissingAction,

    /// No goto entry is registered for the uncovered state and the reduced
    /// nonterminal. Unreachable for a correctly built table.
    #[error("missing goto entry after reduction")]
    MissingGoto,
}

/// The unified failure value shared by the parse engine and the tree
/// builder, carrying enough context to diagnose the rejection.
pub struct ParseError<D>
where
    D: ParserDef,
{
    pub kind: ParseErrorKind,
    /// The state on top of the stack when the walk stopped.
    pub state: D::State,
    /// The lookahead symbol at that point. `None` means the end of input.
    pub lookahead: Option<D::Terminal>,
    /// The number of input symbols consumed before the failure.
    pub position: usize,
    /// The steps taken up to the failure.
    pub trace: Vec<TraceEntry<D>>,
}

impl<D> fmt::Debug for ParseError<D>
where
    D: ParserDef,
    D::State: fmt::Debug,
    D::Terminal: fmt::Debug,
    D::Rule: fmt::Debug,
    D::Nonterminal: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseError")
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("lookahead", &self.lookahead)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

impl<D> fmt::Display for ParseError<D>
where
    D: ParserDef,
    D::State: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (state {}, input position {})",
            self.kind, self.state, self.position
        )
    }
}

impl<D> std::error::Error for ParseError<D>
where
    D: ParserDef,
    D::State: fmt::Debug + fmt::Display,
    D::Terminal: fmt::Debug,
    D::Rule: fmt::Debug,
    D::Nonterminal: fmt::Debug,
{
}

/// The instance of the LR(1) parse engine, driving a stream of terminal
/// symbols against a parser definition.
#[derive(Debug)]
pub struct ParseEngine<D>
where
    D: ParserDef,
{
    def: D,
}

impl<D> ParseEngine<D>
where
    D: ParserDef,
{
    /// Create a parse engine using the specified parser definition.
    pub fn new(def: D) -> Self {
        Self { def }
    }

    /// Walk the whole token stream against the tables.
    ///
    /// The end-of-input marker is appended implicitly: once the iterator is
    /// exhausted the lookahead becomes the end of input. On success the
    /// symbol stack holds exactly the grammar's start symbol.
    pub fn parse<I>(&self, tokens: I) -> Result<Parse<D>, ParseError<D>>
    where
        I: IntoIterator<Item = D::Terminal>,
    {
        let mut input = tokens.into_iter();
        let mut states = vec![self.def.initial_state()];
        let mut symbols: Vec<Symbol<D>> = vec![];
        let mut trace = vec![];
        let mut position = 0;
        let mut lookahead = input.next();

        loop {
            let current = *states.last().unwrap();
            let action = match self.def.action(current, lookahead) {
                Some(action) => action,
                None => {
                    return Err(ParseError {
                        kind: ParseErrorKind::MissingAction,
                        state: current,
                        lookahead,
                        position,
                        trace,
                    })
                }
            };

            match action {
                ParseAction::Shift(next) => {
                    let terminal = lookahead
                        .take()
                        .expect("the end of input must not be shifted");
                    symbols.push(Symbol::T(terminal));
                    states.push(next);
                    trace.push(TraceEntry::Shift { next });
                    lookahead = input.next();
                    position += 1;
                }

                ParseAction::Reduce(rule, left, arity) => {
                    states.truncate(states.len() - arity);
                    symbols.truncate(symbols.len() - arity);

                    let uncovered = *states.last().unwrap();
                    symbols.push(Symbol::N(left));
                    match self.def.goto(uncovered, left) {
                        Some(next) => states.push(next),
                        None => {
                            return Err(ParseError {
                                kind: ParseErrorKind::MissingGoto,
                                state: uncovered,
                                lookahead,
                                position,
                                trace,
                            })
                        }
                    }
                    trace.push(TraceEntry::Reduce { rule, left, arity });
                }

                ParseAction::Accept => {
                    trace.push(TraceEntry::Accept);
                    return Ok(Parse { symbols, trace });
                }
            }
        }
    }
}
