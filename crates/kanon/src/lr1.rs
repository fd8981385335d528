//! The construction of the canonical LR(1) automaton.

use crate::first_sets::FirstSets;
use crate::grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID};
use crate::types::Map;
use crate::util::display_fn;
use kanon_runtime::definition::{ParseAction, ParserDef};
use kanon_runtime::engine::{Symbol, TraceEntry};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID {
    raw: u64,
}

impl StateID {
    pub const START: Self = Self::new(0);

    const fn new(raw: u64) -> Self {
        Self { raw }
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

// LR(1) item core: a production rule together with a marker position into
// its right-hand side.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct ItemCore {
    rule: RuleID,
    marker: usize,
}

impl ItemCore {
    fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let rule = &g.rules[&self.rule];
            write!(f, "({} :=", g.nonterminals[&rule.left()])?;
            for (i, prod) in rule.right().iter().enumerate() {
                if i == self.marker {
                    f.write_str(" .")?;
                }
                match prod {
                    SymbolID::T(t) => write!(f, " {}", g.terminals[t])?,
                    SymbolID::N(n) => write!(f, " {}", g.nonterminals[n])?,
                }
            }
            if self.marker == rule.right().len() {
                f.write_str(" .")?;
            }

            f.write_str(")")
        })
    }
}

// The item set of one state: each core mapped to its lookahead terminals.
// B-tree representations give an order-independent structural key, so two
// states are merged exactly when their full lookahead-annotated item sets
// coincide (canonical LR(1); cores are never merged).
type ItemSet = BTreeMap<ItemCore, BTreeSet<TerminalID>>;

/// The action that the automaton in a state performs on a particular
/// lookahead terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Action {
    /// Read the lookahead terminal and transition to the specified state.
    Shift(StateID),

    /// Reduce by the specified production rule.
    Reduce(RuleID),

    /// The input is recognized.
    Accept,
}

/// One state of the automaton: its closed item set, its action table row
/// and its goto table row.
#[derive(Debug)]
pub struct State {
    item_set: ItemSet,
    actions: Map<TerminalID, Action>,
    gotos: Map<NonterminalID, StateID>,
}

impl State {
    pub fn actions(&self) -> impl Iterator<Item = (TerminalID, &Action)> + '_ {
        self.actions.iter().map(|(token, action)| (*token, action))
    }

    pub fn gotos(&self) -> impl Iterator<Item = (NonterminalID, StateID)> + '_ {
        self.gotos.iter().map(|(symbol, goto)| (*symbol, *goto))
    }
}

/// The canonical collection of LR(1) states with their synthesized
/// shift/reduce/accept and goto tables.
#[derive(Debug)]
pub struct Automaton {
    states: Map<StateID, State>,
}

impl Automaton {
    /// Enumerate the canonical collection for the specified grammar and
    /// synthesize the parse tables.
    pub fn generate(grammar: &Grammar) -> Result<Self, BuildError> {
        let mut gen = Generator::new(grammar);
        gen.populate();
        tracing::debug!("canonical collection has {} states", gen.states.len());
        gen.finalize()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &State)> + '_ {
        self.states.iter().map(|(id, state)| (*id, state))
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[&id]
    }

    /// Bind the automaton to its grammar in the form the runtime engine
    /// drives.
    pub fn tables<'g>(&'g self, grammar: &'g Grammar) -> ParseTables<'g> {
        ParseTables {
            grammar,
            automaton: self,
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (i, (id, state)) in self.states().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }

                writeln!(f, "#### State {:02}", id)?;
                writeln!(f, "## item_sets")?;
                for (core, lookaheads) in &state.item_set {
                    write!(f, "- {}  [", core.display(g))?;
                    for (i, lookahead) in lookaheads.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" ")?;
                        }
                        write!(f, "{}", g.terminals[lookahead])?;
                    }
                    f.write_str("]\n")?;
                }

                writeln!(f, "## actions")?;
                for (token, action) in &state.actions {
                    let token = &g.terminals[token];
                    match action {
                        Action::Shift(n) => {
                            writeln!(f, "- {} => shift({:02})", token, n)?;
                        }
                        Action::Reduce(reduce) => {
                            let reduce = &g.rules[reduce];
                            writeln!(f, "- {} => reduce({})", token, reduce.display(g))?;
                        }
                        Action::Accept => {
                            writeln!(f, "- {} => accept", token)?;
                        }
                    }
                }

                writeln!(f, "## gotos")?;
                for (symbol, goto) in &state.gotos {
                    writeln!(f, "- {} => goto({:02})", g.nonterminals[symbol], goto)?;
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(
        "shift/reduce conflict in state {state} on terminal {terminal:?} \
         (shift to {shift}, reduce by {reduces:?})"
    )]
    ShiftReduceConflict {
        state: StateID,
        terminal: TerminalID,
        shift: StateID,
        reduces: Vec<RuleID>,
    },

    #[error("reduce/reduce conflict in state {state} on terminal {terminal:?} ({reduces:?})")]
    ReduceReduceConflict {
        state: StateID,
        terminal: TerminalID,
        reduces: Vec<RuleID>,
    },

    #[error("conflicting accept action in state {state} on the end-of-input marker")]
    AcceptConflict { state: StateID },
}

// === Generator ===

#[derive(Debug)]
struct Generator<'g> {
    grammar: &'g Grammar,
    first_sets: FirstSets,
    pending: VecDeque<(StateID, ItemSet)>,
    known: Map<ItemSet, StateID>,
    states: Map<StateID, (ItemSet, Map<SymbolID, StateID>)>,
    next_state_id: u64,
}

impl<'g> Generator<'g> {
    fn new(grammar: &'g Grammar) -> Self {
        let mut gen = Self {
            grammar,
            first_sets: FirstSets::new(grammar),
            pending: VecDeque::new(),
            known: Map::default(),
            states: Map::default(),
            next_state_id: 0,
        };

        // [$start := . S] {$eoi}
        let mut item_set = ItemSet::new();
        item_set.insert(
            ItemCore {
                rule: RuleID::ACCEPT,
                marker: 0,
            },
            Some(TerminalID::EOI).into_iter().collect(),
        );
        gen.expand_closures(&mut item_set);
        gen.intern(item_set);

        gen
    }

    /// Register a closed item set, reusing the id of a structurally equal
    /// state discovered earlier.
    fn intern(&mut self, item_set: ItemSet) -> StateID {
        if let Some(&id) = self.known.get(&item_set) {
            return id;
        }

        let id = StateID::new(self.next_state_id);
        self.next_state_id += 1;
        tracing::trace!("state {:02} discovered", id);

        self.known.insert(item_set.clone(), id);
        self.pending.push_back((id, item_set));
        id
    }

    /// Repeat transition extraction and closure expansion until no new
    /// state is discovered.
    fn populate(&mut self) {
        while let Some((id, item_set)) = self.pending.pop_front() {
            let mut edges = Map::default();
            for (symbol, mut kernel) in self.extract_transitions(&item_set) {
                self.expand_closures(&mut kernel);
                let target = self.intern(kernel);
                edges.insert(symbol, target);
            }
            self.states.insert(id, (item_set, edges));
        }
    }

    /// Closure expansion.
    fn expand_closures(&self, items: &mut ItemSet) {
        let mut changed = true;
        while changed {
            changed = false;

            // Extract the candidate items.
            let mut added: Map<ItemCore, BTreeSet<TerminalID>> = Map::default();
            for (core, lookaheads) in items.iter() {
                let rule = &self.grammar.rules[&core.rule];

                // [X := ... . Y beta]
                //  Y: one nonterminal symbol
                let (y_symbol, beta) = match &rule.right()[core.marker..] {
                    [SymbolID::N(y_symbol), beta @ ..] => (*y_symbol, beta),
                    _ => continue,
                };

                // With lookaheads {x1,...,xk}, every terminal in
                // First(beta x1) \cup ... \cup First(beta xk) becomes a
                // lookahead of the expanded items.
                let x = self.first_sets.get(beta, lookaheads.iter().copied());
                for rule in self.grammar.rules.values() {
                    if rule.left() != y_symbol {
                        continue;
                    }

                    added
                        .entry(ItemCore {
                            rule: rule.id(),
                            marker: 0,
                        })
                        .or_default()
                        .extend(x.iter().copied());
                }
            }

            for (core, lookaheads) in added {
                let slot = items.entry(core).or_insert_with(|| {
                    changed = true;
                    BTreeSet::new()
                });
                for l in lookaheads {
                    changed |= slot.insert(l);
                }
            }
        }
    }

    /// Extract the unexpanded kernel item set reached from `items` under
    /// each outgoing grammar symbol.
    fn extract_transitions(&self, items: &ItemSet) -> Map<SymbolID, ItemSet> {
        let mut item_sets: Map<SymbolID, ItemSet> = Map::default();
        for (core, lookaheads) in items {
            let rule = &self.grammar.rules[&core.rule];

            // Ignore items whose marker reached the end of the production.
            if core.marker >= rule.right().len() {
                continue;
            }

            let label = rule.right()[core.marker];
            let kernel = item_sets.entry(label).or_default();
            kernel
                .entry(ItemCore {
                    marker: core.marker + 1,
                    ..*core
                })
                .or_default()
                .extend(lookaheads.iter().copied());
        }
        item_sets
    }

    /// Synthesize the action and goto rows of every discovered state,
    /// rejecting the grammar if any (state, terminal) pair receives two
    /// different actions.
    fn finalize(self) -> Result<Automaton, BuildError> {
        let Generator {
            grammar, states, ..
        } = self;

        let mut out: Map<StateID, State> = Map::default();
        for (id, (item_set, edges)) in states {
            #[derive(Default)]
            struct PendingAction {
                shift: Option<StateID>,
                accept: bool,
                reduces: Vec<RuleID>,
            }
            let mut pending_actions: Map<TerminalID, PendingAction> = Map::default();
            let mut gotos: Map<NonterminalID, StateID> = Map::default();

            for (symbol, target) in edges {
                match symbol {
                    SymbolID::T(t) => {
                        pending_actions.entry(t).or_default().shift = Some(target);
                    }
                    SymbolID::N(n) => {
                        gotos.insert(n, target);
                    }
                }
            }

            for (core, lookaheads) in &item_set {
                let rule = &grammar.rules[&core.rule];
                if core.marker < rule.right().len() {
                    continue;
                }
                if core.rule == RuleID::ACCEPT {
                    pending_actions.entry(TerminalID::EOI).or_default().accept = true;
                } else {
                    for lookahead in lookaheads {
                        pending_actions
                            .entry(*lookahead)
                            .or_default()
                            .reduces
                            .push(core.rule);
                    }
                }
            }

            let mut actions: Map<TerminalID, Action> = Map::default();
            for (terminal, pending) in pending_actions {
                let resolved =
                    resolve_action(id, terminal, pending.shift, pending.accept, &pending.reduces)?;
                actions.insert(terminal, resolved);
            }

            out.insert(
                id,
                State {
                    item_set,
                    actions,
                    gotos,
                },
            );
        }

        Ok(Automaton { states: out })
    }
}

fn resolve_action(
    state: StateID,
    terminal: TerminalID,
    shift: Option<StateID>,
    accept: bool,
    reduces: &[RuleID],
) -> Result<Action, BuildError> {
    if accept {
        // The end-of-input marker never occurs in a production, so the only
        // way to compete with the accept action is another completed item
        // with an EOI lookahead.
        if shift.is_some() || !reduces.is_empty() {
            return Err(BuildError::AcceptConflict { state });
        }
        return Ok(Action::Accept);
    }

    match (shift, reduces) {
        (Some(next), []) => Ok(Action::Shift(next)),
        (None, [reduce]) => Ok(Action::Reduce(*reduce)),
        (Some(next), [_, ..]) => Err(BuildError::ShiftReduceConflict {
            state,
            terminal,
            shift: next,
            reduces: reduces.to_owned(),
        }),
        (None, [_, _, ..]) => Err(BuildError::ReduceReduceConflict {
            state,
            terminal,
            reduces: reduces.to_owned(),
        }),
        (None, []) => unreachable!(),
    }
}

// === ParseTables ===

/// The automaton bound to its grammar, implementing the runtime's parser
/// definition. Cheap to copy; one instance may drive any number of parses.
#[derive(Debug, Copy, Clone)]
pub struct ParseTables<'g> {
    grammar: &'g Grammar,
    automaton: &'g Automaton,
}

impl ParserDef for ParseTables<'_> {
    type State = StateID;
    type Terminal = TerminalID;
    type Nonterminal = NonterminalID;
    type Rule = RuleID;

    fn initial_state(&self) -> Self::State {
        StateID::START
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Terminal>,
    ) -> Option<ParseAction<Self::State, Self::Rule, Self::Nonterminal>> {
        let state = self.automaton.states.get(&current)?;
        let terminal = lookahead.unwrap_or(TerminalID::EOI);
        match *state.actions.get(&terminal)? {
            Action::Shift(next) => Some(ParseAction::Shift(next)),
            Action::Reduce(rule) => {
                let rule_ = &self.grammar.rules[&rule];
                Some(ParseAction::Reduce(rule, rule_.left(), rule_.right().len()))
            }
            Action::Accept => Some(ParseAction::Accept),
        }
    }

    fn goto(&self, current: Self::State, left: Self::Nonterminal) -> Option<Self::State> {
        self.automaton.states.get(&current)?.gotos.get(&left).copied()
    }
}

impl<'g> ParseTables<'g> {
    /// Render one engine trace entry as a human-readable line.
    pub fn display_trace_entry(&self, entry: TraceEntry<Self>) -> impl fmt::Display + 'g {
        let g = self.grammar;
        display_fn(move |f| match entry {
            TraceEntry::Shift { next } => write!(f, "shift and go to state {}", next),
            TraceEntry::Reduce { rule, .. } => {
                write!(f, "reduce by {}", g.rules[&rule].display(g))
            }
            TraceEntry::Accept => f.write_str("accept"),
        })
    }

    /// Render a parse-stack symbol by its exported name.
    pub fn display_symbol(&self, symbol: Symbol<Self>) -> impl fmt::Display + 'g {
        let g = self.grammar;
        display_fn(move |f| match symbol {
            Symbol::T(t) => write!(f, "{}", g.terminals[&t]),
            Symbol::N(n) => write!(f, "{}", g.nonterminals[&n]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    fn arithmetic() -> Grammar {
        Grammar::define(|g| {
            let lparen = g.terminal("LPAREN")?;
            let rparen = g.terminal("RPAREN")?;
            let plus = g.terminal("PLUS")?;
            let star = g.terminal("STAR")?;
            let num = g.terminal("NUM")?;

            let expr = g.nonterminal("EXPR")?;
            let term = g.nonterminal("TERM")?;
            let factor = g.nonterminal("FACTOR")?;

            g.start_symbol(expr)?;

            g.rule(expr, [N(expr), T(plus), N(term)])?;
            g.rule(expr, [N(term)])?;
            g.rule(term, [N(term), T(star), N(factor)])?;
            g.rule(term, [N(factor)])?;
            g.rule(factor, [T(num)])?;
            g.rule(factor, [T(lparen), N(expr), T(rparen)])?;

            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn smoketest_arithmetic() {
        let grammar = arithmetic();
        let automaton = Automaton::generate(&grammar).unwrap();
        eprintln!("{}", automaton.display(&grammar));
    }

    #[test]
    fn closure_is_idempotent() {
        let grammar = arithmetic();
        let gen = Generator::new(&grammar);

        let mut items = ItemSet::new();
        items.insert(
            ItemCore {
                rule: RuleID::ACCEPT,
                marker: 0,
            },
            Some(TerminalID::EOI).into_iter().collect(),
        );
        gen.expand_closures(&mut items);
        let once = items.clone();
        gen.expand_closures(&mut items);
        assert_eq!(once, items);
    }

    #[test]
    fn no_transition_out_of_a_completed_item() {
        let grammar = arithmetic();
        let gen = Generator::new(&grammar);

        let mut items = ItemSet::new();
        items.insert(
            ItemCore {
                rule: RuleID::ACCEPT,
                marker: 1,
            },
            Some(TerminalID::EOI).into_iter().collect(),
        );
        assert!(gen.extract_transitions(&items).is_empty());
    }

    #[test]
    fn shared_suffix_states_are_merged() {
        // S := x E | y E, E := z — the state holding the completed (E := z .)
        // item is reached from two different predecessors and must be
        // allocated exactly once.
        let grammar = Grammar::define(|g| {
            let x = g.terminal("x")?;
            let y = g.terminal("y")?;
            let z = g.terminal("z")?;
            let s = g.nonterminal("S")?;
            let e = g.nonterminal("E")?;
            g.start_symbol(s)?;
            g.rule(s, [T(x), N(e)])?;
            g.rule(s, [T(y), N(e)])?;
            g.rule(e, [T(z)])?;
            Ok(())
        })
        .unwrap();

        let automaton = Automaton::generate(&grammar).unwrap();
        assert_eq!(automaton.len(), 7);
    }

    #[test]
    fn accept_action_on_eoi_only() {
        let grammar = arithmetic();
        let automaton = Automaton::generate(&grammar).unwrap();

        let accepts: Vec<_> = automaton
            .states()
            .flat_map(|(id, state)| {
                state
                    .actions()
                    .filter(|(_, action)| matches!(action, Action::Accept))
                    .map(move |(token, _)| (id, token))
            })
            .collect();
        assert_eq!(accepts.len(), 1);
        assert_eq!(accepts[0].1, TerminalID::EOI);
    }

    #[test]
    fn generation_is_deterministic() {
        let grammar = arithmetic();
        let one = Automaton::generate(&grammar).unwrap();
        let two = Automaton::generate(&grammar).unwrap();
        assert_eq!(
            one.display(&grammar).to_string(),
            two.display(&grammar).to_string()
        );
    }

    #[test]
    fn reduce_reduce_conflict_is_reported() {
        // S := A | B, A := a, B := a
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            let na = g.nonterminal("A")?;
            let nb = g.nonterminal("B")?;
            g.start_symbol(s)?;
            g.rule(s, [N(na)])?;
            g.rule(s, [N(nb)])?;
            g.rule(na, [T(a)])?;
            g.rule(nb, [T(a)])?;
            Ok(())
        })
        .unwrap();

        let err = Automaton::generate(&grammar).unwrap_err();
        assert!(matches!(err, BuildError::ReduceReduceConflict { .. }));
    }

    #[test]
    fn shift_reduce_conflict_is_reported() {
        // E := E plus E | num is ambiguous without associativity.
        let grammar = Grammar::define(|g| {
            let plus = g.terminal("plus")?;
            let num = g.terminal("num")?;
            let e = g.nonterminal("E")?;
            g.start_symbol(e)?;
            g.rule(e, [N(e), T(plus), N(e)])?;
            g.rule(e, [T(num)])?;
            Ok(())
        })
        .unwrap();

        let err = Automaton::generate(&grammar).unwrap_err();
        assert!(matches!(err, BuildError::ShiftReduceConflict { .. }));
    }
}
