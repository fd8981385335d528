//! Calculation of the FIRST set function.

use crate::grammar::{Grammar, NonterminalID, SymbolID, TerminalID};
use crate::types::{Map, Set};

/// The FIRST sets of a grammar, together with its nullable symbols.
#[derive(Debug)]
pub struct FirstSets {
    nulls: Set<NonterminalID>,
    map: Map<SymbolID, Set<TerminalID>>,
}

impl FirstSets {
    pub fn new(grammar: &Grammar) -> Self {
        let nulls = nulls_set(grammar);
        let map = first_set(grammar, &nulls);
        Self { nulls, map }
    }

    /// Whether the specified symbol can derive the empty string.
    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        matches!(symbol, SymbolID::N(n) if self.nulls.contains(&n))
    }

    /// The terminals that can begin a derivation of the specified symbol.
    pub fn first(&self, symbol: SymbolID) -> &Set<TerminalID> {
        &self.map[&symbol]
    }

    /// `First(prefix lookaheads)`
    ///
    /// Accumulation stops at the first non-nullable symbol of the prefix;
    /// only when the whole prefix is nullable are the lookahead terminals
    /// appended.
    pub fn get<L>(&self, prefix: &[SymbolID], lookaheads: L) -> Set<TerminalID>
    where
        L: IntoIterator<Item = TerminalID>,
    {
        let mut res = Set::default();

        let mut is_end = false;
        for symbol in prefix {
            res.extend(self.map[symbol].iter().copied());
            if !self.is_nullable(*symbol) {
                is_end = true;
                break;
            }
        }

        if !is_end {
            res.extend(lookaheads);
        }

        res
    }
}

/// Calculate the set of nullable symbols in this grammar.
fn nulls_set(grammar: &Grammar) -> Set<NonterminalID> {
    // A rule with an empty right-hand side makes its left-hand side nullable
    // unconditionally.
    let mut nulls: Set<NonterminalID> = grammar
        .rules
        .values()
        .filter_map(|rule| rule.right().is_empty().then(|| rule.left()))
        .collect();

    // Repeat until the set no longer changes.
    let mut changed = true;
    while changed {
        changed = false;
        for rule in grammar.rules.values() {
            if nulls.contains(&rule.left()) {
                continue;
            }
            let is_rhs_nullable = rule
                .right()
                .iter()
                .all(|symbol| matches!(symbol, SymbolID::N(n) if nulls.contains(n)));
            if is_rhs_nullable {
                changed = true;
                nulls.insert(rule.left());
                continue;
            }
        }
    }

    nulls
}

fn first_set(grammar: &Grammar, nulls: &Set<NonterminalID>) -> Map<SymbolID, Set<TerminalID>> {
    let mut map: Map<SymbolID, Set<TerminalID>> = Map::default();

    // First(T) = {T} for terminal symbols.
    for terminal in grammar.terminals.values() {
        map.insert(
            SymbolID::T(terminal.id()),
            Some(terminal.id()).into_iter().collect(),
        );
    }
    // First(N) = {} as the initial value for nonterminal symbols.
    for nonterminal in grammar.nonterminals.values() {
        map.insert(SymbolID::N(nonterminal.id()), Set::default());
    }

    // Extract the constraints:
    // for a rule X -> Y1 Y2 ... Yn, let Yk be the first non-nullable symbol
    // of the right-hand side; then First(X) \supseteq First(Yi) holds for
    // every i in 1..=k.
    struct Constraint {
        sup: NonterminalID,
        sub: SymbolID,
    }
    let mut constraints = vec![];
    for rule in grammar.rules.values() {
        for symbol in rule.right() {
            if !matches!(symbol, SymbolID::N(n) if rule.left() == *n) {
                constraints.push(Constraint {
                    sup: rule.left(),
                    sub: *symbol,
                });
            }
            if !matches!(symbol, SymbolID::N(n) if nulls.contains(n)) {
                break;
            }
        }
    }

    // Resolve the constraints by propagating the subset into the superset
    // until no set changes.
    let mut changed = true;
    while changed {
        changed = false;

        for Constraint { sup, sub } in &constraints {
            let mut superset = map.swap_remove(&SymbolID::N(*sup)).unwrap();
            let subset = map.get(sub).unwrap();

            for tok in subset {
                if !superset.contains(tok) {
                    superset.insert(*tok);
                    changed = true;
                }
            }

            map.insert(SymbolID::N(*sup), superset);
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    fn nullable_grammar() -> Grammar {
        // S := A b
        // A := a | (empty)
        Grammar::define(|g| {
            let a = g.terminal("a")?;
            let b = g.terminal("b")?;
            let s = g.nonterminal("S")?;
            let a_sym = g.nonterminal("A")?;
            g.start_symbol(s)?;
            g.rule(s, [N(a_sym), T(b)])?;
            g.rule(a_sym, [T(a)])?;
            g.rule(a_sym, [])?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn nullable_propagation() {
        let grammar = nullable_grammar();
        let first = FirstSets::new(&grammar);

        let a_sym = grammar.nonterminal_id("A").unwrap();
        let s = grammar.nonterminal_id("S").unwrap();
        assert!(first.is_nullable(N(a_sym)));
        assert!(!first.is_nullable(N(s)));
    }

    #[test]
    fn first_of_nonterminals() {
        let grammar = nullable_grammar();
        let first = FirstSets::new(&grammar);

        let a = grammar.terminal_id("a").unwrap();
        let b = grammar.terminal_id("b").unwrap();
        let s = grammar.nonterminal_id("S").unwrap();
        let a_sym = grammar.nonterminal_id("A").unwrap();

        // First(A) = {a}; First(S) = {a, b} since A is nullable.
        let first_a: Vec<_> = first.first(N(a_sym)).iter().copied().collect();
        assert_eq!(first_a, [a]);
        let mut first_s: Vec<_> = first.first(N(s)).iter().copied().collect();
        first_s.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(first_s, expected);
    }

    #[test]
    fn eoi_never_derived() {
        let grammar = nullable_grammar();
        let first = FirstSets::new(&grammar);

        for nonterminal in grammar.nonterminals.keys() {
            assert!(!first.first(N(*nonterminal)).contains(&TerminalID::EOI));
        }
    }

    #[test]
    fn prefix_accumulation() {
        let grammar = nullable_grammar();
        let first = FirstSets::new(&grammar);

        let a = grammar.terminal_id("a").unwrap();
        let b = grammar.terminal_id("b").unwrap();
        let a_sym = grammar.nonterminal_id("A").unwrap();

        // A is nullable, so the lookahead shows through.
        let set = first.get(&[N(a_sym)], Some(TerminalID::EOI));
        assert!(set.contains(&a));
        assert!(set.contains(&TerminalID::EOI));

        // b is not nullable; accumulation stops there.
        let set = first.get(&[T(b), N(a_sym)], Some(TerminalID::EOI));
        assert!(set.contains(&b));
        assert!(!set.contains(&a));
        assert!(!set.contains(&TerminalID::EOI));
    }

    #[test]
    fn fixed_point_is_stable() {
        let grammar = nullable_grammar();
        let one = FirstSets::new(&grammar);
        let two = FirstSets::new(&grammar);
        assert_eq!(one.nulls, two.nulls);
        assert_eq!(one.map, two.map);
    }

    #[test]
    fn rerunning_the_solver_is_a_noop() {
        let grammar = nullable_grammar();
        let first = FirstSets::new(&grammar);

        // one more propagation pass over the computed sets must add nothing
        for rule in grammar.rules.values() {
            let mut acc: Set<TerminalID> = Set::default();
            let mut all_nullable = true;
            for symbol in rule.right() {
                acc.extend(first.first(*symbol).iter().copied());
                if !first.is_nullable(*symbol) {
                    all_nullable = false;
                    break;
                }
            }

            let lhs_first = first.first(N(rule.left()));
            assert!(acc.iter().all(|t| lhs_first.contains(t)));
            if all_nullable {
                assert!(first.is_nullable(N(rule.left())));
            }
        }
    }
}
