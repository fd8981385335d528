//! Calculation of the FOLLOW set function.

use crate::first_sets::FirstSets;
use crate::grammar::{Grammar, NonterminalID, SymbolID, TerminalID};
use crate::types::{Map, Set};

/// The FOLLOW sets of a grammar.
///
/// The automaton construction derives its lookaheads from FIRST alone, so
/// these sets are not consumed by table synthesis; they are exposed for
/// grammar analysis and for diagnosing conflict reports.
#[derive(Debug)]
pub struct FollowSets {
    map: Map<NonterminalID, Set<TerminalID>>,
}

impl FollowSets {
    pub fn new(grammar: &Grammar, first_sets: &FirstSets) -> Self {
        let mut map: Map<NonterminalID, Set<TerminalID>> = Map::default();
        for id in grammar.nonterminals.keys() {
            map.insert(*id, Set::default());
        }

        // Follow($start) = {$eoi} by definition. The augmented start symbol
        // never appears on a right-hand side, so the fixed point below never
        // grows it.
        map[&NonterminalID::START].insert(TerminalID::EOI);

        // Repeat until no set changes:
        // for each rule A -> alpha B beta, Follow(B) gains First(beta), and
        // additionally Follow(A) when beta is empty or entirely nullable.
        let mut changed = true;
        while changed {
            changed = false;
            for rule in grammar.rules.values() {
                for (i, symbol) in rule.right().iter().enumerate() {
                    let b = match symbol {
                        SymbolID::N(n) => *n,
                        SymbolID::T(..) => continue,
                    };
                    let beta = &rule.right()[i + 1..];

                    let mut added = first_sets.get(beta, std::iter::empty());
                    if beta.iter().all(|s| first_sets.is_nullable(*s)) {
                        added.extend(map[&rule.left()].iter().copied());
                    }

                    let follow = map.get_mut(&b).unwrap();
                    for tok in added {
                        changed |= follow.insert(tok);
                    }
                }
            }
        }

        Self { map }
    }

    /// The terminals that can immediately follow the specified nonterminal.
    pub fn get(&self, symbol: NonterminalID) -> &Set<TerminalID> {
        &self.map[&symbol]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    fn sample_grammar() -> Grammar {
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
    fn follow_of_augmented_start() {
        let grammar = sample_grammar();
        let first = FirstSets::new(&grammar);
        let follow = FollowSets::new(&grammar, &first);

        let start: Vec<_> = follow.get(NonterminalID::START).iter().copied().collect();
        assert_eq!(start, [TerminalID::EOI]);
    }

    #[test]
    fn follow_through_suffix_and_lhs() {
        let grammar = sample_grammar();
        let first = FirstSets::new(&grammar);
        let follow = FollowSets::new(&grammar, &first);

        let b = grammar.terminal_id("b").unwrap();
        let s = grammar.nonterminal_id("S").unwrap();
        let a_sym = grammar.nonterminal_id("A").unwrap();

        // Follow(S) inherits {$eoi} from the augmented rule.
        let follow_s: Vec<_> = follow.get(s).iter().copied().collect();
        assert_eq!(follow_s, [TerminalID::EOI]);

        // Follow(A) = First(b) = {b}.
        let follow_a: Vec<_> = follow.get(a_sym).iter().copied().collect();
        assert_eq!(follow_a, [b]);
    }

    #[test]
    fn fixed_point_is_stable() {
        let grammar = sample_grammar();
        let first = FirstSets::new(&grammar);
        let one = FollowSets::new(&grammar, &first);
        let two = FollowSets::new(&grammar, &first);
        assert_eq!(one.map, two.map);
    }

    #[test]
    fn rerunning_the_solver_is_a_noop() {
        let grammar = sample_grammar();
        let first = FirstSets::new(&grammar);
        let follow = FollowSets::new(&grammar, &first);

        // one more propagation pass over the computed sets must add nothing
        for rule in grammar.rules.values() {
            for (i, symbol) in rule.right().iter().enumerate() {
                let b = match symbol {
                    SymbolID::N(n) => *n,
                    SymbolID::T(..) => continue,
                };
                let beta = &rule.right()[i + 1..];

                let mut expected = first.get(beta, std::iter::empty());
                if beta.iter().all(|s| first.is_nullable(*s)) {
                    expected.extend(follow.get(rule.left()).iter().copied());
                }
                assert!(expected.iter().all(|t| follow.get(b).contains(t)));
            }
        }
    }
}
