//! Parser definition.

/// The trait for abstracting the LR(1) parse tables driven by the engine.
pub trait ParserDef {
    /// The number to identify the state of the LR(1) automaton.
    type State: Copy;

    /// The number to identify a terminal symbol.
    type Terminal: Copy;

    /// The number to identify a nonterminal symbol.
    type Nonterminal: Copy;

    /// The number to identify a production rule.
    type Rule: Copy;

    /// Return the initial state number.
    fn initial_state(&self) -> Self::State;

    /// Return the action registered for the specified state number and
    /// lookahead symbol.
    ///
    /// If there is no lookahead symbol, a `None` is passed as the end of
    /// input. A `None` return value means that the table has no action for
    /// this pair.
    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Terminal>,
    ) -> Option<ParseAction<Self::State, Self::Rule, Self::Nonterminal>>;

    /// Return the state to transition to after reducing to `left` on top of
    /// `current`.
    fn goto(&self, current: Self::State, left: Self::Nonterminal) -> Option<Self::State>;
}

impl<T: ?Sized> ParserDef for &T
where
    T: ParserDef,
{
    type State = T::State;
    type Terminal = T::Terminal;
    type Nonterminal = T::Nonterminal;
    type Rule = T::Rule;

    fn initial_state(&self) -> Self::State {
        (**self).initial_state()
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Terminal>,
    ) -> Option<ParseAction<Self::State, Self::Rule, Self::Nonterminal>> {
        (**self).action(current, lookahead)
    }

    fn goto(&self, current: Self::State, left: Self::Nonterminal) -> Option<Self::State> {
        (**self).goto(current, left)
    }
}

impl<T: ?Sized> ParserDef for std::rc::Rc<T>
where
    T: ParserDef,
{
    type State = T::State;
    type Terminal = T::Terminal;
    type Nonterminal = T::Nonterminal;
    type Rule = T::Rule;

    fn initial_state(&self) -> Self::State {
        (**self).initial_state()
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Terminal>,
    ) -> Option<ParseAction<Self::State, Self::Rule, Self::Nonterminal>> {
        (**self).action(current, lookahead)
    }

    fn goto(&self, current: Self::State, left: Self::Nonterminal) -> Option<Self::State> {
        (**self).goto(current, left)
    }
}

impl<T: ?Sized> ParserDef for std::sync::Arc<T>
where
    T: ParserDef,
{
    type State = T::State;
    type Terminal = T::Terminal;
    type Nonterminal = T::Nonterminal;
    type Rule = T::Rule;

    fn initial_state(&self) -> Self::State {
        (**self).initial_state()
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Terminal>,
    ) -> Option<ParseAction<Self::State, Self::Rule, Self::Nonterminal>> {
        (**self).action(current, lookahead)
    }

    fn goto(&self, current: Self::State, left: Self::Nonterminal) -> Option<Self::State> {
        (**self).goto(current, left)
    }
}

/// The action that the automaton performs for a particular state and
/// lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq)]
#[non_exhaustive]
pub enum ParseAction<TState, TRule, TNonterminal> {
    /// Consume the lookahead symbol and transition to the specified state.
    Shift(TState),

    /// Reduce by the specified production rule. The payload carries the
    /// rule, its left-hand side and the length of its right-hand side.
    Reduce(TRule, TNonterminal, usize),

    /// The input has been recognized.
    Accept,
}
