use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use serde::Serialize;

use super::{
    lr_dfa::LR0Automaton, nullable_first_follow::FirstFollow, Grammar, GrammarError, END_MARK_IDX,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "target")]
pub enum Action {
    Shift(usize),
    /// Reduce by the production at this (post-augmentation) index.
    Reduce(usize),
    Accept,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Shift(s) => write!(f, "s{}", s),
            Action::Reduce(p) => write!(f, "r{}", p),
            Action::Accept => write!(f, "acc"),
        }
    }
}

/// Dense SLR(1) table. Rows are automaton states; `action` columns follow
/// `terminals` (ending with `$`), `goto` columns follow `non_terminals`.
#[derive(Debug, Clone)]
pub struct SLRParsingTable {
    pub terminals: Vec<usize>,
    pub non_terminals: Vec<usize>,
    pub action: Vec<Vec<Option<Action>>>,
    pub goto: Vec<Vec<Option<usize>>>,
    terminal_column: HashMap<usize, usize>,
    non_terminal_column: HashMap<usize, usize>,
}

impl SLRParsingTable {
    fn new(g: &Grammar, state_count: usize) -> Self {
        let terminals: Vec<usize> = g
            .terminal_indices()
            .chain(std::iter::once(END_MARK_IDX))
            .collect();
        let non_terminals: Vec<usize> = g.non_terminal_iter().map(|nt| nt.index).collect();

        Self {
            action: vec![vec![None; terminals.len()]; state_count],
            goto: vec![vec![None; non_terminals.len()]; state_count],
            terminal_column: terminals.iter().enumerate().map(|(i, t)| (*t, i)).collect(),
            non_terminal_column: non_terminals
                .iter()
                .enumerate()
                .map(|(i, nt)| (*nt, i))
                .collect(),
            terminals,
            non_terminals,
        }
    }

    pub fn state_count(&self) -> usize {
        self.action.len()
    }

    /// `None` both for an empty cell and for a symbol that is not a terminal.
    pub fn action(&self, state: usize, terminal: usize) -> Option<Action> {
        let column = *self.terminal_column.get(&terminal)?;
        self.action.get(state).and_then(|row| row[column])
    }

    pub fn goto(&self, state: usize, non_terminal: usize) -> Option<usize> {
        let column = *self.non_terminal_column.get(&non_terminal)?;
        self.goto.get(state).and_then(|row| row[column])
    }

    pub fn is_action_symbol(&self, symbol: usize) -> bool {
        self.terminal_column.contains_key(&symbol)
    }

    fn insert_action(
        &mut self,
        g: &Grammar,
        state: usize,
        terminal: usize,
        action: Action,
    ) -> Result<(), GrammarError> {
        let column = self.terminal_column[&terminal];
        let cell = &mut self.action[state][column];
        match cell {
            Some(existing) => {
                let err = GrammarError::Conflict {
                    state,
                    terminal: g.get_symbol_name(terminal).to_string(),
                    existing: *existing,
                    new: action,
                };
                warn!("{}", err);
                Err(err)
            }
            None => {
                *cell = Some(action);
                Ok(())
            }
        }
    }
}

impl LR0Automaton {
    /// Compiles the SLR(1) table. Fails on the first cell that would receive two
    /// actions; no partial table is returned.
    pub fn to_slr_parsing_table(
        &self,
        g: &Grammar,
        ff: &FirstFollow,
    ) -> Result<SLRParsingTable, GrammarError> {
        let mut table = SLRParsingTable::new(g, self.states.len());

        for (u, state) in self.states.iter().enumerate() {
            for (&symbol, &v) in &state.edges {
                if g.is_terminal(symbol) {
                    table.insert_action(g, u, symbol, Action::Shift(v))?;
                } else if let Some(&column) = table.non_terminal_column.get(&symbol) {
                    table.goto[u][column] = Some(v);
                } else {
                    return Err(GrammarError::ReservedSymbol(
                        g.get_symbol_name(symbol).to_string(),
                    ));
                }
            }
        }

        for (u, state) in self.states.iter().enumerate() {
            for item in state.completed(g) {
                if item.production == 0 && g.augmented_start.is_some() {
                    table.insert_action(g, u, END_MARK_IDX, Action::Accept)?;
                    continue;
                }
                let head = g.productions[item.production].head;
                let mut follow: Vec<usize> = ff
                    .follow(head)
                    .map(|f| f.iter().cloned().collect())
                    .unwrap_or_default();
                follow.sort_unstable();
                for t in follow {
                    table.insert_action(g, u, t, Action::Reduce(item.production))?;
                }
            }
        }

        debug!(
            "SLR(1) table compiled: {} states, {} terminals, {} non-terminals",
            table.state_count(),
            table.terminals.len(),
            table.non_terminals.len()
        );
        Ok(table)
    }
}
