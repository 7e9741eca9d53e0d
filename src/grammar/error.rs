use thiserror::Error;

use super::slr_table::Action;

/// Errors raised while loading a grammar or compiling its parsing table.
///
/// None of these are recoverable: a grammar that fails here yields no table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("Line {line}: {reason}")]
    MalformedProduction { line: usize, reason: String },

    #[error("start symbol is not set")]
    MissingStartSymbol,

    /// `$` anywhere, or epsilon as a head or next to other body symbols.
    #[error("reserved symbol \"{0}\" cannot be used here")]
    ReservedSymbol(String),

    /// Two actions want the same `(state, terminal)` cell, so the grammar is not SLR(1).
    #[error("conflict in state {state} on \"{terminal}\": {existing} vs {new}")]
    Conflict {
        state: usize,
        terminal: String,
        existing: Action,
        new: Action,
    },
}

impl GrammarError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        GrammarError::MalformedProduction {
            line,
            reason: reason.into(),
        }
    }
}

/// Rejection of a single input string. Other strings of a batch are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("input string has a symbol ({0}) that is not recognized by the grammar")]
    UnrecognizedSymbol(String),

    #[error("no table entry for state {state} and symbol \"{symbol}\"")]
    NoAction { state: usize, symbol: String },

    /// The stack ran out during a reduce or goto. Only a broken table can cause this.
    #[error("tried to pop from the parser stack but it was empty")]
    StackUnderflow,
}
