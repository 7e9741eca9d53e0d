use std::fmt;

use log::{debug, trace};
use serde::Serialize;

use super::{
    slr_table::{Action, SLRParsingTable},
    Grammar, ParseError, END_MARK,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StackEntry {
    State(usize),
    Symbol(String),
}

impl fmt::Display for StackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackEntry::State(s) => write!(f, "{}", s),
            StackEntry::Symbol(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "target")]
pub enum StepAction {
    Shift(usize),
    Reduce(usize),
    Goto(usize),
    Accept,
    Error(String),
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepAction::Shift(s) => write!(f, "Shift {}", s),
            StepAction::Reduce(p) => write!(f, "Reduce {}", p),
            StepAction::Goto(s) => write!(f, "Goto {}", s),
            StepAction::Accept => write!(f, "Accept"),
            StepAction::Error(e) => write!(f, "Error: {}", e),
        }
    }
}

/// One row of a parse trace: the configuration before `action` was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseStep {
    pub stack: Vec<StackEntry>,
    pub input: Vec<String>,
    pub action: StepAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Accepted,
    Rejected {
        error: ParseError,
        stack: Vec<StackEntry>,
        remaining: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseReport {
    pub input: String,
    pub outcome: ParseOutcome,
    pub trace: Vec<ParseStep>,
}

impl ParseReport {
    pub fn accepted(&self) -> bool {
        self.outcome == ParseOutcome::Accepted
    }

    pub fn error(&self) -> Option<&ParseError> {
        match &self.outcome {
            ParseOutcome::Accepted => None,
            ParseOutcome::Rejected { error, .. } => Some(error),
        }
    }
}

/// Per-string parser configuration. Created for one input and dropped afterwards.
struct Configuration<'a> {
    g: &'a Grammar,
    stack: Vec<StackEntry>,
    input: Vec<&'a str>,
    cursor: usize,
    trace: Vec<ParseStep>,
}

impl<'a> Configuration<'a> {
    fn new(g: &'a Grammar, start: usize, input: &'a str) -> Self {
        let mut tokens: Vec<&str> = input.split_whitespace().collect();
        if tokens.last() != Some(&END_MARK) {
            tokens.push(END_MARK);
        }
        Self {
            g,
            stack: vec![StackEntry::State(start)],
            input: tokens,
            cursor: 0,
            trace: Vec::new(),
        }
    }

    fn remaining(&self) -> Vec<String> {
        self.input[self.cursor..]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn record(&mut self, action: StepAction) {
        self.trace.push(ParseStep {
            stack: self.stack.clone(),
            input: self.remaining(),
            action,
        });
    }

    fn top_state(&self) -> Result<usize, ParseError> {
        match self.stack.last() {
            Some(StackEntry::State(s)) => Ok(*s),
            _ => Err(ParseError::StackUnderflow),
        }
    }

    fn pop(&mut self) -> Result<StackEntry, ParseError> {
        self.stack.pop().ok_or(ParseError::StackUnderflow)
    }

    fn next_token(&self) -> &'a str {
        self.input.get(self.cursor).copied().unwrap_or(END_MARK)
    }

    /// Runs until accept or the first error.
    fn run(&mut self, table: &SLRParsingTable) -> Result<(), ParseError> {
        loop {
            let state = self.top_state()?;
            let token = self.next_token();
            if token == END_MARK && self.cursor + 1 < self.input.len() {
                return Err(ParseError::UnrecognizedSymbol(token.to_string()));
            }
            let symbol = self
                .g
                .get_symbol_index(token)
                .filter(|s| table.is_action_symbol(*s))
                .ok_or_else(|| ParseError::UnrecognizedSymbol(token.to_string()))?;
            let action = table.action(state, symbol).ok_or(ParseError::NoAction {
                state,
                symbol: token.to_string(),
            })?;
            trace!("state {} on {}: {}", state, token, action);

            match action {
                Action::Shift(next) => {
                    self.record(StepAction::Shift(next));
                    self.stack.push(StackEntry::Symbol(token.to_string()));
                    self.stack.push(StackEntry::State(next));
                    self.cursor += 1;
                }
                Action::Reduce(p) => {
                    self.record(StepAction::Reduce(p));
                    let g = self.g;
                    let production = &g.productions[p];
                    for _ in 0..2 * production.len() {
                        self.pop()?;
                    }
                    let exposed = self.top_state()?;
                    let head = g.get_symbol_name(production.head);
                    self.stack.push(StackEntry::Symbol(head.to_string()));
                    let next = table
                        .goto(exposed, production.head)
                        .ok_or_else(|| ParseError::NoAction {
                            state: exposed,
                            symbol: head.to_string(),
                        })?;
                    self.record(StepAction::Goto(next));
                    self.stack.push(StackEntry::State(next));
                }
                Action::Accept => {
                    self.record(StepAction::Accept);
                    return Ok(());
                }
            }
        }
    }
}

impl SLRParsingTable {
    /// Parses one whitespace-separated token string. `$` is appended when missing.
    pub fn parse(&self, g: &Grammar, input: &str) -> ParseReport {
        let mut config = Configuration::new(g, 0, input);
        let outcome = match config.run(self) {
            Ok(()) => ParseOutcome::Accepted,
            Err(error) => {
                config.record(StepAction::Error(error.to_string()));
                ParseOutcome::Rejected {
                    error,
                    stack: config.stack.clone(),
                    remaining: config.remaining(),
                }
            }
        };
        debug!(
            "\"{}\" {} after {} steps",
            input,
            if outcome == ParseOutcome::Accepted {
                "accepted"
            } else {
                "rejected"
            },
            config.trace.len()
        );

        ParseReport {
            input: input.to_string(),
            outcome,
            trace: config.trace,
        }
    }
}
