pub mod analysis;
pub mod error;
pub mod grammar;
pub mod lr_dfa;
pub mod nullable_first_follow;
pub mod parse;
pub mod pretty_print;
pub mod slr_parser;
pub mod slr_table;
pub use analysis::SLRAnalysis;
pub use error::{GrammarError, ParseError};
pub use grammar::Grammar;

pub const EPSILON: &str = "ε";
pub const END_MARK: &str = "$";

pub const EPSILON_IDX: usize = 0;
pub const END_MARK_IDX: usize = 1;
