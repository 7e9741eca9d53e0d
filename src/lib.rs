extern crate wasm_bindgen;

use serde_json::json;
use wasm_bindgen::prelude::*;

pub mod grammar;
pub use grammar::{Grammar, GrammarError, ParseError, SLRAnalysis};

use grammar::pretty_print::ParseReportOutputVec;

fn error_to_json(e: impl std::fmt::Display) -> String {
    json!({ "error": e.to_string() }).to_string()
}

#[wasm_bindgen]
pub fn first_follow_to_json(grammar: &str) -> String {
    match crate::Grammar::parse(grammar) {
        Ok(g) => {
            let ff = g.calculate_first_follow();
            g.to_non_terminal_output_vec(&ff)
                .to_json()
                .unwrap_or_else(error_to_json)
        }
        Err(e) => error_to_json(e),
    }
}

#[wasm_bindgen]
pub fn slr_table_to_json(grammar: &str) -> String {
    match crate::Grammar::parse(grammar).and_then(SLRAnalysis::new) {
        Ok(a) => serde_json::to_string(&a.table.to_output(&a.grammar))
            .unwrap_or_else(error_to_json),
        Err(e) => error_to_json(e),
    }
}

/// `inputs` holds one token string per line.
#[wasm_bindgen]
pub fn parse_to_json(grammar: &str, inputs: &str) -> String {
    match crate::Grammar::parse(grammar).and_then(SLRAnalysis::new) {
        Ok(a) => {
            let reports = a.parse_all(inputs.lines().filter(|l| !l.trim().is_empty()));
            serde_json::to_string(&ParseReportOutputVec::new(&reports))
                .unwrap_or_else(error_to_json)
        }
        Err(e) => error_to_json(e),
    }
}


#[cfg(test)]
mod slr_tests {
    use pretty_assertions::assert_eq;

    use crate::grammar::{
        slr_parser::{ParseOutcome, StepAction},
        GrammarError, ParseError,
    };
    use crate::{Grammar, SLRAnalysis};

    fn analysis(text: &str) -> SLRAnalysis {
        SLRAnalysis::new(Grammar::parse(text).unwrap()).unwrap()
    }

    #[test]
    fn sum_is_accepted() {
        let a = analysis("E -> E + T | T\nT -> id");
        let report = a.parse("id + id");

        assert_eq!(report.outcome, ParseOutcome::Accepted);
        let last = report.trace.last().unwrap();
        assert_eq!(last.action, StepAction::Accept);
        assert_eq!(last.input, vec!["$"]);
    }

    #[test]
    fn unfinished_sum_is_rejected() {
        let a = analysis("E -> E + T | T\nT -> id");
        let report = a.parse("id +");

        assert!(matches!(
            report.error(),
            Some(ParseError::NoAction { .. }) | Some(ParseError::UnrecognizedSymbol(_))
        ));
    }

    #[test]
    fn epsilon_production() {
        let a = analysis("S -> A b\nA -> a | ε");
        let ff = &a.first_follow;
        let g = &a.grammar;
        let nt = g.get_symbol_index("A").unwrap();

        let mut first: Vec<&str> = ff.first(nt).unwrap().iter().map(|i| g.get_symbol_name(*i)).collect();
        first.sort();
        assert_eq!(first, vec!["a", "ε"]);
        let follow: Vec<&str> = ff.follow(nt).unwrap().iter().map(|i| g.get_symbol_name(*i)).collect();
        assert_eq!(follow, vec!["b"]);

        assert!(a.parse("b").accepted());
    }

    #[test]
    fn ambiguous_grammar_is_rejected() {
        let result = SLRAnalysis::new(Grammar::parse("S -> S S | a").unwrap());
        assert!(matches!(result, Err(GrammarError::Conflict { .. })));
    }

    #[test]
    fn json_entry_points() {
        let json = crate::first_follow_to_json("S -> A b\nA -> a | ε");
        assert!(json.contains(r#""name":"A""#));

        let json = crate::slr_table_to_json("S -> S S | a");
        assert!(json.starts_with(r#"{"error":"conflict in state"#));

        let json = crate::parse_to_json("E -> E + T | T\nT -> id", "id + id\n\nid +\n");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["reports"][0]["accepted"], true);
        assert_eq!(value["reports"][1]["accepted"], false);
        assert_eq!(value["reports"].as_array().unwrap().len(), 2);
    }
}
