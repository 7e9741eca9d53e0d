use super::{
    lr_dfa::LR0Automaton, nullable_first_follow::FirstFollow, slr_parser::ParseReport,
    slr_table::SLRParsingTable, Grammar, GrammarError,
};

/// Everything derived from one grammar, built once and then only read.
#[derive(Debug, Clone)]
pub struct SLRAnalysis {
    pub grammar: Grammar,
    pub first_follow: FirstFollow,
    pub automaton: LR0Automaton,
    pub table: SLRParsingTable,
}

impl SLRAnalysis {
    pub fn new(mut grammar: Grammar) -> Result<Self, GrammarError> {
        let automaton = grammar.to_lr0_automaton()?;
        Self::from_automaton(grammar, automaton)
    }

    /// Compiles the table for an automaton already built from `grammar`.
    pub fn from_automaton(
        grammar: Grammar,
        automaton: LR0Automaton,
    ) -> Result<Self, GrammarError> {
        let first_follow = grammar.calculate_first_follow();
        let table = automaton.to_slr_parsing_table(&grammar, &first_follow)?;
        Ok(Self {
            grammar,
            first_follow,
            automaton,
            table,
        })
    }

    pub fn parse(&self, input: &str) -> ParseReport {
        self.table.parse(&self.grammar, input)
    }

    /// Each string is parsed on its own; a rejection never affects the others.
    pub fn parse_all<'a, I>(&self, inputs: I) -> Vec<ParseReport>
    where
        I: IntoIterator<Item = &'a str>,
    {
        inputs.into_iter().map(|input| self.parse(input)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::SLRAnalysis;
    use crate::grammar::GrammarError;
    use crate::Grammar;

    #[test]
    fn batch_continues_after_rejection() {
        let analysis = SLRAnalysis::new(Grammar::parse("E -> E + T | T\nT -> id").unwrap()).unwrap();
        let reports = analysis.parse_all(["id +", "id + id", "x", "id"]);

        let accepted: Vec<bool> = reports.iter().map(|r| r.accepted()).collect();
        assert_eq!(accepted, vec![false, true, false, true]);
    }

    #[test]
    fn conflict_aborts() {
        let result = SLRAnalysis::new(Grammar::parse("S -> S S | a").unwrap());
        assert!(matches!(result, Err(GrammarError::Conflict { .. })));
    }

    #[test]
    fn from_automaton_matches_new() {
        let text = "E -> E + T | T\nT -> id";
        let mut g = Grammar::parse(text).unwrap();
        let automaton = g.to_lr0_automaton().unwrap();
        let built = SLRAnalysis::from_automaton(g, automaton).unwrap();
        let direct = SLRAnalysis::new(Grammar::parse(text).unwrap()).unwrap();

        assert_eq!(built.automaton.states, direct.automaton.states);
        assert_eq!(built.table.action, direct.table.action);
        assert!(built.parse("id + id").accepted());

        let mut g = Grammar::parse("S -> S S | a").unwrap();
        let automaton = g.to_lr0_automaton().unwrap();
        assert!(matches!(
            SLRAnalysis::from_automaton(g, automaton),
            Err(GrammarError::Conflict { .. })
        ));
    }

    #[test]
    fn empty_grammar() {
        assert!(matches!(
            SLRAnalysis::new(Grammar::new()),
            Err(GrammarError::MissingStartSymbol)
        ));
    }
}
