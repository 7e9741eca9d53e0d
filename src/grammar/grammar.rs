use std::collections::HashMap;

use log::debug;

use super::{GrammarError, END_MARK, END_MARK_IDX, EPSILON, EPSILON_IDX};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonTerminal {
    pub index: usize,
    pub name: String,
    /// Positions of this non-terminal's productions in `Grammar::productions`.
    pub productions: Vec<usize>,
}

impl NonTerminal {
    pub fn new(index: usize, name: String) -> Self {
        Self {
            index,
            name,
            productions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    NonTerminal(NonTerminal),
    Terminal(String),
    Epsilon,
    EndOfInput,
}

impl Symbol {
    pub fn non_terminal(&self) -> Option<&NonTerminal> {
        match self {
            Symbol::NonTerminal(e) => Some(e),
            _ => None,
        }
    }

    pub fn mut_non_terminal(&mut self) -> Option<&mut NonTerminal> {
        match self {
            Symbol::NonTerminal(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub head: usize,
    /// `[EPSILON_IDX]` for a production that derives nothing.
    pub body: Vec<usize>,
}

impl Production {
    pub fn is_epsilon(&self) -> bool {
        self.body.len() == 1 && self.body[0] == EPSILON_IDX
    }

    /// Number of symbols the production pops off the parser stack.
    pub fn len(&self) -> usize {
        if self.is_epsilon() {
            0
        } else {
            self.body.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct Grammar {
    pub symbols: Vec<Symbol>,
    pub symbol_table: HashMap<String, usize>,
    pub productions: Vec<Production>,
    pub start_symbol: Option<usize>,
    /// Head of the `S' -> S` production once `augment` has run.
    pub augmented_start: Option<usize>,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar {
    pub fn new() -> Self {
        let mut g = Self {
            symbols: vec![Symbol::Epsilon, Symbol::EndOfInput],
            symbol_table: HashMap::new(),
            productions: Vec::new(),
            start_symbol: None,
            augmented_start: None,
        };

        g.symbol_table.insert(EPSILON.to_string(), EPSILON_IDX);
        g.symbol_table.insert("ϵ".to_string(), EPSILON_IDX);
        g.symbol_table.insert(END_MARK.to_string(), END_MARK_IDX);

        g
    }

    /// Builds a grammar from `(head, body)` pairs. Heads are classified first, so a
    /// symbol is a non-terminal iff it heads some production. An empty body, or a
    /// body made of epsilon alone, is epsilon. `$` is rejected everywhere and
    /// epsilon is rejected as a head or next to other symbols.
    pub fn from_productions<'a, I, B>(productions: I) -> Result<Self, GrammarError>
    where
        I: IntoIterator<Item = (&'a str, B)>,
        B: IntoIterator<Item = &'a str>,
    {
        let mut g = Self::new();
        let productions: Vec<(&str, Vec<&str>)> = productions
            .into_iter()
            .map(|(head, body)| (head, body.into_iter().collect()))
            .collect();

        for (head, body) in &productions {
            if g.get_symbol_index(head).map_or(false, |i| i <= END_MARK_IDX) {
                return Err(GrammarError::ReservedSymbol(head.to_string()));
            }
            for &s in body {
                match g.get_symbol_index(s) {
                    Some(END_MARK_IDX) => {
                        return Err(GrammarError::ReservedSymbol(s.to_string()));
                    }
                    Some(EPSILON_IDX) if body.len() > 1 => {
                        return Err(GrammarError::ReservedSymbol(s.to_string()));
                    }
                    _ => {}
                }
            }
        }

        for (head, _) in &productions {
            if g.get_symbol_index(head).is_none() {
                g.add_non_terminal(head);
            }
        }

        for (head, body) in productions {
            let head = g.symbol_table[head];
            let body = body
                .into_iter()
                .map(|s| {
                    if let Some(idx) = g.get_symbol_index(s) {
                        idx
                    } else {
                        g.add_terminal(s.to_string())
                    }
                })
                .collect::<Vec<_>>();
            g.add_production(head, body);
        }

        Ok(g)
    }

    pub fn terminal_iter(&self) -> impl Iterator<Item = &String> {
        self.symbols.iter().filter_map(|s| {
            if let Symbol::Terminal(name) = s {
                Some(name)
            } else {
                None
            }
        })
    }

    /// Terminal symbol indices in grammar order.
    pub fn terminal_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_terminal())
            .map(|(i, _)| i)
    }

    /// Non-terminals in grammar order, without the augmented head.
    pub fn non_terminal_iter(&self) -> impl Iterator<Item = &NonTerminal> {
        let augmented = self.augmented_start;
        self.symbols
            .iter()
            .filter_map(|s| s.non_terminal())
            .filter(move |nt| Some(nt.index) != augmented)
    }

    pub fn is_non_terminal(&self, index: usize) -> bool {
        matches!(self.symbols.get(index), Some(Symbol::NonTerminal(_)))
    }

    pub fn is_terminal(&self, index: usize) -> bool {
        matches!(self.symbols.get(index), Some(Symbol::Terminal(_)))
    }

    pub fn get_symbol_index(&self, name: &str) -> Option<usize> {
        self.symbol_table.get(name).cloned()
    }

    pub fn add_non_terminal(&mut self, name: &str) -> usize {
        let idx = self.symbols.len();
        self.symbols
            .push(Symbol::NonTerminal(NonTerminal::new(idx, name.to_string())));
        self.symbol_table.insert(name.to_string(), idx);
        if self.start_symbol.is_none() {
            self.start_symbol = Some(idx);
        }
        idx
    }

    pub fn add_terminal(&mut self, name: String) -> usize {
        let idx = self.symbols.len();
        self.symbols.push(Symbol::Terminal(name.clone()));
        self.symbol_table.insert(name, idx);
        idx
    }

    /// Appends a production. An empty `body` is stored as the epsilon body.
    pub fn add_production(&mut self, head: usize, mut body: Vec<usize>) -> usize {
        if body.is_empty() {
            body.push(EPSILON_IDX);
        }
        let p_idx = self.productions.len();
        self.productions.push(Production { head, body });
        if let Some(nt) = self.symbols[head].mut_non_terminal() {
            nt.productions.push(p_idx);
        }
        p_idx
    }

    pub fn productions_of(&self, non_terminal: usize) -> &[usize] {
        self.symbols[non_terminal]
            .non_terminal()
            .map(|nt| nt.productions.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_symbol_name(&self, index: usize) -> &str {
        match &self.symbols[index] {
            Symbol::NonTerminal(e) => e.name.as_str(),
            Symbol::Terminal(e) => e.as_str(),
            Symbol::Epsilon => EPSILON,
            Symbol::EndOfInput => END_MARK,
        }
    }

    pub fn get_symbol_prime_name(&self, mut name: String) -> String {
        while self.symbol_table.contains_key(&name) {
            name.push('\'');
        }
        name
    }

    pub fn production_to_vec_str(&self, production: &Production) -> Vec<&str> {
        production
            .body
            .iter()
            .map(|i| self.get_symbol_name(*i))
            .collect()
    }

    /// Prepends `S' -> S`, shifting every existing production index by one.
    /// Only the first call mutates the grammar; it returns the augmented head.
    pub fn augment(&mut self) -> Result<usize, GrammarError> {
        if let Some(head) = self.augmented_start {
            return Ok(head);
        }
        let start = self.start_symbol.ok_or(GrammarError::MissingStartSymbol)?;

        let name = self.get_symbol_prime_name(self.get_symbol_name(start).to_string());
        let head = self.symbols.len();
        self.symbols
            .push(Symbol::NonTerminal(NonTerminal::new(head, name.clone())));
        self.symbol_table.insert(name, head);

        for symbol in self.symbols.iter_mut() {
            if let Some(nt) = symbol.mut_non_terminal() {
                for p in nt.productions.iter_mut() {
                    *p += 1;
                }
            }
        }
        self.productions.insert(
            0,
            Production {
                head,
                body: vec![start],
            },
        );
        if let Some(nt) = self.symbols[head].mut_non_terminal() {
            nt.productions.push(0);
        }
        self.augmented_start = Some(head);

        debug!(
            "augmented grammar with {} -> {}",
            self.get_symbol_name(head),
            self.get_symbol_name(start)
        );
        Ok(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr_grammar() -> Grammar {
        Grammar::from_productions([
            ("E", vec!["E", "+", "T"]),
            ("E", vec!["T"]),
            ("T", vec!["id"]),
        ])
        .unwrap()
    }

    #[test]
    fn classifies_heads_as_non_terminals() {
        let g = expr_grammar();
        let e = g.get_symbol_index("E").unwrap();
        let t = g.get_symbol_index("T").unwrap();
        let plus = g.get_symbol_index("+").unwrap();

        assert!(g.is_non_terminal(e));
        assert!(g.is_non_terminal(t));
        assert!(g.is_terminal(plus));
        assert_eq!(g.start_symbol, Some(e));
        assert_eq!(g.terminal_iter().collect::<Vec<_>>(), vec!["+", "id"]);
    }

    #[test]
    fn empty_body_is_epsilon() {
        let g = Grammar::from_productions([("A", vec![])]).unwrap();
        assert!(g.productions[0].is_epsilon());
        assert_eq!(g.productions[0].len(), 0);
    }

    #[test]
    fn augment_shifts_indices_once() {
        let mut g = expr_grammar();
        let head = g.augment().unwrap();
        let e = g.get_symbol_index("E").unwrap();
        let t = g.get_symbol_index("T").unwrap();

        assert_eq!(g.get_symbol_name(head), "E'");
        assert_eq!(g.productions[0].body, vec![e]);
        assert_eq!(g.productions_of(e), &[1, 2]);
        assert_eq!(g.productions_of(t), &[3]);
        assert_eq!(g.productions_of(head), &[0]);

        assert_eq!(g.augment().unwrap(), head);
        assert_eq!(g.productions.len(), 4);
        assert_eq!(g.non_terminal_iter().count(), 2);
    }

    #[test]
    fn augment_picks_unused_name() {
        let mut g =
            Grammar::from_productions([("S", vec!["S'"]), ("S'", vec!["a"])]).unwrap();
        let head = g.augment().unwrap();
        assert_eq!(g.get_symbol_name(head), "S''");
    }

    #[test]
    fn epsilon_alone_is_epsilon() {
        let g = Grammar::from_productions([("A", vec!["ε"])]).unwrap();
        assert!(g.productions[0].is_epsilon());
    }

    #[test]
    fn reserved_symbols_are_rejected() {
        fn err(productions: Vec<(&str, Vec<&str>)>) -> GrammarError {
            Grammar::from_productions(productions).unwrap_err()
        }

        assert_eq!(
            err(vec![("S", vec!["a", "$"])]),
            GrammarError::ReservedSymbol("$".to_string())
        );
        assert_eq!(
            err(vec![("S", vec!["ε", "a"])]),
            GrammarError::ReservedSymbol("ε".to_string())
        );
        assert_eq!(
            err(vec![("S", vec!["a"]), ("$", vec!["b"])]),
            GrammarError::ReservedSymbol("$".to_string())
        );
        assert_eq!(
            err(vec![("ϵ", vec!["b"])]),
            GrammarError::ReservedSymbol("ϵ".to_string())
        );
    }

    #[test]
    fn augment_empty_grammar() {
        let mut g = Grammar::new();
        assert_eq!(g.augment(), Err(GrammarError::MissingStartSymbol));
    }
}
