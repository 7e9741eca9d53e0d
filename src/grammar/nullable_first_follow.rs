use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use super::{Grammar, END_MARK_IDX, EPSILON_IDX};

/// Reverse dependency edges between non-terminals: an edge `from -> to` means
/// every member added to `from`'s set must also reach `to`'s set.
#[derive(Debug, Default)]
struct DependencyGraph {
    edges: HashMap<usize, HashSet<usize>>,
}

impl DependencyGraph {
    fn add_edge(&mut self, from: usize, to: usize) {
        self.edges.entry(from).or_default().insert(to);
    }

    /// Adds `seeds` to `start` and to everything reachable from it. Each run owns
    /// its visited set, so cycles of mutually recursive non-terminals stop here.
    fn propagate(
        &self,
        sets: &mut HashMap<usize, HashSet<usize>>,
        start: usize,
        seeds: &HashSet<usize>,
    ) {
        let mut visited: HashSet<usize> = HashSet::new();
        let mut stack = vec![start];
        while let Some(nt) = stack.pop() {
            if !visited.insert(nt) {
                continue;
            }
            sets.entry(nt).or_default().extend(seeds.iter().cloned());
            if let Some(next) = self.edges.get(&nt) {
                stack.extend(next.iter().copied().filter(|n| !visited.contains(n)));
            }
        }
        trace!(
            "propagated {} seeds from {} to {} nodes",
            seeds.len(),
            start,
            visited.len()
        );
    }
}

/// Resolved FIRST and FOLLOW sets, keyed by non-terminal symbol index.
///
/// FIRST sets hold terminal indices and `EPSILON_IDX`; FOLLOW sets hold terminal
/// indices and `END_MARK_IDX`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstFollow {
    pub first: HashMap<usize, HashSet<usize>>,
    pub follow: HashMap<usize, HashSet<usize>>,
}

impl FirstFollow {
    pub fn first(&self, non_terminal: usize) -> Option<&HashSet<usize>> {
        self.first.get(&non_terminal)
    }

    pub fn follow(&self, non_terminal: usize) -> Option<&HashSet<usize>> {
        self.follow.get(&non_terminal)
    }

    pub fn nullable(&self, non_terminal: usize) -> bool {
        self.first
            .get(&non_terminal)
            .map_or(false, |f| f.contains(&EPSILON_IDX))
    }

    /// FIRST of a symbol string; contains `EPSILON_IDX` iff every symbol is erasable.
    pub fn first_of_sequence(&self, g: &Grammar, symbols: &[usize]) -> HashSet<usize> {
        let mut first: HashSet<usize> = HashSet::new();
        for &idx in symbols {
            if idx == EPSILON_IDX {
                continue;
            }
            if g.is_non_terminal(idx) {
                if let Some(nt_first) = self.first.get(&idx) {
                    first.extend(nt_first.iter().filter(|&&s| s != EPSILON_IDX));
                }
                if !self.nullable(idx) {
                    return first;
                }
            } else {
                first.insert(idx);
                return first;
            }
        }
        first.insert(EPSILON_IDX);
        first
    }
}

impl Grammar {
    /// Computes FIRST and FOLLOW for every non-terminal. Never fails: cyclic or
    /// ambiguous grammars still get a fixed point.
    pub fn calculate_first_follow(&self) -> FirstFollow {
        let mut ff = FirstFollow {
            first: HashMap::new(),
            follow: HashMap::new(),
        };
        for symbol in &self.symbols {
            if let Some(nt) = symbol.non_terminal() {
                ff.first.insert(nt.index, HashSet::new());
                ff.follow.insert(nt.index, HashSet::new());
            }
        }

        self.mark_epsilons(&mut ff);
        self.calculate_first(&mut ff);
        self.calculate_follow(&mut ff);

        debug!("first/follow resolved for {} non-terminals", ff.first.len());
        ff
    }

    /// Substitutes erasable non-terminals by epsilon in a scratch copy of every body,
    /// marking heads whose body becomes all-epsilon, until nothing new is marked.
    fn mark_epsilons(&self, ff: &mut FirstFollow) {
        let mut marking: Vec<Vec<usize>> = self
            .productions
            .iter()
            .map(|p| p.body.clone())
            .collect();

        let mut pending: Vec<usize> = Vec::new();
        for p in &self.productions {
            if p.is_epsilon() && ff.first.entry(p.head).or_default().insert(EPSILON_IDX) {
                pending.push(p.head);
            }
        }

        while let Some(nt) = pending.pop() {
            trace!("{} derives epsilon", self.get_symbol_name(nt));
            for (body, p) in marking.iter_mut().zip(self.productions.iter()) {
                for s in body.iter_mut().filter(|s| **s == nt) {
                    *s = EPSILON_IDX;
                }
                if body.iter().all(|s| *s == EPSILON_IDX)
                    && ff.first.entry(p.head).or_default().insert(EPSILON_IDX)
                {
                    pending.push(p.head);
                }
            }
        }
    }

    fn calculate_first(&self, ff: &mut FirstFollow) {
        let mut seeds: HashMap<usize, HashSet<usize>> = HashMap::new();
        let mut graph = DependencyGraph::default();

        for p in self.productions.iter().filter(|p| !p.is_epsilon()) {
            for &idx in &p.body {
                if self.is_non_terminal(idx) {
                    graph.add_edge(idx, p.head);
                    if !ff.nullable(idx) {
                        break;
                    }
                } else {
                    seeds.entry(p.head).or_default().insert(idx);
                    break;
                }
            }
        }

        for nt in self.non_terminal_order() {
            if let Some(s) = seeds.get(&nt).filter(|s| !s.is_empty()) {
                graph.propagate(&mut ff.first, nt, s);
            }
        }
    }

    fn calculate_follow(&self, ff: &mut FirstFollow) {
        let mut seeds: HashMap<usize, HashSet<usize>> = HashMap::new();
        let mut graph = DependencyGraph::default();

        if let Some(start) = self.productions.first().map(|p| p.head) {
            seeds.entry(start).or_default().insert(END_MARK_IDX);
        }

        for p in self.productions.iter().filter(|p| !p.is_epsilon()) {
            for (i, &idx) in p.body.iter().enumerate() {
                if !self.is_non_terminal(idx) {
                    continue;
                }
                if i + 1 < p.body.len() {
                    let beta = ff.first_of_sequence(self, &p.body[i + 1..]);
                    seeds
                        .entry(idx)
                        .or_default()
                        .extend(beta.iter().filter(|&&s| s != EPSILON_IDX));
                    if beta.contains(&EPSILON_IDX) {
                        graph.add_edge(p.head, idx);
                    }
                } else {
                    graph.add_edge(p.head, idx);
                }
            }
        }

        for nt in self.non_terminal_order() {
            if let Some(s) = seeds.get(&nt).filter(|s| !s.is_empty()) {
                graph.propagate(&mut ff.follow, nt, s);
            }
        }
    }

    fn non_terminal_order(&self) -> Vec<usize> {
        self.symbols
            .iter()
            .filter_map(|s| s.non_terminal())
            .map(|nt| nt.index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use crate::grammar::{nullable_first_follow::FirstFollow, EPSILON_IDX};
    use crate::Grammar;

    fn names<'a>(g: &'a Grammar, set: &HashSet<usize>) -> Vec<&'a str> {
        let mut v: Vec<&str> = set.iter().map(|i| g.get_symbol_name(*i)).collect();
        v.sort();
        v
    }

    fn first<'a>(g: &'a Grammar, ff: &FirstFollow, nt: &str) -> Vec<&'a str> {
        names(g, ff.first(g.get_symbol_index(nt).unwrap()).unwrap())
    }

    fn follow<'a>(g: &'a Grammar, ff: &FirstFollow, nt: &str) -> Vec<&'a str> {
        names(g, ff.follow(g.get_symbol_index(nt).unwrap()).unwrap())
    }

    #[test]
    fn expression_grammar() {
        let g = Grammar::parse(
            "E -> T E'\nE' -> + T E' | ε\nT -> F T'\nT' -> * F T' | ε\nF -> ( E ) | id",
        )
        .unwrap();
        let ff = g.calculate_first_follow();

        assert_eq!(first(&g, &ff, "E"), vec!["(", "id"]);
        assert_eq!(first(&g, &ff, "E'"), vec!["+", "ε"]);
        assert_eq!(first(&g, &ff, "T'"), vec!["*", "ε"]);
        assert_eq!(follow(&g, &ff, "E"), vec!["$", ")"]);
        assert_eq!(follow(&g, &ff, "E'"), vec!["$", ")"]);
        assert_eq!(follow(&g, &ff, "T"), vec!["$", ")", "+"]);
        assert_eq!(follow(&g, &ff, "F"), vec!["$", ")", "*", "+"]);
    }

    #[test]
    fn left_recursive_grammar() {
        let g = Grammar::parse("E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id").unwrap();
        let ff = g.calculate_first_follow();

        assert_eq!(first(&g, &ff, "E"), vec!["(", "id"]);
        assert_eq!(first(&g, &ff, "T"), vec!["(", "id"]);
        assert_eq!(follow(&g, &ff, "E"), vec!["$", ")", "+"]);
        assert_eq!(follow(&g, &ff, "F"), vec!["$", ")", "*", "+"]);
    }

    #[test]
    fn mutual_left_recursion() {
        let g = Grammar::parse("S -> A x\nA -> B a | c\nB -> A b | d").unwrap();
        let ff = g.calculate_first_follow();

        assert_eq!(first(&g, &ff, "A"), vec!["c", "d"]);
        assert_eq!(first(&g, &ff, "B"), vec!["c", "d"]);
        assert_eq!(follow(&g, &ff, "A"), vec!["b", "x"]);
        assert_eq!(follow(&g, &ff, "B"), vec!["a"]);
    }

    #[test]
    fn epsilon_through_two_levels() {
        let g = Grammar::parse("S -> A B c\nA -> B C\nB -> C | b\nC -> ε | d").unwrap();
        let ff = g.calculate_first_follow();

        for nt in ["A", "B", "C"] {
            assert!(ff.nullable(g.get_symbol_index(nt).unwrap()), "{}", nt);
        }
        assert!(!ff.nullable(g.get_symbol_index("S").unwrap()));
        assert_eq!(first(&g, &ff, "A"), vec!["b", "d", "ε"]);
        assert_eq!(first(&g, &ff, "S"), vec!["b", "c", "d"]);
        assert_eq!(follow(&g, &ff, "A"), vec!["b", "c", "d"]);
        assert_eq!(follow(&g, &ff, "C"), vec!["b", "c", "d"]);
    }

    #[test]
    fn non_erasable_body_is_not_nullable() {
        let g = Grammar::parse("S -> A B\nA -> ε\nB -> b").unwrap();
        let ff = g.calculate_first_follow();

        assert!(ff.nullable(g.get_symbol_index("A").unwrap()));
        assert!(!ff.nullable(g.get_symbol_index("S").unwrap()));
        assert_eq!(follow(&g, &ff, "A"), vec!["b"]);
    }

    #[test]
    fn epsilon_scenario() {
        let g = Grammar::parse("S -> A b\nA -> a | ε").unwrap();
        let ff = g.calculate_first_follow();

        assert_eq!(first(&g, &ff, "A"), vec!["a", "ε"]);
        assert_eq!(follow(&g, &ff, "A"), vec!["b"]);
        assert_eq!(follow(&g, &ff, "S"), vec!["$"]);
    }

    #[test]
    fn follow_never_holds_epsilon() {
        let g = Grammar::parse("S -> A B\nA -> a | ε\nB -> b | ε").unwrap();
        let ff = g.calculate_first_follow();

        for set in ff.follow.values() {
            assert!(!set.contains(&EPSILON_IDX));
        }
        assert_eq!(follow(&g, &ff, "A"), vec!["$", "b"]);
    }

    #[test]
    fn start_follow_has_end_mark() {
        for text in ["S -> S S | a", "S -> ε", "S -> A\nA -> S | x"] {
            let g = Grammar::parse(text).unwrap();
            let ff = g.calculate_first_follow();
            assert!(follow(&g, &ff, "S").contains(&"$"), "{}", text);
        }
    }

    #[test]
    fn idempotent() {
        let g = Grammar::parse("S -> A x\nA -> B a | c | ε\nB -> A b | d").unwrap();
        assert_eq!(g.calculate_first_follow(), g.calculate_first_follow());
    }

    #[test]
    fn augmented_grammar_keeps_sets() {
        let mut g = Grammar::parse("E -> E + T | T\nT -> id").unwrap();
        let before = g.calculate_first_follow();
        g.augment().unwrap();
        let after = g.calculate_first_follow();

        for nt in ["E", "T"] {
            let idx = g.get_symbol_index(nt).unwrap();
            assert_eq!(before.first(idx), after.first(idx));
            assert_eq!(before.follow(idx), after.follow(idx));
        }
    }
}
