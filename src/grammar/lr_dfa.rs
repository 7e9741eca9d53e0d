use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use log::{debug, trace};

use crate::Grammar;

use super::GrammarError;

/// An LR(0) item: a production index and the position of the dot in its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DotProduction {
    pub production: usize,
    pub position: usize,
}

impl DotProduction {
    pub fn new(production: usize) -> Self {
        Self {
            production,
            position: 0,
        }
    }

    pub fn generate_next(&self) -> Self {
        Self {
            production: self.production,
            position: self.position + 1,
        }
    }

    /// Epsilon productions count as completed from the start.
    pub fn is_completed(&self, g: &Grammar) -> bool {
        self.position >= g.productions[self.production].len()
    }

    pub fn symbol_after_dot(&self, g: &Grammar) -> Option<usize> {
        if self.is_completed(g) {
            None
        } else {
            g.productions[self.production].body.get(self.position).cloned()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LRState {
    pub kernel: BTreeSet<DotProduction>,
    /// Items added by closure, in the order they were discovered.
    pub extend: Vec<DotProduction>,
    pub edges: BTreeMap<usize, usize>,
}

impl LRState {
    fn new(kernel: BTreeSet<DotProduction>) -> Self {
        Self {
            kernel,
            extend: Vec::new(),
            edges: BTreeMap::new(),
        }
    }

    fn calculate_extend(&mut self, g: &Grammar) {
        let mut items: Vec<DotProduction> = self.kernel.iter().cloned().collect();
        let mut i = 0;
        while i < items.len() {
            if let Some(symbol) = items[i].symbol_after_dot(g) {
                for &p in g.productions_of(symbol) {
                    let item = DotProduction::new(p);
                    if !items.contains(&item) {
                        items.push(item);
                    }
                }
            }
            i += 1;
        }
        self.extend = items.split_off(self.kernel.len());
    }

    /// Kernel items followed by closure items.
    pub fn items(&self) -> impl Iterator<Item = &DotProduction> {
        self.kernel.iter().chain(self.extend.iter())
    }

    pub fn completed<'a>(&'a self, g: &'a Grammar) -> impl Iterator<Item = &'a DotProduction> {
        self.items().filter(move |item| item.is_completed(g))
    }

    /// Symbols right after a dot, in order of first appearance.
    fn outgoing_symbols(&self, g: &Grammar) -> Vec<usize> {
        let mut symbols: Vec<usize> = Vec::new();
        for symbol in self.items().filter_map(|item| item.symbol_after_dot(g)) {
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        symbols
    }

    /// Items reached by moving the dot over `symbol`; empty when there is no transition.
    pub fn derived_kernel(&self, g: &Grammar, symbol: usize) -> BTreeSet<DotProduction> {
        self.items()
            .filter(|item| item.symbol_after_dot(g) == Some(symbol))
            .map(|item| item.generate_next())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct LR0Automaton {
    pub states: Vec<LRState>,
    pub start: usize,
}

impl LR0Automaton {
    pub fn transition(&self, state: usize, symbol: usize) -> Option<usize> {
        self.states
            .get(state)
            .and_then(|s| s.edges.get(&symbol))
            .cloned()
    }
}

impl Grammar {
    /// Builds the canonical LR(0) collection, augmenting the grammar first.
    pub fn to_lr0_automaton(&mut self) -> Result<LR0Automaton, GrammarError> {
        self.augment()?;

        let mut start_state = LRState::new(BTreeSet::from([DotProduction::new(0)]));
        start_state.calculate_extend(self);
        let mut states = vec![start_state];
        let mut kernels: HashMap<BTreeSet<DotProduction>, usize> = HashMap::new();
        kernels.insert(states[0].kernel.clone(), 0);
        let mut q: VecDeque<usize> = VecDeque::new();
        q.push_back(0);

        while let Some(u) = q.pop_front() {
            for symbol in states[u].outgoing_symbols(self) {
                let kernel = states[u].derived_kernel(self, symbol);
                if kernel.is_empty() {
                    continue;
                }

                let v = match kernels.get(&kernel) {
                    Some(&v) => v,
                    None => {
                        let mut state = LRState::new(kernel.clone());
                        state.calculate_extend(self);
                        states.push(state);
                        let v = states.len() - 1;
                        kernels.insert(kernel, v);
                        q.push_back(v);
                        trace!(
                            "state {} created from {} on {}",
                            v,
                            u,
                            self.get_symbol_name(symbol)
                        );
                        v
                    }
                };
                states[u].edges.insert(symbol, v);
            }
        }

        debug!("LR(0) automaton has {} states", states.len());
        Ok(LR0Automaton { states, start: 0 })
    }
}
