use crate::Grammar;

use super::{GrammarError, END_MARK};

const EPSILON_MARKERS: [&str; 4] = ["ε", "ϵ", "epsilon", "''"];

/// Splits one alternative into symbols, folding every epsilon spelling into `ε`.
/// `None` means the alternative is epsilon.
fn split_alternative(line: usize, right: &str) -> Result<Option<Vec<&str>>, GrammarError> {
    let symbols: Vec<&str> = right.split_whitespace().collect();
    if symbols.is_empty() {
        return Err(GrammarError::malformed(
            line,
            "empty body, use the epsilon marker instead",
        ));
    }

    let epsilon = symbols == ["'", "'"]
        || (symbols.len() == 1 && EPSILON_MARKERS.contains(&symbols[0]));
    if epsilon {
        return Ok(None);
    }
    if symbols
        .iter()
        .any(|s| EPSILON_MARKERS.contains(s) || *s == "'")
    {
        return Err(GrammarError::malformed(
            line,
            "epsilon must be the only symbol of a body",
        ));
    }
    if symbols.contains(&END_MARK) {
        return Err(GrammarError::malformed(
            line,
            format!("\"{}\" is reserved for the end of input", END_MARK),
        ));
    }
    Ok(Some(symbols))
}

fn split_head(line: usize, left: &str) -> Result<&str, GrammarError> {
    let left_str = left.trim();
    if left_str.is_empty() {
        Err(GrammarError::malformed(line, "empty left side"))
    } else if left_str.split_whitespace().count() != 1 {
        Err(GrammarError::malformed(line, "left side contains whitespace"))
    } else if left_str == END_MARK || EPSILON_MARKERS.contains(&left_str) || left_str == "'" {
        Err(GrammarError::malformed(
            line,
            format!("reserved symbol \"{}\" as left side", left_str),
        ))
    } else {
        Ok(left_str)
    }
}

impl Grammar {
    /// Parses `Head -> a b | c` rules, one per line. A line starting with `|`
    /// continues the previous head.
    pub fn parse(grammar: &str) -> Result<Self, GrammarError> {
        let mut raw_productions: Vec<(&str, Option<Vec<&str>>)> = Vec::new();

        let mut previous_left: Option<&str> = None;
        for (i, line) in grammar.lines().enumerate() {
            if line.chars().all(|c| c.is_whitespace()) {
                continue;
            }
            let parts: Vec<&str> = line.split("->").collect();
            if parts.len() > 2 {
                return Err(GrammarError::malformed(i + 1, "too many \"->\""));
            }
            let (left, rights): (&str, &str) = if parts.len() == 2 {
                (split_head(i + 1, parts[0])?, parts[1])
            } else {
                let rest = parts[0].trim();
                match (previous_left, rest.strip_prefix('|')) {
                    (Some(left), Some(rest)) => (left, rest),
                    _ => return Err(GrammarError::malformed(i + 1, "cannot find left side")),
                }
            };

            previous_left = Some(left);

            for right in rights.split('|') {
                raw_productions.push((left, split_alternative(i + 1, right)?));
            }
        }

        Grammar::from_productions(
            raw_productions
                .into_iter()
                .map(|(left, right)| (left, right.unwrap_or_default())),
        )
    }

    /// Parses the batch format: a `P S` header line, `P` single-alternative
    /// productions and `S` input strings. Returns the grammar and the strings.
    ///
    /// Blank lines are skipped up to the last production. Each string line is
    /// taken as is, so a blank one is the empty input string.
    pub fn parse_batch(input: &str) -> Result<(Self, Vec<String>), GrammarError> {
        let mut lines = input.lines().enumerate();
        let mut next_filled = |missing: &str, at: usize| {
            lines
                .by_ref()
                .find(|(_, l)| !l.trim().is_empty())
                .ok_or_else(|| GrammarError::malformed(at, missing))
        };

        let (header_line, header) = next_filled("missing production and string counts", 1)?;
        let counts = header
            .split_whitespace()
            .map(|n| n.parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| GrammarError::malformed(header_line + 1, e.to_string()))?;
        let (production_count, string_count) = match counts.as_slice() {
            [p] => (*p, 0),
            [p, s] => (*p, *s),
            _ => {
                return Err(GrammarError::malformed(
                    header_line + 1,
                    "expected production and string counts",
                ))
            }
        };

        let mut productions = Vec::with_capacity(production_count);
        for _ in 0..production_count {
            let (i, line) = next_filled("fewer productions than announced", header_line + 1)?;
            let parts: Vec<&str> = line.split("->").collect();
            if parts.len() != 2 {
                return Err(GrammarError::malformed(i + 1, "expected exactly one \"->\""));
            }
            let left = split_head(i + 1, parts[0])?;
            let right = split_alternative(i + 1, parts[1])?;
            productions.push((left, right.unwrap_or_default()));
        }

        let mut strings = Vec::with_capacity(string_count);
        for _ in 0..string_count {
            let (_, line) = lines.next().ok_or_else(|| {
                GrammarError::malformed(header_line + 1, "fewer input strings than announced")
            })?;
            strings.push(line.trim().to_string());
        }

        Ok((Grammar::from_productions(productions)?, strings))
    }
}

#[cfg(test)]
mod tests {
    use crate::grammar::{GrammarError, EPSILON_IDX};
    use crate::Grammar;

    #[test]
    fn epsilon_spellings() {
        for text in ["A -> ε", "A -> ϵ", "A -> epsilon", "A -> ''", "A -> ' '"] {
            let g = Grammar::parse(text).unwrap();
            assert_eq!(g.productions[0].body, vec![EPSILON_IDX], "{}", text);
        }
    }

    #[test]
    fn epsilon_among_alternatives() {
        let g = Grammar::parse("S -> A b\nA -> a | ε").unwrap();
        assert_eq!(g.productions.len(), 3);
        assert!(g.productions[2].is_epsilon());
        assert!(g.is_non_terminal(g.get_symbol_index("A").unwrap()));
    }

    #[test]
    fn empty_alternative_is_malformed() {
        assert_eq!(
            Grammar::parse("A -> a |").unwrap_err(),
            GrammarError::MalformedProduction {
                line: 1,
                reason: "empty body, use the epsilon marker instead".to_string()
            }
        );
    }

    #[test]
    fn mixed_epsilon_is_malformed() {
        assert!(matches!(
            Grammar::parse("S -> a\nA -> ε b"),
            Err(GrammarError::MalformedProduction { line: 2, .. })
        ));
    }

    #[test]
    fn head_declared_after_use() {
        let g = Grammar::parse("S -> A\nA -> a").unwrap();
        let a = g.get_symbol_index("A").unwrap();
        assert!(g.is_non_terminal(a));
        assert_eq!(g.terminal_iter().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    #[should_panic]
    fn continuation_without_head() {
        let _g = Grammar::parse("| a b\n S -> a").unwrap();
    }

    #[test]
    fn batch_format() {
        let (g, strings) = Grammar::parse_batch(
            "4 2\nE -> E + T\nE -> T\nT -> id\nT -> ' '\nid + id\nid +\n",
        )
        .unwrap();
        assert_eq!(g.productions.len(), 4);
        assert!(g.productions[3].is_epsilon());
        assert_eq!(strings, vec!["id + id", "id +"]);
    }

    #[test]
    fn batch_format_keeps_empty_strings() {
        let (g, strings) =
            Grammar::parse_batch("2 3\nS -> a S\n\nS -> ' '\na\n\na a\n").unwrap();
        assert_eq!(strings, vec!["a", "", "a a"]);

        let analysis = crate::SLRAnalysis::new(g).unwrap();
        let accepted: Vec<bool> = analysis
            .parse_all(strings.iter().map(|s| s.as_str()))
            .iter()
            .map(|r| r.accepted())
            .collect();
        assert_eq!(accepted, vec![true, true, true]);
    }

    #[test]
    fn reserved_symbols() {
        for text in ["S -> a $", "S -> a\n$ -> b", "ε -> a", "S -> a\n | $"] {
            assert!(
                matches!(
                    Grammar::parse(text),
                    Err(GrammarError::MalformedProduction { .. })
                ),
                "{}",
                text
            );
        }
        assert!(matches!(
            Grammar::parse_batch("1 0\nS -> a $\n"),
            Err(GrammarError::MalformedProduction { line: 2, .. })
        ));
    }

    #[test]
    fn batch_format_short() {
        assert!(matches!(
            Grammar::parse_batch("3 0\nE -> T\nT -> id\n"),
            Err(GrammarError::MalformedProduction { .. })
        ));
        assert!(matches!(
            Grammar::parse_batch("x y\n"),
            Err(GrammarError::MalformedProduction { line: 1, .. })
        ));
    }
}
