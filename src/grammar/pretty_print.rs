use std::collections::{BTreeMap, HashSet};

use crowbook_text_processing::escape;
use serde::Serialize;

use super::{
    lr_dfa::{DotProduction, LR0Automaton, LRState},
    nullable_first_follow::FirstFollow,
    slr_parser::{ParseReport, ParseStep},
    slr_table::{Action, SLRParsingTable},
    Grammar, EPSILON, EPSILON_IDX,
};

/// How epsilon appears in serialized FIRST sets.
pub const EPSILON_MARKER: &str = "";

const STYLESHEET: &str = "styles.css";

fn join_columns(output: &[Vec<String>]) -> String {
    let width: Vec<usize> = (0..output[0].len())
        .map(|j| output.iter().map(|row| row[j].chars().count()).max().unwrap_or(0))
        .collect();

    output
        .iter()
        .map(|line| {
            line.iter()
                .enumerate()
                .map(|(i, s)| format!("{:>width$}", s, width = width[i]))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn html_row(tag: &str, cells: &[String]) -> String {
    let cells = cells
        .iter()
        .map(|c| format!("\t<{tag}> {} </{tag}>\n", escape::html(c.as_str()), tag = tag))
        .collect::<String>();
    format!("<tr>\n{}</tr>\n", cells)
}

/// Wraps rendered HTML fragments in a standalone document.
pub fn html_document(elements: &[String]) -> String {
    let mut doc = String::from("<!DOCTYPE html>\n<html>\n<head>\n");
    doc.push_str(&format!("\t<link rel='stylesheet' href='{}'>\n", STYLESHEET));
    doc.push_str("\t<title> SLR table </title>\n</head>\n<body>\n");
    for element in elements {
        doc.push_str(element);
        doc.push('\n');
    }
    doc.push_str("</body>\n</html>\n");
    doc
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductionOutput<'a> {
    pub left: &'a str,
    pub rights: Vec<Vec<&'a str>>,
}

impl ProductionOutput<'_> {
    pub fn to_plaintext(&self, left_width: usize) -> String {
        self.rights
            .iter()
            .map(|right| right.join(" "))
            .enumerate()
            .map(|(i, right)| {
                if i == 0 {
                    format!("{:>width$} -> {}", self.left, right, width = left_width)
                } else {
                    format!("{:>width$}  | {}", "", right, width = left_width)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        let right = self
            .rights
            .iter()
            .map(|right| {
                right
                    .iter()
                    .map(|s| escape::tex(*s))
                    .collect::<Vec<_>>()
                    .join(" \\ ")
            })
            .collect::<Vec<_>>()
            .join(" \\mid ");

        let output = format!("{} & \\rightarrow & {}", escape::tex(self.left), right);
        output.replace(EPSILON, "\\epsilon")
    }
}

#[derive(Serialize)]
pub struct ProductionOutputVec<'a> {
    productions: Vec<ProductionOutput<'a>>,
}

impl ProductionOutputVec<'_> {
    pub fn to_plaintext(&self) -> String {
        let left_max_len = self
            .productions
            .iter()
            .map(|p| p.left.chars().count())
            .max()
            .unwrap_or(0);
        self.productions
            .iter()
            .map(|s| s.to_plaintext(left_max_len))
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        std::iter::once("\\[\\begin{array}{cll}".to_string())
            .chain(self.productions.iter().map(|s| s.to_latex()))
            .chain(std::iter::once("\\end{array}\\]".to_string()))
            .collect::<Vec<String>>()
            .join("\\\\\n")
    }
}

impl Grammar {
    pub fn to_production_output_vec(&self) -> ProductionOutputVec<'_> {
        let productions = self
            .non_terminal_iter()
            .filter(|nt| !nt.productions.is_empty())
            .map(|nt| ProductionOutput {
                left: nt.name.as_str(),
                rights: nt
                    .productions
                    .iter()
                    .map(|&p| self.production_to_vec_str(&self.productions[p]))
                    .collect(),
            })
            .collect();
        ProductionOutputVec { productions }
    }

    /// `E -> E + T`, the form used in reduce cells and trace rows.
    pub fn production_to_string(&self, index: usize) -> String {
        let production = &self.productions[index];
        format!(
            "{} -> {}",
            self.get_symbol_name(production.head),
            self.production_to_vec_str(production).join(" ")
        )
    }
}

#[derive(Serialize)]
struct NonTerminalOutput<'a> {
    name: &'a str,
    nullable: bool,
    first: Vec<&'a str>,
    follow: Vec<&'a str>,
}

impl NonTerminalOutput<'_> {
    fn first_for_print(&self) -> Vec<&str> {
        self.first
            .iter()
            .map(|s| if *s == EPSILON_MARKER { EPSILON } else { *s })
            .collect()
    }

    fn to_plaintext(&self) -> String {
        format!(
            "{} => FIRST = {{{}}}, FOLLOW = {{{}}}",
            self.name,
            self.first_for_print().join(", "),
            self.follow.join(", ")
        )
    }

    fn to_latex(&self) -> String {
        fn f(a: &[&str]) -> String {
            a.iter()
                .map(|s| escape::tex(*s))
                .collect::<Vec<_>>()
                .join(r"\ ")
                .replace(EPSILON, r"$\epsilon$")
        }

        format!(
            "{} & {} & {} & {}",
            escape::tex(self.name),
            self.nullable,
            f(&self.first_for_print()),
            f(&self.follow)
        )
    }
}

#[derive(Serialize)]
pub struct NonTerminalOutputVec<'a> {
    data: Vec<NonTerminalOutput<'a>>,
}

impl NonTerminalOutputVec<'_> {
    pub fn to_plaintext(&self) -> String {
        self.data
            .iter()
            .map(|s| s.to_plaintext())
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_latex(&self) -> String {
        let content = self
            .data
            .iter()
            .map(|e| e.to_latex())
            .collect::<Vec<_>>()
            .join("\\\\\n ");

        "\\begin{tabular}{c|c|c|c}\n".to_string()
            + "Symbol & Nullable & First & Follow\\\\\\hline\n"
            + &content
            + "\\\\\n\\end{tabular}"
    }

    pub fn to_html(&self) -> String {
        let header = html_row(
            "th",
            &["Non-terminal", "First", "Follow"].map(|s| s.to_string()),
        );
        let rows = self
            .data
            .iter()
            .map(|nt| {
                html_row(
                    "td",
                    &[
                        nt.name.to_string(),
                        nt.first_for_print().join(", "),
                        nt.follow.join(", "),
                    ],
                )
            })
            .collect::<String>();
        format!("<table>\n{}{}</table>\n", header, rows)
    }
}

impl Grammar {
    pub fn to_non_terminal_output_vec<'a>(&'a self, ff: &FirstFollow) -> NonTerminalOutputVec<'a> {
        let names = |set: Option<&HashSet<usize>>| -> Vec<&'a str> {
            let mut v: Vec<&str> = set
                .map(|s| {
                    s.iter()
                        .filter(|&&i| i != EPSILON_IDX)
                        .map(|&i| self.get_symbol_name(i))
                        .collect()
                })
                .unwrap_or_default();
            v.sort();
            v
        };

        let mut data = Vec::new();
        for nt in self.non_terminal_iter() {
            let mut t = NonTerminalOutput {
                name: nt.name.as_str(),
                nullable: ff.nullable(nt.index),
                first: names(ff.first(nt.index)),
                follow: names(ff.follow(nt.index)),
            };
            if t.nullable {
                t.first.push(EPSILON_MARKER);
            }
            data.push(t);
        }
        NonTerminalOutputVec { data }
    }
}

impl DotProduction {
    pub fn to_plaintext(&self, g: &Grammar) -> String {
        let production = &g.productions[self.production];
        let mut right: Vec<&str> = Vec::new();
        if !production.is_epsilon() {
            for (i, s) in production.body.iter().enumerate() {
                if i == self.position {
                    right.push(".");
                }
                right.push(g.get_symbol_name(*s));
            }
        }
        if self.is_completed(g) {
            right.push(".");
        }

        format!(
            "{} -> {}",
            g.get_symbol_name(production.head),
            right.join(" ")
        )
    }

    pub fn to_latex(&self, g: &Grammar) -> String {
        let production = &g.productions[self.production];
        let mut right: Vec<String> = Vec::new();
        if !production.is_epsilon() {
            for (i, s) in production.body.iter().enumerate() {
                if i == self.position {
                    right.push(".".to_string());
                }
                right.push(escape::tex(g.get_symbol_name(*s)).to_string());
            }
        }
        if self.is_completed(g) {
            right.push(".".to_string());
        }

        format!(
            "${} \\rightarrow {}$",
            escape::tex(g.get_symbol_name(production.head)),
            right.join(" ")
        )
    }
}

#[derive(Serialize)]
pub struct LRStateOutput<'a> {
    kernel: Vec<String>,
    extend: Vec<String>,
    edges: BTreeMap<&'a str, usize>,
    #[serde(skip)]
    latex: Vec<String>,
}

impl<'a> LRStateOutput<'a> {
    fn new(state: &LRState, g: &'a Grammar) -> Self {
        Self {
            kernel: state.kernel.iter().map(|i| i.to_plaintext(g)).collect(),
            extend: state.extend.iter().map(|i| i.to_plaintext(g)).collect(),
            edges: state
                .edges
                .iter()
                .map(|(s, v)| (g.get_symbol_name(*s), *v))
                .collect(),
            latex: state.items().map(|i| i.to_latex(g)).collect(),
        }
    }

    fn to_plaintext(&self) -> String {
        let kernel = self.kernel.join("\n");

        let extend = if !self.extend.is_empty() {
            format!("\n---\n{}", self.extend.join("\n"))
        } else {
            String::new()
        };

        let edges = if !self.edges.is_empty() {
            format!(
                "\n===\n{}",
                self.edges
                    .iter()
                    .map(|(k, v)| format!("- {} -> {}", k, v))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        } else {
            String::new()
        };

        format!("{}{}{}", kernel, extend, edges)
    }

    fn node_to_latex(&self, id: usize) -> String {
        format!(
            "\\node [block] (I_{}){}\n{{\n$I_{}$\\\\\n{}\n}};",
            id,
            if id > 0 {
                if id % 2 == 0 {
                    format!(" [below of = I_{}] ", id - 2)
                } else {
                    format!(" [right of = I_{}] ", id - 1)
                }
            } else {
                String::new()
            },
            id,
            self.latex.join(" \\\\ \n")
        )
    }

    fn edge_to_latex(&self, id: usize) -> String {
        self.edges
            .iter()
            .map(|(e, v)| {
                format!(
                    "\\path [->] (I_{}) edge {} node [above]{{{}}} (I_{});",
                    id,
                    if id == *v { "[loop left]" } else { "[right]" },
                    escape::tex(*e),
                    v
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Serialize)]
pub struct LRFSMOutput<'a> {
    states: Vec<LRStateOutput<'a>>,
    start: usize,
}

impl LRFSMOutput<'_> {
    pub fn to_plaintext(&self) -> String {
        let states = self
            .states
            .iter()
            .enumerate()
            .map(|(i, s)| format!("I{}\n{}", i, s.to_plaintext()))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!("{}\n\nstart: {}", states, self.start)
    }

    pub fn to_latex(&self) -> String {
        format!(
            "\\begin{{tikzpicture}}[node distance=5cm,block/.style={{state, rectangle, text width=6em}}]\n{}\n\\end{{tikzpicture}}",
            self.states
                .iter()
                .enumerate()
                .map(|(i, s)| s.node_to_latex(i))
                .chain(self.states.iter().enumerate().map(|(i, s)| s.edge_to_latex(i)))
                .collect::<Vec<_>>()
                .join("\n")
        )
    }
}

impl LR0Automaton {
    pub fn to_output<'a>(&self, g: &'a Grammar) -> LRFSMOutput<'a> {
        LRFSMOutput {
            states: self
                .states
                .iter()
                .map(|s| LRStateOutput::new(s, g))
                .collect(),
            start: self.start,
        }
    }
}

#[derive(Serialize)]
pub struct SLRTableOutput<'a> {
    terminals: Vec<&'a str>,
    non_terminals: Vec<&'a str>,
    productions: Vec<String>,
    action: &'a [Vec<Option<Action>>],
    goto: &'a [Vec<Option<usize>>],
}

impl SLRTableOutput<'_> {
    fn action_to_plaintext(&self, action: &Action) -> String {
        match action {
            Action::Reduce(p) => format!("r({})", self.productions[*p]),
            _ => action.to_string(),
        }
    }

    fn action_to_latex(&self, action: &Action) -> String {
        match action {
            Action::Reduce(p) => {
                let (head, body) = self.productions[*p]
                    .split_once(" -> ")
                    .unwrap_or_default();
                format!(
                    "reduce ${} \\rightarrow {}$",
                    escape::tex(head),
                    escape::tex(body).replace(EPSILON, "\\epsilon")
                )
            }
            Action::Shift(s) => format!("shift {}", s),
            Action::Accept => "accept".to_string(),
        }
    }

    fn action_to_html(action: &Action) -> String {
        match action {
            Action::Shift(s) => format!("S{}", s),
            Action::Reduce(p) => format!("R{}", p),
            Action::Accept => "AC".to_string(),
        }
    }

    fn rows<F>(&self, cell: F) -> Vec<Vec<String>>
    where
        F: Fn(&Action) -> String,
    {
        self.action
            .iter()
            .zip(self.goto.iter())
            .enumerate()
            .map(|(i, (r1, r2))| {
                std::iter::once(i.to_string())
                    .chain(r1.iter().map(|a| a.as_ref().map(&cell).unwrap_or_default()))
                    .chain(
                        r2.iter()
                            .map(|g| g.map(|g| g.to_string()).unwrap_or_default()),
                    )
                    .collect()
            })
            .collect()
    }

    pub fn to_plaintext(&self) -> String {
        let mut output: Vec<Vec<String>> = Vec::new();
        output.push(
            std::iter::once(String::new())
                .chain(self.terminals.iter().map(|s| s.to_string()))
                .chain(self.non_terminals.iter().map(|s| s.to_string()))
                .collect(),
        );
        output.extend(self.rows(|a| self.action_to_plaintext(a)));
        join_columns(&output)
    }

    pub fn to_latex(&self) -> String {
        let header: String = format!(
            "\\begin{{tabular}}{{c{}}}\n & \\multicolumn{{{}}}{{c}}{{action}} & \\multicolumn{{{}}}{{|c}}{{goto}}\\\\",
            "|l".repeat(self.terminals.len() + self.non_terminals.len()),
            self.terminals.len(),
            self.non_terminals.len(),
        );

        let first_row = std::iter::once(String::new())
            .chain(
                self.terminals
                    .iter()
                    .chain(self.non_terminals.iter())
                    .map(|s| escape::tex(*s).to_string()),
            )
            .collect::<Vec<_>>()
            .join(" & ");

        let content = self
            .rows(|a| self.action_to_latex(a))
            .iter()
            .map(|row| row.join(" & "))
            .collect::<Vec<_>>()
            .join(" \\\\\n");

        format!(
            "{}\n{} \\\\\\hline\n{}\n\\end{{tabular}}",
            header, first_row, content
        )
    }

    /// The SLR table followed by the numbered production list reduce cells refer to.
    pub fn to_html(&self) -> String {
        let titles = format!(
            "<tr>\n\t<th> </th>\n\t<th colspan = {}> ACTIONS </th>\n\t<th colspan = {}> GOTO </th>\n</tr>\n",
            self.terminals.len(),
            self.non_terminals.len()
        );
        let symbols = html_row(
            "th",
            &std::iter::once(String::new())
                .chain(
                    self.terminals
                        .iter()
                        .chain(self.non_terminals.iter())
                        .map(|s| s.to_string()),
                )
                .collect::<Vec<_>>(),
        );
        let rows = self
            .rows(Self::action_to_html)
            .iter()
            .map(|row| html_row("td", row))
            .collect::<String>();

        let productions = self
            .productions
            .iter()
            .enumerate()
            .map(|(i, p)| html_row("td", &[i.to_string(), p.clone()]))
            .collect::<String>();

        format!(
            "<table>\n{}{}{}</table>\n<table>\n{}{}</table>\n",
            titles,
            symbols,
            rows,
            html_row("th", &["#".to_string(), "Production".to_string()]),
            productions
        )
    }
}

impl SLRParsingTable {
    pub fn to_output<'a>(&'a self, g: &'a Grammar) -> SLRTableOutput<'a> {
        SLRTableOutput {
            terminals: self.terminals.iter().map(|i| g.get_symbol_name(*i)).collect(),
            non_terminals: self
                .non_terminals
                .iter()
                .map(|i| g.get_symbol_name(*i))
                .collect(),
            productions: (0..g.productions.len())
                .map(|p| g.production_to_string(p))
                .collect(),
            action: &self.action,
            goto: &self.goto,
        }
    }
}

#[derive(Serialize)]
pub struct ParseReportOutput<'a> {
    input: &'a str,
    accepted: bool,
    error: Option<String>,
    trace: &'a [ParseStep],
}

impl<'a> From<&'a ParseReport> for ParseReportOutput<'a> {
    fn from(report: &'a ParseReport) -> Self {
        Self {
            input: report.input.as_str(),
            accepted: report.accepted(),
            error: report.error().map(|e| e.to_string()),
            trace: &report.trace,
        }
    }
}

impl ParseReportOutput<'_> {
    fn result_message(&self) -> String {
        match &self.error {
            None => "Accepted.".to_string(),
            Some(e) => format!("Unaccepted. Error: {}.", e),
        }
    }

    fn trace_rows(&self) -> Vec<Vec<String>> {
        self.trace
            .iter()
            .map(|step| {
                vec![
                    step.stack
                        .iter()
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>()
                        .join(" "),
                    step.input.join(" "),
                    step.action.to_string(),
                ]
            })
            .collect()
    }

    pub fn to_plaintext(&self) -> String {
        let mut output = vec![vec![
            "Stack".to_string(),
            "String".to_string(),
            "Action to perform".to_string(),
        ]];
        output.extend(self.trace_rows());
        format!(
            "{}: {}\n{}",
            self.input,
            self.result_message(),
            join_columns(&output)
        )
    }

    pub fn to_html(&self) -> String {
        let header = html_row(
            "th",
            &["Stack", "String", "Action to perform"].map(|s| s.to_string()),
        );
        let rows = self
            .trace_rows()
            .iter()
            .map(|row| html_row("td", row))
            .collect::<String>();
        format!("<table>\n{}{}</table>\n", header, rows)
    }
}

#[derive(Serialize)]
pub struct ParseReportOutputVec<'a> {
    reports: Vec<ParseReportOutput<'a>>,
}

impl<'a> ParseReportOutputVec<'a> {
    pub fn new(reports: &'a [ParseReport]) -> Self {
        Self {
            reports: reports.iter().map(ParseReportOutput::from).collect(),
        }
    }

    pub fn to_plaintext(&self) -> String {
        self.reports
            .iter()
            .map(|r| r.to_plaintext())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The accept table followed by one trace table per input string.
    pub fn to_html(&self) -> String {
        let header = html_row("th", &["Input string".to_string(), "Parse result".to_string()]);
        let rows = self
            .reports
            .iter()
            .map(|r| html_row("td", &[r.input.to_string(), r.result_message()]))
            .collect::<String>();
        std::iter::once(format!("<table>\n{}{}</table>\n", header, rows))
            .chain(self.reports.iter().map(|r| r.to_html()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::grammar::{pretty_print::ParseReportOutputVec, SLRAnalysis};
    use crate::Grammar;

    fn analysis(text: &str) -> SLRAnalysis {
        SLRAnalysis::new(Grammar::parse(text).unwrap()).unwrap()
    }

    #[test]
    fn productions_plaintext() {
        let g = Grammar::parse("E -> E + T | T\nT -> id").unwrap();
        assert_eq!(
            g.to_production_output_vec().to_plaintext(),
            "E -> E + T\n   | T\nT -> id"
        );
    }

    #[test]
    fn first_follow_plaintext_and_json() {
        let g = Grammar::parse("S -> A b\nA -> a | ε").unwrap();
        let ff = g.calculate_first_follow();
        let out = g.to_non_terminal_output_vec(&ff);

        assert_eq!(
            out.to_plaintext(),
            "S => FIRST = {a, b}, FOLLOW = {$}\nA => FIRST = {a, ε}, FOLLOW = {b}"
        );
        assert_eq!(
            out.to_json().unwrap(),
            r#"{"data":[{"name":"S","nullable":false,"first":["a","b"],"follow":["$"]},{"name":"A","nullable":true,"first":["a",""],"follow":["b"]}]}"#
        );
    }

    #[test]
    fn item_plaintext() {
        let a = analysis("S -> A b\nA -> a | ε");
        let out = a.automaton.to_output(&a.grammar).to_plaintext();
        assert!(out.starts_with("I0\nS' -> . S\n---\nS -> . A b\nA -> . a\nA -> .\n"));
    }

    #[test]
    fn table_plaintext_header() {
        let a = analysis("E -> E + T | T\nT -> id");
        let out = a.table.to_output(&a.grammar).to_plaintext();
        let header: Vec<&str> = out.lines().next().unwrap().split('|').map(|s| s.trim()).collect();
        assert_eq!(header, vec!["", "+", "id", "$", "E", "T"]);
        assert!(out.contains("r(T -> id)"));
        assert!(out.contains("acc"));
    }

    #[test]
    fn html_escapes_symbols() {
        let a = analysis("S -> < S > | x");
        let html = a.table.to_output(&a.grammar).to_html();
        assert!(html.contains("&lt;"));
        assert!(!html.contains("<th> < </th>"));
    }

    #[test]
    fn parse_reports() {
        let a = analysis("E -> E + T | T\nT -> id");
        let reports = a.parse_all(["id + id", "id +"]);
        let out = ParseReportOutputVec::new(&reports);

        let text = out.to_plaintext();
        assert!(text.starts_with("id + id: Accepted."));
        assert!(text.contains("id +: Unaccepted. Error: no table entry for state"));
        assert!(out.to_html().contains("Accepted."));
        assert!(reports[0].accepted());
    }
}
