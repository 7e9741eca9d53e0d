use slr_analyzer::grammar::pretty_print::{html_document, ParseReportOutputVec};
use slr_analyzer::{Grammar, SLRAnalysis};
use std::{fs, io::Read, process};

const OUTPUTS: [&str; 5] = ["prod", "ff", "lr0fsm", "slrtable", "parse"];

fn print_help() {
    println!("Usage: slr-analyzer [outputs] [options] [grammar file]");
    println!("outputs:");
    println!("  prod: Productions");
    println!("  ff: First and follow sets");
    println!("  lr0fsm: LR(0) Automata");
    println!("  slrtable: SLR(1) parsing table");
    println!("  parse: Parse the input strings with the SLR(1) table");
    println!("options:");
    println!("  -h: Print this help");
    println!("  -l: Print in LaTeX format");
    println!("  -j: Print in JSON format");
    println!("  -w: Print an HTML document");
    println!("  -b: Read the batch format (counts, productions, then input strings)");
    println!("  -s <string>: Add an input string to parse (repeatable)");
    println!("The log level is read from RUST_LOG.");
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputFormat {
    Plain,
    LaTeX,
    JSON,
    HTML,
}

#[derive(Debug)]
struct Options {
    outputs: Vec<String>,
    format: OutputFormat,
    batch: bool,
    strings: Vec<String>,
    file: Option<String>,
}

impl Options {
    /// `Ok(None)` when help was requested or the arguments make no sense.
    fn from_args(args: &[String]) -> Result<Option<Self>, String> {
        let mut i: usize = 0;
        let mut outputs = Vec::new();
        while i < args.len() && OUTPUTS.contains(&args[i].as_str()) {
            outputs.push(args[i].clone());
            i += 1;
        }

        let mut options = Options {
            outputs,
            format: OutputFormat::Plain,
            batch: false,
            strings: Vec::new(),
            file: None,
        };

        while i < args.len() && args[i].starts_with('-') {
            match args[i].as_str() {
                "-h" | "--help" => return Ok(None),
                "-l" => options.format = OutputFormat::LaTeX,
                "-j" => options.format = OutputFormat::JSON,
                "-w" => options.format = OutputFormat::HTML,
                "-b" => options.batch = true,
                "-s" => {
                    i += 1;
                    let s = args.get(i).ok_or("-s expects an input string")?;
                    options.strings.push(s.clone());
                }
                other => return Err(format!("unknown option {}", other)),
            }
            i += 1;
        }

        if i + 1 < args.len() || options.outputs.is_empty() {
            return Ok(None);
        }
        options.file = args.get(i).cloned();
        Ok(Some(options))
    }
}

fn read_input(file: &Option<String>) -> Result<String, String> {
    match file {
        Some(path) => fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e)),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .lock()
                .read_to_string(&mut input)
                .map_err(|e| e.to_string())?;
            Ok(input)
        }
    }
}

fn to_json<T: serde::Serialize>(t: &T) -> Result<String, String> {
    serde_json::to_string(t).map_err(|e| e.to_string())
}

fn run(options: Options) -> Result<(), String> {
    let input = read_input(&options.file)?;
    let (g, mut strings) = if options.batch {
        Grammar::parse_batch(&input).map_err(|e| e.to_string())?
    } else {
        (Grammar::parse(&input).map_err(|e| e.to_string())?, Vec::new())
    };
    strings.extend(options.strings.iter().cloned());

    let mut out = Printer::new(options.format);
    let result = print_outputs(&mut out, &options.outputs, g, &strings);
    out.finish();
    result
}

/// Prints each rendering as soon as it is ready; HTML fragments are held back
/// and written as one document by `finish`.
struct Printer {
    format: OutputFormat,
    html: Vec<String>,
}

impl Printer {
    fn new(format: OutputFormat) -> Self {
        Self {
            format,
            html: Vec::new(),
        }
    }

    fn emit(&mut self, plain: String, latex: Option<String>, json: String, fragment: String) {
        match self.format {
            OutputFormat::Plain => println!("{}", plain),
            OutputFormat::LaTeX => println!("{}", latex.unwrap_or(plain)),
            OutputFormat::JSON => println!("{}", json),
            OutputFormat::HTML => self.html.push(fragment),
        }
    }

    fn finish(&self) {
        if self.format == OutputFormat::HTML {
            println!("{}", html_document(&self.html));
        }
    }
}

fn print_outputs(
    out: &mut Printer,
    outputs: &[String],
    mut g: Grammar,
    strings: &[String],
) -> Result<(), String> {
    if outputs.iter().any(|o| o == "prod") {
        let t = g.to_production_output_vec();
        out.emit(
            t.to_plaintext(),
            Some(t.to_latex()),
            to_json(&t)?,
            format!("<pre>\n{}\n</pre>", t.to_plaintext()),
        );
    }
    if outputs.iter().any(|o| o == "ff") {
        let ff = g.calculate_first_follow();
        let t = g.to_non_terminal_output_vec(&ff);
        let json = t.to_json().map_err(|e| e.to_string())?;
        out.emit(t.to_plaintext(), Some(t.to_latex()), json, t.to_html());
    }

    let needs_table = outputs
        .iter()
        .any(|o| o == "lr0fsm" || o == "slrtable" || o == "parse");
    if needs_table {
        let automaton = g.to_lr0_automaton().map_err(|e| e.to_string())?;
        if outputs.iter().any(|o| o == "lr0fsm") {
            let t = automaton.to_output(&g);
            out.emit(
                t.to_plaintext(),
                Some(t.to_latex()),
                to_json(&t)?,
                format!("<pre>\n{}\n</pre>", t.to_plaintext()),
            );
        }

        if outputs.iter().any(|o| o == "slrtable" || o == "parse") {
            let analysis =
                SLRAnalysis::from_automaton(g, automaton).map_err(|e| e.to_string())?;
            if outputs.iter().any(|o| o == "slrtable") {
                let t = analysis.table.to_output(&analysis.grammar);
                out.emit(t.to_plaintext(), Some(t.to_latex()), to_json(&t)?, t.to_html());
            }
            if outputs.iter().any(|o| o == "parse") {
                let reports = analysis.parse_all(strings.iter().map(|s| s.as_str()));
                let t = ParseReportOutputVec::new(&reports);
                out.emit(t.to_plaintext(), None, to_json(&t)?, t.to_html());
            }
        }
    }

    Ok(())
}

fn main() {
    env_logger::init();

    let args = std::env::args().skip(1).collect::<Vec<String>>();
    let options = match Options::from_args(&args) {
        Ok(Some(options)) => options,
        Ok(None) => {
            print_help();
            return;
        }
        Err(e) => {
            eprintln!("{}", e);
            print_help();
            process::exit(2);
        }
    };

    if let Err(e) = run(options) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
