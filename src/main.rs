use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;

use ltl2buchi::core::{Flags, translate};
use ltl2buchi::errors::TranslateError;
use ltl2buchi::output::{self, OutputMode};

/// Translates a linear temporal logic formula into a Büchi automaton.
#[derive(Debug, Parser)]
#[command(name = "ltl2buchi", disable_version_flag = true)]
struct Cli {
    /// Translate the given LTL formula
    #[arg(short = 'f', value_name = "formula")]
    formula: Option<String>,

    /// Like -f, but with the formula stored in a one-line file
    #[arg(short = 'F', value_name = "file", conflicts_with = "formula")]
    file: Option<PathBuf>,

    /// Negate the formula once read
    #[arg(short = 'i')]
    invert: bool,

    /// Display the intermediate automata on standard error
    #[arg(short = 'd')]
    verbose: bool,

    /// Print computing time and automata sizes
    #[arg(short = 's')]
    stats: bool,

    /// Disable logic-level formula simplification
    #[arg(short = 'l')]
    no_simp_log: bool,

    /// Disable a-posteriori simplification
    #[arg(short = 'p')]
    no_simp_post: bool,

    /// Disable on-the-fly simplification
    #[arg(short = 'o')]
    no_simp_fly: bool,

    /// Disable the strongly-connected-component simplification
    #[arg(short = 'c')]
    no_simp_scc: bool,

    /// Evaluate acceptance marks on target states instead of sources
    #[arg(short = 'a')]
    fin_on_target: bool,

    /// Output mode; one of spin, c or dot
    #[arg(short = 'O', value_name = "mode", default_value = "spin")]
    output: String,

    /// Symbol prefix for the C output
    #[arg(short = 'P', value_name = "prefix", default_value = "_ltl2buchi")]
    prefix: String,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let asked_for_help = matches!(err.kind(), ErrorKind::DisplayHelp);
            let _ = err.print();
            return if asked_for_help {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            };
        }
    };

    let Ok(mode) = cli.output.parse::<OutputMode>() else {
        eprintln!("ltl2buchi: unknown output mode '{}'", cli.output);
        return ExitCode::from(1);
    };

    let raw = match (&cli.formula, &cli.file) {
        (Some(formula), None) => formula.clone(),
        (None, Some(path)) => match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => {
                eprintln!("ltl2buchi: cannot open {}", path.display());
                return ExitCode::from(1);
            }
        },
        _ => {
            eprintln!("ltl2buchi: exactly one of -f and -F is required");
            return ExitCode::from(1);
        }
    };

    // tabs, quotes and newlines collapse to spaces before parsing
    let mut formula: String = raw
        .chars()
        .map(|c| if matches!(c, '\t' | '"' | '\n' | '\r') { ' ' } else { c })
        .collect();
    formula = formula.trim().to_string();
    if cli.invert {
        formula = format!("!({formula})");
    }

    init_tracing(&cli);

    let flags = Flags {
        simp_log: !cli.no_simp_log,
        simp_post: !cli.no_simp_post,
        simp_fly: !cli.no_simp_fly,
        simp_scc: !cli.no_simp_scc,
        fin_on_target: cli.fin_on_target,
        verbose: cli.verbose,
        stats: cli.stats,
    };

    match translate(&formula, &flags) {
        Ok(translation) => {
            print!("{}", output::render(&translation, mode, &formula, &cli.prefix));
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&formula, &err);
            ExitCode::from(1)
        }
    }
}

/// Installs the stderr trace subscriber; `-d` turns on the automaton
/// dumps, `-s` the statistics lines.
fn init_tracing(cli: &Cli) {
    use tracing_subscriber::filter::LevelFilter;

    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else if cli.stats {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// One-line diagnostic with a caret under the offending column.
fn report(formula: &str, err: &TranslateError) {
    eprintln!("ltl2buchi: {err}");
    eprintln!("ltl2buchi: {formula}");
    let offset = "ltl2buchi: ".len() + err.column().saturating_sub(1);
    eprintln!("{}^", "-".repeat(offset));
}
