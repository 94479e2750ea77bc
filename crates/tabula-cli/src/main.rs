//! tabula CLI - evaluate and inspect spreadsheet formulas

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tabula::prelude::*;
use tabula::Reference;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tabula")]
#[command(author, version, about = "Spreadsheet formula evaluation tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Calculation settings as a JSON file
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a formula against cells given on the command line
    Eval {
        /// Formula text, starting with '='
        formula: String,

        /// Cell contents as CELL=VALUE; a value starting with '=' is a formula
        #[arg(short = 's', long = "set", value_name = "CELL=VALUE")]
        cells: Vec<String>,

        /// Named areas as NAME=REFERENCE
        #[arg(short, long = "name", value_name = "NAME=REFERENCE")]
        names: Vec<String>,

        /// Sheet the formula is evaluated on
        #[arg(long, default_value = "Sheet1")]
        sheet: String,
    },

    /// Show the compiled program of a formula
    Dump {
        /// Formula text, starting with '='
        formula: String,
    },

    /// Show the tokens of a formula
    Tokens {
        /// Formula text, starting with '='
        formula: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match &cli.settings {
        Some(path) => load_settings(path)?,
        None => CalculationSettings::default(),
    };

    match cli.command {
        Commands::Eval {
            formula,
            cells,
            names,
            sheet,
        } => eval(&formula, &cells, &names, &sheet, settings),
        Commands::Dump { formula } => dump(&formula, &settings),
        Commands::Tokens { formula } => tokens(&formula, &settings),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: &Path) -> Result<CalculationSettings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let settings = serde_json::from_str(&text)
        .with_context(|| format!("Invalid settings in '{}'", path.display()))?;
    debug!(?settings, "loaded settings");
    Ok(settings)
}

fn eval(
    formula: &str,
    cells: &[String],
    names: &[String],
    sheet: &str,
    settings: CalculationSettings,
) -> Result<()> {
    let mut workbook = Workbook::empty();
    workbook.set_settings(settings);
    let sheet = ensure_sheet(&mut workbook, sheet)?;

    for assignment in cells {
        let (cell, content) = split_assignment(assignment)?;
        let reference =
            Reference::parse(cell).with_context(|| format!("Invalid cell '{}'", cell))?;
        let address = reference
            .cell()
            .with_context(|| format!("'{}' is not a single cell", cell))?
            .to_a1_string();
        let target = match &reference.sheet {
            Some(name) => ensure_sheet(&mut workbook, name)?,
            None => sheet,
        };

        if content.starts_with('=') {
            workbook.set_formula(target, &address, content)?;
        } else {
            workbook.set_value(target, &address, parse_literal(content))?;
        }
    }

    for definition in names {
        let (name, reference) = split_assignment(definition)?;
        workbook
            .define_name(name, reference)
            .with_context(|| format!("Failed to define name '{}'", name))?;
    }

    let value = workbook.evaluate_formula(sheet, formula)?;
    println!("{}", value);
    Ok(())
}

fn dump(formula: &str, settings: &CalculationSettings) -> Result<()> {
    let formula = Formula::with_expression(formula);
    let workbook = Workbook::with_settings(settings.clone());
    print!("{}", formula.dump(settings, &workbook));
    Ok(())
}

fn tokens(formula: &str, settings: &CalculationSettings) -> Result<()> {
    let workbook = Workbook::new();
    let tokens = Formula::with_expression(formula).tokens(settings, &workbook);
    if !tokens.is_valid() {
        eprintln!("Warning: formula does not scan cleanly");
    }
    for token in tokens.iter() {
        println!("{:>4}  {:<12} {}", token.offset(), format!("{:?}", token.kind()), token.text());
    }
    Ok(())
}

/// Index of a sheet, adding it when missing
fn ensure_sheet(workbook: &mut Workbook, name: &str) -> Result<usize> {
    match workbook.sheet_index(name) {
        Some(index) => Ok(index),
        None => workbook
            .add_sheet(name)
            .with_context(|| format!("Failed to add sheet '{}'", name)),
    }
}

/// Split `KEY=VALUE` at the first `=`
fn split_assignment(text: &str) -> Result<(&str, &str)> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => bail!("Expected KEY=VALUE, got '{}'", text),
    }
}

/// Interpret command-line text as a number, boolean or text
fn parse_literal(text: &str) -> Value {
    if let Ok(i) = text.parse::<i64>() {
        return Value::integer(i);
    }
    if let Ok(f) = text.parse::<f64>() {
        return Value::float(f);
    }
    if text.eq_ignore_ascii_case("TRUE") {
        return Value::boolean(true);
    }
    if text.eq_ignore_ascii_case("FALSE") {
        return Value::boolean(false);
    }
    Value::text(text)
}
