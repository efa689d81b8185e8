#![allow(non_snake_case)]
//! Command line front end: run task documents and evaluate expressions.
use RustedNumAn::Utils::logger::{init_logger, stamped_log_name};
use RustedNumAn::numerical::requests::TaskDocument;
use RustedNumAn::symbolic::parse_expr::parse_expression_with_vars;
use RustedNumAn::symbolic::symbolic_lambdify::compile;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "rusted_num_an")]
#[command(about = "Classical numerical methods: root finding, iterative linear solvers, interpolation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every request of a task document
    Run {
        /// Path to the task document
        task_file: PathBuf,

        /// Print responses as JSON instead of tables
        #[arg(long)]
        json: bool,

        /// Log level (off, error, warn, info, debug); overrides the settings section
        #[arg(short, long, value_parser = parse_level)]
        loglevel: Option<LevelFilter>,
    },

    /// Evaluate an expression
    Eval {
        /// Expression, e.g. "x^2 - 4"
        expression: String,

        /// Variable binding name=value, may be repeated
        #[arg(long = "at", value_parser = parse_binding)]
        at: Vec<(String, f64)>,

        /// Also print the symbolic derivative with respect to this variable
        #[arg(long)]
        diff: Option<String>,
    },
}

fn parse_binding(text: &str) -> Result<(String, f64), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", text))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("'{}': {}", value, e))?;
    Ok((name.trim().to_string(), value))
}

fn parse_level(text: &str) -> Result<LevelFilter, String> {
    text.parse::<LevelFilter>()
        .map_err(|_| format!("'{}' is not one of off, error, warn, info, debug", text))
}

fn run(task_file: PathBuf, json: bool, loglevel: Option<LevelFilter>) -> ExitCode {
    let document = match TaskDocument::from_file(&task_file) {
        Ok(document) => document,
        Err(err) => {
            eprintln!("error: {}\nhint: {}", err, err.hint());
            return ExitCode::FAILURE;
        }
    };
    let level = loglevel.unwrap_or(document.settings.loglevel);
    let log_file = document.settings.log_file.as_ref().map(|name| {
        if name == "auto" {
            stamped_log_name()
        } else {
            name.clone()
        }
    });
    init_logger(level, log_file.as_deref());

    let mut failed = false;
    for (operation, outcome) in document.execute() {
        match outcome {
            Ok(response) => {
                if json {
                    match response.to_json() {
                        Ok(text) => println!("{}", text),
                        Err(e) => {
                            eprintln!("{}: cannot serialize response: {}", operation, e);
                            failed = true;
                        }
                    }
                } else {
                    println!("{}\n{}\n", operation, response.render());
                }
            }
            Err(err) => {
                failed = true;
                eprintln!(
                    "{}: {} [{}]\nhint: {}",
                    operation,
                    err,
                    err.category(),
                    err.hint()
                );
            }
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn eval(expression: String, at: Vec<(String, f64)>, diff: Option<String>) -> ExitCode {
    let mut names: Vec<&str> = at.iter().map(|(name, _)| name.as_str()).collect();
    if let Some(var) = diff.as_deref() {
        if !names.contains(&var) {
            names.push(var);
        }
    }
    if let Some(var) = diff.as_deref() {
        match parse_expression_with_vars(&expression, &names) {
            Ok(expr) => println!("d/d{} = {}", var, expr.diff(var).simplify_()),
            Err(err) => {
                eprintln!("error: {}", err);
                return ExitCode::FAILURE;
            }
        }
        if at.is_empty() {
            return ExitCode::SUCCESS;
        }
    }
    let names: Vec<&str> = at.iter().map(|(name, _)| name.as_str()).collect();
    let compiled = match compile(&expression, &names) {
        Ok(compiled) => compiled,
        Err(err) => {
            eprintln!("error: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let bindings: HashMap<String, f64> = at.into_iter().collect();
    match compiled.evaluate(&bindings) {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            task_file,
            json,
            loglevel,
        } => run(task_file, json, loglevel),
        Commands::Eval {
            expression,
            at,
            diff,
        } => eval(expression, at, diff),
    }
}
