// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Selva command line: run a script, evaluate an expression, or start
//! an interactive REPL.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use selva_vm::{writer, State, Value};

#[derive(Parser)]
#[command(name = "selva", version, about = "Selva - a small Scheme-family interpreter")]
struct Cli {
    /// Script file to run.
    file: Option<PathBuf>,

    /// Evaluate an expression and print its result.
    #[arg(short, long, value_name = "EXPR")]
    eval: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut st = State::open();

    if let Some(src) = cli.eval {
        return eval_and_print(&mut st, &src, true);
    }

    if let Some(file) = cli.file {
        let src = match std::fs::read_to_string(&file) {
            Ok(src) => src,
            Err(e) => {
                eprintln!("selva: cannot read {}: {e}", file.display());
                return ExitCode::FAILURE;
            }
        };
        return eval_and_print(&mut st, &src, false);
    }

    repl(&mut st)
}

fn eval_and_print(st: &mut State, src: &str, print: bool) -> ExitCode {
    match st.eval_str(src) {
        Ok(v) => {
            if print && !matches!(v, Value::Undef) {
                println!("{}", writer::write_string(st, v));
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("selva: {e}");
            ExitCode::FAILURE
        }
    }
}

fn repl(st: &mut State) -> ExitCode {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("selva: cannot start line editor: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("selva {}", selva_vm::VERSION);
    loop {
        match rl.readline("selva> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                match st.eval_str(&line) {
                    Ok(v) => {
                        if !matches!(v, Value::Undef) {
                            println!("{}", writer::write_string(st, v));
                        }
                    }
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => return ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("selva: {e}");
                return ExitCode::FAILURE;
            }
        }
    }
}
