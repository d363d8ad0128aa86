use clap::Parser;
use edlisp::{Interpreter, Value, cli::RunArgs};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    let args = RunArgs::parse();
    let mut interpreter = Interpreter::with_config(args.config());

    let mut sources = Vec::new();
    for (i, expr) in args.eval.iter().enumerate() {
        sources.push((format!("<eval {}>", i + 1), expr.clone()));
    }
    for path in &args.files {
        match std::fs::read_to_string(path) {
            Ok(text) => sources.push((path.display().to_string(), text)),
            Err(err) => {
                eprintln!("Cannot read {}: {}", path.display(), err);
                return ExitCode::FAILURE;
            }
        }
    }

    let mut last = Value::Nil;
    for (name, text) in &sources {
        log::debug!("running {}", name);
        match interpreter.evaluate(text) {
            Ok(value) => last = value,
            Err(err) => {
                if err.pretty_print(name, text).is_err() {
                    eprintln!("Error: {}", err);
                }
                return ExitCode::FAILURE;
            }
        }
    }

    if !sources.is_empty() {
        println!("{}", last);
    }
    ExitCode::SUCCESS
}
