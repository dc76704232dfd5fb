// ABOUTME: Command-line driver and REPL for the Lox interpreter

use clap::Parser as ClapParser;
use rlox::config::{
    EXIT_COMPILE_ERROR, EXIT_IO_ERROR, EXIT_RUNTIME_ERROR, EXIT_USAGE, HISTORY_FILE, PROMPT,
    USAGE, VERSION,
};
use rlox::interpreter::Interpreter;
use rlox::parser::Parser;
use rlox::reporter::Reporter;
use rlox::resolver::Resolver;
use rlox::scanner::Scanner;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use std::path::{Path, PathBuf};
use std::process::exit;

/// Tree-walking Lox interpreter
#[derive(ClapParser, Debug)]
#[command(name = "lox")]
#[command(version = VERSION)]
#[command(about = "A tree-walking Lox interpreter")]
struct CliArgs {
    /// Script file to execute (optional - if not provided, starts REPL)
    #[arg(value_name = "SCRIPT")]
    scripts: Vec<PathBuf>,
}

fn main() {
    let args = CliArgs::parse();

    match args.scripts.as_slice() {
        [] => run_prompt(),
        [script] => run_file(script),
        _ => {
            println!("{}", USAGE);
            exit(EXIT_USAGE);
        }
    }
}

/// Executes a script file, then exits with 65 on compile errors or 70 on
/// a runtime error.
fn run_file(path: &Path) {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Cannot read script file {}: {}", path.display(), error);
            exit(EXIT_IO_ERROR);
        }
    };

    let mut reporter = Reporter::new();
    let mut interpreter = Interpreter::new();
    let mut next_expr_id = 0;
    run(&source, &mut interpreter, &mut reporter, &mut next_expr_id);

    if reporter.had_error() {
        exit(EXIT_COMPILE_ERROR);
    }
    if reporter.had_runtime_error() {
        exit(EXIT_RUNTIME_ERROR);
    }
}

/// Interactive loop. Errors are reported but never terminate the
/// session; flags reset between lines.
fn run_prompt() {
    let mut reporter = Reporter::new();
    let mut interpreter = Interpreter::new();
    let mut next_expr_id = 0;

    let config = Config::builder().auto_add_history(true).build();
    let mut rl = match DefaultEditor::with_config(config) {
        Ok(rl) => rl,
        Err(error) => {
            eprintln!("Failed to initialize REPL: {}", error);
            exit(EXIT_IO_ERROR);
        }
    };

    // Best effort; a missing history file is fine
    let _ = rl.load_history(HISTORY_FILE);

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                run(&line, &mut interpreter, &mut reporter, &mut next_expr_id);
                reporter.reset();
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C clears the line, not the session
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(error) => {
                eprintln!("Error: {}", error);
                break;
            }
        }
    }

    let _ = rl.save_history(HISTORY_FILE);
}

/// One pass through the pipeline. Each phase runs only if the previous
/// one reported no errors; runtime errors land in the reporter.
fn run(
    source: &str,
    interpreter: &mut Interpreter,
    reporter: &mut Reporter,
    next_expr_id: &mut usize,
) {
    let tokens = Scanner::new(source).scan_tokens(reporter);

    let mut parser = Parser::new(tokens, *next_expr_id, reporter);
    let statements = parser.parse();
    *next_expr_id = parser.next_expr_id();
    if reporter.had_error() {
        return;
    }

    let locals = Resolver::new(reporter).resolve(&statements);
    if reporter.had_error() {
        return;
    }

    interpreter.resolve(locals);
    if let Err(error) = interpreter.interpret(&statements) {
        reporter.runtime_error(&error);
    }
}
