// ABOUTME: CLI driver running scripts or an interactive REPL

use clap::Parser as CliParser;
use log::{debug, error, LevelFilter};
use rlox::config;
use rlox::error::ConsoleReporter;
use rlox::eval::Interpreter;
use rlox::lexer::Lexer;
use rlox::parser::Parser;
use rlox::resolver::Resolver;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use simple_logger::SimpleLogger;
use std::path::{Path, PathBuf};
use std::process;

/// Lox interpreter: runs a script file, or a REPL when no file is given
#[derive(CliParser, Debug)]
#[command(name = "rlox")]
#[command(version = config::VERSION)]
#[command(about = "A tree-walking Lox interpreter")]
struct CliArgs {
    /// Script file to execute (optional - if not provided, starts REPL)
    // Collected as a list so surplus arguments reach the usage check in
    // main instead of clap's own error path; misuse must exit with 64.
    #[arg(value_name = "FILE")]
    scripts: Vec<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// One interpreter run: the evaluator plus its diagnostic sink. Both live
/// for the whole session so REPL lines share state.
struct Lox {
    interpreter: Interpreter,
    reporter: ConsoleReporter,
}

impl Lox {
    fn new() -> Self {
        Lox {
            interpreter: Interpreter::new(),
            reporter: ConsoleReporter::new(),
        }
    }

    /// Runs one source unit through the pipeline. Any compile-time error
    /// suppresses evaluation; the reporter keeps the flags.
    fn run(&mut self, source: &str) {
        let tokens = Lexer::new(source, &mut self.reporter).scan_tokens();
        debug!("lexed {} tokens", tokens.len());

        let statements = Parser::new(tokens, &mut self.reporter).parse();
        debug!("parsed {} statements", statements.len());
        if self.reporter.had_error {
            return;
        }

        Resolver::new(&mut self.interpreter, &mut self.reporter).resolve(&statements);
        if self.reporter.had_error {
            return;
        }

        self.interpreter.interpret(&statements, &mut self.reporter);
    }

    fn run_file(&mut self, path: &Path) -> ! {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                error!("cannot read {}: {}", path.display(), e);
                eprintln!("Cannot read script file {}: {}", path.display(), e);
                process::exit(74);
            }
        };

        self.run(&source);

        if self.reporter.had_error {
            process::exit(65);
        }
        if self.reporter.had_runtime_error {
            process::exit(70);
        }
        process::exit(0);
    }

    fn run_prompt(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let config = Config::builder().auto_add_history(true).build();
        let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)
            .map_err(|e| format!("Failed to initialize REPL: {}", e))?;

        // Best effort: a missing history file is fine on first launch.
        let _ = rl.load_history(config::HISTORY_FILE);

        println!("{}", config::WELCOME_MESSAGE);
        println!("{}", config::WELCOME_SUBTITLE);
        println!("{}", config::WELCOME_FOOTER);

        loop {
            match rl.readline(config::PROMPT) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        println!("Goodbye!");
                        break;
                    }

                    // Errors print and the loop continues; a bad line must
                    // not poison the next one.
                    self.reporter.reset();
                    self.run(&line);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("\nGoodbye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {}", err);
                    break;
                }
            }
        }

        let _ = rl.save_history(config::HISTORY_FILE);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    SimpleLogger::new().with_level(level).init()?;

    if args.scripts.len() > 1 {
        eprintln!("{}", config::USAGE);
        process::exit(64);
    }

    let mut lox = Lox::new();
    match args.scripts.first() {
        Some(path) => lox.run_file(path),
        None => lox.run_prompt(),
    }
}
