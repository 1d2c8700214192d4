use std::fs::File;
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{Local, SecondsFormat};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use jslox::ast_printer::AstPrinter;
use jslox::interpreter::Interpreter;
use jslox::parser::Parser;
use jslox::scanner::{self, Scanner};

/// Exit status after a lexical or syntax error.
const EXIT_STATIC_ERROR: u8 = 65;

/// Exit status after a runtime error.
const EXIT_RUNTIME_ERROR: u8 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "jslox scripting language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to jslox.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print tokens as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Parses input and prints each statement in prefix form
    Parse { filename: Option<PathBuf> },

    /// Runs input as a program (stdin when no file is given)
    Run { filename: Option<PathBuf> },

    /// Starts an interactive prompt
    Repl,
}

/// Reads a script file, or all of stdin when no path is given.
fn read_source(filename: Option<PathBuf>) -> Result<String> {
    let Some(filename) = filename else {
        info!("Reading source from stdin");
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read stdin")?;
        return Ok(source);
    };

    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();

    // Zero-length files cannot be mapped.
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the mapping is read-only and dropped before this function
    // returns; its bytes are copied out once validated.
    let map = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map file {:?}", filename))?;

    let source = std::str::from_utf8(&map)
        .with_context(|| format!("File {:?} is not valid UTF-8", filename))?
        .to_owned();

    info!("Read {} bytes from {:?}", source.len(), filename);

    Ok(source)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("jslox.log").context("Failed to create jslox.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'jslox::' from module path
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("jslox::").unwrap_or(module);
            writeln!(
                buf,
                "{} [{}:{}] - {}",
                Local::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env() // RUST_LOG overrides the default
        .init();

    info!("Logger initialized, writing to jslox.log");
    Ok(())
}

fn tokenize(filename: Option<PathBuf>, json: bool) -> Result<ExitCode> {
    let source = read_source(filename)?;
    let mut tokenized = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) if json => println!("{}", serde_json::to_string(&token)?),
            Ok(token) => println!("{}", token),
            Err(e) => {
                tokenized = false;
                debug!("Tokenization debug: {}", e);
                eprintln!("{}", e);
            }
        }
    }

    if tokenized {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_STATIC_ERROR))
    }
}

fn parse(filename: Option<PathBuf>) -> Result<ExitCode> {
    let source = read_source(filename)?;

    let tokens = match scanner::scan(&source) {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(ExitCode::from(EXIT_STATIC_ERROR));
        }
    };

    let program = Parser::new(tokens).parse();

    for stmt in &program.statements {
        println!("{}", AstPrinter::print_stmt(stmt));
    }

    for e in &program.errors {
        eprintln!("{}", e);
    }

    if program.has_errors() {
        Ok(ExitCode::from(EXIT_STATIC_ERROR))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn run(filename: Option<PathBuf>) -> Result<ExitCode> {
    let source = read_source(filename)?;
    let mut interpreter = Interpreter::new();

    let report = interpreter.run_report(&source);
    debug!("Run finished with value {}", report.value);

    // The message itself already went to stdout.
    for e in report.errors.iter().filter(|e| !e.is_static()) {
        if let Some(line) = e.line() {
            eprintln!("[line {}]", line);
        }
    }

    if report.errors.iter().any(|e| e.is_static()) {
        Ok(ExitCode::from(EXIT_STATIC_ERROR))
    } else if !report.is_ok() {
        Ok(ExitCode::from(EXIT_RUNTIME_ERROR))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// One `run` per input line; globals persist between lines.
fn repl() -> Result<ExitCode> {
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        line.clear();
        if stdin.lock().read_line(&mut line).context("Failed to read line")? == 0 {
            break;
        }

        interpreter.run(&line);
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => tokenize(filename, json),
        Commands::Parse { filename } => parse(filename),
        Commands::Run { filename } => run(filename),
        Commands::Repl => repl(),
    }
}
