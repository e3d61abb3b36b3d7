use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use rlox::error::LoxError;
use rlox::scanner::Scanner;
use rlox::{Lox, RunStatus};

const EXIT_USAGE: i32 = 64;
const EXIT_COMPILE_ERROR: i32 = 65;
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Script to run; starts an interactive prompt when omitted
    script: Option<PathBuf>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print one JSON object per token
        #[arg(long)]
        json: bool,
    },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },
}

/// Maps a source file and copies it out as UTF‑8 text.
fn read_source(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    // Zero‑length mappings are rejected on some platforms.
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the mapping is read once and copied before `file` is dropped;
    // concurrent truncation by another process is outside our control.
    let map = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    let text = std::str::from_utf8(&map)
        .map_err(LoxError::from)
        .context(format!("File {:?} is not valid UTF-8", filename))?
        .to_owned();

    info!("Read {} bytes from {:?}", text.len(), filename);

    Ok(text)
}

fn init_logger(to_file: bool) -> Result<()> {
    if !to_file {
        // RUST_LOG still applies; silent by default.
        Builder::new()
            .filter_level(log::LevelFilter::Off)
            .parse_default_env()
            .init();

        return Ok(());
    }

    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip the crate prefix from module paths
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rlox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn tokenize(filename: &Path, json: bool) -> Result<()> {
    let source = read_source(filename)?;
    let mut tokenized = true;

    for item in Scanner::new(&source) {
        match item {
            Ok(token) if json => println!("{}", serde_json::to_string(&token)?),
            Ok(token) => println!("{}", token),
            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_COMPILE_ERROR);
        std::process::exit(EXIT_COMPILE_ERROR);
    }

    Ok(())
}

fn run_file(filename: &Path) -> Result<()> {
    let source = read_source(filename)?;
    let mut lox = Lox::new();

    match lox.run(&source) {
        RunStatus::Ok => {
            info!("Program executed successfully");
            Ok(())
        }
        RunStatus::CompileError => std::process::exit(EXIT_COMPILE_ERROR),
        RunStatus::RuntimeError => std::process::exit(EXIT_RUNTIME_ERROR),
    }
}

fn run_prompt() -> Result<()> {
    let mut editor =
        DefaultEditor::new().map_err(|e| anyhow!("Failed to start line editor: {}", e))?;
    let mut lox = Lox::new();

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());

                let status = lox.run(&line);
                debug!("REPL line finished with {:?}", status);

                lox.reset_errors();
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(anyhow!("Failed to read line: {}", e)),
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,
        // --help and --version still exit successfully
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(EXIT_USAGE);
        }
    };

    init_logger(args.log)?;

    info!("CLI arguments: {:?}", args);

    match (args.commands, args.script) {
        (Some(Commands::Tokenize { filename, json }), _) => tokenize(&filename, json),
        (Some(Commands::Run { filename }), _) | (None, Some(filename)) => run_file(&filename),
        (None, None) => run_prompt(),
    }
}
