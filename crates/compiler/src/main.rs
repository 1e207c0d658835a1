//! Alma CLI
//!
//! Command-line interface for running .alma programs and starting an
//! interactive session.

use almac::{Interp, repl};
use alma_runtime::Stack;
use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{Shell, generate};
use std::io;
use std::path::{Path, PathBuf};
use std::process;

#[derive(ClapParser)]
#[command(name = "alma")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Alma interpreter - run concatenative .alma programs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an .alma program
    Run {
        /// Input .alma source file
        input: PathBuf,

        /// Module search path (overrides ALMA_PATH)
        #[arg(long)]
        path: Option<String>,

        /// Print the stack left behind by the program
        #[arg(long)]
        show_stack: bool,
    },

    /// Start an interactive session
    Repl {
        /// Module search path (overrides ALMA_PATH)
        #[arg(long)]
        path: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            path,
            show_stack,
        } => run_program(&input, path, show_stack),
        Commands::Repl { path } => run_repl(path),
        Commands::Completions { shell } => run_completions(shell),
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "alma", &mut io::stdout());
}

fn make_interp(path: Option<String>) -> Interp {
    let result = match path {
        Some(path) => Interp::new(path),
        None => Interp::from_env(),
    };
    match result {
        Ok(interp) => interp,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_program(input: &Path, path: Option<String>, show_stack: bool) {
    let mut interp = make_interp(path);
    let mut stack = Stack::new();

    if let Err(e) = interp.run_file(input, &mut stack) {
        eprintln!("{}", e);
        eprintln!("Compilation aborted.");
        process::exit(1);
    }

    if show_stack && !stack.is_empty() {
        println!("{}", stack);
    }
}

fn run_repl(path: Option<String>) {
    let mut interp = make_interp(path);
    if let Err(e) = repl::run(&mut interp) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
