//! Bolt Compiler CLI
//!
//! Main entry point for the `boltc` command.

use boltc::SourceFile;
use boltc::codegen::llvm::OptLevel;
use boltc::diagnostics::Reporter;
use boltc::driver::{BuildConfig, EmitKind, Session};
use clap::{Parser, Subcommand};
use miette::Result;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Exit status for errors in the compiled program
const EXIT_USER_ERROR: u8 = 1;
/// Exit status for defects in the compiler
const EXIT_INTERNAL_ERROR: u8 = 101;

#[derive(Parser)]
#[command(name = "boltc")]
#[command(version = boltc::VERSION)]
#[command(about = "The Bolt programming language compiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile Bolt source files
    Build {
        /// Input files, compiled as independent modules
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Library search directory, searched in the order given
        #[arg(short = 'L', long = "library-path", value_name = "DIR")]
        library_paths: Vec<PathBuf>,

        /// Output directory
        #[arg(short = 'o', long = "out-dir", value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Artifacts to write: ir, asm, obj, ast
        #[arg(long, value_delimiter = ',')]
        emit: Vec<EmitKind>,

        /// Optimization level (0-3)
        #[arg(short = 'O', value_name = "LEVEL")]
        opt_level: Option<OptLevel>,

        /// Build configuration file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Lex, parse and analyse without generating code
    Check {
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        #[arg(short = 'L', long = "library-path", value_name = "DIR")]
        library_paths: Vec<PathBuf>,
    },

    /// Print the token stream of a file
    Tokens {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Commands::Build {
            inputs,
            library_paths,
            output_dir,
            emit,
            opt_level,
            config,
        } => {
            let mut config = match config {
                Some(path) => BuildConfig::load(&path)?,
                None => BuildConfig::default(),
            };
            config.library_paths.extend(library_paths);
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if !emit.is_empty() {
                config.emit = emit;
            }
            if let Some(level) = opt_level {
                config.opt_level = level;
            }
            Ok(build(&inputs, config))
        }

        Commands::Check {
            inputs,
            library_paths,
        } => {
            let mut config = BuildConfig::default();
            config.library_paths.extend(library_paths);
            Ok(check(&inputs, config))
        }

        Commands::Tokens { input } => tokens(&input),
    }
}

fn build(inputs: &[PathBuf], config: BuildConfig) -> ExitCode {
    let mut session = Session::new(config);
    let mut reporter = Reporter::new();

    for input in inputs {
        tracing::info!("Compiling {:?}", input);
        let result = session
            .compile_file(input)
            .and_then(|module| session.write_artifacts(&module).map(|paths| (module, paths)));

        match result {
            Ok((module, paths)) => {
                for path in paths {
                    println!("{}", path.display());
                }
                for flag in &module.linker_flags {
                    tracing::info!(module = %module.name, %flag, "linker flag");
                }
            }
            Err(err) => reporter.error(input.display().to_string(), err),
        }
    }

    finish(&reporter)
}

fn check(inputs: &[PathBuf], config: BuildConfig) -> ExitCode {
    let mut session = Session::new(config);
    let mut reporter = Reporter::new();

    for input in inputs {
        match session.check_file(input) {
            Ok(analysed) => println!(
                "{}: ok ({} declarations)",
                input.display(),
                analysed.declarations.len()
            ),
            Err(err) => reporter.error(input.display().to_string(), err),
        }
    }

    finish(&reporter)
}

fn finish(reporter: &Reporter) -> ExitCode {
    if !reporter.has_errors() {
        return ExitCode::SUCCESS;
    }
    reporter.emit_all();
    if reporter.has_internal_errors() {
        ExitCode::from(EXIT_INTERNAL_ERROR)
    } else {
        ExitCode::from(EXIT_USER_ERROR)
    }
}

fn tokens(input: &Path) -> Result<ExitCode> {
    let source = SourceFile::load(input)?;
    let tokens = boltc::lexer::lex(&source)?;
    for token in &tokens {
        println!("{:<16} {}", token.mark().to_string(), token);
    }
    tracing::debug!(count = tokens.len(), "printed tokens");
    Ok(ExitCode::SUCCESS)
}
