use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rfdebug::config::ShellConfig;
use rfdebug::host::{SuiteOutcome, SuiteRunner, parse_suite};
use rfdebug::repl::{ReedlineReader, StdinReader};
use rfdebug::styles::Console;
use rfdebug::{BuiltinEngine, Context, Session};

#[derive(Parser, Debug)]
#[command(name = "rfdebug")]
#[command(version)]
#[command(about = "Interactive debug shell for keyword-driven tests")]
struct Cli {
    /// Plain-text suites to walk; without any, open an interactive shell
    suites: Vec<PathBuf>,

    /// History file [default: $RFDEBUG_HISTORY or ~/.rfdebug_history]
    #[arg(long)]
    history: Option<String>,

    /// Disable coloured output
    #[arg(long)]
    no_color: bool,

    /// Pause before the first step of the first suite
    #[arg(short, long)]
    step: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("RFDEBUG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = ShellConfig::from_env();
    if let Some(history) = &cli.history {
        config = config.with_history(history);
    }
    if cli.no_color {
        config = config.without_color();
    }
    tracing::debug!(?config, "starting");

    let console = Console::stdout(config.colored);
    let context = Context::global();
    let handles_interrupts = config.handles_interrupts();
    let session = if config.interactive {
        Session::new(context, console, ReedlineReader::new(config.history_path))
    } else {
        Session::new(context, console, StdinReader::stdin())
    };

    let mut engine = BuiltinEngine::new(session.clone());
    if handles_interrupts {
        engine
            .monitor()
            .install()
            .context("cannot install the SIGINT handler")?;
    }

    if cli.suites.is_empty() {
        rfdebug::debug(&mut engine, &session)?;
        return Ok(ExitCode::SUCCESS);
    }

    if cli.step {
        session.context.set_step_mode(true);
    }

    let mut runner = SuiteRunner::new(engine);
    let mut total = SuiteOutcome::default();
    for path in &cli.suites {
        let suite = parse_suite(path)?;
        total += runner.run(&suite)?;
    }
    runner.print_summary(&total)?;

    Ok(if total.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("rfdebug: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
