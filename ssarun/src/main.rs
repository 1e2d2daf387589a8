//! ssarun command line
//!
//! Runs one of the bundled sample programs through the SSA interpreter.
//! Logging is controlled with the `SSARUN_LOG` environment variable.

use clap::Parser;
use ssarun::Engine;
use ssarun::demos::{self, DEMOS};
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ssarun")]
#[command(version)]
#[command(about = "Interpreter for programs in SSA form", long_about = None)]
struct Cli {
    /// Sample program to run
    #[arg(default_value = "hello")]
    demo: String,

    /// Function to start from
    #[arg(long, default_value = "main")]
    entry: String,

    /// List the sample programs and exit
    #[arg(long)]
    list: bool,
}

fn main() -> ExitCode {
    let log_level = std::env::var("SSARUN_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.list {
        for demo in DEMOS {
            println!("{:<12} {}", demo.name, demo.summary);
        }
        return ExitCode::SUCCESS;
    }

    match run(&cli) {
        Ok(exit_code) => {
            info!("Interpretation completed with exit code: {:?}", exit_code);
            exit_code
        }
        Err(e) => {
            error!("Interpretation failed: {:#}", e);
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let demo = demos::find(&cli.demo).ok_or_else(|| {
        anyhow::anyhow!("Unknown demo '{}', use --list to see the available ones", cli.demo)
    })?;
    info!("Running demo: {}", demo.name);

    let program = (demo.build)()?;
    let mut engine = Engine::new(&program);
    (demo.install)(&mut engine);

    ssarun::run_entry(&mut engine, &cli.entry)
}
