//! liftdag command-line driver.
//!
//! Reads operation graphs in the text format, lifts every function into one IR module
//! and prints it. Diagnostics go to stderr after the module.

use bumpalo::Bump;
use clap::Parser;
use liftdag::{parse_dags, target_by_name, LiftOptions, LiftSession, Lifter};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "liftdag", version, about = "Lift selection DAGs back to target-independent IR")]
struct Cli {
    /// Operation graph file (`-` reads stdin)
    input: PathBuf,

    /// Target the graphs were selected for
    #[arg(long, default_value = "ppc64")]
    target: String,

    /// Emit the graphs as written, without reverse instruction selection
    #[arg(long)]
    no_select: bool,

    /// Dump each graph to stderr after selection
    #[arg(long)]
    print_dag: bool,

    /// Longest operand path followed during emission
    #[arg(long, default_value_t = LiftOptions::default().max_depth)]
    max_depth: usize,

    /// Write the module here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_module("liftdag", level)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let Some(target) = target_by_name(&cli.target) else {
        eprintln!("error: unknown target '{}'", cli.target);
        std::process::exit(2);
    };

    let text = if cli.input.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(&cli.input)?
    };
    let mut dags = parse_dags(&text, target.as_ref())?;

    let arena = Bump::new();
    let session = LiftSession::new(&arena);
    let options = LiftOptions { run_selector: !cli.no_select, max_depth: cli.max_depth };
    let module_name = cli.input.file_stem().and_then(|s| s.to_str()).unwrap_or("stdin");
    let mut lifter = Lifter::new(module_name, target.as_ref(), &session, options);

    let mut failure = None;
    for dag in dags.iter_mut() {
        let result = lifter.lift_function(dag);
        if cli.print_dag {
            eprint!("{}", dag.display(target.as_ref()));
        }
        if let Err(err) = result {
            failure = Some(format!("{}: {err}", dag.name()));
            break;
        }
    }

    let rendered = lifter.module().to_string();
    match &cli.output {
        Some(path) => fs::write(path, rendered)?,
        None => io::stdout().write_all(rendered.as_bytes())?,
    }

    for diagnostic in session.diagnostics() {
        eprintln!("{diagnostic}");
    }
    log::info!("{}", session.stats());

    if let Some(message) = failure {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
    Ok(())
}
