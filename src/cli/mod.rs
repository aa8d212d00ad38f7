//! CLI subcommands — run, validate, expand, status, completions.

use crate::core::executor::{self, RunConfig};
use crate::core::resolver::SourceResolver;
use crate::core::types::{RunContext, VarStore};
use crate::core::{include, parser, scan, state};
use crate::error::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "opchain",
    version,
    about = "Declarative operation-pipeline runner — ordered shell operations with auditable state"
)]
pub struct Cli {
    /// -v echoes each operation and logs progress; -vv adds debug tracing
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Expand, parse, and execute the configured operations
    Run {
        /// Config file path or http(s) URL (repeatable, applied in order)
        #[arg(short, long = "config", required = true, value_name = "PATH_OR_URL")]
        config: Vec<String>,

        /// State directory for per-operation records
        #[arg(long, env = "OPCHAIN_STATE_DIR", default_value = state::DEFAULT_STATE_DIR)]
        state_dir: PathBuf,

        /// Remove everything in the state directory before starting
        #[arg(long)]
        nuke: bool,

        /// Skip host detection (no os.* / pkgs.* variables)
        #[arg(long)]
        no_scan: bool,
    },

    /// Expand and parse without executing; list the operations
    Validate {
        /// Config file path or http(s) URL (repeatable)
        #[arg(short, long = "config", required = true, value_name = "PATH_OR_URL")]
        config: Vec<String>,
    },

    /// Print the fully expanded configuration text
    Expand {
        /// Config file path or http(s) URL (repeatable)
        #[arg(short, long = "config", required = true, value_name = "PATH_OR_URL")]
        config: Vec<String>,
    },

    /// Show recorded operation results from a state directory
    Status {
        /// State directory
        #[arg(long, env = "OPCHAIN_STATE_DIR", default_value = state::DEFAULT_STATE_DIR)]
        state_dir: PathBuf,
    },

    /// Generate a shell completion script
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Install the stderr tracing subscriber. `RUST_LOG` overrides the level.
pub fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Dispatch a parsed command line.
pub fn dispatch(cli: Cli) -> Result<()> {
    let verbose = cli.verbose > 0;
    match cli.command {
        Commands::Run {
            config,
            state_dir,
            nuke,
            no_scan,
        } => {
            let mut vars = VarStore::new();
            if !no_scan {
                scan::seed_from_issue(&mut vars, Path::new(scan::ISSUE_PATH));
            }
            cmd_run(&config, vars, &state_dir, nuke, verbose)
        }
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Expand { config } => cmd_expand(&config),
        Commands::Status { state_dir } => cmd_status(&state_dir),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "opchain", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn trimmed_refs(configs: &[String]) -> Vec<String> {
    configs.iter().map(|c| c.trim().to_string()).collect()
}

/// Expand and parse the configs into a run context seeded with `vars`.
fn load_context(configs: &[String], vars: VarStore) -> Result<RunContext> {
    let refs = trimmed_refs(configs);
    let text = include::expand_configs(&refs, &SourceResolver)?;
    let mut ctx = RunContext::with_vars(vars);
    // Line numbers count lines of the expanded text, not of any one file
    let source = format!("{} after expansion (see `opchain expand`)", refs.join(" + "));
    parser::parse_config(&text, &source, &mut ctx)?;
    Ok(ctx)
}

fn cmd_run(
    configs: &[String],
    vars: VarStore,
    state_dir: &Path,
    nuke: bool,
    verbose: bool,
) -> Result<()> {
    let ctx = load_context(configs, vars)?;
    state::prepare_state_dir(state_dir, nuke)?;

    let cfg = RunConfig { state_dir, verbose };
    let report = executor::run(&ctx.operations, &cfg)?;

    if verbose {
        println!();
    }
    println!(
        "Run complete: {} executed, {} succeeded, {} failed ({:.1}s)",
        report.executed,
        report.succeeded,
        report.failed,
        report.total_duration.as_secs_f64()
    );
    Ok(())
}

fn cmd_validate(configs: &[String]) -> Result<()> {
    let ctx = load_context(configs, VarStore::new())?;
    println!(
        "OK: {} operations, {} variables",
        ctx.operations.len(),
        ctx.vars.len()
    );
    for (i, op) in ctx.operations.iter().enumerate() {
        let lines = op.script.lines().count();
        let halt = if op.halt_if_fail { " [halt-if-fail]" } else { "" };
        println!(
            "  {}. {}{} ({} line{})",
            i + 1,
            op.label,
            halt,
            lines,
            if lines == 1 { "" } else { "s" }
        );
    }
    Ok(())
}

fn cmd_expand(configs: &[String]) -> Result<()> {
    let text = include::expand_configs(&trimmed_refs(configs), &SourceResolver)?;
    print!("{}", text);
    Ok(())
}

fn cmd_status(state_dir: &Path) -> Result<()> {
    let summaries = state::load_summaries(state_dir)?;
    if summaries.is_empty() {
        println!("No operations recorded in {}.", state_dir.display());
        return Ok(());
    }

    let mut failed = 0;
    for s in &summaries {
        let status = if s.success { "OK" } else { "FAILED" };
        if !s.success {
            failed += 1;
        }
        println!(
            "{:05} {}: {} exit {} ({:.2}s){}",
            s.sequence,
            s.label,
            status,
            s.exit_code,
            s.run_time,
            if s.halt_if_fail { " [halt-if-fail]" } else { "" }
        );
        if !s.run_error.is_empty() {
            println!("      run error: {}", s.run_error);
        }
    }
    println!();
    println!("{} operations, {} failed.", summaries.len(), failed);
    Ok(())
}
