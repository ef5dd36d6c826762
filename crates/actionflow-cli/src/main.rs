mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "actionflow",
    about = "Evaluate action groups: run, inspect and validate registered actions",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .actionflow/ or .git/)
    #[arg(long, global = true, env = "ACTIONFLOW_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .actionflow/ with a config and a sample action file
    Init,

    /// Evaluate a comma-separated list of actions
    Run {
        /// Action names, e.g. "on-confirm" or "set-defaults,save,form:invoice-form"
        names: String,

        /// JSON file holding the initial context object
        #[arg(long, value_name = "FILE")]
        context: Option<PathBuf>,

        /// Set a context value (repeatable); the value is parsed as JSON when possible
        #[arg(long = "set", value_name = "KEY=VALUE")]
        sets: Vec<String>,
    },

    /// List registered actions
    List,

    /// Show the definition of an action
    Show { name: String },

    /// Check the config and action files for mistakes
    Validate,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Run {
            names,
            context,
            sets,
        } => cmd::run::run(&root, &names, context.as_deref(), &sets, cli.json),
        Commands::List => cmd::list::list(&root, cli.json),
        Commands::Show { name } => cmd::list::show(&root, &name, cli.json),
        Commands::Validate => cmd::validate::run(&root, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
