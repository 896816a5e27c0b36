use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::registry::{cmd_registry, RegistryAction};
use cli::resolve::{cmd_resolve, DEFAULT_CUTOFF_DEPTH};
use cli::search::cmd_search;

#[derive(Parser)]
#[command(
    name = "quiver",
    version,
    about = "Resolve artifacts and their dependencies from metadata registries"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve an installation plan (defaults to the project's requirements)
    Resolve {
        /// Requirements as SPEC[@RANGE], e.g. tools:compilers/gcc@^10
        requirements: Vec<String>,
        /// Artifacts reached above this depth are marked as user selections
        #[arg(long, default_value_t = DEFAULT_CUTOFF_DEPTH)]
        depth: usize,
    },
    /// Search registries by keyword
    Search {
        /// Keyword matched against identity, summary and description
        query: String,
        /// Only search this registry
        #[arg(long)]
        registry: Option<String>,
        /// Only show versions in this range
        #[arg(long)]
        range: Option<String>,
    },
    /// Manage registries
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("QUIVER_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Resolve {
            requirements,
            depth,
        } => cmd_resolve(requirements, depth),
        Command::Search {
            query,
            registry,
            range,
        } => cmd_search(query, registry, range),
        Command::Registry { action } => cmd_registry(action),
    }
}
