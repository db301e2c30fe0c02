/// dagpath command-line tool for content-addressed DAGs kept in a directory
/// block store.
///
/// # Command overview
///
/// ```text
/// dagpath <COMMAND> [OPTIONS]
///
/// Commands:
///   put        Build a DAG from a JSON manifest and print its root address
///   resolve    Resolve /<root>/<seg>/... and print the result
///   inspect    Decode a single block and print it
///   help       Print help information
///
/// Global options:
///   -v, --verbose    Log every resolution step (RUST_LOG overrides)
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                          |
/// |------|--------------------------------------------------|
/// | 0    | Success                                          |
/// | 1    | Error (I/O failure, unresolvable path, etc.)     |
///
/// Errors and logs go to stderr so stdout can be piped cleanly.
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cmd_inspect;
mod cmd_put;
mod cmd_resolve;
mod fs_store;
mod render;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// Work with content-addressed DAGs in a directory block store.
#[derive(Parser)]
#[command(name = "dagpath", version, about = "Merkle DAG path resolver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log every resolution step at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Build a DAG from a JSON manifest into a block store.
    Put(PutArgs),
    /// Resolve a path of the form /<root>/<segment>/...
    Resolve(ResolveArgs),
    /// Decode one block and print it.
    Inspect(InspectArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `dagpath put`.
///
/// See [`cmd_put`] for the manifest format.
///
/// ```text
/// ┌──────────────────┬───────────────────────────────────────────────┐
/// │ Flag             │ Effect                                        │
/// ├──────────────────┼───────────────────────────────────────────────┤
/// │ --store DIR      │ Block store directory (created if missing)    │
/// │ --no-compress    │ Store every block body uncompressed           │
/// │ --sha2           │ Address blocks by SHA2-256 instead of BLAKE3  │
/// │ --chunk-size N   │ Split files larger than N bytes into chunks   │
/// └──────────────────┴───────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct PutArgs {
    /// Path to the JSON manifest describing the DAG.
    pub manifest: PathBuf,

    /// Block store directory.
    #[arg(short, long)]
    pub store: PathBuf,

    /// Disable zstd compression of block bodies.
    #[arg(long)]
    pub no_compress: bool,

    /// Address blocks by SHA2-256 instead of BLAKE3.
    #[arg(long)]
    pub sha2: bool,

    /// Largest file stored inline in a single block, in bytes.
    #[arg(long)]
    pub chunk_size: Option<usize>,
}

/// Arguments for `dagpath resolve`.
///
/// ```text
/// ┌──────────────────┬───────────────────────────────────────────────┐
/// │ Flag             │ Effect                                        │
/// ├──────────────────┼───────────────────────────────────────────────┤
/// │ --last           │ Stop at the last link; print link + remainder │
/// │ --required-reify │ Fail instead of falling back on reify errors  │
/// │ --timeout-ms N   │ Give up after N milliseconds                  │
/// │ --no-verify      │ Skip checking blocks against their addresses  │
/// │ --max-depth N    │ Reject paths longer than N segments           │
/// │ --json           │ Print the result as JSON                      │
/// └──────────────────┴───────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct ResolveArgs {
    /// Path to resolve: `/<root address>/<segment>/...`.
    pub path: String,

    /// Block store directory.
    #[arg(short, long)]
    pub store: PathBuf,

    /// Resolve only up to the last link on the path.
    #[arg(long)]
    pub last: bool,

    /// Treat reification failures as errors.
    #[arg(long)]
    pub required_reify: bool,

    /// Deadline for the whole resolution, in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Do not verify block digests.
    #[arg(long)]
    pub no_verify: bool,

    /// Longest accepted path, in segments.
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `dagpath inspect`.
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Address of the block to inspect.
    pub address: String,

    /// Block store directory.
    #[arg(short, long)]
    pub store: PathBuf,

    /// Show the node after file-system reification.
    #[arg(long)]
    pub reify: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Put(args) => cmd_put::run(&args),
        Commands::Resolve(args) => cmd_resolve::run(&args).await,
        Commands::Inspect(args) => cmd_inspect::run(&args).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
