//! auditlog - command-line client for the secure audit log.

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{canonicalize, log, root, search, verify};

#[derive(Parser)]
#[command(name = "auditlog")]
#[command(about = "Secure audit log client: log, search and verify tamper-evident records")]
struct Cli {
    /// Log debug output to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Service connection flags.
#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// Service base URL
    #[arg(long, env = "AUDIT_BASE_URL")]
    pub base_url: Option<String>,
    /// Bearer token
    #[arg(long, env = "AUDIT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show canonical bytes for input JSON
    Canonicalize {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Print the SHA-256 of the canonical bytes instead
        #[arg(long)]
        hash: bool,
    },
    /// Verify a membership proof
    VerifyMembership {
        /// Root hash (hex)
        #[arg(long)]
        root: String,
        /// Leaf hash (hex)
        #[arg(long)]
        leaf: String,
        /// Proof string, e.g. "l:<hex>,r:<hex>"
        #[arg(long)]
        proof: String,
        /// Exit with error code unless the proof verifies
        #[arg(long)]
        strict: bool,
    },
    /// Verify a consistency proof between two roots
    VerifyConsistency {
        /// Older root hash (hex)
        #[arg(long)]
        old_root: String,
        /// Newer root hash (hex)
        #[arg(long)]
        new_root: String,
        /// Proof item, repeatable, e.g. "x:<hex>,l:<hex>"
        #[arg(long = "proof", required = true)]
        proof: Vec<String>,
        /// Exit with error code unless the proof verifies
        #[arg(long)]
        strict: bool,
    },
    /// Check an envelope's hash and signature
    VerifyEnvelope {
        /// Envelope JSON file (or stdin if not provided)
        input: Option<String>,
        /// Hash the service reported for the envelope (hex)
        #[arg(long)]
        hash: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Exit with error code if any check fails
        #[arg(long)]
        strict: bool,
    },
    /// Log an event
    Log {
        #[command(flatten)]
        service: ServiceArgs,
        #[command(flatten)]
        event: log::EventArgs,
        /// Sign the event with this PKCS#8 PEM ed25519 key
        #[arg(long)]
        key: Option<String>,
        /// Tenant attached to the event
        #[arg(long)]
        tenant: Option<String>,
        /// Verify membership and consistency proofs
        #[arg(long)]
        verify: bool,
    },
    /// Search events
    Search {
        #[command(flatten)]
        service: ServiceArgs,
        /// Query string
        query: String,
        /// Events per page
        #[arg(long)]
        limit: Option<u32>,
        /// Maximum number of results
        #[arg(long)]
        max_results: Option<u32>,
        /// Fetch every page
        #[arg(long)]
        all: bool,
        /// Verify membership and consistency proofs
        #[arg(long)]
        verify: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a published root
    Root {
        #[command(flatten)]
        service: ServiceArgs,
        /// Tree size (default: latest)
        #[arg(long)]
        tree_size: Option<u64>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Canonicalize { input, hash } => canonicalize::run(input, hash),
        Commands::VerifyMembership {
            root,
            leaf,
            proof,
            strict,
        } => verify::membership(&root, &leaf, &proof, strict),
        Commands::VerifyConsistency {
            old_root,
            new_root,
            proof,
            strict,
        } => verify::consistency(&old_root, &new_root, &proof, strict),
        Commands::VerifyEnvelope {
            input,
            hash,
            json,
            strict,
        } => verify::envelope(input, hash, json, strict),
        Commands::Log {
            service,
            event,
            key,
            tenant,
            verify,
        } => log::run(service, event, key, tenant, verify).await,
        Commands::Search {
            service,
            query,
            limit,
            max_results,
            all,
            verify,
            json,
        } => search::run(service, query, limit, max_results, all, verify, json).await,
        Commands::Root { service, tree_size } => root::run(service, tree_size).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
