//! Quorus node binary.
//!
//! Wires a chain instance to the JSON-RPC server and the peer listener,
//! with an optional block-producing miner loop.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod node;

use node::{Node, NodeConfig};

/// Quorus blockchain node and tools
#[derive(Parser, Debug)]
#[command(name = "quorus")]
#[command(version)]
#[command(about = "Quorus blockchain node - pluggable-consensus chain kernel")]
struct Cli {
    /// Enable verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the node
    Start {
        /// JSON-RPC HTTP listen address
        #[arg(long, default_value = "127.0.0.1:8545")]
        rpc_addr: String,

        /// Peer transport listen address
        #[arg(long, default_value = "127.0.0.1:7000")]
        p2p_addr: String,

        /// Peer addresses to announce blocks to (comma-separated)
        #[arg(long)]
        peers: Option<String>,

        /// Mine pending transactions to this address on an interval
        #[arg(long)]
        mine: Option<String>,

        /// Seconds between mining attempts
        #[arg(long, default_value_t = 10)]
        mine_interval: u64,
    },
    /// Wallet utilities
    Wallet {
        #[command(subcommand)]
        command: WalletCommands,
    },
}

#[derive(Subcommand, Debug)]
enum WalletCommands {
    /// Generate a key pair and print its address
    New,
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Start {
            rpc_addr,
            p2p_addr,
            peers,
            mine,
            mine_interval,
        } => {
            let config = NodeConfig {
                rpc_addr,
                p2p_addr,
                peers: peers
                    .map(|list| list.split(',').map(|peer| peer.trim().to_string()).collect())
                    .unwrap_or_default(),
                miner: mine,
                mine_interval_secs: mine_interval,
            };
            Node::new(config).run().await
        }
        Commands::Wallet {
            command: WalletCommands::New,
        } => {
            let wallet = quorus_crypto::Wallet::generate();
            println!("address:     {}", wallet.address());
            println!("public key:  {}", wallet.public_key().to_hex());
            println!("private key: {}", wallet.private_key().to_hex());
            Ok(())
        }
    }
}
