use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use defra_client::{ClientConfig, DefraClient, Document, Scheme};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "defra")]
#[command(about = "DefraDB node client", long_about = None)]
struct Cli {
    #[command(flatten)]
    node: NodeArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct NodeArgs {
    /// HTTP API prefix, without scheme
    #[arg(long, global = true, default_value = "localhost:9181/api/v0/")]
    api_url: String,

    /// Multiaddr of the node's RPC endpoint
    #[arg(long, global = true, default_value = "/ip4/127.0.0.1/tcp/9161")]
    rpc_addr: String,

    /// Use https:// for the HTTP API
    #[arg(long, global = true)]
    https: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    timeout_secs: u64,
}

impl NodeArgs {
    fn config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_api_url(self.api_url.clone())
            .with_tcp_multiaddr(self.rpc_addr.clone())
            .with_scheme(if self.https { Scheme::Https } else { Scheme::Http })
            .with_request_timeout(Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Schema operations
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
    /// Document operations
    Doc {
        #[command(subcommand)]
        command: DocCommands,
    },
    /// Execute a raw GraphQL request
    Query {
        /// GraphQL document
        gql: String,
    },
    /// Print the node's peer ID
    PeerId,
    /// Replicator management over RPC
    Replicator {
        #[command(subcommand)]
        command: ReplicatorCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Load a schema file (re-loading an existing type is not an error)
    Load {
        /// Schema definition file
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum DocCommands {
    /// Create a document
    Create {
        /// Schema type name
        type_name: String,
        /// Document as a JSON object
        document: String,
    },
    /// Update a document
    Update {
        /// Schema type name
        type_name: String,
        /// Document as a JSON object
        document: String,
    },
}

#[derive(Subcommand)]
enum ReplicatorCommands {
    /// Replicate collections to a peer
    Set {
        /// Peer multiaddr, e.g. /ip4/10.0.0.2/tcp/9171/p2p/<peer-id>
        addr: String,
        /// Collection names
        #[arg(required = true)]
        collections: Vec<String>,
    },
    /// Stop replicating to a peer
    Delete {
        /// Base-58 peer ID
        peer_id: String,
    },
    /// List replicators
    List,
}

fn parse_document(text: &str) -> Result<Document> {
    match serde_json::from_str::<Value>(text).context("Document is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("Document must be a JSON object, got {}", other),
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.node.config();
    debug!(api_url = %config.api_url, rpc_addr = %config.tcp_multiaddr, "Connecting to node");
    let client = DefraClient::new(config).context("Invalid client configuration")?;

    match cli.command {
        Commands::Schema { command } => match command {
            SchemaCommands::Load { path } => {
                let schema = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read schema file {:?}", path))?;
                let response = client.load_schema(&schema).await?;
                print_json(&response)?;
            }
        },
        Commands::Doc { command } => match command {
            DocCommands::Create {
                type_name,
                document,
            } => {
                let document = parse_document(&document)?;
                let response = client.create_doc(&type_name, &document).await?;
                print_json(&response)?;
            }
            DocCommands::Update {
                type_name,
                document,
            } => {
                let document = parse_document(&document)?;
                let response = client.update_doc(&type_name, &document).await?;
                print_json(&response)?;
            }
        },
        Commands::Query { gql } => {
            let response = client.request(&gql).await?;
            print_json(&response)?;
        }
        Commands::PeerId => {
            println!("{}", client.peer_id().await?);
        }
        Commands::Replicator { command } => match command {
            ReplicatorCommands::Set { addr, collections } => {
                let peer_id = client
                    .set_replicator(&collections, &addr)
                    .await
                    .context("Failed to set replicator")?;
                println!("{}", peer_id);
            }
            ReplicatorCommands::Delete { peer_id } => {
                let removed = client
                    .delete_replicator(&peer_id)
                    .await
                    .context("Failed to delete replicator")?;
                println!("{}", removed);
            }
            ReplicatorCommands::List => {
                let replicators = client.get_all_replicators().await?;
                print_json(&serde_json::to_value(&replicators)?)?;
            }
        },
    }

    Ok(())
}
