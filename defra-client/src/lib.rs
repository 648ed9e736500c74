/// DefraDB Client Library
///
/// This crate talks to a DefraDB node over its GraphQL/HTTP API (schemas,
/// documents, raw queries) and its gRPC endpoint (replicator management).

pub mod address;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod query;
pub mod rpc;
pub mod schema;
pub mod types;

// Re-export key types
pub use client::DefraClient;
pub use config::{ClientConfig, Scheme};
pub use error::{ClientError, Result};
pub use multiaddr::Multiaddr;
pub use query::{
    build_create, build_create_with_variables, build_update, build_update_with_variables,
    Document, GraphQLRequest, MutationKind, PayloadStyle,
};
pub use types::{PeerId, Replicator};
