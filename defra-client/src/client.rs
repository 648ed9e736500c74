/// DefraDB client implementation
use crate::address::{decode_identifier, encode_identifier, parse_multiaddr};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::HttpTransport;
use crate::query::{build_mutation, Document, GraphQLRequest, MutationKind};
use crate::rpc::RpcPool;
use crate::schema::check_schema_response;
use crate::types::Replicator;
use defra_proto as proto;
use serde_json::Value;
use tracing::info;

/// Client for a DefraDB node
///
/// Schema and document operations go over the GraphQL/HTTP API; replicator
/// management goes over the node's gRPC endpoint. The configuration is
/// validated once at construction and never changes afterwards.
pub struct DefraClient {
    config: ClientConfig,
    http: HttpTransport,
    rpc: RpcPool,
}

impl DefraClient {
    /// Create a client from a configuration
    ///
    /// Fails if the configuration is invalid. No connection is opened here;
    /// the RPC channel is dialled on first use.
    ///
    /// # Example
    /// ```no_run
    /// # use defra_client::{ClientConfig, DefraClient};
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ClientConfig::new()
    ///     .with_api_url("localhost:9181/api/v0/")
    ///     .with_tcp_multiaddr("/ip4/127.0.0.1/tcp/9161");
    /// let client = DefraClient::new(config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let http = HttpTransport::new(&config)?;
        let rpc = RpcPool::new(&config)?;

        Ok(Self { config, http, rpc })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute a raw GraphQL document and return its `data` member
    ///
    /// # Example
    /// ```no_run
    /// # use defra_client::{ClientConfig, DefraClient};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = DefraClient::new(ClientConfig::default())?;
    /// let data = client.request("query { Parameters { _key a b c } }").await?;
    /// println!("{}", data);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn request(&self, query: &str) -> Result<Value> {
        self.http.execute(&GraphQLRequest::new(query)).await
    }

    /// Execute a GraphQL document with variables bound separately
    pub async fn request_with_variables(&self, query: &str, variables: Value) -> Result<Value> {
        self.http
            .execute(&GraphQLRequest::with_variables(query, variables))
            .await
    }

    /// Execute a prebuilt request
    pub async fn execute(&self, request: &GraphQLRequest) -> Result<Value> {
        self.http.execute(request).await
    }

    /// Load a schema, treating "already exists" errors as success
    ///
    /// Safe to call repeatedly with the same schema.
    ///
    /// # Example
    /// ```no_run
    /// # use defra_client::{ClientConfig, DefraClient};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = DefraClient::new(ClientConfig::default())?;
    /// client.load_schema("type Parameters { a: String b: String }").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load_schema(&self, schema: &str) -> Result<Value> {
        let body = self.http.post_schema(schema).await?;
        check_schema_response(body)
    }

    /// Create a document of the given type
    ///
    /// Returns the mutation's `data`, which carries the assigned `_key`.
    pub async fn create_doc(&self, type_name: &str, document: &Document) -> Result<Value> {
        let request = build_mutation(
            MutationKind::Create,
            type_name,
            document,
            self.config.payload_style,
        )?;
        self.http.execute(&request).await
    }

    /// Update a document of the given type
    pub async fn update_doc(&self, type_name: &str, document: &Document) -> Result<Value> {
        let request = build_mutation(
            MutationKind::Update,
            type_name,
            document,
            self.config.payload_style,
        )?;
        self.http.execute(&request).await
    }

    /// The node's own peer ID, base-58 encoded
    pub async fn peer_id(&self) -> Result<String> {
        self.http.peer_id().await
    }

    /// Replicate `collections` to the peer at `addr`
    ///
    /// # Arguments
    /// * `collections` - Collection (schema type) names to replicate
    /// * `addr` - Multiaddr of the target peer, e.g. `/ip4/10.0.0.2/tcp/9171/p2p/<id>`
    ///
    /// # Returns
    /// The base-58 peer ID the node registered the replicator under
    pub async fn set_replicator(&self, collections: &[String], addr: &str) -> Result<String> {
        let addr = parse_multiaddr(addr)?;
        let request = proto::SetReplicatorRequest {
            collections: collections.to_vec(),
            addr: addr.to_vec(),
        };

        let mut lease = self.rpc.acquire().await?;
        let reply = lease
            .set_replicator(request)
            .await
            .map_err(|status| lease.fail(status))?
            .into_inner();

        let peer_id = encode_identifier(&reply.peer_id);
        info!(%peer_id, %addr, ?collections, "Replicator set");
        Ok(peer_id)
    }

    /// Stop replicating to a peer
    ///
    /// # Returns
    /// The base-58 peer ID the node confirmed as removed
    pub async fn delete_replicator(&self, peer_id: &str) -> Result<String> {
        let request = proto::DeleteReplicatorRequest {
            peer_id: decode_identifier(peer_id)?,
        };

        let mut lease = self.rpc.acquire().await?;
        let reply = lease
            .delete_replicator(request)
            .await
            .map_err(|status| lease.fail(status))?
            .into_inner();

        let removed = encode_identifier(&reply.peer_id);
        info!(peer_id = %removed, "Replicator deleted");
        Ok(removed)
    }

    /// List every replicator the node knows about
    pub async fn get_all_replicators(&self) -> Result<Vec<Replicator>> {
        let mut lease = self.rpc.acquire().await?;
        let reply = lease
            .get_all_replicators(proto::GetAllReplicatorRequest {})
            .await
            .map_err(|status| lease.fail(status))?
            .into_inner();

        reply
            .replicators
            .into_iter()
            .map(Replicator::try_from)
            .collect()
    }

    /// The RPC channel pool, for inspecting connection state
    pub fn rpc_pool(&self) -> &RpcPool {
        &self.rpc
    }
}
