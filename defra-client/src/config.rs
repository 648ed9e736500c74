/// Client configuration for node endpoints and transport policy
use crate::address::{parse_multiaddr, socket_parts};
use crate::error::{ClientError, Result};
use crate::query::PayloadStyle;
use multiaddr::Multiaddr;
use reqwest::Url;
use std::fmt;
use std::time::Duration;

pub const ROUTE_GRAPHQL: &str = "graphql";
pub const ROUTE_SCHEMA_LOAD: &str = "schema/load";
pub const ROUTE_PEERID: &str = "peerid";

/// URL scheme used for the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http://",
            Scheme::Https => "https://",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a [`DefraClient`](crate::DefraClient)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `host[:port]/path` prefix of the HTTP API, without scheme
    pub api_url: String,

    /// Multiaddr of the node's RPC endpoint
    pub tcp_multiaddr: String,

    pub scheme: Scheme,

    /// Deadline for every HTTP request and RPC call
    pub request_timeout: Duration,

    /// Deadline for establishing HTTP and RPC connections
    pub connect_timeout: Duration,

    /// A cached RPC channel unused for longer than this is re-dialled
    pub rpc_idle_timeout: Duration,

    /// HTTP/2 keep-alive ping interval on RPC channels
    pub rpc_keepalive: Duration,

    /// How document mutations carry their data
    pub payload_style: PayloadStyle,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "localhost:9181/api/v0/".to_string(),
            tcp_multiaddr: "/ip4/127.0.0.1/tcp/9161".to_string(),
            scheme: Scheme::Http,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            rpc_idle_timeout: Duration::from_secs(60),
            rpc_keepalive: Duration::from_secs(30),
            payload_style: PayloadStyle::Variables,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_tcp_multiaddr(mut self, addr: impl Into<String>) -> Self {
        self.tcp_multiaddr = addr.into();
        self
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_rpc_idle_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_idle_timeout = timeout;
        self
    }

    pub fn with_rpc_keepalive(mut self, interval: Duration) -> Self {
        self.rpc_keepalive = interval;
        self
    }

    pub fn with_payload_style(mut self, style: PayloadStyle) -> Self {
        self.payload_style = style;
        self
    }

    /// Full URL of an HTTP API route: `<scheme><api_url><route>`.
    pub fn route_url(&self, route: &str) -> Result<Url> {
        let mut base = format!("{}{}", self.scheme, self.api_url);
        if !base.ends_with('/') {
            base.push('/');
        }
        let joined = format!("{}{}", base, route);
        Url::parse(&joined)
            .map_err(|e| ClientError::InvalidConfig(format!("invalid API URL {:?}: {}", joined, e)))
    }

    /// Parsed RPC multiaddr.
    pub fn rpc_multiaddr(&self) -> Result<Multiaddr> {
        parse_multiaddr(&self.tcp_multiaddr)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.api_url.is_empty() {
            return Err(ClientError::InvalidConfig("api_url must not be empty".to_string()));
        }

        if self.api_url.contains("://") {
            return Err(ClientError::InvalidConfig(format!(
                "api_url must not include a scheme: {:?}",
                self.api_url
            )));
        }

        for route in [ROUTE_GRAPHQL, ROUTE_SCHEMA_LOAD, ROUTE_PEERID] {
            self.route_url(route)?;
        }

        let addr = self.rpc_multiaddr()?;
        socket_parts(&addr)?;

        if self.request_timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "connect_timeout must be greater than 0".to_string(),
            ));
        }

        if self.rpc_idle_timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "rpc_idle_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
