/// Pooled gRPC channel for the replication service
///
/// Callers borrow the channel through [`RpcPool::acquire`], which hands out an
/// [`RpcLease`]. Dropping the lease returns the channel to the pool, or throws
/// it away if a call on it failed at the transport level. A channel left idle
/// longer than the configured idle timeout is re-dialled on next acquisition,
/// since the node is not assumed to keep idle connections open.
use crate::address::to_host_port;
use crate::config::ClientConfig;
use crate::error::{is_transport_code, ClientError, Result};
use defra_proto::service_client::ServiceClient;
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};
use tonic::transport::{Channel, Endpoint};
use tonic::Status;
use tracing::{debug, warn};

struct CachedChannel {
    channel: Channel,
    last_used: Instant,
    generation: u64,
}

/// The cached channel, plus the counter that tags each newly dialled one so a
/// lease only ever touches the channel it was handed.
#[derive(Default)]
struct Slot {
    cached: Option<CachedChannel>,
    next_generation: u64,
}

pub struct RpcPool {
    endpoint: Endpoint,
    target: String,
    idle_timeout: Duration,
    slot: Mutex<Slot>,
}

impl RpcPool {
    /// Create a pool for the configured RPC address. Does not connect.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let target = to_host_port(&config.rpc_multiaddr()?)?;

        let endpoint = Endpoint::from_shared(format!("http://{}", target))
            .map_err(|e| ClientError::AddressFormat(format!("{}: {}", target, e)))?
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .tcp_nodelay(true)
            .tcp_keepalive(Some(config.rpc_keepalive))
            .http2_keep_alive_interval(config.rpc_keepalive)
            .keep_alive_timeout(config.connect_timeout)
            .keep_alive_while_idle(false);

        Ok(Self {
            endpoint,
            target,
            idle_timeout: config.rpc_idle_timeout,
            slot: Mutex::new(Slot::default()),
        })
    }

    /// `host:port` this pool dials.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns true if a channel is cached and not yet past its idle timeout.
    pub fn has_live_channel(&self) -> bool {
        self.slot
            .lock()
            .cached
            .as_ref()
            .is_some_and(|cached| cached.last_used.elapsed() <= self.idle_timeout)
    }

    /// Borrow a client, dialling if no live channel is cached.
    pub async fn acquire(&self) -> Result<RpcLease<'_>> {
        let cached = {
            let mut slot = self.slot.lock();
            if slot
                .cached
                .as_ref()
                .is_some_and(|cached| cached.last_used.elapsed() > self.idle_timeout)
            {
                debug!(target_addr = %self.target, "Discarding idle RPC channel");
                slot.cached = None;
            }
            slot.cached
                .as_ref()
                .map(|cached| (cached.channel.clone(), cached.generation))
        };

        let (channel, generation) = match cached {
            Some(cached) => cached,
            None => {
                let channel = self.dial().await?;
                let generation = self.install(channel.clone());
                (channel, generation)
            }
        };

        Ok(RpcLease {
            pool: self,
            generation,
            client: ServiceClient::new(channel),
            healthy: true,
        })
    }

    async fn dial(&self) -> Result<Channel> {
        debug!(target_addr = %self.target, "Dialling RPC endpoint");

        self.endpoint.connect().await.map_err(|e| ClientError::Replication {
            code: tonic::Code::Unavailable,
            message: format!("failed to connect to {}: {}", self.target, e),
        })
    }

    /// Cache a freshly dialled channel, replacing any other, and return its
    /// generation.
    fn install(&self, channel: Channel) -> u64 {
        let mut slot = self.slot.lock();
        let generation = slot.next_generation;
        slot.next_generation += 1;
        slot.cached = Some(CachedChannel {
            channel,
            last_used: Instant::now(),
            generation,
        });
        generation
    }

    /// Mark the channel of `generation` as just used. A channel that has
    /// since been discarded or replaced stays out of the cache.
    fn check_in(&self, generation: u64) {
        if let Some(cached) = self.slot.lock().cached.as_mut() {
            if cached.generation == generation {
                cached.last_used = Instant::now();
            }
        }
    }

    /// Drop the cached channel if it is still the one of `generation`.
    fn discard(&self, generation: u64) {
        let mut slot = self.slot.lock();
        if slot
            .cached
            .as_ref()
            .is_some_and(|cached| cached.generation == generation)
        {
            slot.cached = None;
        }
    }
}

/// A borrowed replication client. Derefs to the generated gRPC client.
pub struct RpcLease<'a> {
    pool: &'a RpcPool,
    generation: u64,
    client: ServiceClient<Channel>,
    healthy: bool,
}

impl RpcLease<'_> {
    /// Convert a failed call's status into an error, marking the channel
    /// broken if the failure was at the transport level.
    pub fn fail(&mut self, status: Status) -> ClientError {
        if is_transport_code(status.code()) {
            self.healthy = false;
        }
        ClientError::from(status)
    }
}

impl Deref for RpcLease<'_> {
    type Target = ServiceClient<Channel>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl DerefMut for RpcLease<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.client
    }
}

impl Drop for RpcLease<'_> {
    fn drop(&mut self) {
        if self.healthy {
            self.pool.check_in(self.generation);
        } else {
            warn!(target_addr = %self.pool.target, "Dropping broken RPC channel");
            self.pool.discard(self.generation);
        }
    }
}
