//! Store Clients
//!
//! A client handle is a long-lived connection to one endpoint of the
//! time-series store. The executors only see the [`StoreClient`] trait;
//! [`InfluxHttpClient`] speaks the InfluxDB 1.x HTTP API.
//!
//! ```text
//! ClientRegistry ──connect──► ClientFactory ──► StoreClient
//!                                               ├── write(text)   POST /write
//!                                               ├── query(text)   POST /query
//!                                               └── BatchWriter   background flush task
//! ```

mod batch;
mod http;
pub mod wire;

pub use batch::{BatchWriter, LineSink};
pub use http::{HttpClientFactory, InfluxHttpClient};
pub use wire::{QueryResult, Series, StatementResult};

use std::future::Future;

use crate::error::BridgeResult;
use crate::registry::EndpointKey;

/// Everything a factory needs to open a client for one endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ConnectParams<'a> {
    pub key: &'a EndpointKey,
    pub uri: &'a str,
    pub account: &'a str,
    pub password: &'a str,
    /// Database selected on the new client
    pub database: &'a str,
}

/// A live connection to the store.
///
/// The database selection is shared mutable state on the handle. Callers
/// that select a database and then submit must hold [`selection_lock`]
/// across both steps.
///
/// [`selection_lock`]: StoreClient::selection_lock
pub trait StoreClient: Send + Sync + 'static {
    fn endpoint(&self) -> &EndpointKey;

    /// Currently selected database
    fn database(&self) -> String;

    fn set_database(&self, database: &str);

    fn selection_lock(&self) -> &tokio::sync::Mutex<()>;

    /// Submit line-protocol text as one unit to the selected database.
    fn write(&self, text: &str) -> impl Future<Output = BridgeResult<()>> + Send;

    /// Run query text against the selected database.
    fn query(&self, text: &str) -> impl Future<Output = BridgeResult<QueryResult>> + Send;

    /// Stop background work and release the connection. Idempotent.
    fn close(&self) -> impl Future<Output = BridgeResult<()>> + Send;
}

/// Opens client handles for the registry.
pub trait ClientFactory: Send + Sync + 'static {
    type Client: StoreClient;

    /// Construct a client. Runs while the registry holds the endpoint's map
    /// shard locked, which stalls lookups of unrelated endpoints in that shard:
    /// it must not block on the network or load expensive shared state such as
    /// TLS roots. Build that once in the factory and clone it per handle.
    fn connect(&self, params: &ConnectParams<'_>) -> BridgeResult<Self::Client>;
}
