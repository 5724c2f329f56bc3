//! Client Registry
//!
//! Keeps one live client per endpoint identity (URI + account). Clients are
//! created on the first lookup miss and live until evicted; errors never
//! remove an entry.
//!
//! ## Lifecycle
//!
//! ```text
//! resolve(req, true)  ── miss ──► factory.connect() ──► insert ──► Arc<Client>
//!                     ── hit  ──► Arc<Client>
//! evict(req)          ──► remove ──► close()
//! shutdown()          ──► remove all ──► close() each, failures logged
//! ```
//!
//! The registry is an ordinary value owned by the host. Nothing is
//! registered globally; the host calls [`ClientRegistry::shutdown`] from its
//! own shutdown sequence.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{BridgeError, BridgeResult};
use crate::request::{effective_schema, OrmRequest};
use crate::store::{ClientFactory, ConnectParams, StoreClient};

/// Endpoint identity: the connection URI with the account appended as an
/// explicit `username` query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey(String);

impl EndpointKey {
    pub fn new(uri: &str, account: &str) -> Self {
        let separator = if uri.contains('?') { '&' } else { '?' };
        EndpointKey(format!("{uri}{separator}username={account}"))
    }

    pub fn for_request<R: OrmRequest + ?Sized>(request: &R) -> Self {
        Self::new(request.uri(), request.account())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pool of client handles keyed by [`EndpointKey`].
pub struct ClientRegistry<F: ClientFactory> {
    factory: F,
    clients: DashMap<EndpointKey, Arc<F::Client>>,
    default_schema: String,
    created: AtomicU64,
}

impl<F: ClientFactory> ClientRegistry<F> {
    /// Create an empty registry. `default_schema` is selected on new clients
    /// whose first request names no database.
    pub fn new(factory: F, default_schema: impl Into<String>) -> Self {
        ClientRegistry {
            factory,
            clients: DashMap::new(),
            default_schema: default_schema.into(),
            created: AtomicU64::new(0),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    /// Look up the client for the request's endpoint, creating it when
    /// `auto_create` is set. Without `auto_create` a miss returns `None`.
    pub fn resolve<R: OrmRequest + ?Sized>(
        &self,
        request: &R,
        auto_create: bool,
    ) -> BridgeResult<Option<Arc<F::Client>>> {
        if auto_create {
            self.obtain(request).map(Some)
        } else {
            Ok(self.get(&EndpointKey::for_request(request)))
        }
    }

    /// Return the client for the request's endpoint, creating it on a miss.
    ///
    /// Concurrent first calls for one endpoint construct a single client: the
    /// map slot stays locked while the factory runs.
    pub fn obtain<R: OrmRequest + ?Sized>(&self, request: &R) -> BridgeResult<Arc<F::Client>> {
        let key = EndpointKey::for_request(request);
        if let Some(client) = self.get(&key) {
            return Ok(client);
        }

        match self.clients.entry(key) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let database = effective_schema(request.schema(), &self.default_schema);
                let params = ConnectParams {
                    key: entry.key(),
                    uri: request.uri(),
                    account: request.account(),
                    password: request.password(),
                    database,
                };
                let client = Arc::new(self.factory.connect(&params)?);
                tracing::info!(endpoint = %entry.key(), database, "client_created");
                self.created.fetch_add(1, Ordering::Relaxed);
                entry.insert(Arc::clone(&client));
                Ok(client)
            }
        }
    }

    /// Lookup only.
    pub fn get(&self, key: &EndpointKey) -> Option<Arc<F::Client>> {
        self.clients.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove and close the request's client. Returns whether one was present.
    pub async fn evict<R: OrmRequest + ?Sized>(&self, request: &R) -> BridgeResult<bool> {
        self.evict_key(&EndpointKey::for_request(request)).await
    }

    pub async fn evict_key(&self, key: &EndpointKey) -> BridgeResult<bool> {
        let Some((key, client)) = self.clients.remove(key) else {
            return Ok(false);
        };
        tracing::info!(endpoint = %key, "client_evicted");
        client.close().await?;
        Ok(true)
    }

    /// Remove and close every client. A failing close does not stop the
    /// others; failures are logged and returned.
    pub async fn evict_all(&self) -> Vec<(EndpointKey, BridgeError)> {
        let keys: Vec<EndpointKey> = self.clients.iter().map(|e| e.key().clone()).collect();
        let drained: Vec<(EndpointKey, Arc<F::Client>)> =
            keys.iter().filter_map(|k| self.clients.remove(k)).collect();
        let total = drained.len();

        let outcomes = join_all(drained.into_iter().map(|(key, client)| async move {
            let result = client.close().await;
            (key, result)
        }))
        .await;

        let failures: Vec<(EndpointKey, BridgeError)> = outcomes
            .into_iter()
            .filter_map(|(key, result)| result.err().map(|e| (key, e)))
            .collect();
        for (key, e) in &failures {
            tracing::warn!(endpoint = %key, error = %e, "client_close_failed");
        }
        tracing::info!(closed = total - failures.len(), failed = failures.len(), "registry_cleared");
        failures
    }

    /// Teardown routine for the host's shutdown sequence.
    pub async fn shutdown(&self) -> Vec<(EndpointKey, BridgeError)> {
        self.evict_all().await
    }

    pub fn contains(&self, key: &EndpointKey) -> bool {
        self.clients.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Registered endpoints, sorted.
    pub fn keys(&self) -> Vec<EndpointKey> {
        let mut keys: Vec<EndpointKey> = self.clients.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Clients constructed over the registry's lifetime
    pub fn created_count(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }
}
