//! Request Dispatcher
//!
//! [`Bridge`] is the entry point for ORM requests. Read-style methods run
//! through the query executor and come back as a row envelope; every other
//! method runs through the write executor and comes back as a write outcome.
//! Uses `AtomicU64` (lock-free counters) for request statistics.

mod query;
mod write;

pub use write::affected_count;

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::envelope::Envelope;
use crate::error::{BridgeError, BridgeResult};
use crate::registry::ClientRegistry;
use crate::request::{effective_schema, Operation, OrmRequest};
use crate::store::{ClientFactory, HttpClientFactory};

/// Executes ORM requests against pooled store clients.
pub struct Bridge<F: ClientFactory> {
    registry: Arc<ClientRegistry<F>>,
    start_time: Instant,
    query_count: AtomicU64,
    write_count: AtomicU64,
}

impl Bridge<HttpClientFactory> {
    /// Bridge over InfluxDB HTTP clients built from `config`.
    pub fn from_config(config: &Config) -> BridgeResult<Self> {
        let factory = HttpClientFactory::new(config.client.clone())?;
        Ok(Self::new(Arc::new(ClientRegistry::new(
            factory,
            config.schema.default_schema.clone(),
        ))))
    }
}

impl<F: ClientFactory> Bridge<F> {
    pub fn new(registry: Arc<ClientRegistry<F>>) -> Self {
        Bridge {
            registry,
            start_time: Instant::now(),
            query_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<ClientRegistry<F>> {
        &self.registry
    }

    /// Execute a request. `rendered` overrides the request's own text when
    /// present and non-blank; `lenient_typing` is passed through to the
    /// query path untouched.
    pub async fn execute<R: OrmRequest + ?Sized>(
        &self,
        request: &R,
        rendered: Option<&str>,
        lenient_typing: bool,
    ) -> BridgeResult<Envelope> {
        match request.method().operation() {
            Operation::Read => self.exec_query(request, rendered, lenient_typing).await,
            Operation::Create | Operation::Update | Operation::Delete => {
                let outcome = self.execute_update(None, request, rendered).await?;
                Ok(outcome.into_envelope())
            }
        }
    }

    /// Close every pooled client. See [`ClientRegistry::shutdown`].
    pub async fn shutdown(&self) -> Vec<(crate::registry::EndpointKey, BridgeError)> {
        self.registry.shutdown().await
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn total_queries(&self) -> u64 {
        self.query_count.load(Ordering::Relaxed)
    }

    pub fn total_writes(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    fn client_for<R: OrmRequest + ?Sized>(
        &self,
        client: Option<Arc<F::Client>>,
        request: &R,
    ) -> BridgeResult<Arc<F::Client>> {
        match client {
            Some(client) => Ok(client),
            None => self.registry.obtain(request),
        }
    }

    fn schema_for<'a, R: OrmRequest + ?Sized>(&'a self, request: &'a R) -> &'a str {
        effective_schema(request.schema(), self.registry.default_schema())
    }
}

/// Text to submit: the caller's rendering when non-blank, else the request's own.
fn text_for<'a, R: OrmRequest + ?Sized>(
    request: &R,
    rendered: Option<&'a str>,
) -> BridgeResult<Cow<'a, str>> {
    match rendered {
        Some(text) if !text.trim().is_empty() => Ok(Cow::Borrowed(text)),
        _ => request.render_text().map(Cow::Owned),
    }
}
