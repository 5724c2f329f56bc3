//! InfluxDB 1.x HTTP client handle.

use parking_lot::RwLock;
use reqwest::{RequestBuilder, Url};
use serde::Deserialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::batch::{BatchWriter, LineSink};
use super::wire::QueryResult;
use super::{ClientFactory, ConnectParams, StoreClient};
use crate::config::ClientConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::registry::EndpointKey;

const VERSION_HEADER: &str = "X-Influxdb-Version";

/// Error body returned by the store on rejected requests
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

fn store_error(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.error)
        .filter(|e| !e.trim().is_empty())
}

/// Shared by the handle and its batch flusher.
struct HttpTransport {
    http: reqwest::Client,
    base: Url,
    account: String,
    password: String,
}

impl HttpTransport {
    /// `path` appended to the base path; query parameters of the base URI are kept.
    fn endpoint_url(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let joined = format!("{}/{path}", self.base.path().trim_end_matches('/'));
        url.set_path(&joined);
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.account.is_empty() {
            request
        } else {
            request.basic_auth(&self.account, Some(&self.password))
        }
    }

    async fn write(&self, database: &str, body: String) -> BridgeResult<()> {
        let mut url = self.endpoint_url("write");
        url.query_pairs_mut().append_pair("db", database);

        let response = self.authorize(self.http.post(url)).body(body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(BridgeError::Write {
            status: status.as_u16(),
            message: store_error(&text).unwrap_or(text),
        })
    }

    async fn query(&self, database: &str, text: &str) -> BridgeResult<QueryResult> {
        let mut url = self.endpoint_url("query");
        url.query_pairs_mut().append_pair("db", database);

        // Query text travels in the form body; long statements overflow URL limits
        let response = self
            .authorize(self.http.post(url))
            .form(&[("q", text)])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<QueryResult>(&body) {
            Ok(result) if status.is_success() || result.error_message().is_some() => Ok(result),
            Ok(_) => Err(BridgeError::Status {
                status: status.as_u16(),
                body,
            }),
            Err(e) if status.is_success() => Err(BridgeError::Decode(e)),
            Err(_) => Err(BridgeError::Status {
                status: status.as_u16(),
                body,
            }),
        }
    }

    async fn ping(&self) -> BridgeResult<Option<String>> {
        let response = self
            .authorize(self.http.get(self.endpoint_url("ping")))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response
            .headers()
            .get(VERSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }
}

impl LineSink for HttpTransport {
    fn write_lines(&self, database: &str, body: String) -> impl Future<Output = BridgeResult<()>> + Send {
        self.write(database, body)
    }
}

/// Client handle bound to one endpoint.
///
/// Construction does no network I/O; the first write or query opens the
/// connection. Dropping the handle without [`StoreClient::close`] stops the
/// flusher but discards nothing already queued in the channel.
pub struct InfluxHttpClient {
    endpoint: EndpointKey,
    transport: Arc<HttpTransport>,
    database: RwLock<String>,
    selection: tokio::sync::Mutex<()>,
    batch: BatchWriter,
    closed: AtomicBool,
}

/// Build the HTTP client shared by every handle of one factory.
/// Loads TLS roots, so it runs once rather than per endpoint.
pub(crate) fn build_http(config: &ClientConfig) -> BridgeResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }
    if let Some(timeout) = config.connect_timeout() {
        builder = builder.connect_timeout(timeout);
    }
    Ok(builder.build()?)
}

impl InfluxHttpClient {
    /// Build a standalone client for `params` with its own HTTP client.
    /// Must run inside a tokio runtime, which hosts the batch flusher.
    pub fn connect(params: &ConnectParams<'_>, config: &ClientConfig) -> BridgeResult<Self> {
        let http = build_http(config).map_err(|e| BridgeError::connection(params.uri, e))?;
        Self::connect_with(params, http, config)
    }

    /// Build a client for `params` on an existing HTTP client. Performs no
    /// I/O beyond URI validation and spawning the flusher.
    pub fn connect_with(
        params: &ConnectParams<'_>,
        http: reqwest::Client,
        config: &ClientConfig,
    ) -> BridgeResult<Self> {
        let base = Url::parse(params.uri).map_err(|e| BridgeError::connection(params.uri, e))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(BridgeError::connection(
                params.uri,
                format!("unsupported scheme '{}'", base.scheme()),
            ));
        }
        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(BridgeError::connection(params.uri, "URI has no host"));
        }

        let transport = Arc::new(HttpTransport {
            http,
            base,
            account: params.account.to_string(),
            password: params.password.to_string(),
        });

        let batch = BatchWriter::spawn(Arc::clone(&transport), config, params.key.as_str())
            .map_err(|e| BridgeError::connection(params.uri, e))?;

        Ok(InfluxHttpClient {
            endpoint: params.key.clone(),
            transport,
            database: RwLock::new(params.database.to_string()),
            selection: tokio::sync::Mutex::new(()),
            batch,
            closed: AtomicBool::new(false),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> BridgeResult<()> {
        if self.is_closed() {
            Err(BridgeError::ClientClosed {
                endpoint: self.endpoint.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Hand one line-protocol record to the background flusher for the
    /// selected database. Flush failures are logged, not returned.
    pub async fn enqueue(&self, line: impl Into<String>) -> BridgeResult<()> {
        self.ensure_open()?;
        let database = self.database();
        self.batch.enqueue(&database, line).await
    }

    /// Check the store is reachable. Returns the server version if reported.
    pub async fn ping(&self) -> BridgeResult<Option<String>> {
        self.ensure_open()?;
        self.transport.ping().await
    }
}

impl StoreClient for InfluxHttpClient {
    fn endpoint(&self) -> &EndpointKey {
        &self.endpoint
    }

    fn database(&self) -> String {
        self.database.read().clone()
    }

    fn set_database(&self, database: &str) {
        let mut current = self.database.write();
        if *current != database {
            *current = database.to_string();
        }
    }

    fn selection_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.selection
    }

    async fn write(&self, text: &str) -> BridgeResult<()> {
        self.ensure_open()?;
        let database = self.database();
        self.transport.write(&database, text.to_string()).await
    }

    async fn query(&self, text: &str) -> BridgeResult<QueryResult> {
        self.ensure_open()?;
        let database = self.database();
        self.transport.query(&database, text).await
    }

    async fn close(&self) -> BridgeResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.batch
            .close()
            .await
            .map_err(|e| BridgeError::Shutdown {
                endpoint: self.endpoint.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Opens [`InfluxHttpClient`] handles with a shared [`ClientConfig`].
///
/// Every handle clones one pooled `reqwest::Client`, so `connect` stays cheap
/// while the registry holds the endpoint's slot.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    config: ClientConfig,
    http: reqwest::Client,
}

impl HttpClientFactory {
    pub fn new(config: ClientConfig) -> BridgeResult<Self> {
        let http = build_http(&config)?;
        Ok(HttpClientFactory { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl ClientFactory for HttpClientFactory {
    type Client = InfluxHttpClient;

    fn connect(&self, params: &ConnectParams<'_>) -> BridgeResult<InfluxHttpClient> {
        InfluxHttpClient::connect_with(params, self.http.clone(), &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params<'a>(key: &'a EndpointKey, uri: &'a str) -> ConnectParams<'a> {
        ConnectParams {
            key,
            uri,
            account: "root",
            password: "secret",
            database: "metrics",
        }
    }

    #[test]
    fn test_store_error_extraction() {
        assert_eq!(
            store_error(r#"{"error":"unable to parse 'cpu': missing fields"}"#).as_deref(),
            Some("unable to parse 'cpu': missing fields")
        );
        assert_eq!(store_error("plain text"), None);
        assert_eq!(store_error(r#"{"error":""}"#), None);
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_uri() {
        let key = EndpointKey::new("not a uri", "root");
        let err = InfluxHttpClient::connect(&params(&key, "not a uri"), &ClientConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, BridgeError::Connection { .. }));

        let key = EndpointKey::new("ftp://db.local", "root");
        let err = InfluxHttpClient::connect(&params(&key, "ftp://db.local"), &ClientConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("unsupported scheme 'ftp'"));
    }

    #[test]
    fn test_connect_outside_runtime_is_connection_error() {
        let key = EndpointKey::new("http://localhost:8086", "root");
        let err = InfluxHttpClient::connect(
            &params(&key, "http://localhost:8086"),
            &ClientConfig::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, BridgeError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_endpoint_url_keeps_base_path_and_query() {
        let uri = "http://localhost:8086/influx/?precision=ms";
        let key = EndpointKey::new(uri, "root");
        let client = InfluxHttpClient::connect(&params(&key, uri), &ClientConfig::default()).unwrap();

        let url = client.transport.endpoint_url("query");
        assert_eq!(url.path(), "/influx/query");
        assert_eq!(url.query(), Some("precision=ms"));
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_factory_handles_share_one_http_client() {
        // Built outside the registry so connect does no TLS setup
        let factory = HttpClientFactory::new(ClientConfig::default()).unwrap();
        let uri = "http://localhost:8086";
        let alice = EndpointKey::new(uri, "alice");
        let bob = EndpointKey::new(uri, "bob");

        let a = factory.connect(&params(&alice, uri)).unwrap();
        let b = factory.connect(&params(&bob, uri)).unwrap();

        assert_eq!(a.endpoint(), &alice);
        assert_eq!(b.endpoint(), &bob);
        a.close().await.unwrap();
        b.close().await.unwrap();
    }

    #[test]
    fn test_factory_builds_outside_runtime() {
        let factory = HttpClientFactory::new(ClientConfig {
            request_timeout_ms: 0,
            ..ClientConfig::default()
        })
        .unwrap();
        assert_eq!(factory.config().request_timeout(), None);
    }

    #[tokio::test]
    async fn test_closed_client_rejects_work() {
        let uri = "http://localhost:8086";
        let key = EndpointKey::new(uri, "root");
        let client = InfluxHttpClient::connect(&params(&key, uri), &ClientConfig::default()).unwrap();
        assert_eq!(client.database(), "metrics");

        client.close().await.unwrap();
        client.close().await.unwrap();
        assert!(client.is_closed());
        assert!(matches!(
            client.write("cpu value=1").await,
            Err(BridgeError::ClientClosed { .. })
        ));
        assert!(matches!(
            client.query("SELECT 1").await,
            Err(BridgeError::ClientClosed { .. })
        ));
    }
}
