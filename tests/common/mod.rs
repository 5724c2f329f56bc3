//! Scriptable in-memory store client shared by the integration tests.

#![allow(dead_code)]

use influx_bridge::registry::EndpointKey;
use influx_bridge::store::{ClientFactory, ConnectParams, QueryResult, StoreClient};
use influx_bridge::{BridgeError, BridgeResult, ClientRegistry, RequestConfig, RequestMethod};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const URI: &str = "http://influx.test:8086";

pub fn request(method: RequestMethod) -> RequestConfig {
    RequestConfig::new(URI, "root", method)
        .with_password("secret")
        .with_schema("metrics")
}

pub struct FakeClient {
    endpoint: EndpointKey,
    database: RwLock<String>,
    selection: tokio::sync::Mutex<()>,
    response: Mutex<QueryResult>,
    write_error: Mutex<Option<BridgeError>>,
    fail_close: bool,
    /// Awaited inside write/query before the selected database is read
    submit_delay: Option<Duration>,
    closed: AtomicBool,
    pub close_calls: AtomicUsize,
    /// (database, text) of every write
    pub writes: Mutex<Vec<(String, String)>>,
    /// (database, text) of every query
    pub queries: Mutex<Vec<(String, String)>>,
}

impl FakeClient {
    pub fn new(endpoint: EndpointKey, database: &str) -> Self {
        FakeClient {
            endpoint,
            database: RwLock::new(database.to_string()),
            selection: tokio::sync::Mutex::new(()),
            response: Mutex::new(QueryResult::default()),
            write_error: Mutex::new(None),
            fail_close: false,
            submit_delay: None,
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn respond_with(&self, result: QueryResult) {
        *self.response.lock() = result;
    }

    pub fn respond_with_json(&self, body: serde_json::Value) {
        self.respond_with(serde_json::from_value(body).unwrap());
    }

    pub fn fail_next_write(&self, error: BridgeError) {
        *self.write_error.lock() = Some(error);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl StoreClient for FakeClient {
    fn endpoint(&self) -> &EndpointKey {
        &self.endpoint
    }

    fn database(&self) -> String {
        self.database.read().clone()
    }

    fn set_database(&self, database: &str) {
        *self.database.write() = database.to_string();
    }

    fn selection_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.selection
    }

    fn write(&self, text: &str) -> impl Future<Output = BridgeResult<()>> + Send {
        let text = text.to_string();
        async move {
            if let Some(delay) = self.submit_delay {
                tokio::time::sleep(delay).await;
            }
            let failure = self.write_error.lock().take();
            match failure {
                Some(e) => Err(e),
                None => {
                    self.writes.lock().push((self.database(), text));
                    Ok(())
                }
            }
        }
    }

    fn query(&self, text: &str) -> impl Future<Output = BridgeResult<QueryResult>> + Send {
        let text = text.to_string();
        async move {
            if let Some(delay) = self.submit_delay {
                tokio::time::sleep(delay).await;
            }
            self.queries.lock().push((self.database(), text));
            let result = self.response.lock().clone();
            Ok(result)
        }
    }

    fn close(&self) -> impl Future<Output = BridgeResult<()>> + Send {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        let outcome = if self.fail_close {
            Err(BridgeError::Shutdown {
                endpoint: self.endpoint.to_string(),
                reason: "socket already reset".to_string(),
            })
        } else {
            Ok(())
        };
        async move { outcome }
    }
}

#[derive(Default)]
pub struct FakeFactory {
    pub connects: AtomicUsize,
    /// Accounts whose clients fail to close
    pub fail_close_accounts: Vec<String>,
    /// Held inside `connect` to widen race windows
    pub connect_delay: Option<Duration>,
    /// Passed to every client as its submit delay
    pub submit_delay: Option<Duration>,
}

impl ClientFactory for FakeFactory {
    type Client = FakeClient;

    fn connect(&self, params: &ConnectParams<'_>) -> BridgeResult<FakeClient> {
        if !params.uri.starts_with("http") {
            return Err(BridgeError::Connection {
                uri: params.uri.to_string(),
                reason: "unsupported scheme".to_string(),
            });
        }
        if let Some(delay) = self.connect_delay {
            std::thread::sleep(delay);
        }
        self.connects.fetch_add(1, Ordering::SeqCst);

        let mut client = FakeClient::new(params.key.clone(), params.database);
        client.fail_close = self
            .fail_close_accounts
            .iter()
            .any(|a| a == params.account);
        client.submit_delay = self.submit_delay;
        Ok(client)
    }
}

pub fn registry() -> Arc<ClientRegistry<FakeFactory>> {
    Arc::new(ClientRegistry::new(FakeFactory::default(), "sys"))
}

pub fn registry_with(factory: FakeFactory) -> Arc<ClientRegistry<FakeFactory>> {
    Arc::new(ClientRegistry::new(factory, "sys"))
}
