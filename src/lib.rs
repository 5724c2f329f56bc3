//! # influx-bridge
//!
//! Executes relational ORM requests (create/read/update/delete expressed as
//! method + schema + filter/content) against an InfluxDB time-series store,
//! whose protocol only offers "write line protocol" and "run a query that
//! returns columnar series".
//!
//! ## Pipeline Architecture
//!
//! ```text
//! OrmRequest
//!     ↓
//! [Bridge::execute]           → method resolved to Operation
//!     ↓
//! [ClientRegistry]            → pooled client per (URI, account)
//!     ↓
//!     ├── Read  → [query executor] → [flatten] → Envelope (row + @RAW@LIST)
//!     └── Other → [write executor]             → Envelope (ok, code, msg, count)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use influx_bridge::request::{RequestConfig, RequestMethod};
//! use influx_bridge::{Bridge, Config};
//!
//! # async fn run() -> influx_bridge::BridgeResult<()> {
//! let bridge = Bridge::from_config(&Config::default())?;
//!
//! let request = RequestConfig::new("http://localhost:8086", "admin", RequestMethod::Get)
//!     .with_password("secret")
//!     .with_schema("metrics")
//!     .with_text("SELECT * FROM cpu LIMIT 10");
//!
//! let envelope = bridge.execute(&request, None, false).await?;
//! println!("{}", serde_json::to_string(&envelope)?);
//!
//! // Part of the host's shutdown sequence
//! bridge.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `request` | ORM request contract, methods, schema helpers |
//! | `registry` | Endpoint identity and the client pool |
//! | `store` | Client trait, InfluxDB HTTP client, batch flusher, wire types |
//! | `flatten` | Column-major series → row records |
//! | `envelope` | Response envelopes and write outcomes |
//! | `executor` | Dispatcher, query and write executors |

pub mod config;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod flatten;
pub mod registry;
pub mod request;
pub mod store;

// Re-export public types
pub use config::Config;
pub use envelope::{Envelope, WriteOutcome, KEY_COUNT, KEY_RAW_LIST};
pub use error::{BridgeError, BridgeResult};
pub use executor::{affected_count, Bridge};
pub use flatten::{flatten, Record};
pub use registry::{ClientRegistry, EndpointKey};
pub use request::{Operation, OrmRequest, RequestConfig, RequestMethod};
pub use store::{ClientFactory, HttpClientFactory, InfluxHttpClient, QueryResult, StoreClient};
