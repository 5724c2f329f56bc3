//! ORM Request Model
//!
//! The bridge consumes requests through the [`OrmRequest`] trait so any ORM
//! front end can plug in. [`RequestConfig`] is a plain, serde-deserializable
//! implementation used by the binary and by tests.
//!
//! ## Example
//!
//! ```rust
//! use influx_bridge::request::{OrmRequest, RequestConfig, RequestMethod};
//! use serde_json::json;
//!
//! let request = RequestConfig::new("http://localhost:8086", "admin", RequestMethod::Put)
//!     .with_schema("metrics")
//!     .with_id(json!(7))
//!     .with_text("cpu,host=a usage=0.5");
//!
//! assert_eq!(request.id_key(), "id");
//! assert!(!request.method().is_query());
//! ```

mod method;

pub use method::{Operation, RequestMethod};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BridgeError, BridgeResult};

/// Identifier key used when a request does not configure one
pub const DEFAULT_ID_KEY: &str = "id";

/// The request contract consumed from the ORM layer.
pub trait OrmRequest: Send + Sync {
    /// Connection URI of the store
    fn uri(&self) -> &str;

    /// Account the connection authenticates as
    fn account(&self) -> &str;

    fn password(&self) -> &str;

    /// Target database, if the request names one
    fn schema(&self) -> Option<&str>;

    fn method(&self) -> RequestMethod;

    /// Render the request's own query or line-protocol text.
    fn render_text(&self) -> BridgeResult<String>;

    /// Value tuples of a batch create
    fn values(&self) -> Option<&[Vec<Value>]>;

    /// Field map of an update
    fn content(&self) -> Option<&Map<String, Value>>;

    fn id(&self) -> Option<&Value>;

    fn id_in(&self) -> Option<&Value>;

    fn id_key(&self) -> &str {
        DEFAULT_ID_KEY
    }
}

/// Resolve the database a request targets, falling back to `default_schema`
/// when the request leaves it empty.
pub fn effective_schema<'a>(schema: Option<&'a str>, default_schema: &'a str) -> &'a str {
    match schema {
        Some(s) if !s.trim().is_empty() => s,
        _ => default_schema,
    }
}

/// Schema prefix to render into query text. Time-series stores select the
/// database out of band, so their queries carry no schema prefix.
pub fn sql_schema(schema: Option<&str>, is_time_series: bool) -> Option<&str> {
    if is_time_series {
        None
    } else {
        schema
    }
}

/// A self-contained request description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    pub uri: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub schema: Option<String>,
    pub method: RequestMethod,
    /// Pre-rendered query or line-protocol text
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub values: Option<Vec<Vec<Value>>>,
    #[serde(default)]
    pub content: Option<Map<String, Value>>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub id_in: Option<Value>,
    #[serde(default = "default_id_key")]
    pub id_key: String,
}

fn default_id_key() -> String {
    DEFAULT_ID_KEY.to_string()
}

impl RequestConfig {
    pub fn new(uri: impl Into<String>, account: impl Into<String>, method: RequestMethod) -> Self {
        RequestConfig {
            uri: uri.into(),
            account: account.into(),
            password: String::new(),
            schema: None,
            method,
            text: None,
            values: None,
            content: None,
            id: None,
            id_in: None,
            id_key: default_id_key(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_values(mut self, values: Vec<Vec<Value>>) -> Self {
        self.values = Some(values);
        self
    }

    pub fn with_content(mut self, content: Map<String, Value>) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_id(mut self, id: Value) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_id_in(mut self, id_in: Value) -> Self {
        self.id_in = Some(id_in);
        self
    }

    pub fn with_id_key(mut self, id_key: impl Into<String>) -> Self {
        self.id_key = id_key.into();
        self
    }
}

impl OrmRequest for RequestConfig {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn account(&self) -> &str {
        &self.account
    }

    fn password(&self) -> &str {
        &self.password
    }

    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn method(&self) -> RequestMethod {
        self.method
    }

    fn render_text(&self) -> BridgeResult<String> {
        match self.text.as_deref() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Err(BridgeError::InvalidRequest(format!(
                "{} request carries no query or write text",
                self.method
            ))),
        }
    }

    fn values(&self) -> Option<&[Vec<Value>]> {
        self.values.as_deref()
    }

    fn content(&self) -> Option<&Map<String, Value>> {
        self.content.as_ref()
    }

    fn id(&self) -> Option<&Value> {
        self.id.as_ref().filter(|v| !v.is_null())
    }

    fn id_in(&self) -> Option<&Value> {
        self.id_in.as_ref().filter(|v| !v.is_null())
    }

    fn id_key(&self) -> &str {
        &self.id_key
    }
}
