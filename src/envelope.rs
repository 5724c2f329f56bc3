//! Response Envelopes
//!
//! Query responses are a single record (the first row) carrying every row
//! under [`KEY_RAW_LIST`] when more than one row came back. Write responses
//! are a synthetic success record with an affected count.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::flatten::Record;

pub const KEY_OK: &str = "ok";
pub const KEY_CODE: &str = "code";
pub const KEY_MSG: &str = "msg";
pub const KEY_COUNT: &str = "count";
/// Field holding all rows of a multi-row query result
pub const KEY_RAW_LIST: &str = "@RAW@LIST";

pub const CODE_SUCCESS: u16 = 200;
pub const MSG_SUCCESS: &str = "success";

/// Response object handed back to the ORM caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    /// Wrap query rows. `None` and an empty sequence both yield an empty
    /// envelope; one row is returned as-is; more rows attach the raw list.
    pub fn from_rows(rows: Option<Vec<Record>>) -> Self {
        let mut rows = match rows {
            Some(rows) if !rows.is_empty() => rows,
            _ => return Envelope::default(),
        };
        if rows.len() == 1 {
            return Envelope(rows.pop().unwrap_or_default());
        }

        let mut primary = rows[0].clone();
        let raw = rows.into_iter().map(Value::Object).collect();
        primary.insert(KEY_RAW_LIST.to_string(), Value::Array(raw));
        Envelope(primary)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// All rows of a multi-row result
    pub fn raw_list(&self) -> Option<&Vec<Value>> {
        self.0.get(KEY_RAW_LIST).and_then(Value::as_array)
    }

    /// Affected count of a write response
    pub fn count(&self) -> Option<u64> {
        self.0.get(KEY_COUNT).and_then(Value::as_u64)
    }

    /// The primary record without the raw list.
    pub fn primary(&self) -> Record {
        self.0
            .iter()
            .filter(|(key, _)| key.as_str() != KEY_RAW_LIST)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Envelope> for Value {
    fn from(envelope: Envelope) -> Self {
        Value::Object(envelope.0)
    }
}

/// Synthetic result of a write, since the store reports no affected rows.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub count: u64,
    /// Key the identifiers are echoed under
    pub id_key: String,
    pub id: Option<Value>,
    pub id_in: Option<Value>,
}

impl WriteOutcome {
    pub fn into_envelope(self) -> Envelope {
        let mut map = Map::new();
        map.insert(KEY_OK.to_string(), Value::Bool(true));
        map.insert(KEY_CODE.to_string(), Value::from(CODE_SUCCESS));
        map.insert(KEY_MSG.to_string(), Value::from(MSG_SUCCESS));
        if let Some(id) = self.id {
            map.insert(self.id_key.clone(), id);
        }
        if let Some(id_in) = self.id_in {
            map.insert(format!("{}[]", self.id_key), id_in);
        }
        map.insert(KEY_COUNT.to_string(), Value::from(self.count));
        Envelope(map)
    }
}
