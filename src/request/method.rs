//! Request methods and the operation they resolve to.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::BridgeError;

/// Method named by an ORM request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    /// Read a single record
    Get,
    /// Count a single record
    Head,
    /// Read with elevated access
    Gets,
    /// Count with elevated access
    Heads,
    /// Create records
    Post,
    /// Update records
    Put,
    /// Delete records
    Delete,
}

/// What a request does to the store, resolved once at dispatch entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl RequestMethod {
    pub fn operation(self) -> Operation {
        match self {
            RequestMethod::Get | RequestMethod::Head | RequestMethod::Gets | RequestMethod::Heads => {
                Operation::Read
            }
            RequestMethod::Post => Operation::Create,
            RequestMethod::Put => Operation::Update,
            RequestMethod::Delete => Operation::Delete,
        }
    }

    pub fn is_query(self) -> bool {
        self.operation() == Operation::Read
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Head => "HEAD",
            RequestMethod::Gets => "GETS",
            RequestMethod::Heads => "HEADS",
            RequestMethod::Post => "POST",
            RequestMethod::Put => "PUT",
            RequestMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestMethod {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(RequestMethod::Get),
            "HEAD" => Ok(RequestMethod::Head),
            "GETS" => Ok(RequestMethod::Gets),
            "HEADS" => Ok(RequestMethod::Heads),
            "POST" => Ok(RequestMethod::Post),
            "PUT" => Ok(RequestMethod::Put),
            "DELETE" => Ok(RequestMethod::Delete),
            other => Err(BridgeError::InvalidRequest(format!(
                "unknown request method '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_methods_are_queries() {
        for m in [
            RequestMethod::Get,
            RequestMethod::Head,
            RequestMethod::Gets,
            RequestMethod::Heads,
        ] {
            assert!(m.is_query(), "{m} should be a query");
        }
        assert!(!RequestMethod::Post.is_query());
        assert!(!RequestMethod::Put.is_query());
        assert!(!RequestMethod::Delete.is_query());
    }

    #[test]
    fn test_operation_mapping() {
        assert_eq!(RequestMethod::Post.operation(), Operation::Create);
        assert_eq!(RequestMethod::Put.operation(), Operation::Update);
        assert_eq!(RequestMethod::Delete.operation(), Operation::Delete);
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("gets".parse::<RequestMethod>().unwrap(), RequestMethod::Gets);
        assert_eq!(" Put ".parse::<RequestMethod>().unwrap(), RequestMethod::Put);
        assert!("PATCH".parse::<RequestMethod>().is_err());
    }

    #[test]
    fn test_serde_uppercase() {
        let json = serde_json::to_string(&RequestMethod::Delete).unwrap();
        assert_eq!(json, "\"DELETE\"");
        let back: RequestMethod = serde_json::from_str("\"HEADS\"").unwrap();
        assert_eq!(back, RequestMethod::Heads);
    }
}
