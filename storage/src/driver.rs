use std::collections::HashMap;
use std::fmt;

use crate::error::DriverError;

/// One storage host:port the core can execute queries against.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A parameter or column value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// One result row, column name to value.
pub type Row = HashMap<String, Value>;

/// What the core expects of the surrounding storage driver: synchronous
/// parameterized query execution against one endpoint, and a cheap
/// connectivity probe. The driver's internals are not the core's concern.
pub trait StorageDriver: Send + Sync {
    fn execute(
        &self,
        endpoint: &Endpoint,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, DriverError>;

    /// Runs the configured validation query; true means the endpoint is
    /// usable.
    fn validate(&self, endpoint: &Endpoint, validation_query: &str) -> bool;
}
