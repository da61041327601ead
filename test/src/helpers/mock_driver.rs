use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use realm_storage::{DriverError, Endpoint, Row, StorageDriver, Value};

/// A scriptable in-memory storage driver: endpoints can be marked down,
/// and every executed statement is recorded for assertions.
pub struct MockDriver {
    down: Mutex<HashSet<String>>,
    statements: Mutex<Vec<(String, String)>>,
}

impl MockDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            down: Mutex::new(HashSet::new()),
            statements: Mutex::new(Vec::new()),
        })
    }

    /// Simulates an outage (or recovery) of one endpoint.
    pub fn set_down(&self, endpoint: &str, down: bool) {
        let mut set = self.down.lock();
        if down {
            set.insert(endpoint.to_string());
        } else {
            set.remove(endpoint);
        }
    }

    /// Every (endpoint, statement) executed so far.
    pub fn statements(&self) -> Vec<(String, String)> {
        self.statements.lock().clone()
    }

    pub fn statements_against(&self, endpoint: &str) -> Vec<String> {
        self.statements
            .lock()
            .iter()
            .filter(|(executed_on, _)| executed_on == endpoint)
            .map(|(_, statement)| statement.clone())
            .collect()
    }
}

impl StorageDriver for MockDriver {
    fn execute(
        &self,
        endpoint: &Endpoint,
        query: &str,
        _params: &[Value],
    ) -> Result<Vec<Row>, DriverError> {
        if self.down.lock().contains(&endpoint.to_string()) {
            return Err(DriverError::Unreachable {
                endpoint: endpoint.to_string(),
            });
        }
        self.statements
            .lock()
            .push((endpoint.to_string(), query.to_string()));

        let mut row = Row::new();
        row.insert("endpoint".to_string(), Value::Text(endpoint.to_string()));
        Ok(vec![row])
    }

    fn validate(&self, endpoint: &Endpoint, _validation_query: &str) -> bool {
        !self.down.lock().contains(&endpoint.to_string())
    }
}
