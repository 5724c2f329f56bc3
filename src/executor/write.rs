//! Write Executor

use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::{text_for, Bridge};
use crate::envelope::WriteOutcome;
use crate::error::BridgeResult;
use crate::request::{Operation, OrmRequest};
use crate::store::{ClientFactory, StoreClient};

/// Affected count reported for a successful write.
///
/// - create: number of value tuples in the batch
/// - update: number of fields in the content map
/// - anything else: size of the id set when no single id is given, else 1
pub fn affected_count<R: OrmRequest + ?Sized>(request: &R) -> u64 {
    match request.method().operation() {
        Operation::Create => request.values().map_or(0, |values| values.len() as u64),
        Operation::Update => request.content().map_or(0, |content| content.len() as u64),
        Operation::Delete | Operation::Read => match (request.id(), request.id_in()) {
            (None, Some(Value::Array(ids))) => ids.len() as u64,
            // Approximation: the store does not report deleted rows, and
            // natively rendered deletes carry no id filter to count.
            _ => 1,
        },
    }
}

fn outcome_for<R: OrmRequest + ?Sized>(request: &R) -> WriteOutcome {
    let echo = request.method().operation() != Operation::Create;
    WriteOutcome {
        count: affected_count(request),
        id_key: request.id_key().to_string(),
        id: request.id().filter(|_| echo).cloned(),
        id_in: request.id_in().filter(|_| echo).cloned(),
    }
}

impl<F: ClientFactory> Bridge<F> {
    /// Submit write text as one unit and synthesize the outcome.
    /// Store and transport errors propagate unchanged.
    pub async fn execute_update<R: OrmRequest + ?Sized>(
        &self,
        client: Option<Arc<F::Client>>,
        request: &R,
        rendered: Option<&str>,
    ) -> BridgeResult<WriteOutcome> {
        let client = self.client_for(client, request)?;
        let text = text_for(request, rendered)?;
        let database = self.schema_for(request);

        {
            let _selected = client.selection_lock().lock().await;
            client.set_database(database);
            client.write(&text).await?;
        }
        self.write_count.fetch_add(1, Ordering::Relaxed);

        let outcome = outcome_for(request);
        tracing::debug!(
            endpoint = %client.endpoint(),
            database,
            method = %request.method(),
            count = outcome.count,
            "write_executed"
        );
        Ok(outcome)
    }

    /// Write and return only the affected count.
    pub async fn exec_update<R: OrmRequest + ?Sized>(
        &self,
        request: &R,
        rendered: Option<&str>,
    ) -> BridgeResult<u64> {
        Ok(self.execute_update(None, request, rendered).await?.count)
    }
}
