//! Query Executor

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use super::{text_for, Bridge};
use crate::envelope::Envelope;
use crate::error::{BridgeError, BridgeResult};
use crate::flatten::{flatten, Record};
use crate::request::OrmRequest;
use crate::store::{ClientFactory, StoreClient};

impl<F: ClientFactory> Bridge<F> {
    /// Run a query and flatten its series into records.
    ///
    /// Returns `None` when the store sent no result groups, which callers
    /// treat the same as an empty sequence. A non-blank store error fails
    /// with [`BridgeError::QueryFailed`] carrying the message verbatim.
    pub async fn execute_query<R: OrmRequest + ?Sized>(
        &self,
        client: Option<Arc<F::Client>>,
        request: &R,
        rendered: Option<&str>,
        lenient_typing: bool,
    ) -> BridgeResult<Option<Vec<Record>>> {
        let client = self.client_for(client, request)?;
        let text = text_for(request, rendered)?;
        let database = self.schema_for(request);
        let started = Instant::now();

        let result = {
            // One handle may serve several databases; select and submit together
            let _selected = client.selection_lock().lock().await;
            client.set_database(database);
            client.query(&text).await?
        };
        self.query_count.fetch_add(1, Ordering::Relaxed);

        if let Some(message) = result.error_message() {
            tracing::debug!(endpoint = %client.endpoint(), database, error = message, "query_failed");
            return Err(BridgeError::QueryFailed(message.to_string()));
        }

        let Some(groups) = result.results else {
            tracing::debug!(endpoint = %client.endpoint(), database, "query_without_results");
            return Ok(None);
        };

        let records = flatten(groups);
        tracing::debug!(
            endpoint = %client.endpoint(),
            database,
            rows = records.len(),
            lenient_typing,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query_executed"
        );
        Ok(Some(records))
    }

    /// Run a query and wrap its rows into an envelope, whatever the
    /// request's method.
    pub async fn exec_query<R: OrmRequest + ?Sized>(
        &self,
        request: &R,
        rendered: Option<&str>,
        lenient_typing: bool,
    ) -> BridgeResult<Envelope> {
        let rows = self
            .execute_query(None, request, rendered, lenient_typing)
            .await?;
        Ok(Envelope::from_rows(rows))
    }
}
