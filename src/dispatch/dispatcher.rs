use serde::Serialize;
use std::time::Instant;

use super::{DispatchError, OperationRequest};
use crate::database::{DataStore, StoreError};
use crate::filter::FilterWhere;
use crate::middleware::AuthUser;
use crate::types::{Record, RecordId, Table};

/// Result of one dispatched operation: a single record for create/update/delete, a list for read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OperationOutput {
    Single(Record),
    Many(Vec<Record>),
}

impl OperationOutput {
    pub fn into_records(self) -> Vec<Record> {
        match self {
            OperationOutput::Single(record) => vec![record],
            OperationOutput::Many(records) => records,
        }
    }

    pub fn as_single(&self) -> Option<&Record> {
        match self {
            OperationOutput::Single(record) => Some(record),
            OperationOutput::Many(_) => None,
        }
    }
}

/// Forwards validated operation requests to a data store on behalf of one caller.
pub struct Dispatcher<'a> {
    store: &'a dyn DataStore,
    auth: &'a AuthUser,
}

impl<'a> Dispatcher<'a> {
    pub fn new(store: &'a dyn DataStore, auth: &'a AuthUser) -> Self {
        Self { store, auth }
    }

    /// Parse a raw body and dispatch it.
    pub async fn dispatch_json(&self, body: &serde_json::Value) -> Result<OperationOutput, DispatchError> {
        let request = OperationRequest::from_json(body)?;
        self.dispatch(request).await
    }

    /// Validate `request` and perform exactly one store call for it.
    ///
    /// Validation failures never reach the store.
    pub async fn dispatch(&self, request: OperationRequest) -> Result<OperationOutput, DispatchError> {
        request.validate()?;

        let kind = request.kind();
        let table = request.table();
        let started = Instant::now();

        let result = match request {
            OperationRequest::Create { table, data } => self.create(table, data).await,
            OperationRequest::Read { table, filters } => self.read(table, &filters).await,
            OperationRequest::Update { table, id, data } => self.update(table, &id, data).await,
            OperationRequest::Delete { table, id } => self.delete(table, &id).await,
        };

        match &result {
            Ok(_) => tracing::debug!(
                "{} on {} via {} completed in {:?}",
                kind,
                table,
                self.store.name(),
                started.elapsed()
            ),
            Err(e) => tracing::warn!("{} on {} failed: {}", kind, table, e),
        }

        result
    }

    async fn create(&self, table: Table, data: Record) -> Result<OperationOutput, DispatchError> {
        let record = self.store.insert(self.auth, table, data).await.map_err(store_failure)?;
        Ok(OperationOutput::Single(record))
    }

    async fn read(&self, table: Table, filters: &FilterWhere) -> Result<OperationOutput, DispatchError> {
        let records = self.store.select(self.auth, table, filters).await.map_err(store_failure)?;
        Ok(OperationOutput::Many(records))
    }

    async fn update(&self, table: Table, id: &RecordId, data: Record) -> Result<OperationOutput, DispatchError> {
        let record = self
            .store
            .update_by_id(self.auth, table, id, data)
            .await
            .map_err(store_failure)?;
        Ok(OperationOutput::Single(record))
    }

    async fn delete(&self, table: Table, id: &RecordId) -> Result<OperationOutput, DispatchError> {
        let record = self.store.delete_by_id(self.auth, table, id).await.map_err(store_failure)?;
        Ok(OperationOutput::Single(record))
    }
}

fn store_failure(err: StoreError) -> DispatchError {
    match err {
        StoreError::Decode(msg) => DispatchError::Internal(msg),
        other => DispatchError::Upstream(other.to_string()),
    }
}
