use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{DataStore, StoreError};
use crate::filter::FilterWhere;
use crate::middleware::AuthUser;
use crate::types::{Record, RecordId, Table};

/// Seed data keyed by table, as read from a YAML or JSON fixture file.
pub type Fixture = BTreeMap<Table, Vec<Record>>;

#[derive(Debug, Default)]
struct TableRows {
    rows: Vec<Record>,
    last_id: i64,
}

impl TableRows {
    fn positions(&self, id: &RecordId) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.get("id").map(|v| id.matches(v)).unwrap_or(false))
            .map(|(i, _)| i)
            .collect()
    }

    fn single(&self, table: Table, id: &RecordId) -> Result<usize, StoreError> {
        match self.positions(id).as_slice() {
            [index] => Ok(*index),
            other => Err(StoreError::NotSingleRow {
                table,
                id: id.to_string(),
                rows: other.len(),
            }),
        }
    }

    fn next_serial(&mut self, table: Table) -> Result<i64, StoreError> {
        loop {
            self.last_id = self
                .last_id
                .checked_add(1)
                .ok_or(StoreError::SequenceExhausted(table))?;
            if self.positions(&RecordId::Int(self.last_id)).is_empty() {
                return Ok(self.last_id);
            }
        }
    }

    fn insert(&mut self, table: Table, mut record: Record) -> Result<Record, StoreError> {
        match record.get("id") {
            None | Some(Value::Null) => {
                let id = self.next_serial(table)?;
                record.insert("id".to_string(), Value::from(id));
            }
            Some(value) => {
                let id = RecordId::from_value(value)
                    .ok_or_else(|| StoreError::InvalidInput(format!("invalid id value: {}", value)))?;
                if !self.positions(&id).is_empty() {
                    return Err(StoreError::DuplicateKey(table));
                }
                if let RecordId::Int(i) = id {
                    self.last_id = self.last_id.max(i);
                }
            }
        }

        self.rows.push(record.clone());
        Ok(record)
    }

    fn update(&mut self, table: Table, id: &RecordId, patch: Record) -> Result<Record, StoreError> {
        let index = self.single(table, id)?;

        if let Some(new_id) = patch.get("id") {
            let new_id = RecordId::from_value(new_id)
                .ok_or_else(|| StoreError::InvalidInput(format!("invalid id value: {}", new_id)))?;
            if self.positions(&new_id).iter().any(|&i| i != index) {
                return Err(StoreError::DuplicateKey(table));
            }
        }

        let row = &mut self.rows[index];
        for (column, value) in patch {
            row.insert(column, value);
        }
        Ok(row.clone())
    }

    fn delete(&mut self, table: Table, id: &RecordId) -> Result<Record, StoreError> {
        let index = self.single(table, id)?;
        Ok(self.rows.remove(index))
    }
}

/// In-process store used for local development and tests. Rows keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, TableRows>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a fixture file. YAML is a superset of JSON, so both formats are accepted.
    pub async fn load_fixture(path: &Path) -> Result<Fixture, StoreError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::Fixture(format!("{}: {}", path.display(), e)))?;
        Self::parse_fixture(&text)
    }

    pub fn parse_fixture(text: &str) -> Result<Fixture, StoreError> {
        serde_yaml::from_str(text).map_err(|e| StoreError::Fixture(e.to_string()))
    }

    /// Insert every fixture record, returning how many were stored.
    pub async fn seed(&self, fixture: Fixture) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().await;
        let mut count = 0;
        for (table, records) in fixture {
            let rows = tables.entry(table).or_default();
            for record in records {
                rows.insert(table, record)?;
                count += 1;
            }
        }
        Ok(count)
    }

    pub async fn len(&self, table: Table) -> usize {
        self.tables
            .read()
            .await
            .get(&table)
            .map(|rows| rows.rows.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, _auth: &AuthUser, table: Table, record: Record) -> Result<Record, StoreError> {
        let mut tables = self.tables.write().await;
        tables.entry(table).or_default().insert(table, record)
    }

    async fn select(&self, _auth: &AuthUser, table: Table, filter: &FilterWhere) -> Result<Vec<Record>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&table)
            .map(|rows| {
                rows.rows
                    .iter()
                    .filter(|row| filter.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_by_id(
        &self,
        _auth: &AuthUser,
        table: Table,
        id: &RecordId,
        patch: Record,
    ) -> Result<Record, StoreError> {
        let mut tables = self.tables.write().await;
        tables.entry(table).or_default().update(table, id, patch)
    }

    async fn delete_by_id(&self, _auth: &AuthUser, table: Table, id: &RecordId) -> Result<Record, StoreError> {
        let mut tables = self.tables.write().await;
        tables.entry(table).or_default().delete(table, id)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
