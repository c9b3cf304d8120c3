//! In-memory document store for tests and development.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use cap_core::{CapabilityError, CapabilityResult, Scope, json_path};
use chrono::Utc;
use serde_json::Value;

use crate::store::{DocStore, merge_shallow};
use crate::types::{DocRecord, Order, QueryConstraint, QueryOptions};

/// Reader/writer lock over a scope-partitioned map of documents.
#[derive(Default)]
pub struct MemoryDocStore {
    records: RwLock<HashMap<Scope, HashMap<String, DocRecord>>>,
}

impl MemoryDocStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update_with(
        &self,
        scope: &Scope,
        id: &str,
        apply: impl FnOnce(&Value) -> Value,
    ) -> CapabilityResult<DocRecord> {
        let mut records = self.records.write().expect("db lock poisoned");
        let record = records
            .get_mut(scope)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| CapabilityError::not_found(format!("document {id:?}")))?;
        record.value = apply(&record.value);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

fn matches(record: &DocRecord, constraint: &QueryConstraint) -> bool {
    json_path::lookup(&record.value, &constraint.field) == Some(&constraint.value)
}

#[async_trait]
impl DocStore for MemoryDocStore {
    async fn get(&self, scope: &Scope, id: &str) -> CapabilityResult<DocRecord> {
        let records = self.records.read().expect("db lock poisoned");
        records
            .get(scope)
            .and_then(|docs| docs.get(id))
            .cloned()
            .ok_or_else(|| CapabilityError::not_found(format!("document {id:?}")))
    }

    async fn query(
        &self,
        scope: &Scope,
        table: &str,
        options: &QueryOptions,
    ) -> CapabilityResult<Vec<DocRecord>> {
        options.validate()?;
        let records = self.records.read().expect("db lock poisoned");
        let mut matched: Vec<DocRecord> = records
            .get(scope)
            .map(|docs| {
                docs.values()
                    .filter(|rec| rec.table == table)
                    .filter(|rec| options.constraints().all(|c| matches(rec, c)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        match options.order {
            Order::Asc => matched.sort_by(|a, b| a.updated_at.cmp(&b.updated_at)),
            Order::Desc => matched.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
        }
        if let Some(limit) = options.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn insert(
        &self,
        scope: &Scope,
        table: &str,
        value: Value,
    ) -> CapabilityResult<DocRecord> {
        let now = Utc::now();
        let record = DocRecord {
            id: cap_core::new_record_id(),
            table: table.to_string(),
            value,
            created_at: now,
            updated_at: now,
        };
        let mut records = self.records.write().expect("db lock poisoned");
        records
            .entry(scope.clone())
            .or_default()
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn patch(&self, scope: &Scope, id: &str, value: Value) -> CapabilityResult<DocRecord> {
        self.update_with(scope, id, |existing| merge_shallow(existing, value))
    }

    async fn replace(&self, scope: &Scope, id: &str, value: Value) -> CapabilityResult<DocRecord> {
        self.update_with(scope, id, |_| value)
    }

    async fn delete(&self, scope: &Scope, id: &str) -> CapabilityResult<bool> {
        let mut records = self.records.write().expect("db lock poisoned");
        Ok(records
            .get_mut(scope)
            .and_then(|docs| docs.remove(id))
            .is_some())
    }
}
