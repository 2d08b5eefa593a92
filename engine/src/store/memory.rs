//! In-process record store
//!
//! Keeps collections in a map and ranks by a crude text similarity: exact
//! (case-insensitive) matches first, then substring matches, then everything
//! else in insertion order. Good enough to drive the canonicalizer and the
//! filter path without a running vector store.

use super::{FilterPredicate, QueryHits, Record, RecordStore, Result};
use async_trait::async_trait;
use sdk::errors::EngineError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Record>>>,
    unavailable: AtomicBool,
    queries: AtomicUsize,
}

fn poisoned() -> EngineError {
    EngineError::StoreUnavailable("memory store lock poisoned".to_string())
}

fn distance(query: &str, document: &str) -> f32 {
    let query = query.trim().to_lowercase();
    let document = document.to_lowercase();
    if document == query {
        0.0
    } else if !query.is_empty() && (document.contains(&query) || query.contains(&document)) {
        0.5
    } else {
        1.0
    }
}

fn matches(record: &Record, filter: Option<&FilterPredicate>) -> bool {
    match filter {
        None => true,
        Some(predicate) if predicate.is_empty() => true,
        Some(predicate) => predicate.clauses().iter().any(|clause| {
            record
                .metadata
                .get(clause.field.as_str())
                .and_then(|v| v.as_str())
                .is_some_and(|v| v == clause.value)
        }),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `query_similar` calls served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Records currently held in `collection`
    pub fn records(&self, collection: &str) -> Vec<Record> {
        self.collections
            .read()
            .ok()
            .and_then(|c| c.get(collection).cloned())
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(EngineError::Lookup("memory store marked unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_collection(&self, name: &str) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EngineError::StoreUnavailable(name.to_string()));
        }
        self.collections
            .write()
            .map_err(|_| poisoned())?
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EngineError::StoreUnavailable(name.to_string()));
        }
        self.collections.write().map_err(|_| poisoned())?.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[Record]) -> Result<()> {
        self.check_available()?;
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| EngineError::Lookup(format!("no collection '{}'", collection)))?;

        for record in records {
            match stored.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => stored.push(record.clone()),
            }
        }
        Ok(())
    }

    async fn query_similar(
        &self,
        collection: &str,
        texts: &[String],
        k: usize,
        filter: Option<&FilterPredicate>,
    ) -> Result<QueryHits> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let collections = self.collections.read().map_err(|_| poisoned())?;
        let stored = collections
            .get(collection)
            .ok_or_else(|| EngineError::Lookup(format!("no collection '{}'", collection)))?;

        let mut hits = QueryHits::default();
        for text in texts {
            let mut ranked: Vec<(f32, &Record)> = stored
                .iter()
                .filter(|r| matches(r, filter))
                .map(|r| (distance(text, &r.document), r))
                .collect();
            ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
            ranked.truncate(k);

            hits.ids.push(ranked.iter().map(|(_, r)| r.id.clone()).collect());
            hits.documents
                .push(ranked.iter().map(|(_, r)| r.document.clone()).collect());
            hits.metadatas
                .push(ranked.iter().map(|(_, r)| r.metadata.clone()).collect());
            hits.distances.push(ranked.iter().map(|(d, _)| *d).collect());
        }

        Ok(hits)
    }

    async fn heartbeat(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EngineError::StoreUnavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}
