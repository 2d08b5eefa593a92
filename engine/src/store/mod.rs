//! Record store client
//!
//! A typed facade over the vector/metadata store. Course sections live in one
//! collection; deduplicated instructor names and subject titles live in two
//! small reference collections used for canonicalization.
//!
//! The store is reached only through the [`RecordStore`] trait, and the
//! handles are carried explicitly in [`CatalogCollections`] rather than held
//! globally, so every consumer can be exercised against [`memory::MemoryStore`].

use crate::config::StoreConfig;
use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::FieldKey;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::Arc;

pub mod chroma;
pub mod embeddings;
pub mod memory;

pub use chroma::ChromaStore;
pub use embeddings::{Embedder, OpenAIEmbedder};
pub use memory::MemoryStore;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// One stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub document: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            document: document.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Hits of a similarity query, one inner vector per query text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryHits {
    pub ids: Vec<Vec<String>>,
    pub documents: Vec<Vec<String>>,
    pub metadatas: Vec<Vec<Map<String, Value>>>,
    pub distances: Vec<Vec<f32>>,
}

impl QueryHits {
    /// Nearest document for the first query text, if any
    pub fn first_document(&self) -> Option<&str> {
        self.documents
            .first()
            .and_then(|docs| docs.first())
            .map(String::as_str)
    }

    /// All documents across all query texts, in order
    pub fn all_documents(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().flatten().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.documents.iter().all(Vec::is_empty)
    }
}

/// Single-field equality clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub field: FieldKey,
    pub value: String,
}

impl Clause {
    pub fn new(field: FieldKey, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

impl Serialize for Clause {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.field.as_str(), &self.value)?;
        map.end()
    }
}

/// Disjunction of equality clauses. Serializes as `{"$or":[{"Key":"value"}, ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPredicate {
    clauses: Vec<Clause>,
}

impl FilterPredicate {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    /// Store `where` document for this predicate.
    ///
    /// The store rejects an `$or` with fewer than two operands, so a single
    /// clause goes out bare and an empty predicate means no filter at all.
    pub fn to_where(&self) -> Option<Value> {
        match self.clauses.as_slice() {
            [] => None,
            [only] => serde_json::to_value(only).ok(),
            _ => serde_json::to_value(self).ok(),
        }
    }
}

impl Serialize for FilterPredicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        struct Clauses<'a>(&'a [Clause]);

        impl Serialize for Clauses<'_> {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
                for clause in self.0 {
                    seq.serialize_element(clause)?;
                }
                seq.end()
            }
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("$or", &Clauses(&self.clauses))?;
        map.end()
    }
}

/// Vector store operations the engine depends on
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a collection if it does not exist yet
    async fn create_collection(&self, name: &str) -> Result<()>;

    /// Delete a collection. A missing collection is not an error.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Insert or replace records by id
    async fn upsert(&self, collection: &str, records: &[Record]) -> Result<()>;

    /// Nearest `k` records to each of `texts`, restricted by `filter`
    async fn query_similar(
        &self,
        collection: &str,
        texts: &[String],
        k: usize,
        filter: Option<&FilterPredicate>,
    ) -> Result<QueryHits>;

    /// Cheap reachability probe
    async fn heartbeat(&self) -> Result<()> {
        Ok(())
    }
}

/// Store handle plus the names of the three collections
#[derive(Clone)]
pub struct CatalogCollections {
    store: Arc<dyn RecordStore>,
    pub courses: String,
    pub instructors: String,
    pub subjects: String,
}

impl CatalogCollections {
    pub fn new(store: Arc<dyn RecordStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            courses: config.courses_collection.clone(),
            instructors: config.instructors_collection.clone(),
            subjects: config.subjects_collection.clone(),
        }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Collection names in ingestion order
    pub fn names(&self) -> [&str; 3] {
        [&self.courses, &self.instructors, &self.subjects]
    }
}
