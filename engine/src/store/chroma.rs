//! Chroma HTTP client
//!
//! Talks to the `/api/v1` REST surface. Collections are addressed by name in
//! management calls and by id in data calls, so resolved ids are cached.

use super::{Embedder, FilterPredicate, QueryHits, Record, RecordStore, Result};
use async_trait::async_trait;
use sdk::errors::EngineError;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ChromaQueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Map<String, Value>>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
}

impl From<ChromaQueryResponse> for QueryHits {
    fn from(raw: ChromaQueryResponse) -> Self {
        QueryHits {
            ids: raw.ids,
            documents: raw
                .documents
                .unwrap_or_default()
                .into_iter()
                .map(|docs| docs.into_iter().map(Option::unwrap_or_default).collect())
                .collect(),
            metadatas: raw
                .metadatas
                .unwrap_or_default()
                .into_iter()
                .map(|metas| metas.into_iter().map(Option::unwrap_or_default).collect())
                .collect(),
            distances: raw.distances.unwrap_or_default(),
        }
    }
}

pub struct ChromaStore {
    base_url: String,
    client: reqwest::Client,
    embedder: Arc<dyn Embedder>,
    collection_ids: RwLock<HashMap<String, String>>,
}

impl ChromaStore {
    pub fn new(base_url: impl Into<String>, embedder: Arc<dyn Embedder>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            embedder,
            collection_ids: RwLock::new(HashMap::new()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    fn cached_id(&self, name: &str) -> Option<String> {
        self.collection_ids
            .read()
            .ok()
            .and_then(|ids| ids.get(name).cloned())
    }

    fn remember_id(&self, name: &str, id: String) {
        if let Ok(mut ids) = self.collection_ids.write() {
            ids.insert(name.to_string(), id);
        }
    }

    fn forget_id(&self, name: &str) {
        if let Ok(mut ids) = self.collection_ids.write() {
            ids.remove(name);
        }
    }

    /// Resolves a collection name to its id
    async fn collection_id(&self, name: &str) -> Result<String> {
        if let Some(id) = self.cached_id(name) {
            return Ok(id);
        }

        let response = self
            .client
            .get(self.url(&format!("collections/{}", name)))
            .send()
            .await
            .map_err(|e| EngineError::Lookup(format!("Failed to reach store: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::Lookup(format!(
                "Collection '{}' not available ({}): {}",
                name, status, text
            )));
        }

        let info: CollectionInfo = response
            .json()
            .await
            .map_err(|e| EngineError::Lookup(format!("Invalid collection response: {}", e)))?;

        self.remember_id(name, info.id.clone());
        Ok(info.id)
    }
}

#[async_trait]
impl RecordStore for ChromaStore {
    async fn create_collection(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("collections"))
            .json(&json!({
                "name": name,
                "metadata": {"hnsw:space": "l2"},
                "get_or_create": true,
            }))
            .send()
            .await
            .map_err(|e| EngineError::StoreUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::StoreUnavailable(format!(
                "Failed to create collection '{}' ({}): {}",
                name, status, text
            )));
        }

        let info: CollectionInfo = response
            .json()
            .await
            .map_err(|e| EngineError::StoreUnavailable(format!("Invalid collection response: {}", e)))?;

        info!("Collection '{}' ready", name);
        self.remember_id(name, info.id);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.forget_id(name);

        let response = self
            .client
            .delete(self.url(&format!("collections/{}", name)))
            .send()
            .await
            .map_err(|e| EngineError::StoreUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            info!("Deleted collection '{}'", name);
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        if status.as_u16() == 404 || text.contains("does not exist") {
            debug!("Collection '{}' did not exist", name);
            return Ok(());
        }

        Err(EngineError::StoreUnavailable(format!(
            "Failed to delete collection '{}' ({}): {}",
            name, status, text
        )))
    }

    async fn upsert(&self, collection: &str, records: &[Record]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let id = self.collection_id(collection).await?;
        let documents: Vec<String> = records.iter().map(|r| r.document.clone()).collect();
        let embeddings = self.embedder.embed_batch(&documents).await?;

        let response = self
            .client
            .post(self.url(&format!("collections/{}/upsert", id)))
            .json(&json!({
                "ids": records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
                "embeddings": embeddings,
                "metadatas": records.iter().map(|r| &r.metadata).collect::<Vec<_>>(),
                "documents": documents,
            }))
            .send()
            .await
            .map_err(|e| EngineError::Lookup(format!("Upsert failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::Lookup(format!(
                "Upsert into '{}' failed ({}): {}",
                collection, status, text
            )));
        }

        debug!("Upserted {} records into '{}'", records.len(), collection);
        Ok(())
    }

    async fn query_similar(
        &self,
        collection: &str,
        texts: &[String],
        k: usize,
        filter: Option<&FilterPredicate>,
    ) -> Result<QueryHits> {
        let id = self.collection_id(collection).await?;
        let embeddings = self.embedder.embed_batch(texts).await?;

        let mut body = json!({
            "query_embeddings": embeddings,
            "n_results": k,
            "include": ["documents", "metadatas", "distances"],
        });
        if let Some(where_doc) = filter.and_then(FilterPredicate::to_where) {
            body["where"] = where_doc;
        }

        let response = self
            .client
            .post(self.url(&format!("collections/{}/query", id)))
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Lookup(format!("Query failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::Lookup(format!(
                "Query on '{}' failed ({}): {}",
                collection, status, text
            )));
        }

        let raw: ChromaQueryResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Lookup(format!("Invalid query response: {}", e)))?;

        Ok(raw.into())
    }

    async fn heartbeat(&self) -> Result<()> {
        let response = self
            .client
            .get(self.url("heartbeat"))
            .send()
            .await
            .map_err(|e| EngineError::StoreUnavailable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(EngineError::StoreUnavailable(format!(
                "Heartbeat returned {}",
                response.status()
            )))
        }
    }
}
