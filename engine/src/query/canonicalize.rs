use crate::store::CatalogCollections;
use sdk::errors::EngineError;
use std::fmt;
use tracing::debug;

/// Which reference collection a fuzzy value is resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Instructor,
    Subject,
}

impl ReferenceKind {
    fn collection<'a>(&self, collections: &'a CatalogCollections) -> &'a str {
        match self {
            ReferenceKind::Instructor => &collections.instructors,
            ReferenceKind::Subject => &collections.subjects,
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Instructor => f.write_str("instructor"),
            ReferenceKind::Subject => f.write_str("subject"),
        }
    }
}

/// Resolves `fuzzy` to the nearest canonical instructor name or subject title.
///
/// Returns `Ok(None)` when the reference collection has no hit, which is a
/// normal outcome. Store failures come back as `EngineError::Lookup`. The
/// reference collection is only read.
pub async fn canonicalize(
    collections: &CatalogCollections,
    kind: ReferenceKind,
    fuzzy: &str,
) -> Result<Option<String>, EngineError> {
    let text = fuzzy.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let hits = collections
        .store()
        .query_similar(kind.collection(collections), &[text.to_string()], 1, None)
        .await
        .map_err(|e| match e {
            EngineError::Lookup(_) => e,
            other => EngineError::Lookup(other.to_string()),
        })?;

    let canonical = hits.first_document().map(str::to_string);
    debug!("Canonicalized {} '{}' -> {:?}", kind, text, canonical);
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::store::{MemoryStore, Record, RecordStore};
    use std::sync::Arc;

    async fn collections_with(instructors: &[&str]) -> (Arc<MemoryStore>, CatalogCollections) {
        let store = Arc::new(MemoryStore::new());
        let collections = CatalogCollections::new(store.clone(), &StoreConfig::default());
        for name in collections.names() {
            store.create_collection(name).await.unwrap();
        }
        let records: Vec<Record> = instructors.iter().map(|n| Record::new(*n, *n)).collect();
        store.upsert(&collections.instructors, &records).await.unwrap();
        (store, collections)
    }

    #[tokio::test]
    async fn test_exact_match_round_trips() {
        let (_, collections) = collections_with(&["Ada Lovelace", "Alan Turing"]).await;
        let canonical = canonicalize(&collections, ReferenceKind::Instructor, "Alan Turing")
            .await
            .unwrap();
        assert_eq!(canonical.as_deref(), Some("Alan Turing"));
    }

    #[tokio::test]
    async fn test_empty_reference_set_is_not_found() {
        let (_, collections) = collections_with(&[]).await;
        let canonical = canonicalize(&collections, ReferenceKind::Subject, "skating")
            .await
            .unwrap();
        assert_eq!(canonical, None);
    }

    #[tokio::test]
    async fn test_blank_text_skips_lookup() {
        let (store, collections) = collections_with(&["Ada Lovelace"]).await;
        let canonical = canonicalize(&collections, ReferenceKind::Instructor, "   ")
            .await
            .unwrap();
        assert_eq!(canonical, None);
        assert_eq!(store.query_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_lookup_error() {
        let (store, collections) = collections_with(&["Ada Lovelace"]).await;
        store.set_unavailable(true);
        let err = canonicalize(&collections, ReferenceKind::Instructor, "ada")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Lookup(_)));
    }
}
