use crate::store::QueryHits;
use serde_json::Value;
use tracing::warn;

/// Keys stripped from course documents before they reach the model
const INTERNAL_KEYS: [&str; 2] = ["vector", "embedding"];

/// Renders query hits as one text block for the model.
///
/// Each document is decoded as a JSON object, internal keys are removed and
/// the rest is pretty-printed. Documents are joined with a newline; no hits
/// gives an empty string. Documents that are not valid JSON are skipped.
pub fn project(hits: &QueryHits) -> String {
    hits.all_documents()
        .filter_map(project_document)
        .collect::<Vec<_>>()
        .join("\n")
}

fn project_document(document: &str) -> Option<String> {
    let mut value: Value = match serde_json::from_str(document) {
        Ok(value) => value,
        Err(e) => {
            warn!("Skipping undecodable course document: {}", e);
            return None;
        }
    };

    if let Some(object) = value.as_object_mut() {
        for key in INTERNAL_KEYS {
            object.remove(key);
        }
    }

    serde_json::to_string_pretty(&value).ok()
}
