use super::canonicalize::{canonicalize, ReferenceKind};
use crate::config::FilterConfig;
use crate::store::{CatalogCollections, Clause, FilterPredicate};
use sdk::errors::EngineError;
use sdk::FieldKey;
use serde_json::Value;
use std::str::FromStr;
use tracing::debug;

/// Decoded `get_relevant_courses` arguments: known keys with non-empty, trimmed values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(FieldKey, String)>,
}

impl FieldMap {
    /// Decodes a JSON object of field names to scalar values.
    ///
    /// Strings are trimmed and dropped when empty; numbers and booleans are
    /// stringified; `null` is treated as empty. Nested values fail with
    /// `EngineError::Decode`, unknown keys with `EngineError::UnknownField`.
    pub fn from_value(value: &Value) -> Result<Self, EngineError> {
        let object = value.as_object().ok_or_else(|| {
            EngineError::Decode(format!("expected a JSON object, got {}", value))
        })?;

        let mut entries = Vec::with_capacity(object.len());
        for (name, raw) in object {
            let key = FieldKey::from_str(name)?;
            let text = match raw {
                Value::Null => continue,
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(EngineError::Decode(format!(
                        "field '{}' must be a scalar",
                        name
                    )))
                }
            };
            if !text.is_empty() {
                entries.push((key, text));
            }
        }

        Ok(Self { entries })
    }

    /// Decodes the raw argument string of a tool call
    pub fn from_arguments(arguments: &str) -> Result<Self, EngineError> {
        let value: Value = serde_json::from_str(arguments)
            .map_err(|e| EngineError::Decode(format!("invalid tool arguments: {}", e)))?;
        Self::from_value(&value)
    }

    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Entries that become equality clauses as-is
    pub fn literal_entries(&self) -> impl Iterator<Item = &(FieldKey, String)> {
        self.entries.iter().filter(|(k, _)| !k.is_synthetic())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Appends `padding` when the predicate has exactly one clause.
///
/// The store rejects a single-operand `$or`; the padding clause names a value
/// no real course carries, so the match set is unchanged.
pub fn pad_single_clause(predicate: &mut FilterPredicate, padding: Option<&Clause>) {
    if predicate.len() == 1 {
        if let Some(clause) = padding {
            predicate.push(clause.clone());
        }
    }
}

/// Turns extracted field maps into store predicates
#[derive(Clone)]
pub struct FilterBuilder {
    collections: CatalogCollections,
    padding: Option<Clause>,
}

impl FilterBuilder {
    pub fn new(collections: CatalogCollections, config: &FilterConfig) -> Self {
        Self {
            collections,
            padding: config
                .padding_clause()
                .map(|p| Clause::new(p.field, p.value.clone())),
        }
    }

    pub fn collections(&self) -> &CatalogCollections {
        &self.collections
    }

    /// Builds the disjunctive predicate for `fields`.
    ///
    /// A canonicalization lookup failure aborts the build; no partial
    /// predicate is returned.
    pub async fn build(&self, fields: &FieldMap) -> Result<FilterPredicate, EngineError> {
        let mut predicate = FilterPredicate::default();

        for (key, value) in fields.literal_entries() {
            predicate.push(Clause::new(*key, value.clone()));
        }

        let fuzzy = [
            (FieldKey::InstructorFullName, ReferenceKind::Instructor),
            (FieldKey::TitleShortDesc, ReferenceKind::Subject),
        ];
        for (key, kind) in fuzzy {
            let Some(text) = fields.get(key) else {
                continue;
            };
            match canonicalize(&self.collections, kind, text).await? {
                Some(canonical) => predicate.push(Clause::new(key, canonical)),
                None => debug!("No canonical {} for '{}', skipping", kind, text),
            }
        }

        pad_single_clause(&mut predicate, self.padding.as_ref());

        debug!("Built predicate with {} clauses", predicate.len());
        Ok(predicate)
    }

    /// Decodes `arguments` and builds the predicate
    pub async fn build_from_arguments(
        &self,
        arguments: &str,
    ) -> Result<FilterPredicate, EngineError> {
        let fields = FieldMap::from_arguments(arguments)?;
        self.build(&fields).await
    }
}
