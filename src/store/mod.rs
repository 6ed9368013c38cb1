//! Document storage contract.
//!
//! The engine treats persistence as an opaque document store: insert many,
//! find by filter, delete by filter. Documents are JSON objects and filters
//! match by field-value equality; document identity is never used.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::EngineError;

pub type Document = Map<String, Value>;

/// Field-equality filter. An empty filter matches every document.
pub type Filter = Map<String, Value>;

pub trait DocumentStore {
    fn insert_many(&mut self, documents: Vec<Document>) -> Result<usize, EngineError>;
    fn find(&self, filter: &Filter) -> Result<Vec<Document>, EngineError>;
    /// Returns the number of documents removed.
    fn delete(&mut self, filter: &Filter) -> Result<usize, EngineError>;
}

/// In-process store; insertion order is preserved.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Vec<Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn insert_many(&mut self, documents: Vec<Document>) -> Result<usize, EngineError> {
        let n = documents.len();
        self.documents.extend(documents);
        Ok(n)
    }

    fn find(&self, filter: &Filter) -> Result<Vec<Document>, EngineError> {
        Ok(self.documents.iter().filter(|d| matches(d, filter)).cloned().collect())
    }

    fn delete(&mut self, filter: &Filter) -> Result<usize, EngineError> {
        let before = self.documents.len();
        self.documents.retain(|d| !matches(d, filter));
        Ok(before - self.documents.len())
    }
}

fn matches(document: &Document, filter: &Filter) -> bool {
    filter.iter().all(|(key, expected)| document.get(key) == Some(expected))
}

/// Build a filter from `(field, value)` pairs.
pub fn filter<I, K, V>(pairs: I) -> Filter
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

pub fn to_documents<R: Serialize>(records: &[R]) -> Result<Vec<Document>, EngineError> {
    records
        .iter()
        .map(|r| match serde_json::to_value(r) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(EngineError::Parse(format!("record serialized to non-object: {other}"))),
            Err(e) => Err(EngineError::Parse(format!("failed to serialize record: {e}"))),
        })
        .collect()
}

pub fn from_documents<R: DeserializeOwned>(documents: Vec<Document>) -> Result<Vec<R>, EngineError> {
    documents
        .into_iter()
        .map(|d| {
            serde_json::from_value(Value::Object(d))
                .map_err(|e| EngineError::Parse(format!("failed to decode stored record: {e}")))
        })
        .collect()
}
