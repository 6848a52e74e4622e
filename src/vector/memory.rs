use super::{IndexError, IndexSpec, VectorIndex, VectorRecord};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// In-process index for running without a vector service.
///
/// Enforces the configured dimension and keeps ids in lexicographic order,
/// which is also the order it lists them in.
pub struct MemoryIndex {
    spec: IndexSpec,
    records: Mutex<BTreeMap<String, VectorRecord>>,
}

impl MemoryIndex {
    pub fn new(spec: IndexSpec) -> Self {
        Self { spec, records: Mutex::new(BTreeMap::new()) }
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    async fn ensure(&self) -> Result<(), IndexError> {
        Ok(())
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, IndexError> {
        if let Some(bad) = records.iter().find(|r| r.values.len() != self.spec.dimension) {
            return Err(IndexError::DimensionMismatch {
                id: bad.id.clone(),
                expected: self.spec.dimension,
                actual: bad.values.len(),
            });
        }
        let count = records.len();
        let mut stored = self.records.lock();
        for record in records {
            stored.insert(record.id.clone(), record);
        }
        Ok(count)
    }

    async fn fetch(&self, ids: &[String]) -> Result<Vec<VectorRecord>, IndexError> {
        let stored = self.records.lock();
        Ok(ids.iter().filter_map(|id| stored.get(id).cloned()).collect())
    }

    async fn list_ids(&self, limit: usize) -> Result<Vec<String>, IndexError> {
        Ok(self.records.lock().keys().take(limit).cloned().collect())
    }
}
