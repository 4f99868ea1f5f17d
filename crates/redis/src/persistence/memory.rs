//! In-memory implementation of KeyValueBackend for testing

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::backend::{KeyValueBackend, ScoreBound};
use super::store::StoreError;

/// In-memory implementation of KeyValueBackend
///
/// This is primarily for testing. It stores all data in memory and
/// provides the same per-command semantics as Redis, including score
/// ordering with lexicographic tie-breaks.
///
/// # Example
///
/// ```
/// use everruns_redis::persistence::{InMemoryBackend, IndexedPersistenceProvider};
///
/// let store = IndexedPersistenceProvider::new(InMemoryBackend::new(), "test", false);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    hashes: RwLock<HashMap<String, HashMap<String, String>>>,
    sorted_sets: RwLock<HashMap<String, HashMap<String, f64>>>,
}

impl InMemoryBackend {
    /// Create a new, empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields in a hash
    pub fn hash_len(&self, key: &str) -> usize {
        self.hashes.read().get(key).map_or(0, HashMap::len)
    }

    /// Number of members in a sorted set
    pub fn sorted_set_len(&self, key: &str) -> usize {
        self.sorted_sets.read().get(key).map_or(0, HashMap::len)
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        self.hashes.write().clear();
        self.sorted_sets.write().clear();
    }
}

#[async_trait]
impl KeyValueBackend for InMemoryBackend {
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .hashes
            .read()
            .get(key)
            .and_then(|h| h.get(field))
            .cloned())
    }

    async fn hash_get_many(
        &self,
        key: &str,
        fields: &[String],
    ) -> Result<Vec<Option<String>>, StoreError> {
        let hashes = self.hashes.read();
        let hash = hashes.get(key);
        Ok(fields
            .iter()
            .map(|f| hash.and_then(|h| h.get(f)).cloned())
            .collect())
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.hashes
            .write()
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_set_if_absent(
        &self,
        key: &str,
        field: &str,
        value: &str,
    ) -> Result<bool, StoreError> {
        let mut hashes = self.hashes.write();
        let hash = hashes.entry(key.to_string()).or_default();
        if hash.contains_key(field) {
            return Ok(false);
        }
        hash.insert(field.to_string(), value.to_string());
        Ok(true)
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), StoreError> {
        let mut hashes = self.hashes.write();
        if let Some(hash) = hashes.get_mut(key) {
            hash.remove(field);
            // Redis drops empty keys
            if hash.is_empty() {
                hashes.remove(key);
            }
        }
        Ok(())
    }

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        self.sorted_sets
            .write()
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut sets = self.sorted_sets.write();
        if let Some(set) = sets.get_mut(key) {
            set.remove(member);
            if set.is_empty() {
                sets.remove(key);
            }
        }
        Ok(())
    }

    async fn sorted_set_range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<String>, StoreError> {
        let sets = self.sorted_sets.read();
        let Some(set) = sets.get(key) else {
            return Ok(vec![]);
        };

        let mut hits: Vec<(&String, f64)> = set
            .iter()
            .filter(|(_, score)| min.admits_from_below(**score) && max.admits_from_above(**score))
            .map(|(member, score)| (member, *score))
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));

        Ok(hits.into_iter().map(|(member, _)| member.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_set_if_absent() {
        let backend = InMemoryBackend::new();

        assert!(backend.hash_set_if_absent("h", "f", "1").await.unwrap());
        assert!(!backend.hash_set_if_absent("h", "f", "2").await.unwrap());
        assert_eq!(
            backend.hash_get("h", "f").await.unwrap(),
            Some("1".to_string())
        );
    }

    #[tokio::test]
    async fn test_hash_get_many_aligns_missing_fields() {
        let backend = InMemoryBackend::new();
        backend.hash_set("h", "a", "1").await.unwrap();
        backend.hash_set("h", "c", "3").await.unwrap();

        let fields = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let values = backend.hash_get_many("h", &fields).await.unwrap();
        assert_eq!(
            values,
            vec![Some("1".to_string()), None, Some("3".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_keys_are_dropped() {
        let backend = InMemoryBackend::new();
        backend.hash_set("h", "a", "1").await.unwrap();
        backend.sorted_set_add("z", "m", 1.0).await.unwrap();

        backend.hash_delete("h", "a").await.unwrap();
        backend.sorted_set_remove("z", "m").await.unwrap();

        assert_eq!(backend.hash_len("h"), 0);
        assert_eq!(backend.sorted_set_len("z"), 0);
        assert!(backend.hashes.read().is_empty());
        assert!(backend.sorted_sets.read().is_empty());
    }

    #[tokio::test]
    async fn test_range_orders_by_score_then_member() {
        let backend = InMemoryBackend::new();
        backend.sorted_set_add("z", "b", 1.0).await.unwrap();
        backend.sorted_set_add("z", "a", 1.0).await.unwrap();
        backend.sorted_set_add("z", "c", 0.5).await.unwrap();
        backend.sorted_set_add("z", "d", 9.0).await.unwrap();

        let range = backend
            .sorted_set_range_by_score("z", ScoreBound::NegInfinity, ScoreBound::Inclusive(1.0))
            .await
            .unwrap();
        assert_eq!(range, vec!["c", "a", "b"]);
    }
}
