//! Time-scored sorted-set index

use chrono::{DateTime, Utc};

use super::backend::{KeyValueBackend, ScoreBound};
use super::store::StoreError;

/// Score of a point in time: whole microseconds since the epoch
///
/// Sub-microsecond precision is dropped, so distinct instants can share a
/// score. Range queries report entries at the bound's own score as
/// [`IndexHit::Boundary`] for the caller to settle against the record.
pub fn time_score(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64
}

/// An id returned by a range query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexHit {
    /// The score alone places the entry inside the range
    Settled(String),
    /// The entry shares the bound's microsecond; compare exact times
    Boundary(String),
}

impl IndexHit {
    pub fn id(&self) -> &str {
        match self {
            IndexHit::Settled(id) | IndexHit::Boundary(id) => id,
        }
    }

    pub fn into_id(self) -> String {
        match self {
            IndexHit::Settled(id) | IndexHit::Boundary(id) => id,
        }
    }
}

/// A sorted set of ids scored by absolute time
///
/// Backs the runnable queues and every slug correlation index.
pub struct SchedulingIndex<'a, B: KeyValueBackend> {
    backend: &'a B,
    key: String,
}

impl<'a, B: KeyValueBackend> SchedulingIndex<'a, B> {
    pub fn new(backend: &'a B, key: String) -> Self {
        Self { backend, key }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Insert `id` at `at`, rescoring it if already present
    pub async fn add(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.backend
            .sorted_set_add(&self.key, id, time_score(at))
            .await
    }

    pub async fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.backend.sorted_set_remove(&self.key, id).await
    }

    /// Entries at or before `as_of`, earliest first
    ///
    /// Entries within the same microsecond as `as_of` come back as
    /// [`IndexHit::Boundary`]; they may lie up to 999ns after it.
    pub async fn due(&self, as_of: DateTime<Utc>) -> Result<Vec<IndexHit>, StoreError> {
        let bound = time_score(as_of);
        let settled = self.range(ScoreBound::NegInfinity, ScoreBound::Inclusive(bound - 1.0));
        let boundary = self.range(ScoreBound::Inclusive(bound), ScoreBound::Inclusive(bound));
        let (settled, boundary) = futures::try_join!(settled, boundary)?;

        Ok(settled
            .into_iter()
            .map(IndexHit::Settled)
            .chain(boundary.into_iter().map(IndexHit::Boundary))
            .collect())
    }

    /// Entries at or after `as_of`, earliest first
    ///
    /// Entries within the same microsecond as `as_of` come back as
    /// [`IndexHit::Boundary`]; they may lie up to 999ns before it.
    pub async fn since(&self, as_of: DateTime<Utc>) -> Result<Vec<IndexHit>, StoreError> {
        let bound = time_score(as_of);
        let boundary = self.range(ScoreBound::Inclusive(bound), ScoreBound::Inclusive(bound));
        let settled = self.range(ScoreBound::Inclusive(bound + 1.0), ScoreBound::PosInfinity);
        let (boundary, settled) = futures::try_join!(boundary, settled)?;

        Ok(boundary
            .into_iter()
            .map(IndexHit::Boundary)
            .chain(settled.into_iter().map(IndexHit::Settled))
            .collect())
    }

    async fn range(&self, min: ScoreBound, max: ScoreBound) -> Result<Vec<String>, StoreError> {
        self.backend
            .sorted_set_range_by_score(&self.key, min, max)
            .await
    }
}
