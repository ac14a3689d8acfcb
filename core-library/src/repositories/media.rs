//! Media repository trait and in-memory implementation

use crate::error::Result;
use crate::models::{ContentHash, MediaRecord, ServiceKey};
use crate::query::SearchContext;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Query interface over the media database.
#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Hashes of every file matching the search, in no particular order.
    async fn query_matching_hashes(&self, search: &SearchContext) -> Result<HashSet<ContentHash>>;

    /// Metadata records for `hashes` on `service_key`.
    ///
    /// Records come back in the order requested; hashes the service does not
    /// hold are left out.
    async fn fetch_media_records(
        &self,
        service_key: &ServiceKey,
        hashes: &[ContentHash],
    ) -> Result<Vec<MediaRecord>>;
}

/// Media repository held entirely in memory.
///
/// Suitable for hosts without a database and for tests.
#[derive(Default)]
pub struct InMemoryMediaRepository {
    services: RwLock<HashMap<ServiceKey, HashMap<ContentHash, MediaRecord>>>,
}

impl InMemoryMediaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a record on a service.
    pub fn insert(&self, service_key: ServiceKey, record: MediaRecord) {
        let mut services = self
            .services
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        services
            .entry(service_key)
            .or_default()
            .insert(record.hash, record);
    }

    /// Remove a record, returning whether it was present.
    pub fn remove(&self, service_key: &ServiceKey, hash: &ContentHash) -> bool {
        let mut services = self
            .services
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        services
            .get_mut(service_key)
            .map_or(false, |records| records.remove(hash).is_some())
    }
}

#[async_trait]
impl MediaRepository for InMemoryMediaRepository {
    async fn query_matching_hashes(&self, search: &SearchContext) -> Result<HashSet<ContentHash>> {
        let services = self
            .services
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        Ok(services
            .get(&search.file_service_key)
            .map(|records| {
                records
                    .values()
                    .filter(|record| search.matches_tags(&record.tags))
                    .map(|record| record.hash)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_media_records(
        &self,
        service_key: &ServiceKey,
        hashes: &[ContentHash],
    ) -> Result<Vec<MediaRecord>> {
        let services = self
            .services
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let Some(records) = services.get(service_key) else {
            return Ok(Vec::new());
        };

        Ok(hashes
            .iter()
            .filter_map(|hash| records.get(hash).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Mime, TagsView};

    fn record(byte: u8, tags: &[&str]) -> MediaRecord {
        MediaRecord::new(
            ContentHash::from_bytes([byte; 32]),
            Mime::Jpeg,
            100 + byte as u64,
            TagsView::new(tags.iter().copied(), Vec::<String>::new()),
        )
    }

    #[tokio::test]
    async fn test_query_filters_by_service_and_tags() {
        let repo = InMemoryMediaRepository::new();
        let local = ServiceKey::local_files();
        let other = ServiceKey::new(b"trash".to_vec());

        repo.insert(local.clone(), record(1, &["series:metroid"]));
        repo.insert(local.clone(), record(2, &["series:zelda"]));
        repo.insert(other, record(3, &["series:metroid"]));

        let search = SearchContext::new(local).with_tag("series:metroid");
        let hashes = repo.query_matching_hashes(&search).await.unwrap();

        assert_eq!(hashes, HashSet::from([ContentHash::from_bytes([1; 32])]));
    }

    #[tokio::test]
    async fn test_fetch_keeps_request_order_and_skips_unknown() {
        let repo = InMemoryMediaRepository::new();
        let local = ServiceKey::local_files();
        repo.insert(local.clone(), record(1, &[]));
        repo.insert(local.clone(), record(2, &[]));

        let wanted = [
            ContentHash::from_bytes([2; 32]),
            ContentHash::from_bytes([9; 32]),
            ContentHash::from_bytes([1; 32]),
        ];
        let records = repo.fetch_media_records(&local, &wanted).await.unwrap();

        let sizes: Vec<u64> = records.iter().map(|r| r.size).collect();
        assert_eq!(sizes, vec![102, 101]);
    }

    #[tokio::test]
    async fn test_remove() {
        let repo = InMemoryMediaRepository::new();
        let local = ServiceKey::local_files();
        repo.insert(local.clone(), record(1, &[]));

        assert!(repo.remove(&local, &ContentHash::from_bytes([1; 32])));
        assert!(!repo.remove(&local, &ContentHash::from_bytes([1; 32])));
        assert!(repo
            .query_matching_hashes(&SearchContext::new(local))
            .await
            .unwrap()
            .is_empty());
    }
}
