use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::attribution::engine::AttributionTable;
use crate::attribution::export::table_to_csv_string;
use crate::narrative::{ApiCredential, Narrative, NarrativeProvider, TableFingerprint};
use crate::BrinsonResult;

/// Content-addressed memo of narratives.
///
/// Keyed by [`TableFingerprint`], so a changed table always misses. Each key
/// owns a `OnceCell`: concurrent callers for the same table share a single
/// in-flight summarization. Failures leave the cell empty and the next caller
/// retries. The key covers the table inputs and attribution scheme; the
/// credential is not part of it.
#[derive(Default)]
pub struct NarrativeCache {
    entries: DashMap<TableFingerprint, Arc<OnceCell<Narrative>>>,
}

impl NarrativeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_summarize<P>(
        &self,
        table: &AttributionTable,
        credential: &ApiCredential,
        provider: &P,
    ) -> BrinsonResult<Narrative>
    where
        P: NarrativeProvider + ?Sized,
    {
        let key = TableFingerprint::of_table(table);
        // Clone the cell out so no map guard is held across the await.
        let cell = Arc::clone(&*self.entries.entry(key).or_default());

        if let Some(hit) = cell.get() {
            debug!(%key, "narrative cache hit");
            return Ok(hit.clone());
        }

        let narrative = cell
            .get_or_try_init(|| async {
                info!(%key, segments = table.len(), "summarizing attribution table");
                let csv = table_to_csv_string(table, b',')?;
                provider.summarize(credential, &csv).await
            })
            .await?;
        Ok(narrative.clone())
    }

    /// Cached narrative for `key`, if a summarization has completed.
    pub fn get(&self, key: &TableFingerprint) -> Option<Narrative> {
        self.entries.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Drop the entry for `key`. Returns whether a completed narrative was removed.
    pub fn invalidate(&self, key: &TableFingerprint) -> bool {
        self.entries
            .remove(key)
            .map(|(_, cell)| cell.initialized())
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of completed narratives.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttributionError;
    use crate::{compute, compute_with, AttributionScheme, SegmentRecord};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct CountingProvider {
        calls: AtomicUsize,
        fail_first: bool,
        last_csv: Mutex<String>,
    }

    impl CountingProvider {
        fn new(fail_first: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first,
                last_csv: Mutex::new(String::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_csv(&self) -> String {
            self.last_csv.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NarrativeProvider for CountingProvider {
        async fn summarize(
            &self,
            _credential: &ApiCredential,
            table_csv: &str,
        ) -> BrinsonResult<Narrative> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_csv.lock().unwrap() = table_csv.to_string();
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_first && n == 0 {
                return Err(AttributionError::Narrative("upstream unavailable".into()));
            }
            let rows = table_csv.lines().count() - 1;
            Ok(Narrative::parse(&format!(
                r#"{{"insights": "{rows} segments", "risks": []}}"#
            )))
        }
    }

    fn table(tech_return: f64) -> AttributionTable {
        compute(&[
            SegmentRecord::new("Tech", 0.30, 0.20, tech_return, 0.05),
            SegmentRecord::new("Energy", 0.70, 0.80, -0.05, 0.02),
        ])
        .unwrap()
    }

    fn key() -> ApiCredential {
        ApiCredential::new("test-key").unwrap()
    }

    #[tokio::test]
    async fn test_second_call_hits_cache() {
        let cache = NarrativeCache::new();
        let provider = CountingProvider::new(false);
        let first = cache.get_or_summarize(&table(0.10), &key(), &provider).await.unwrap();
        let second = cache.get_or_summarize(&table(0.10), &key(), &provider).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.insights, "2 segments");
        assert_eq!(provider.calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_summarization() {
        let cache = NarrativeCache::new();
        let provider = CountingProvider::new(false);
        let t = table(0.10);
        let credential = key();
        let (a, b, c) = tokio::join!(
            cache.get_or_summarize(&t, &credential, &provider),
            cache.get_or_summarize(&t, &credential, &provider),
            cache.get_or_summarize(&t, &credential, &provider),
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert!(c.is_ok());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_new_table_is_new_key() {
        let cache = NarrativeCache::new();
        let provider = CountingProvider::new(false);
        cache.get_or_summarize(&table(0.10), &key(), &provider).await.unwrap();
        cache.get_or_summarize(&table(0.11), &key(), &provider).await.unwrap();
        assert_eq!(provider.calls(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_scheme_is_part_of_the_key() {
        let cache = NarrativeCache::new();
        let provider = CountingProvider::new(false);
        let segments = [SegmentRecord::new("Tech", 0.30, 0.20, 0.10, 0.05)];
        let three = compute_with(&segments, AttributionScheme::ThreeFactor).unwrap();
        let two = compute_with(&segments, AttributionScheme::TwoFactor).unwrap();

        cache.get_or_summarize(&three, &key(), &provider).await.unwrap();
        cache.get_or_summarize(&two, &key(), &provider).await.unwrap();
        assert_eq!(provider.calls(), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(provider.last_csv(), table_to_csv_string(&two, b',').unwrap());
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let cache = NarrativeCache::new();
        let provider = CountingProvider::new(false);
        let t = table(0.10);
        cache.get_or_summarize(&t, &key(), &provider).await.unwrap();

        let fp = TableFingerprint::of_table(&t);
        assert!(cache.get(&fp).is_some());
        assert!(cache.invalidate(&fp));
        assert!(cache.get(&fp).is_none());
        assert!(!cache.invalidate(&fp));

        cache.get_or_summarize(&t, &key(), &provider).await.unwrap();
        assert_eq!(provider.calls(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache = NarrativeCache::new();
        let provider = CountingProvider::new(true);
        let t = table(0.10);
        assert!(cache.get_or_summarize(&t, &key(), &provider).await.is_err());
        assert!(cache.is_empty());
        assert!(cache.get_or_summarize(&t, &key(), &provider).await.is_ok());
        assert_eq!(provider.calls(), 2);
    }
}
