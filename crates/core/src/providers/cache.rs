use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::RunConfigurationContext;
use crate::error::Result;
use crate::producer::UiContext;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    element_key: String,
    modification_stamp: u64,
    sync_generation: u64,
    selected_tests: Vec<String>,
}

/// Memoizes provider answers per (element, modification stamp, sync generation, selection).
///
/// Bumping the sync generation invalidates every entry at once. Pending contexts that failed or
/// were cancelled are recomputed instead of served.
pub struct ContextCache {
    entries: Mutex<LruCache<CacheKey, Option<RunConfigurationContext>>>,
    sync_generation: AtomicU64,
}

impl std::fmt::Debug for ContextCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextCache")
            .field("entries", &self.len())
            .field("sync_generation", &self.sync_generation())
            .finish()
    }
}

impl ContextCache {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            sync_generation: AtomicU64::new(0),
        }
    }

    pub fn sync_generation(&self) -> u64 {
        self.sync_generation.load(Ordering::SeqCst)
    }

    /// Starts a new sync generation; older entries are never served again.
    pub fn bump_generation(&self) -> u64 {
        let generation = self.sync_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.entries.lock().clear();
        tracing::debug!("context cache moved to sync generation {}", generation);
        generation
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// The cached answer for `ui`, or the result of `compute`, which is then cached.
    /// The lock is not held while computing. An answer computed across a generation bump is
    /// returned but not stored.
    pub fn get_or_compute<F>(&self, ui: &UiContext, compute: F) -> Result<Option<RunConfigurationContext>>
    where
        F: FnOnce() -> Result<Option<RunConfigurationContext>>,
    {
        let key = CacheKey {
            element_key: ui.source.element.element_key(),
            modification_stamp: ui.source.modification_stamp,
            sync_generation: self.sync_generation(),
            selected_tests: ui.selected_tests.clone(),
        };

        let cached = self.entries.lock().get(&key).cloned();
        match cached {
            Some(Some(context)) if context.is_failed() => {
                tracing::debug!("cached context for {} failed, recomputing", key.element_key);
            }
            Some(answer) => {
                tracing::debug!("context cache hit for {}", key.element_key);
                return Ok(answer);
            }
            None => {}
        }

        let answer = compute()?;
        let mut entries = self.entries.lock();
        if self.sync_generation() == key.sync_generation {
            entries.put(key, answer.clone());
        } else {
            tracing::debug!("sync generation moved while computing {}, not caching", key.element_key);
        }
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextDetails, KnownContext, PendingContext};
    use crate::error::Error;
    use crate::future::ListenableFuture;
    use crate::types::{BuildCommand, Label, SourceContext, SourceElement, TargetInfo};
    use std::cell::Cell;
    use std::path::PathBuf;

    fn element() -> SourceElement {
        SourceElement::File {
            path: PathBuf::from("pkg/FooTest.java"),
        }
    }

    fn known() -> RunConfigurationContext {
        KnownContext::new(
            TargetInfo::new(Label::new("pkg", "FooTest"), "java_test"),
            ContextDetails::new(element(), BuildCommand::Test),
        )
        .into()
    }

    fn ui(stamp: u64) -> UiContext {
        UiContext::new(SourceContext::new(element()).with_modification_stamp(stamp))
    }

    #[test]
    fn test_hit_until_stamp_or_generation_changes() {
        let cache = ContextCache::new(8);
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok(Some(known()))
        };

        cache.get_or_compute(&ui(1), compute).unwrap();
        cache.get_or_compute(&ui(1), compute).unwrap();
        assert_eq!(calls.get(), 1);

        cache.get_or_compute(&ui(2), compute).unwrap();
        assert_eq!(calls.get(), 2);

        assert_eq!(cache.bump_generation(), 1);
        assert!(cache.is_empty());
        cache.get_or_compute(&ui(2), compute).unwrap();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_selection_is_part_of_the_key() {
        let cache = ContextCache::new(8);
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok(None)
        };

        cache.get_or_compute(&ui(1), compute).unwrap();
        cache
            .get_or_compute(&ui(1).with_selected_tests(["testA"]), compute)
            .unwrap();
        cache.get_or_compute(&ui(1), compute).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_failed_pending_is_recomputed() {
        let cache = ContextCache::new(8);
        let failed: RunConfigurationContext = PendingContext::new(
            ContextDetails::new(element(), BuildCommand::Test),
            ListenableFuture::failed(Error::NoTargetFound("No Bazel target found.".into())),
            "Searching",
            4,
        )
        .into();

        let first = cache.get_or_compute(&ui(1), || Ok(Some(failed.clone()))).unwrap();
        assert!(first.is_some_and(|c| c.is_failed()));

        let second = cache.get_or_compute(&ui(1), || Ok(Some(known()))).unwrap();
        assert!(matches!(second, Some(RunConfigurationContext::Known(_))));
    }

    #[test]
    fn test_answer_outliving_its_generation_is_not_stored() {
        let cache = ContextCache::new(8);
        let answer = cache
            .get_or_compute(&ui(1), || {
                cache.bump_generation();
                Ok(Some(known()))
            })
            .unwrap();
        assert!(matches!(answer, Some(RunConfigurationContext::Known(_))));
        assert!(cache.is_empty());

        let calls = Cell::new(0);
        cache
            .get_or_compute(&ui(1), || {
                calls.set(calls.get() + 1);
                Ok(None)
            })
            .unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = ContextCache::new(8);
        assert!(cache
            .get_or_compute(&ui(1), || Err(Error::Other("boom".into())))
            .is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_is_bounded() {
        let cache = ContextCache::new(2);
        for stamp in 0..5 {
            cache.get_or_compute(&ui(stamp), || Ok(None)).unwrap();
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(ContextCache::new(0).len(), 0);
    }
}
