//! Target index served from a JSON file
//!
//! Stands in for a build tool query: every call answers on a background thread after a fixed
//! latency, so the pending paths of the resolver are exercised from the command line as well.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use runtarget_core::future::ListenableFuture;
use runtarget_core::types::{Label, SourceContext, TargetInfo};
use runtarget_core::TargetLookup;

const LATENCY_STEP: Duration = Duration::from_millis(10);

/// `{ "targets": [...], "wrappers": { "//pkg:FooTest": ["//pkg:FooTest_chrome"] } }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetIndex {
    #[serde(default)]
    pub targets: Vec<TargetInfo>,
    /// Wrapped label to the labels of its wrappers, all listed in `targets`
    #[serde(default)]
    pub wrappers: BTreeMap<String, Vec<Label>>,
}

impl TargetIndex {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read target index {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse target index {}", path.display()))
    }

    pub fn find(&self, label: &Label) -> Option<&TargetInfo> {
        self.targets.iter().find(|t| &t.label == label)
    }

    /// Targets listing `path` (workspace-relative, `/` separated) among their sources
    pub fn targets_for_path(&self, path: &str) -> Vec<TargetInfo> {
        self.targets
            .iter()
            .filter(|t| t.sources.iter().any(|s| s == path))
            .cloned()
            .collect()
    }

    pub fn wrappers_of(&self, label: &Label) -> Vec<TargetInfo> {
        let Some(wrappers) = self.wrappers.get(&label.to_string()) else {
            return Vec::new();
        };
        wrappers
            .iter()
            .filter_map(|wrapper| {
                let found = self.find(wrapper).cloned();
                if found.is_none() {
                    debug!("wrapper {} of {} is not in the index", wrapper, label);
                }
                found
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct IndexLookup {
    index: Arc<TargetIndex>,
    latency: Duration,
}

impl IndexLookup {
    pub fn new(index: TargetIndex, latency: Duration) -> Self {
        Self {
            index: Arc::new(index),
            latency,
        }
    }

    pub fn index(&self) -> &TargetIndex {
        &self.index
    }

    fn serve<T, F>(&self, query: F) -> ListenableFuture<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce(&TargetIndex) -> T + Send + 'static,
    {
        let index = Arc::clone(&self.index);
        let latency = self.latency;
        ListenableFuture::spawn("target-index", move |token| {
            let deadline = std::time::Instant::now() + latency;
            while std::time::Instant::now() < deadline {
                if token.is_cancelled() {
                    return Err(runtarget_core::Error::Cancelled);
                }
                std::thread::sleep(LATENCY_STEP.min(latency));
            }
            Ok(query(&index))
        })
    }
}

impl TargetLookup for IndexLookup {
    fn targets_for_source(&self, source: &SourceContext) -> ListenableFuture<Vec<TargetInfo>> {
        let path = source.path().to_string_lossy().replace('\\', "/");
        debug!("querying targets for {}", path);
        self.serve(move |index| index.targets_for_path(&path))
    }

    fn wrappers_of(&self, label: &Label) -> ListenableFuture<Vec<TargetInfo>> {
        let label = label.clone();
        self.serve(move |index| index.wrappers_of(&label))
    }

    fn target_info(&self, label: &Label) -> ListenableFuture<Option<TargetInfo>> {
        let label = label.clone();
        self.serve(move |index| index.find(&label).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"{
        "targets": [
            { "label": "//pkg:FooTest", "kind": "java_test", "sources": ["pkg/FooTest.java"] },
            { "label": "//pkg:FooTest_chrome", "kind": "web_test" }
        ],
        "wrappers": { "//pkg:FooTest": ["//pkg:FooTest_chrome", "//pkg:missing"] }
    }"#;

    #[test]
    fn test_index_queries() {
        let index: TargetIndex = serde_json::from_str(INDEX).unwrap();
        let lookup = IndexLookup::new(index, Duration::from_millis(5));

        let source = SourceContext::new(runtarget_core::SourceElement::File {
            path: "pkg/FooTest.java".into(),
        });
        let future = lookup.targets_for_source(&source);
        let targets = future.wait().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].label.to_string(), "//pkg:FooTest");

        let label = Label::parse("//pkg:FooTest").unwrap();
        let wrappers = lookup.wrappers_of(&label).wait().unwrap();
        assert_eq!(wrappers.len(), 1);
        assert_eq!(wrappers[0].kind, "web_test");

        let missing = Label::parse("//pkg:Nope").unwrap();
        assert_eq!(lookup.target_info(&missing).wait().unwrap(), None);
    }
}
