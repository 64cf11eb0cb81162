//! In-memory collaborators for driving the resolver in tests
//!
//! Every fake records what it was asked so tests can assert on the interaction, and the target
//! lookup can hold its answers back until the test releases them.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use runtarget_core::future::{ListenableFuture, Promise, ProgressIndicator};
use runtarget_core::types::{Label, SourceContext, SourceElement, TargetInfo};
use runtarget_core::{Error, ErrorReporter, TargetChooser, TargetLookup};

enum Query {
    Sources {
        path: String,
        promise: Promise<Vec<TargetInfo>>,
    },
    Wrappers {
        label: Label,
        promise: Promise<Vec<TargetInfo>>,
    },
    Info {
        label: Label,
        promise: Promise<Option<TargetInfo>>,
    },
}

#[derive(Default)]
struct LookupState {
    targets: Vec<TargetInfo>,
    wrappers: HashMap<Label, Vec<TargetInfo>>,
    queued: Vec<Query>,
}

impl LookupState {
    fn targets_for_path(&self, path: &str) -> Vec<TargetInfo> {
        self.targets
            .iter()
            .filter(|t| t.sources.iter().any(|s| s == path))
            .cloned()
            .collect()
    }

    fn wrappers_of(&self, label: &Label) -> Vec<TargetInfo> {
        self.wrappers.get(label).cloned().unwrap_or_default()
    }

    fn target_info(&self, label: &Label) -> Option<TargetInfo> {
        self.targets.iter().find(|t| &t.label == label).cloned()
    }
}

/// A target table answering by source path.
///
/// Immediate by default. A [`deferred`](FakeLookup::deferred) lookup queues every query until
/// [`release`](FakeLookup::release) answers them from the table as it is at that moment.
pub struct FakeLookup {
    state: Mutex<LookupState>,
    deferred: bool,
    queries: AtomicUsize,
}

impl FakeLookup {
    pub fn new(targets: Vec<TargetInfo>) -> Self {
        Self {
            state: Mutex::new(LookupState {
                targets,
                ..LookupState::default()
            }),
            deferred: false,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    pub fn with_wrappers(self, label: Label, wrappers: Vec<TargetInfo>) -> Self {
        self.state.lock().wrappers.insert(label, wrappers);
        self
    }

    /// Replaces the table, as a sync would.
    pub fn set_targets(&self, targets: Vec<TargetInfo>) {
        self.state.lock().targets = targets;
    }

    /// Number of queries received so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn queued(&self) -> usize {
        self.state.lock().queued.len()
    }

    /// Answers every queued query. Returns how many there were.
    pub fn release(&self) -> usize {
        let (queued, answers) = {
            let mut state = self.state.lock();
            let queued = std::mem::take(&mut state.queued);
            let answers: Vec<_> = queued
                .iter()
                .map(|query| match query {
                    Query::Sources { path, .. } => Answer::Targets(state.targets_for_path(path)),
                    Query::Wrappers { label, .. } => Answer::Targets(state.wrappers_of(label)),
                    Query::Info { label, .. } => Answer::Info(state.target_info(label)),
                })
                .collect();
            (queued, answers)
        };

        let count = queued.len();
        // Listeners run on completion; no lock may be held here
        for (query, answer) in queued.into_iter().zip(answers) {
            match (query, answer) {
                (Query::Sources { promise, .. }, Answer::Targets(targets))
                | (Query::Wrappers { promise, .. }, Answer::Targets(targets)) => {
                    promise.complete(targets);
                }
                (Query::Info { promise, .. }, Answer::Info(info)) => {
                    promise.complete(info);
                }
                _ => {}
            }
        }
        count
    }

    /// Releases until no query is left, including the ones issued by completion listeners.
    pub fn release_all(&self) -> usize {
        let mut total = 0;
        loop {
            let released = self.release();
            if released == 0 {
                return total;
            }
            total += released;
        }
    }

    /// Fails every queued query with an [`Error::Other`] carrying `message`.
    pub fn fail(&self, message: &str) -> usize {
        let queued = std::mem::take(&mut self.state.lock().queued);
        let count = queued.len();
        for query in queued {
            let error = Error::Other(message.to_string());
            match query {
                Query::Sources { promise, .. } | Query::Wrappers { promise, .. } => {
                    promise.fail(error);
                }
                Query::Info { promise, .. } => {
                    promise.fail(error);
                }
            }
        }
        count
    }

    fn answer<T, F>(&self, immediate: F, queue: impl FnOnce(Promise<T>) -> Query) -> ListenableFuture<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce(&LookupState) -> T,
    {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if !self.deferred {
            return ListenableFuture::ready(immediate(&state));
        }
        let promise = Promise::new();
        let future = promise.future();
        state.queued.push(queue(promise));
        future
    }
}

enum Answer {
    Targets(Vec<TargetInfo>),
    Info(Option<TargetInfo>),
}

impl TargetLookup for FakeLookup {
    fn targets_for_source(&self, source: &SourceContext) -> ListenableFuture<Vec<TargetInfo>> {
        let path = source.path().to_string_lossy().replace('\\', "/");
        let key = path.clone();
        self.answer(
            move |state| state.targets_for_path(&key),
            move |promise| Query::Sources { path, promise },
        )
    }

    fn wrappers_of(&self, label: &Label) -> ListenableFuture<Vec<TargetInfo>> {
        let key = label.clone();
        let label = label.clone();
        self.answer(
            move |state| state.wrappers_of(&key),
            move |promise| Query::Wrappers { label, promise },
        )
    }

    fn target_info(&self, label: &Label) -> ListenableFuture<Option<TargetInfo>> {
        let key = label.clone();
        let label = label.clone();
        self.answer(
            move |state| state.target_info(&key),
            move |promise| Query::Info { label, promise },
        )
    }
}

/// Progress indicator recording its messages, with a cancel button
#[derive(Debug, Default)]
pub struct RecordingProgress {
    messages: Mutex<Vec<String>>,
    stops: AtomicUsize,
    cancelled: AtomicBool,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl ProgressIndicator for RecordingProgress {
    fn start(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Chooser with a preset answer; `None` dismisses every choice.
#[derive(Debug, Default)]
pub struct FixedChooser {
    answer: Option<usize>,
    offered: Mutex<Vec<Vec<Label>>>,
}

impl FixedChooser {
    pub fn pick(index: usize) -> Self {
        Self {
            answer: Some(index),
            ..Self::default()
        }
    }

    pub fn dismiss() -> Self {
        Self::default()
    }

    /// Candidate labels of every choice offered so far
    pub fn offered(&self) -> Vec<Vec<Label>> {
        self.offered.lock().clone()
    }
}

impl TargetChooser for FixedChooser {
    fn choose(&self, _element: &SourceElement, candidates: &[TargetInfo]) -> Option<usize> {
        self.offered
            .lock()
            .push(candidates.iter().map(|t| t.label.clone()).collect());
        self.answer.filter(|index| *index < candidates.len())
    }
}

/// Event delivered to the user-facing error channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reported {
    NoTargetFound(String),
    LookupFailed(String),
}

#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<Reported>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Reported> {
        self.events.lock().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn no_target_found(&self, message: &str) {
        tracing::debug!("reported no target: {}", message);
        self.events
            .lock()
            .push(Reported::NoTargetFound(message.to_string()));
    }

    fn lookup_failed(&self, error: &Error) {
        self.events.lock().push(Reported::LookupFailed(error.to_string()));
    }
}

/// A test target built from `sources`
pub fn test_target(label: &str, kind: &str, sources: &[&str]) -> TargetInfo {
    let label = Label::parse(label).unwrap_or_else(|_| Label::new("", label));
    TargetInfo::new(label, kind).with_sources(sources.iter().copied())
}
