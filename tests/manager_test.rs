//! Run manager: configuration reuse and sync handling

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use runtarget_core::config::ResolverSettings;
use runtarget_core::future::WaitOptions;
use runtarget_core::types::{SourceContext, SourceElement};
use runtarget_core::{
    Error, ResolveEnv, RunConfiguration, RunConfigurationProducer, RunManager, TargetLookup,
    UiContext,
};
use runtarget_testkit::{
    FakeLookup, FixedChooser, RecordingProgress, RecordingReporter, Reported, test_target,
};

fn java_method(method: &str) -> UiContext {
    UiContext::new(
        SourceContext::new(SourceElement::Method {
            file: PathBuf::from("pkg/Foo.java"),
            class_name: Some("com.pkg.Foo".to_string()),
            name: method.to_string(),
        })
        .with_workspace_path("pkg/Foo.java")
        .marked_test(),
    )
}

fn manager(lookup: &Arc<FakeLookup>) -> RunManager {
    let lookup: Arc<dyn TargetLookup> = Arc::clone(lookup) as Arc<dyn TargetLookup>;
    let producer = Arc::new(RunConfigurationProducer::from_settings(
        Arc::clone(&lookup),
        &ResolverSettings::default(),
    ));
    RunManager::new(producer, lookup)
}

fn launch(
    manager: &RunManager,
    config: &RunConfiguration,
    progress: &RecordingProgress,
) -> Result<(), Error> {
    let chooser = FixedChooser::dismiss();
    let env = ResolveEnv {
        progress,
        chooser: &chooser,
        wait: WaitOptions {
            poll_interval: Duration::from_millis(5),
            timeout: Some(Duration::from_secs(5)),
        },
    };
    manager
        .producer()
        .prepare_for_launch(config, &env, &RecordingReporter::new())
}

fn foo_test(kind: &str) -> Vec<runtarget_core::TargetInfo> {
    vec![test_target("//pkg:FooTest", kind, &["pkg/Foo.java"])]
}

#[test]
fn test_same_action_reuses_configuration() {
    let lookup = Arc::new(FakeLookup::new(foo_test("java_test")));
    let manager = manager(&lookup);

    let first = manager.find_or_create(&java_method("testBar")).unwrap().unwrap();
    let queries = lookup.query_count();
    let again = manager.find_or_create(&java_method("testBar")).unwrap().unwrap();

    assert!(first.ptr_eq(&again));
    assert_eq!(manager.len(), 1);
    // Served from the context cache
    assert_eq!(lookup.query_count(), queries);

    let other = manager.find_or_create(&java_method("testBaz")).unwrap().unwrap();
    assert!(!other.ptr_eq(&first));
    assert_eq!(manager.len(), 2);
}

#[test]
fn test_user_flags_do_not_prevent_reuse() {
    let lookup = Arc::new(FakeLookup::new(foo_test("java_test")));
    let manager = manager(&lookup);

    let config = manager.find_or_create(&java_method("testBar")).unwrap().unwrap();
    let mut flags = config.flags();
    flags.push("--runs_per_test=5".to_string());
    config.set_flags(flags);
    config.set_name("my run");

    let again = manager.find_or_create(&java_method("testBar")).unwrap().unwrap();
    assert!(again.ptr_eq(&config));
}

#[test]
fn test_existing_configuration_filters_reuse() {
    let lookup = Arc::new(FakeLookup::new(foo_test("java_test")));
    let manager = manager(&lookup);

    let bar = manager.find_or_create(&java_method("testBar")).unwrap().unwrap();
    let baz = manager.find_or_create(&java_method("testBaz")).unwrap().unwrap();

    let from_bar = manager
        .find_or_create(&java_method("testBar").with_existing(bar.clone()))
        .unwrap()
        .unwrap();
    assert!(from_bar.ptr_eq(&bar));

    // Invoked from another configuration: the matching one must not be picked up
    let from_baz = manager
        .find_or_create(&java_method("testBar").with_existing(baz))
        .unwrap()
        .unwrap();
    assert!(!from_baz.ptr_eq(&bar));
    assert_eq!(manager.len(), 3);
}

#[test]
fn test_sync_removes_configurations_without_target() {
    let lookup = Arc::new(FakeLookup::new(Vec::new()).deferred());
    let manager = manager(&lookup);

    let config = manager.find_or_create(&java_method("testBar")).unwrap().unwrap();
    assert!(config.is_pending());
    lookup.release_all();

    let report = manager.on_sync();
    assert_eq!(report.sync_generation, 1);
    assert_eq!(report.removed, vec![config.name()]);
    assert!(manager.is_empty());
}

#[test]
fn test_sync_keeps_running_setups() {
    let lookup = Arc::new(FakeLookup::new(foo_test("java_test")).deferred());
    let manager = manager(&lookup);

    let config = manager.find_or_create(&java_method("testBar")).unwrap().unwrap();
    let report = manager.on_sync();
    assert!(report.removed.is_empty());
    assert_eq!(manager.len(), 1);

    lookup.release_all();
    assert!(!config.is_pending());
    assert_eq!(config.target_patterns(), vec!["//pkg:FooTest".to_string()]);
}

#[test]
fn test_sync_refreshes_kind_and_invalidates_cache() {
    let lookup = Arc::new(FakeLookup::new(foo_test("java_test")));
    let manager = manager(&lookup);

    let config = manager.find_or_create(&java_method("testBar")).unwrap().unwrap();
    assert_eq!(config.target_kind().as_deref(), Some("java_test"));
    assert_eq!(manager.producer().cache().len(), 1);

    lookup.set_targets(foo_test("kt_jvm_test"));
    let report = manager.on_sync();
    assert_eq!(report.refreshed, 1);
    assert_eq!(config.target_kind().as_deref(), Some("kt_jvm_test"));
    assert!(manager.producer().cache().is_empty());

    // Recomputed against the new sync, still the same configuration
    let queries = lookup.query_count();
    let again = manager.find_or_create(&java_method("testBar")).unwrap().unwrap();
    assert!(again.ptr_eq(&config));
    assert!(lookup.query_count() > queries);
}

#[test]
fn test_cancelled_setup_is_retried_on_next_action() {
    let lookup = Arc::new(FakeLookup::new(foo_test("java_test")).deferred());
    let manager = manager(&lookup);

    let config = manager.find_or_create(&java_method("testBar")).unwrap().unwrap();
    let cancelled = RecordingProgress::new();
    cancelled.cancel();
    assert!(matches!(launch(&manager, &config, &cancelled), Err(Error::Cancelled)));
    assert!(config.is_pending());

    let again = manager.find_or_create(&java_method("testBar")).unwrap().unwrap();
    assert!(again.ptr_eq(&config));
    assert_eq!(manager.len(), 1);

    lookup.release_all();
    launch(&manager, &config, &RecordingProgress::new()).unwrap();
    assert!(!config.is_pending());
    assert_eq!(config.target_patterns(), vec!["//pkg:FooTest".to_string()]);
}

#[test]
fn test_missing_target_is_looked_up_again() {
    let lookup = Arc::new(FakeLookup::new(Vec::new()).deferred());
    let manager = manager(&lookup);

    let config = manager.find_or_create(&java_method("testBar")).unwrap().unwrap();
    lookup.release_all();
    let reporter = RecordingReporter::new();
    let env_progress = RecordingProgress::new();
    let chooser = FixedChooser::dismiss();
    let env = ResolveEnv {
        progress: &env_progress,
        chooser: &chooser,
        wait: WaitOptions::default(),
    };
    assert!(manager.producer().prepare_for_launch(&config, &env, &reporter).is_err());
    assert_eq!(
        reporter.events(),
        vec![Reported::NoTargetFound("No Bazel target found.".to_string())]
    );

    // The target shows up after the user fixed the BUILD file
    lookup.set_targets(foo_test("java_test"));
    let again = manager.find_or_create(&java_method("testBar")).unwrap().unwrap();
    assert!(again.ptr_eq(&config));

    lookup.release_all();
    launch(&manager, &config, &RecordingProgress::new()).unwrap();
    assert_eq!(config.target_patterns(), vec!["//pkg:FooTest".to_string()]);
}
