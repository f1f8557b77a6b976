//! 依赖注入容器端到端测试

use config_abstractions::{
    config_enum, ConfigValue, ConfigurationManager, ConfigurationSection, Schema, ValueTag,
};
use config_impl::FileConfigurationManager;
use di_abstractions::{
    BeanMethod, ComponentDescriptor, ComponentRegistry, ConfigCondition, ConfigurationSource,
    Injected, Parameters, ScanScope,
};
use di_impl::Injector;
use infrastructure_common::DependencyError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

type EventLog = Arc<Mutex<Vec<String>>>;

fn configuration(folder: &TempDir) -> Arc<dyn ConfigurationManager> {
    Arc::new(FileConfigurationManager::new(folder.path()))
}

fn scope_of(descriptors: impl IntoIterator<Item = ComponentDescriptor>) -> ScanScope {
    let mut scope = ScanScope::new("integration");
    for descriptor in descriptors {
        scope.register(descriptor).unwrap();
    }
    scope
}

struct Repo;

struct Service {
    repo: Arc<Repo>,
}

#[test]
fn test_shared_dependency_is_constructed_once() {
    let folder = TempDir::new().unwrap();
    let constructed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&constructed);

    let scope = scope_of([
        ComponentDescriptor::service::<Service>()
            .constructor(Parameters::new().dependency::<Repo>("repo"), |arguments| {
                Ok(Service {
                    repo: arguments.instance::<Repo>(0)?,
                })
            })
            .build(),
        ComponentDescriptor::component::<Repo>()
            .constructor(Parameters::new(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Repo)
            })
            .build(),
    ]);

    let injector = Injector::new(scope, configuration(&folder));
    injector.inject().unwrap();

    let registry = injector.registry();
    let service = registry.get::<Service>().unwrap();
    let repo = registry.get::<Repo>().unwrap();
    assert!(Arc::ptr_eq(&service.repo, &repo));
    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 2);
}

struct First {
    _next: Arc<Second>,
}

struct Second {
    _next: Arc<Third>,
}

struct Third {
    _next: Arc<First>,
}

#[test]
fn test_three_cycle_fails_before_any_construction() {
    let folder = TempDir::new().unwrap();
    let constructed = Arc::new(AtomicUsize::new(0));
    let (a, b, c) = (
        Arc::clone(&constructed),
        Arc::clone(&constructed),
        Arc::clone(&constructed),
    );

    let scope = scope_of([
        ComponentDescriptor::component::<First>()
            .constructor(Parameters::new().dependency::<Second>("next"), move |arguments| {
                a.fetch_add(1, Ordering::SeqCst);
                Ok(First {
                    _next: arguments.instance::<Second>(0)?,
                })
            })
            .build(),
        ComponentDescriptor::component::<Second>()
            .constructor(Parameters::new().dependency::<Third>("next"), move |arguments| {
                b.fetch_add(1, Ordering::SeqCst);
                Ok(Second {
                    _next: arguments.instance::<Third>(0)?,
                })
            })
            .build(),
        ComponentDescriptor::component::<Third>()
            .constructor(Parameters::new().dependency::<First>("next"), move |arguments| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(Third {
                    _next: arguments.instance::<First>(0)?,
                })
            })
            .build(),
    ]);

    let injector = Injector::new(scope, configuration(&folder));
    let error = injector.inject().unwrap_err();

    match error {
        DependencyError::CircularDependency { type_name } => {
            assert!(type_name.ends_with("First"), "{type_name}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(constructed.load(Ordering::SeqCst), 0);
    assert!(injector.registry().is_empty());
}

struct Metrics;

struct Legacy;

struct Beta;

#[test]
fn test_conditional_gates_follow_configuration() {
    let folder = TempDir::new().unwrap();
    std::fs::write(folder.path().join("config.yml"), "feature:\n  enabled: false\n").unwrap();

    let scope = scope_of([
        ComponentDescriptor::component::<Metrics>()
            .constructor(Parameters::new(), |_| Ok(Metrics))
            .conditional_on(ConfigCondition::property("metrics.enabled", "true").match_if_missing(true))
            .build(),
        ComponentDescriptor::component::<Legacy>()
            .constructor(Parameters::new(), |_| Ok(Legacy))
            .conditional_on(ConfigCondition::property("feature.enabled", "true"))
            .build(),
        ComponentDescriptor::component::<Beta>()
            .constructor(Parameters::new(), |_| Ok(Beta))
            .conditional_on(ConfigCondition::property("feature.enabled", "false"))
            .build(),
    ]);

    let injector = Injector::new(scope, configuration(&folder));
    injector.inject().unwrap();

    let registry = injector.registry();
    assert!(registry.get::<Metrics>().is_some());
    assert!(registry.get::<Legacy>().is_none());
    assert!(registry.get::<Beta>().is_some());
}

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Test,
    Live,
}

config_enum!(Mode { Test => "TEST", Live => "LIVE" });

#[derive(Debug, Clone, Default)]
struct TestSection {
    test: ConfigValue<String>,
    test_nr: ConfigValue<i64>,
}

impl ConfigurationSection for TestSection {
    fn schema() -> Schema<Self> {
        Schema::<Self>::new()
            .value(ValueTag::field("test"), |section| &section.test)
            .value(ValueTag::field("testNr"), |section| &section.test_nr)
    }
}

struct PluginSettings {
    section: ConfigValue<TestSection>,
    test_nr: ConfigValue<i64>,
    mode: ConfigValue<Mode>,
    untouched: ConfigValue<String>,
}

impl PluginSettings {
    fn descriptor() -> ComponentDescriptor {
        ComponentDescriptor::configuration::<PluginSettings>(ConfigurationSource::yaml("plugin.yml"))
            .constructor(Parameters::new(), |_| {
                Ok(PluginSettings {
                    section: ConfigValue::new(TestSection {
                        test: ConfigValue::new("default".to_string()),
                        test_nr: ConfigValue::new(5),
                    }),
                    test_nr: ConfigValue::new(1),
                    mode: ConfigValue::new(Mode::Live),
                    untouched: ConfigValue::new("default".to_string()),
                })
            })
            .section(ValueTag::field("section").path("test-section"), |settings| {
                &settings.section
            })
            .value(ValueTag::field("testNr"), |settings| &settings.test_nr)
            .enumeration(ValueTag::field("mode"), |settings| &settings.mode)
            .value(ValueTag::field("untouched"), |settings| &settings.untouched)
            .build()
    }
}

const PLUGIN_DOCUMENT: &str = "\
test-section:
  test: from-file
  test-nr: 42
test-nr: 7
mode: TEST
";

#[test]
fn test_configuration_type_binds_derived_paths() {
    let folder = TempDir::new().unwrap();
    std::fs::write(folder.path().join("plugin.yml"), PLUGIN_DOCUMENT).unwrap();

    let injector = Injector::new(scope_of([PluginSettings::descriptor()]), configuration(&folder));
    injector.inject().unwrap();

    let settings = injector.registry().get::<PluginSettings>().unwrap();
    let section = settings.section.get();
    assert_eq!(section.test.get(), "from-file");
    assert_eq!(section.test_nr.get(), 42);
    assert_eq!(settings.test_nr.get(), 7);
    assert_eq!(settings.mode.get(), Mode::Test);
    assert_eq!(settings.untouched.get(), "default");
}

#[test]
fn test_unknown_enum_literal_fails_injection() {
    let folder = TempDir::new().unwrap();
    std::fs::write(folder.path().join("plugin.yml"), "mode: UNKNOWN\n").unwrap();

    let injector = Injector::new(scope_of([PluginSettings::descriptor()]), configuration(&folder));
    let error = injector.inject().unwrap_err();

    match error {
        DependencyError::FailedInjection { target, .. } => {
            assert!(target.contains("mode"), "{target}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_configuration_file_is_created_from_defaults() {
    let folder = TempDir::new().unwrap();

    let injector = Injector::new(scope_of([PluginSettings::descriptor()]), configuration(&folder));
    injector.inject().unwrap();

    let written = std::fs::read_to_string(folder.path().join("plugin.yml")).unwrap();
    let document: serde_json::Value = serde_yaml::from_str(&written).unwrap();
    assert_eq!(document["test-section"]["test"], "default");
    assert_eq!(document["test-section"]["test-nr"], 5);
    assert_eq!(document["test-nr"], 1);
    assert_eq!(document["mode"], "LIVE");

    let settings = injector.registry().get::<PluginSettings>().unwrap();
    assert_eq!(settings.section.get().test_nr.get(), 5);
    assert_eq!(settings.mode.get(), Mode::Live);
}

#[test]
fn test_reload_rebinds_configuration_in_place() {
    let folder = TempDir::new().unwrap();
    std::fs::write(folder.path().join("plugin.yml"), PLUGIN_DOCUMENT).unwrap();

    let injector = Injector::new(scope_of([PluginSettings::descriptor()]), configuration(&folder));
    injector.inject().unwrap();
    let before = injector.registry().get::<PluginSettings>().unwrap();

    std::fs::write(
        folder.path().join("plugin.yml"),
        PLUGIN_DOCUMENT.replace("test-nr: 7", "test-nr: 99"),
    )
    .unwrap();
    assert_eq!(injector.reload_configurations().unwrap(), 1);

    let after = injector.registry().get::<PluginSettings>().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after.test_nr.get(), 99);
    assert_eq!(after.section.get().test_nr.get(), 42);
}

struct Clock;

struct Store {
    clock: Injected<Clock>,
    log: EventLog,
}

struct Reporter {
    store: Arc<Store>,
    log: EventLog,
}

#[test]
fn test_post_construct_runs_after_dependency_is_wired() {
    let folder = TempDir::new().unwrap();
    let log: EventLog = Arc::default();
    let (store_log, reporter_log) = (Arc::clone(&log), Arc::clone(&log));

    let scope = scope_of([
        ComponentDescriptor::service::<Reporter>()
            .constructor(Parameters::new().dependency::<Store>("store"), move |arguments| {
                reporter_log.lock().push("construct Reporter".to_string());
                Ok(Reporter {
                    store: arguments.instance::<Store>(0)?,
                    log: Arc::clone(&reporter_log),
                })
            })
            .post_construct("ready", |reporter| {
                if !reporter.store.clock.is_set() {
                    return Err("依赖尚未完成注入".into());
                }
                reporter.log.lock().push("Reporter ready".to_string());
                Ok(())
            })
            .build(),
        ComponentDescriptor::component::<Store>()
            .constructor(Parameters::new(), move |_| {
                store_log.lock().push("construct Store".to_string());
                Ok(Store {
                    clock: Injected::new(),
                    log: Arc::clone(&store_log),
                })
            })
            .inject::<Clock>("clock", |store| &store.clock)
            .post_construct("ready", |store| {
                store.log.lock().push("Store ready".to_string());
                Ok(())
            })
            .build(),
        ComponentDescriptor::component::<Clock>()
            .constructor(Parameters::new(), |_| Ok(Clock))
            .build(),
    ]);

    let injector = Injector::new(scope, configuration(&folder));
    injector.inject().unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "construct Store".to_string(),
            "construct Reporter".to_string(),
            "Store ready".to_string(),
            "Reporter ready".to_string(),
        ]
    );
}

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

struct English;

impl Greeter for English {
    fn greet(&self) -> String {
        "hello".to_string()
    }
}

struct French;

impl Greeter for French {
    fn greet(&self) -> String {
        "bonjour".to_string()
    }
}

struct Host {
    greeter: Arc<dyn Greeter>,
}

fn english() -> ComponentDescriptor {
    ComponentDescriptor::component::<English>()
        .constructor(Parameters::new(), |_| Ok(English))
        .provides::<dyn Greeter>(|english| english)
        .build()
}

fn host() -> ComponentDescriptor {
    ComponentDescriptor::service::<Host>()
        .constructor(Parameters::new().dependency::<dyn Greeter>("greeter"), |arguments| {
            Ok(Host {
                greeter: arguments.instance::<dyn Greeter>(0)?,
            })
        })
        .build()
}

#[test]
fn test_capability_dependency_is_the_concrete_instance() {
    let folder = TempDir::new().unwrap();
    let injector = Injector::new(scope_of([host(), english()]), configuration(&folder));
    injector.inject().unwrap();

    let registry = injector.registry();
    let host = registry.get::<Host>().unwrap();
    let english = registry.get::<English>().unwrap();
    assert_eq!(host.greeter.greet(), "hello");
    assert_eq!(
        Arc::as_ptr(&host.greeter) as *const (),
        Arc::as_ptr(&english) as *const ()
    );

    let alias = registry.lookup(infrastructure_common::TypeInfo::of::<dyn Greeter>()).unwrap();
    let concrete = registry.lookup(infrastructure_common::TypeInfo::of::<English>()).unwrap();
    assert!(alias.same_object(&concrete));
}

struct Beans;

#[test]
fn test_bean_alias_claims_capability_first() {
    let folder = TempDir::new().unwrap();
    let scope = scope_of([
        host(),
        english(),
        ComponentDescriptor::bean_factory::<Beans>()
            .constructor(Parameters::new(), |_| Ok(Beans))
            .bean_method(
                BeanMethod::new("french", Parameters::new(), |_: &Beans, _| Ok(Some(French)))
                    .provides::<dyn Greeter>(|french| french),
            )
            .build(),
    ]);

    let injector = Injector::new(scope, configuration(&folder));
    injector.inject().unwrap();

    let registry = injector.registry();
    assert!(registry.get::<French>().is_some());
    assert!(registry.get::<English>().is_some());
    assert_eq!(registry.get::<Host>().unwrap().greeter.greet(), "bonjour");
    assert_eq!(registry.get::<dyn Greeter>().unwrap().greet(), "bonjour");
}
