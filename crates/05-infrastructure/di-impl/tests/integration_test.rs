//! 依赖注入实现的集成测试

use config_abstractions::ConfigurationManager;
use config_impl::FileConfigurationManager;
use di_abstractions::{
    Arguments, BeanMethod, CommandHandler, CommandRegistrar, CommandRegistration, CommandSpec,
    ComponentDescriptor, ComponentRegistry, Injected, Instance, ListenerRegistrar, Method,
    MethodRole, Parameters, ScanScope, TabCompleter, TaskDescriptor, TaskJob, TaskScheduler,
    TaskSpec, Visibility,
};
use infrastructure_common::TypeInfo;
use di_impl::Injector;
use infrastructure_common::{BoxError, DependencyError, DependencyResult};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

type EventLog = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
struct RecordingCommands {
    registrations: Mutex<Vec<CommandRegistration>>,
}

impl CommandRegistrar for RecordingCommands {
    fn register_command(&self, registration: CommandRegistration) -> DependencyResult<()> {
        self.registrations.lock().push(registration);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingListeners {
    instances: Mutex<Vec<Instance>>,
}

impl ListenerRegistrar for RecordingListeners {
    fn register(&self, listener: Instance) -> DependencyResult<()> {
        self.instances.lock().push(listener);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingScheduler {
    tasks: Mutex<Vec<(TaskDescriptor, TaskJob)>>,
}

impl TaskScheduler for RecordingScheduler {
    fn register_task(&self, task: TaskDescriptor, job: TaskJob) -> DependencyResult<()> {
        self.tasks.lock().push((task, job));
        Ok(())
    }
}

fn configuration(folder: &TempDir) -> Arc<dyn ConfigurationManager> {
    Arc::new(FileConfigurationManager::new(folder.path()))
}

struct Greeting {
    text: String,
}

struct Factory;

struct Shout;

impl CommandHandler for Shout {
    fn execute(&self, _label: &str, args: &[String]) -> Result<(), BoxError> {
        if args.is_empty() {
            return Err("缺少参数".into());
        }
        Ok(())
    }
}

impl TabCompleter for Shout {
    fn complete(&self, _label: &str, _args: &[String]) -> Vec<String> {
        vec!["loud".to_string()]
    }
}

struct Listener {
    log: EventLog,
}

struct Worker {
    log: EventLog,
    greeting: Injected<Greeting>,
}

fn full_scope(log: &EventLog) -> ScanScope {
    let listener_log = Arc::clone(log);
    let worker_log = Arc::clone(log);

    let mut scope = ScanScope::new("integration");
    scope
        .register(
            ComponentDescriptor::service::<Worker>()
                .constructor(Parameters::new(), move |_| {
                    worker_log.lock().push("construct Worker".to_string());
                    Ok(Worker {
                        log: Arc::clone(&worker_log),
                        greeting: Injected::new(),
                    })
                })
                .inject::<Greeting>("greeting", |worker| &worker.greeting)
                .post_construct("ready", |worker| {
                    let text = worker.greeting.get().ok_or("未注入")?.text.clone();
                    worker.log.lock().push(format!("ready {text}"));
                    Ok(())
                })
                .task("tick", TaskSpec::every(Duration::from_secs(1)), |worker| {
                    worker.log.lock().push("tick".to_string());
                    Ok(())
                })
                .build(),
        )
        .unwrap();
    scope
        .register(
            ComponentDescriptor::listener_group::<Listener>()
                .constructor(Parameters::new(), move |_| {
                    listener_log.lock().push("construct Listener".to_string());
                    Ok(Listener {
                        log: Arc::clone(&listener_log),
                    })
                })
                .build(),
        )
        .unwrap();
    scope
        .register(
            ComponentDescriptor::command::<Shout>(
                CommandSpec::new("shout").aliases(["sh"]).permission("demo.shout"),
            )
            .constructor(Parameters::new(), |_| Ok(Shout))
            .tab_completer()
            .build(),
        )
        .unwrap();
    scope
        .register(
            ComponentDescriptor::bean_factory::<Factory>()
                .constructor(Parameters::new(), |_| Ok(Factory))
                .bean("greeting", |_| {
                    Ok(Greeting {
                        text: "hi".to_string(),
                    })
                })
                .bean_method(BeanMethod::new(
                    "nothing",
                    Parameters::new(),
                    |_: &Factory, _| Ok(None::<u64>),
                ))
                .build(),
        )
        .unwrap();
    scope
}

#[test]
fn test_phases_run_in_role_order() {
    let folder = TempDir::new().unwrap();
    let log: EventLog = Arc::default();
    let listeners = Arc::new(RecordingListeners::default());

    let injector = Injector::new(full_scope(&log), configuration(&folder))
        .with_listener_registrar(Arc::clone(&listeners) as Arc<dyn ListenerRegistrar>);
    injector.inject().unwrap();

    let log = log.lock().clone();
    assert_eq!(
        log,
        vec![
            "construct Listener".to_string(),
            "construct Worker".to_string(),
            "ready hi".to_string(),
        ]
    );
    assert_eq!(listeners.instances.lock().len(), 1);
    assert!(listeners.instances.lock()[0].is::<Listener>());
}

#[test]
fn test_bean_results_are_registered() {
    let folder = TempDir::new().unwrap();
    let log: EventLog = Arc::default();
    let injector = Injector::new(full_scope(&log), configuration(&folder));
    injector.inject().unwrap();

    let registry = injector.registry();
    assert_eq!(registry.get::<Greeting>().unwrap().text, "hi");
    assert!(registry.get::<u64>().is_none());
    assert!(registry.get::<Factory>().is_some());
}

#[test]
fn test_command_is_handed_to_registrar() {
    let folder = TempDir::new().unwrap();
    let log: EventLog = Arc::default();
    let commands = Arc::new(RecordingCommands::default());

    let injector = Injector::new(full_scope(&log), configuration(&folder))
        .with_command_registrar(Arc::clone(&commands) as Arc<dyn CommandRegistrar>);
    injector.inject().unwrap();

    let registrations = commands.registrations.lock();
    assert_eq!(registrations.len(), 1);
    let registration = &registrations[0];
    assert_eq!(registration.name, "shout");
    assert_eq!(registration.aliases, vec!["sh".to_string()]);
    assert_eq!(registration.permission.as_deref(), Some("demo.shout"));
    assert!(!registration.override_existing);
    assert!(registration.handler.execute("shout", &[]).is_err());
    let completer = registration.tab_completer.as_ref().unwrap();
    assert_eq!(completer.complete("shout", &[]), vec!["loud".to_string()]);
}

#[test]
fn test_tasks_are_registered_and_runnable() {
    let folder = TempDir::new().unwrap();
    let log: EventLog = Arc::default();
    let scheduler = Arc::new(RecordingScheduler::default());

    let injector = Injector::new(full_scope(&log), configuration(&folder))
        .with_scheduler(Arc::clone(&scheduler) as Arc<dyn TaskScheduler>);
    injector.inject().unwrap();

    let tasks = scheduler.tasks.lock();
    assert_eq!(tasks.len(), 1);
    let (task, job) = &tasks[0];
    assert_eq!(task.method, "tick");
    assert!(task.owner.ends_with("Worker"));
    assert_eq!(task.spec.period, Duration::from_secs(1));

    job().unwrap();
    job().unwrap();
    assert_eq!(log.lock().iter().filter(|entry| *entry == "tick").count(), 2);
}

struct Flaky;

#[test]
fn test_task_runtime_failure_is_reported_per_invocation() {
    let folder = TempDir::new().unwrap();
    let scheduler = Arc::new(RecordingScheduler::default());
    let mut scope = ScanScope::new("flaky");
    scope
        .register(
            ComponentDescriptor::component::<Flaky>()
                .constructor(Parameters::new(), |_| Ok(Flaky))
                .task("poll", TaskSpec::every(Duration::from_millis(10)), |_| {
                    Err("上游不可用".into())
                })
                .build(),
        )
        .unwrap();

    let injector = Injector::new(scope, configuration(&folder))
        .with_scheduler(Arc::clone(&scheduler) as Arc<dyn TaskScheduler>);
    injector.inject().unwrap();

    let tasks = scheduler.tasks.lock();
    let (_, job) = &tasks[0];
    assert!(matches!(job(), Err(DependencyError::TaskExecution { .. })));
    assert!(matches!(job(), Err(DependencyError::TaskExecution { .. })));
}

#[test]
fn test_private_task_is_fatal() {
    let folder = TempDir::new().unwrap();
    let mut scope = ScanScope::new("invalid");
    scope
        .register(
            ComponentDescriptor::component::<Flaky>()
                .constructor(Parameters::new(), |_| Ok(Flaky))
                .task_with(
                    "hidden",
                    TaskSpec::every(Duration::from_secs(1)),
                    Parameters::new(),
                    Visibility::Private,
                    |_, _| Ok(()),
                )
                .build(),
        )
        .unwrap();

    let error = Injector::new(scope, configuration(&folder))
        .inject()
        .unwrap_err();
    assert!(matches!(error, DependencyError::TaskExecution { .. }));
}

#[test]
fn test_post_construct_with_parameters_is_fatal() {
    let folder = TempDir::new().unwrap();
    let mut scope = ScanScope::new("invalid");
    scope
        .register(
            ComponentDescriptor::component::<Flaky>()
                .constructor(Parameters::new(), |_| Ok(Flaky))
                .post_construct_with(
                    "init",
                    Parameters::new().dependency::<Factory>("factory"),
                    |_, _| Ok(()),
                )
                .build(),
        )
        .unwrap();

    let error = Injector::new(scope, configuration(&folder))
        .inject()
        .unwrap_err();
    match error {
        DependencyError::PostConstruct { method, .. } => assert_eq!(method, "init"),
        other => panic!("unexpected error: {other}"),
    }
}

struct Second;

#[test]
fn test_failing_post_construct_is_fatal_and_stops_later_hooks() {
    let folder = TempDir::new().unwrap();
    let log: EventLog = Arc::default();
    let first_log = Arc::clone(&log);
    let second_log = Arc::clone(&log);

    let mut scope = ScanScope::new("hooks");
    scope
        .register(
            ComponentDescriptor::component::<Flaky>()
                .constructor(Parameters::new(), |_| Ok(Flaky))
                .post_construct("open", |_| Err("端口被占用".into()))
                .post_construct("announce", move |_| {
                    first_log.lock().push("Flaky announce".to_string());
                    Ok(())
                })
                .build(),
        )
        .unwrap();
    scope
        .register(
            ComponentDescriptor::component::<Second>()
                .constructor(Parameters::new(), |_| Ok(Second))
                .post_construct("ready", move |_| {
                    second_log.lock().push("Second ready".to_string());
                    Ok(())
                })
                .build(),
        )
        .unwrap();

    let error = Injector::new(scope, configuration(&folder))
        .inject()
        .unwrap_err();
    match error {
        DependencyError::PostConstruct { method, type_name, .. } => {
            assert_eq!(method, "open");
            assert!(type_name.ends_with("Flaky"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(log.lock().is_empty());
}

#[test]
fn test_beans_of_the_same_type_keep_the_last_value() {
    let folder = TempDir::new().unwrap();
    let mut scope = ScanScope::new("beans");
    scope
        .register(
            ComponentDescriptor::bean_factory::<Factory>()
                .constructor(Parameters::new(), |_| Ok(Factory))
                .bean("primary", |_| Ok(String::from("a")))
                .bean("secondary", |_| Ok(String::from("b")))
                .build(),
        )
        .unwrap();

    let injector = Injector::new(scope, configuration(&folder));
    injector.inject().unwrap();

    let registry = injector.registry();
    assert_eq!(registry.get::<String>().unwrap().as_str(), "b");
    let strings = registry
        .registrations()
        .into_iter()
        .filter(|registration| registration.type_info.is::<String>())
        .count();
    assert_eq!(strings, 2);
}

#[test]
fn test_bean_of_a_preregistered_type_replaces_it() {
    let folder = TempDir::new().unwrap();
    let mut scope = ScanScope::new("beans");
    scope
        .register(
            ComponentDescriptor::bean_factory::<Factory>()
                .constructor(Parameters::new(), |_| Ok(Factory))
                .bean("label", |_| Ok(String::from("bean")))
                .build(),
        )
        .unwrap();

    let injector = Injector::new(scope, configuration(&folder));
    injector
        .registry()
        .register_instance(Arc::new(String::from("platform")))
        .unwrap();
    injector.inject().unwrap();

    assert_eq!(injector.registry().get::<String>().unwrap().as_str(), "bean");
}

#[test]
fn test_bean_must_match_declared_type() {
    let folder = TempDir::new().unwrap();
    let mut descriptor = ComponentDescriptor::bean_factory::<Factory>()
        .constructor(Parameters::new(), |_| Ok(Factory))
        .build();
    descriptor.methods.push(Method {
        name: "mislabelled".to_string(),
        visibility: Visibility::Public,
        parameters: Parameters::new(),
        role: MethodRole::Bean {
            produces: TypeInfo::of::<Greeting>(),
            provisions: Vec::new(),
        },
        invoke: Arc::new(
            |_: &Instance, _: &Arguments| -> Result<Option<Instance>, BoxError> {
                Ok(Some(Instance::new(Arc::new(7_u64))))
            },
        ),
    });

    let mut scope = ScanScope::new("beans");
    scope.register(descriptor).unwrap();

    let injector = Injector::new(scope, configuration(&folder));
    let error = injector.inject().unwrap_err();
    assert!(matches!(error, DependencyError::RegistrationError { .. }));
    assert!(injector.registry().get::<u64>().is_none());
}

#[test]
fn test_failing_bean_method_raises_bean_error() {
    let folder = TempDir::new().unwrap();
    let mut scope = ScanScope::new("beans");
    scope
        .register(
            ComponentDescriptor::bean_factory::<Factory>()
                .constructor(Parameters::new(), |_| Ok(Factory))
                .bean("broken", |_| -> Result<Greeting, BoxError> { Err("坏了".into()) })
                .build(),
        )
        .unwrap();

    let error = Injector::new(scope, configuration(&folder))
        .inject()
        .unwrap_err();
    match error {
        DependencyError::Bean { method, type_name, .. } => {
            assert_eq!(method, "broken");
            assert!(type_name.ends_with("Factory"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_bean_method_with_unresolvable_parameter_is_skipped() {
    let folder = TempDir::new().unwrap();
    let mut scope = ScanScope::new("beans");
    scope
        .register(
            ComponentDescriptor::bean_factory::<Factory>()
                .constructor(Parameters::new(), |_| Ok(Factory))
                .bean_method(BeanMethod::new(
                    "needs_string",
                    Parameters::new().dependency::<String>("label"),
                    |_: &Factory, arguments| {
                        Ok(Some(Greeting {
                            text: arguments.instance::<String>(0)?.to_string(),
                        }))
                    },
                ))
                .build(),
        )
        .unwrap();

    let injector = Injector::new(scope, configuration(&folder));
    injector.inject().unwrap();
    assert!(injector.registry().get::<Greeting>().is_none());
}
