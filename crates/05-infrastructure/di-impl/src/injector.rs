//! 生命周期编排器
//!
//! 按固定阶段顺序完成校验、实例化与全局注入处理

use crate::registry::TypeRegistry;
use crate::resolver::Resolver;
use crate::scanner::RoleScanner;
use config_abstractions::ConfigurationManager;
use config_impl::ConfigurationBinder;
use di_abstractions::{
    Arguments, CommandRegistrar, CommandRegistration, ComponentDescriptor, ComponentRegistry,
    ComponentScanner, DependencyResolver, Instance, ListenerRegistrar, Method, MethodRole,
    Registration, RoleKind, ScanScope, TaskDescriptor, TaskJob, TaskScheduler, Visibility,
};
use infrastructure_common::{DependencyError, DependencyResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 注入器
///
/// 持有扫描范围、注册表和外部协作者，由宿主应用创建并显式传递
pub struct Injector {
    scope: Arc<ScanScope>,
    registry: Arc<TypeRegistry>,
    scanner: Arc<RoleScanner>,
    resolver: Arc<Resolver>,
    scheduler: Option<Arc<dyn TaskScheduler>>,
    commands: Option<Arc<dyn CommandRegistrar>>,
    listeners: Option<Arc<dyn ListenerRegistrar>>,
}

impl Injector {
    /// 创建注入器
    pub fn new(scope: ScanScope, configuration: Arc<dyn ConfigurationManager>) -> Self {
        Self::with_registry(scope, configuration, Arc::new(TypeRegistry::new()))
    }

    /// 使用已有注册表创建注入器，注册表中可以预先放入平台实例
    pub fn with_registry(
        scope: ScanScope,
        configuration: Arc<dyn ConfigurationManager>,
        registry: Arc<TypeRegistry>,
    ) -> Self {
        let scope = Arc::new(scope);
        let scanner = Arc::new(RoleScanner::new(Arc::clone(&configuration)));
        let resolver = Arc::new(Resolver::new(
            Arc::clone(&scope),
            Arc::clone(&registry),
            Arc::clone(&scanner) as Arc<dyn ComponentScanner>,
            configuration,
            Arc::new(ConfigurationBinder::new()),
        ));

        Self {
            scope,
            registry,
            scanner,
            resolver,
            scheduler: None,
            commands: None,
            listeners: None,
        }
    }

    /// 设置任务调度器
    pub fn with_scheduler(mut self, scheduler: Arc<dyn TaskScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// 设置命令注册器
    pub fn with_command_registrar(mut self, commands: Arc<dyn CommandRegistrar>) -> Self {
        self.commands = Some(commands);
        self
    }

    /// 设置监听器注册器
    pub fn with_listener_registrar(mut self, listeners: Arc<dyn ListenerRegistrar>) -> Self {
        self.listeners = Some(listeners);
        self
    }

    /// 注册表
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// 依赖解析器
    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// 扫描范围
    pub fn scope(&self) -> &ScanScope {
        &self.scope
    }

    /// 执行完整装配流程
    ///
    /// 任一错误都会中止流程，已注册的实例不会回滚
    pub fn inject(&self) -> DependencyResult<()> {
        info!("开始装配: {} ({} 个类型)", self.scope.name(), self.scope.len());

        self.resolver.validate_all(&self.scope)?;

        for role in RoleKind::PHASE_ORDER {
            self.run_phase(role)?;
        }
        self.run_global_pass()?;

        info!("装配完成: 共 {} 个实例", self.registry.len());
        Ok(())
    }

    fn run_phase(&self, role: RoleKind) -> DependencyResult<()> {
        let candidates = self.scanner.candidates_with_role(&self.scope, role);
        debug!("阶段 {}: {} 个候选", role, candidates.len());

        for candidate in candidates {
            let descriptor = candidate.descriptor;
            if !candidate.eligible {
                debug!("条件不满足，跳过: {}", descriptor.type_info.short_name());
                continue;
            }

            let instance = self.resolver.resolve(descriptor.type_info)?;
            match role {
                RoleKind::BeanFactory => self.produce_beans(&descriptor, &instance)?,
                RoleKind::Command => self.register_command(&descriptor, &instance)?,
                RoleKind::ListenerGroup => self.register_listener(&descriptor, instance)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn produce_beans(
        &self,
        descriptor: &ComponentDescriptor,
        instance: &Instance,
    ) -> DependencyResult<()> {
        for method in &descriptor.methods {
            let MethodRole::Bean { produces, provisions } = &method.role else {
                continue;
            };
            if !self.resolver.can_resolve_all(&method.parameters) {
                debug!("Bean 方法参数无法解析，跳过: {}.{}", descriptor.name(), method.name);
                continue;
            }

            let arguments = self.resolver.resolve_arguments(descriptor, &method.parameters)?;
            let produced = (method.invoke)(instance, &arguments)
                .map_err(|source| DependencyError::bean(&method.name, descriptor.name(), source))?;

            match produced {
                Some(bean) => {
                    if bean.type_info() != *produces {
                        return Err(DependencyError::RegistrationError {
                            type_name: bean.type_info().name.to_string(),
                            message: format!(
                                "Bean 方法 {}.{} 声明产出 {}",
                                descriptor.name(),
                                method.name,
                                produces
                            ),
                        });
                    }
                    debug!("Bean {}.{} -> {}", descriptor.name(), method.name, produces);
                    self.registry.register(bean, None, provisions)?;
                }
                None => debug!("Bean 方法未产出值: {}.{}", descriptor.name(), method.name),
            }
        }
        Ok(())
    }

    fn register_command(
        &self,
        descriptor: &ComponentDescriptor,
        instance: &Instance,
    ) -> DependencyResult<()> {
        let Some(spec) = descriptor.command_spec() else {
            return Ok(());
        };
        let handler = descriptor
            .command_handler
            .as_ref()
            .and_then(|cast| cast(instance))
            .ok_or_else(|| {
                DependencyError::invalid_context(format!(
                    "命令 {} 的类型 {} 没有命令处理器",
                    spec.name,
                    descriptor.name()
                ))
            })?;
        let tab_completer = descriptor
            .tab_completer
            .as_ref()
            .and_then(|cast| cast(instance));

        let Some(commands) = &self.commands else {
            warn!("未设置命令注册器，忽略命令: {}", spec.name);
            return Ok(());
        };
        commands.register_command(CommandRegistration {
            name: spec.name.clone(),
            aliases: spec.aliases.clone(),
            permission: spec.permission.clone(),
            handler,
            tab_completer,
            override_existing: spec.override_existing,
        })
    }

    fn register_listener(
        &self,
        descriptor: &ComponentDescriptor,
        instance: Instance,
    ) -> DependencyResult<()> {
        match &self.listeners {
            Some(listeners) => listeners.register(instance),
            None => {
                warn!("未设置监听器注册器，忽略: {}", descriptor.name());
                Ok(())
            }
        }
    }

    /// 全局处理阶段
    ///
    /// 依次完成字段注入、配置字段绑定、生命周期钩子与任务注册。每一步都按注册顺序
    /// 遍历注册表，字段注入期间按需注册的实例也会被后续步骤处理。
    fn run_global_pass(&self) -> DependencyResult<()> {
        self.for_each_registration(|registration, descriptor| {
            self.inject_fields(descriptor, &registration.instance)
        })?;
        self.for_each_registration(|registration, descriptor| {
            if descriptor.kind() == RoleKind::Configuration {
                return Ok(());
            }
            self.resolver.bind_values(descriptor, &registration.instance)
        })?;
        self.for_each_registration(|registration, descriptor| {
            self.invoke_post_constructs(descriptor, &registration.instance)
        })?;
        self.for_each_registration(|registration, descriptor| {
            self.register_tasks(descriptor, &registration.instance)
        })
    }

    fn for_each_registration<F>(&self, mut step: F) -> DependencyResult<()>
    where
        F: FnMut(&Registration, &ComponentDescriptor) -> DependencyResult<()>,
    {
        let mut index = 0;
        while let Some(registration) = self.registry.entry_at(index) {
            index += 1;
            if let Some(descriptor) = &registration.descriptor {
                step(&registration, descriptor)?;
            }
        }
        Ok(())
    }

    fn inject_fields(
        &self,
        descriptor: &ComponentDescriptor,
        instance: &Instance,
    ) -> DependencyResult<()> {
        for field in &descriptor.inject_fields {
            let dependency = self.resolver.resolve(field.dependency)?;
            (field.assign)(instance, &dependency).map_err(|source| {
                DependencyError::failed_injection(
                    format!("{}.{}", descriptor.type_info.short_name(), field.name),
                    source,
                )
            })?;
            debug!(
                "注入字段 {}.{} <- {}",
                descriptor.type_info.short_name(),
                field.name,
                dependency.type_info().short_name()
            );
        }
        Ok(())
    }

    fn invoke_post_constructs(
        &self,
        descriptor: &ComponentDescriptor,
        instance: &Instance,
    ) -> DependencyResult<()> {
        for method in descriptor.methods_where(Method::is_post_construct) {
            if !method.parameters.is_empty() {
                return Err(DependencyError::post_construct(
                    &method.name,
                    descriptor.name(),
                    format!("生命周期钩子不能有参数 (声明了 {} 个)", method.parameters.len()),
                ));
            }
            debug!("调用生命周期钩子 {}.{}", descriptor.type_info.short_name(), method.name);
            (method.invoke)(instance, &Arguments::empty()).map_err(|source| {
                DependencyError::post_construct(&method.name, descriptor.name(), source)
            })?;
        }
        Ok(())
    }

    fn register_tasks(
        &self,
        descriptor: &ComponentDescriptor,
        instance: &Instance,
    ) -> DependencyResult<()> {
        for method in descriptor.methods_where(Method::is_task) {
            let MethodRole::Task(spec) = &method.role else {
                continue;
            };
            if method.visibility != Visibility::Public {
                return Err(DependencyError::task_execution(
                    &method.name,
                    descriptor.name(),
                    "定时任务必须是公开方法",
                ));
            }
            if !method.parameters.is_empty() {
                return Err(DependencyError::task_execution(
                    &method.name,
                    descriptor.name(),
                    format!("定时任务不能有参数 (声明了 {} 个)", method.parameters.len()),
                ));
            }

            let Some(scheduler) = &self.scheduler else {
                warn!("未设置任务调度器，忽略任务: {}.{}", descriptor.name(), method.name);
                continue;
            };

            let invoke = Arc::clone(&method.invoke);
            let target = instance.clone();
            let method_name = method.name.clone();
            let owner = descriptor.name().to_string();
            let job: TaskJob = Arc::new(move || {
                invoke(&target, &Arguments::empty())
                    .map(|_| ())
                    .map_err(|source| DependencyError::task_execution(&method_name, &owner, source))
            });

            scheduler.register_task(
                TaskDescriptor {
                    method: method.name.clone(),
                    owner: descriptor.name().to_string(),
                    spec: *spec,
                },
                job,
            )?;
            info!("注册定时任务 {}.{}", descriptor.type_info.short_name(), method.name);
        }
        Ok(())
    }

    /// 重新读取全部配置类型的配置文件并原地重新绑定
    ///
    /// 返回重新绑定的实例数量
    pub fn reload_configurations(&self) -> DependencyResult<usize> {
        let configurations = self.registry.all_of_role(RoleKind::Configuration);
        for registration in &configurations {
            if let Some(descriptor) = &registration.descriptor {
                self.resolver
                    .reload_configuration(descriptor, &registration.instance)?;
            }
        }
        info!("已重新加载 {} 个配置类型", configurations.len());
        Ok(configurations.len())
    }
}
