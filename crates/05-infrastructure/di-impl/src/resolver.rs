//! 依赖解析器

use crate::registry::TypeRegistry;
use config_abstractions::{ConfigDocument, ConfigurationManager, StorageKind};
use config_impl::ConfigurationBinder;
use di_abstractions::{
    Argument, Arguments, ComponentDescriptor, ComponentRegistry, ComponentScanner, Constructor,
    CyclePath, DependencyResolver, Instance, Parameter, Parameters, ScanScope,
};
use infrastructure_common::{DependencyError, DependencyResult, TypeInfo};
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// 依赖解析器
///
/// 递归实例化依赖图，实例化后立即登记到注册表
pub struct Resolver {
    scope: Arc<ScanScope>,
    registry: Arc<TypeRegistry>,
    scanner: Arc<dyn ComponentScanner>,
    configuration: Arc<dyn ConfigurationManager>,
    binder: Arc<ConfigurationBinder>,
}

impl Resolver {
    /// 创建依赖解析器
    pub fn new(
        scope: Arc<ScanScope>,
        registry: Arc<TypeRegistry>,
        scanner: Arc<dyn ComponentScanner>,
        configuration: Arc<dyn ConfigurationManager>,
        binder: Arc<ConfigurationBinder>,
    ) -> Self {
        Self {
            scope,
            registry,
            scanner,
            configuration,
            binder,
        }
    }

    /// 按扫描顺序选出能力类型的第一个可用实现
    fn implementer_of(&self, capability: TypeInfo) -> Option<Arc<ComponentDescriptor>> {
        self.scope
            .implementers(capability)
            .into_iter()
            .find(|descriptor| self.scanner.is_eligible(descriptor))
    }

    fn instantiate(&self, descriptor: &Arc<ComponentDescriptor>) -> DependencyResult<Instance> {
        let constructor = single_constructor(descriptor)?;
        trace!("实例化 {}", descriptor.name());

        let arguments = self.resolve_arguments(descriptor, &constructor.parameters)?;
        let instance = (constructor.factory)(&arguments)
            .map_err(|source| DependencyError::failed_injection(descriptor.name(), source))?;

        self.registry.register(
            instance.clone(),
            Some(Arc::clone(descriptor)),
            &descriptor.provisions,
        )?;

        if descriptor.configuration_source().is_some() {
            self.bind_configuration(descriptor, &instance)?;
        }
        Ok(instance)
    }

    /// 按声明顺序解析构造函数或方法的参数
    pub fn resolve_arguments(
        &self,
        owner: &ComponentDescriptor,
        parameters: &Parameters,
    ) -> DependencyResult<Arguments> {
        let mut values = Vec::with_capacity(parameters.len());
        for (position, parameter) in parameters.iter().enumerate() {
            let argument = match parameter {
                Parameter::Dependency { name, type_info } => {
                    if let Some(instance) = self.registry.lookup(*type_info) {
                        Argument::Instance(instance)
                    } else if self.is_managed(*type_info) {
                        Argument::Instance(self.resolve(*type_info)?)
                    } else {
                        return Err(DependencyError::invalid_context(format!(
                            "{} 的参数 {} (位置 {}) 无法解析: {}",
                            owner.name(),
                            name,
                            position,
                            type_info
                        )));
                    }
                }
                Parameter::Value(tag) => {
                    let document = self.default_document(owner)?;
                    Argument::Value(self.binder.get_scalar(
                        document.as_ref(),
                        "",
                        tag.name(),
                        tag.explicit_path(),
                    ))
                }
            };
            values.push(argument);
        }
        Ok(Arguments::new(values))
    }

    /// 方法参数是否都能解析
    pub fn can_resolve_all(&self, parameters: &Parameters) -> bool {
        parameters
            .dependencies()
            .all(|type_info| self.registry.contains(type_info) || self.is_managed(type_info))
    }

    /// 确保配置文件存在后绑定配置类型自身的字段
    pub fn bind_configuration(
        &self,
        descriptor: &ComponentDescriptor,
        instance: &Instance,
    ) -> DependencyResult<()> {
        let Some(source) = descriptor.configuration_source() else {
            return Ok(());
        };
        let host = host_of(descriptor, instance)?;

        let defaults = self.binder.defaults(host, &descriptor.values)?;
        let created = self
            .configuration
            .create_default(source.storage, &source.file_path, &defaults)
            .map_err(|source| DependencyError::failed_injection(descriptor.name(), source))?;
        if created {
            info!("已生成默认配置文件: {}", source.file_path);
        }

        let document = self
            .configuration
            .get_or_load(source.storage, &source.file_path)
            .map_err(|source| DependencyError::failed_injection(descriptor.name(), source))?;
        self.binder
            .bind(host, &descriptor.values, document.as_ref(), "")
    }

    /// 从存储重新读取配置文件并原地重新绑定
    pub fn reload_configuration(
        &self,
        descriptor: &ComponentDescriptor,
        instance: &Instance,
    ) -> DependencyResult<()> {
        let Some(source) = descriptor.configuration_source() else {
            return Ok(());
        };
        let host = host_of(descriptor, instance)?;
        let document = self
            .configuration
            .reload(source.storage, &source.file_path)
            .map_err(|source| DependencyError::failed_injection(descriptor.name(), source))?;
        debug!("重新绑定配置: {}", descriptor.type_info.short_name());
        self.binder
            .bind(host, &descriptor.values, document.as_ref(), "")
    }

    /// 以默认配置文件绑定普通类型的配置字段
    pub fn bind_values(
        &self,
        descriptor: &ComponentDescriptor,
        instance: &Instance,
    ) -> DependencyResult<()> {
        if descriptor.values.is_empty() {
            return Ok(());
        }
        let host = host_of(descriptor, instance)?;
        let document = self.default_document(descriptor)?;
        self.binder
            .bind(host, &descriptor.values, document.as_ref(), "")
    }

    fn default_document(
        &self,
        owner: &ComponentDescriptor,
    ) -> DependencyResult<Arc<dyn ConfigDocument>> {
        self.configuration
            .get_or_load(StorageKind::Yaml, StorageKind::DEFAULT_FILE)
            .map_err(|source| DependencyError::failed_injection(owner.name(), source))
    }
}

impl DependencyResolver for Resolver {
    fn validate_all(&self, scope: &ScanScope) -> DependencyResult<()> {
        for descriptor in scope.descriptors() {
            single_constructor(descriptor)?;
        }
        for descriptor in scope.descriptors() {
            self.check_cycles(descriptor.type_info, &mut CyclePath::new())?;
        }
        debug!("校验完成: {} 个类型", scope.len());
        Ok(())
    }

    fn check_cycles(&self, type_info: TypeInfo, path: &mut CyclePath) -> DependencyResult<()> {
        path.push(type_info)?;

        if let Some(descriptor) = self.scope.get(type_info) {
            if let Some(constructor) = descriptor.constructors.first() {
                for dependency in constructor.parameters.dependencies() {
                    if self.is_managed(dependency) {
                        self.check_cycles(dependency, path)?;
                    }
                }
            }
        } else if let Some(implementer) = self.implementer_of(type_info) {
            self.check_cycles(implementer.type_info, path)?;
        }

        path.pop();
        Ok(())
    }

    fn resolve(&self, type_info: TypeInfo) -> DependencyResult<Instance> {
        if let Some(instance) = self.registry.lookup(type_info) {
            return Ok(instance);
        }

        if let Some(descriptor) = self.scope.get(type_info) {
            return self.instantiate(descriptor);
        }

        let implementer = self.implementer_of(type_info).ok_or_else(|| {
            DependencyError::ComponentNotRegistered {
                type_name: type_info.name.to_string(),
            }
        })?;
        trace!("能力类型 {} 由 {} 实现", type_info.short_name(), implementer.name());
        let instance = self.resolve(implementer.type_info)?;

        implementer
            .provision(type_info)
            .and_then(|provision| provision.apply(&instance))
            .ok_or_else(|| DependencyError::RegistrationError {
                type_name: implementer.name().to_string(),
                message: format!("无法转换为能力类型 {}", type_info),
            })
    }

    fn is_managed(&self, type_info: TypeInfo) -> bool {
        self.scope.get(type_info).is_some() || self.implementer_of(type_info).is_some()
    }
}

fn single_constructor(descriptor: &ComponentDescriptor) -> DependencyResult<&Constructor> {
    match descriptor.constructors.as_slice() {
        [constructor] => Ok(constructor),
        [] => Err(DependencyError::invalid_context(format!(
            "{} 没有声明构造函数",
            descriptor.name()
        ))),
        constructors => Err(DependencyError::invalid_context(format!(
            "{} 声明了 {} 个构造函数，只允许一个",
            descriptor.name(),
            constructors.len()
        ))),
    }
}

fn host_of<'a>(
    descriptor: &ComponentDescriptor,
    instance: &'a Instance,
) -> DependencyResult<&'a dyn Any> {
    descriptor.host(instance).ok_or_else(|| {
        DependencyError::invalid_context(format!(
            "实例 {} 与描述符 {} 不一致",
            instance.type_info(),
            descriptor.name()
        ))
    })
}
