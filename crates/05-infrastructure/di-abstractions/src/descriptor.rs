//! 组件描述符
//!
//! 描述符取代运行时反射：每个受管类型在启动时声明自己的角色、构造函数、
//! 提供的能力类型、注入字段、配置字段以及生命周期方法。
//!
//! ```
//! use di_abstractions::{ComponentDescriptor, Injected, Parameters};
//! use std::sync::Arc;
//!
//! trait Store: Send + Sync {}
//!
//! struct MemoryStore;
//! impl Store for MemoryStore {}
//!
//! struct Audit {
//!     store: Injected<dyn Store>,
//! }
//!
//! let store = ComponentDescriptor::component::<MemoryStore>()
//!     .constructor(Parameters::new(), |_| Ok(MemoryStore))
//!     .provides::<dyn Store>(|store| store)
//!     .build();
//!
//! let audit = ComponentDescriptor::service::<Audit>()
//!     .constructor(Parameters::new(), |_| Ok(Audit { store: Injected::new() }))
//!     .inject::<dyn Store>("store", |audit| &audit.store)
//!     .build();
//!
//! assert_eq!(store.provisions.len(), 1);
//! assert_eq!(audit.inject_fields.len(), 1);
//! ```

use crate::container::{CommandHandler, TabCompleter};
use tracing::debug;
use crate::instance::{Arguments, Injected, Instance};
use crate::roles::{
    CommandSpec, ConfigCondition, ConfigurationSource, Role, RoleKind, TaskSpec, Visibility,
};
use config_abstractions::{
    BindingSchema, ConfigEnum, ConfigValue, ConfigurationSection, Schema, ValueTag,
    ValueTransformer,
};
use infrastructure_common::{BoxError, TypeInfo};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 参数声明
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    /// 受管依赖
    Dependency {
        /// 参数名称
        name: String,
        /// 依赖类型
        type_info: TypeInfo,
    },
    /// 配置值
    Value(ValueTag),
}

impl Parameter {
    /// 参数名称
    pub fn name(&self) -> &str {
        match self {
            Self::Dependency { name, .. } => name,
            Self::Value(tag) => tag.name(),
        }
    }
}

/// 有序参数列表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    items: Vec<Parameter>,
}

impl Parameters {
    /// 创建空参数列表
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加依赖参数，`D` 可以是 `dyn Trait`
    pub fn dependency<D: ?Sized + 'static>(mut self, name: impl Into<String>) -> Self {
        self.items.push(Parameter::Dependency {
            name: name.into(),
            type_info: TypeInfo::of::<D>(),
        });
        self
    }

    /// 追加配置值参数
    pub fn value(mut self, tag: ValueTag) -> Self {
        self.items.push(Parameter::Value(tag));
        self
    }

    /// 遍历参数
    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.items.iter()
    }

    /// 参数数量
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 是否没有参数
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 全部依赖参数的类型
    pub fn dependencies(&self) -> impl Iterator<Item = TypeInfo> + '_ {
        self.items.iter().filter_map(|parameter| match parameter {
            Parameter::Dependency { type_info, .. } => Some(*type_info),
            Parameter::Value(_) => None,
        })
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// 构造工厂
pub type Factory = Arc<dyn Fn(&Arguments) -> Result<Instance, BoxError> + Send + Sync>;

/// 构造函数声明
#[derive(Clone)]
pub struct Constructor {
    /// 参数列表
    pub parameters: Parameters,
    /// 构造工厂
    pub factory: Factory,
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// 能力类型转换
pub type Cast = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;

/// 能力类型声明
///
/// 取代祖先类型与接口：实例注册时同时以这些类型登记别名
#[derive(Clone)]
pub struct Provision {
    /// 能力类型
    pub capability: TypeInfo,
    /// 从具体实例转换为能力实例
    pub cast: Cast,
}

impl Provision {
    /// 声明 `T` 提供能力 `I`
    pub fn of<T, I>(cast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        T: Send + Sync + 'static,
        I: ?Sized + Send + Sync + 'static,
    {
        Self {
            capability: TypeInfo::of::<I>(),
            cast: Arc::new(move |instance: &Instance| -> Option<Instance> {
                instance.downcast::<T>().map(|value| Instance::new(cast(value)))
            }),
        }
    }

    /// 转换实例
    pub fn apply(&self, instance: &Instance) -> Option<Instance> {
        (self.cast)(instance)
    }
}

impl fmt::Debug for Provision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provision")
            .field("capability", &self.capability.name)
            .finish()
    }
}

/// 依赖字段写入
pub type AssignDependency = Arc<dyn Fn(&Instance, &Instance) -> Result<(), BoxError> + Send + Sync>;

/// 注入字段声明
#[derive(Clone)]
pub struct InjectField {
    /// 字段名称
    pub name: String,
    /// 依赖类型
    pub dependency: TypeInfo,
    /// 写入依赖
    pub assign: AssignDependency,
}

impl fmt::Debug for InjectField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectField")
            .field("name", &self.name)
            .field("dependency", &self.dependency.name)
            .finish()
    }
}

/// 方法调用
pub type Invoke =
    Arc<dyn Fn(&Instance, &Arguments) -> Result<Option<Instance>, BoxError> + Send + Sync>;

/// 方法级角色
#[derive(Debug, Clone)]
pub enum MethodRole {
    /// 产出需要注册的值
    Bean {
        /// 产出类型
        produces: TypeInfo,
        /// 产出值提供的能力类型
        provisions: Vec<Provision>,
    },
    /// 定时任务
    Task(TaskSpec),
    /// 装配完成后的生命周期钩子
    PostConstruct,
}

/// 方法声明
#[derive(Clone)]
pub struct Method {
    /// 方法名称
    pub name: String,
    /// 可见性
    pub visibility: Visibility,
    /// 参数列表
    pub parameters: Parameters,
    /// 方法角色
    pub role: MethodRole,
    /// 调用入口
    pub invoke: Invoke,
}

impl Method {
    /// 是否为 Bean 方法
    pub fn is_bean(&self) -> bool {
        matches!(self.role, MethodRole::Bean { .. })
    }

    /// 是否为定时任务
    pub fn is_task(&self) -> bool {
        matches!(self.role, MethodRole::Task(_))
    }

    /// 是否为生命周期钩子
    pub fn is_post_construct(&self) -> bool {
        matches!(self.role, MethodRole::PostConstruct)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("parameters", &self.parameters)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// 命令处理器转换
pub type CommandCast = Arc<dyn Fn(&Instance) -> Option<Arc<dyn CommandHandler>> + Send + Sync>;
/// 补全器转换
pub type CompleterCast = Arc<dyn Fn(&Instance) -> Option<Arc<dyn TabCompleter>> + Send + Sync>;

/// 组件描述符
pub struct ComponentDescriptor {
    /// 具体类型
    pub type_info: TypeInfo,
    /// 类型级角色
    pub role: Role,
    /// 注册条件
    pub condition: Option<ConfigCondition>,
    /// 构造函数，必须恰好一个
    pub constructors: Vec<Constructor>,
    /// 提供的能力类型
    pub provisions: Vec<Provision>,
    /// 注入字段
    pub inject_fields: Vec<InjectField>,
    /// 配置字段
    pub values: BindingSchema,
    /// 方法
    pub methods: Vec<Method>,
    /// 命令处理器转换
    pub command_handler: Option<CommandCast>,
    /// 补全器转换
    pub tab_completer: Option<CompleterCast>,
    host: fn(&Instance) -> Option<&dyn Any>,
}

impl ComponentDescriptor {
    /// 配置类型
    pub fn configuration<T>(source: ConfigurationSource) -> DescriptorBuilder<T>
    where
        T: Send + Sync + 'static,
    {
        DescriptorBuilder::new(Role::Configuration(source))
    }

    /// Bean 工厂
    pub fn bean_factory<T>() -> DescriptorBuilder<T>
    where
        T: Send + Sync + 'static,
    {
        DescriptorBuilder::new(Role::BeanFactory)
    }

    /// 命令
    pub fn command<T>(spec: CommandSpec) -> DescriptorBuilder<T>
    where
        T: CommandHandler + 'static,
    {
        let mut builder = DescriptorBuilder::new(Role::Command(spec));
        builder.command_handler = Some(Arc::new(
            |instance: &Instance| -> Option<Arc<dyn CommandHandler>> {
                instance
                    .downcast::<T>()
                    .map(|handler| handler as Arc<dyn CommandHandler>)
            },
        ));
        builder
    }

    /// 监听器组
    pub fn listener_group<T>() -> DescriptorBuilder<T>
    where
        T: Send + Sync + 'static,
    {
        DescriptorBuilder::new(Role::ListenerGroup)
    }

    /// 普通组件
    pub fn component<T>() -> DescriptorBuilder<T>
    where
        T: Send + Sync + 'static,
    {
        DescriptorBuilder::new(Role::Component)
    }

    /// 管理器
    pub fn manager<T>() -> DescriptorBuilder<T>
    where
        T: Send + Sync + 'static,
    {
        DescriptorBuilder::new(Role::Manager)
    }

    /// 服务
    pub fn service<T>() -> DescriptorBuilder<T>
    where
        T: Send + Sync + 'static,
    {
        DescriptorBuilder::new(Role::Service)
    }

    /// 角色种类
    pub fn kind(&self) -> RoleKind {
        self.role.kind()
    }

    /// 类型名称
    pub fn name(&self) -> &'static str {
        self.type_info.name
    }

    /// 借用实例中的具体对象，用于配置绑定
    pub fn host<'a>(&self, instance: &'a Instance) -> Option<&'a dyn Any> {
        (self.host)(instance)
    }

    /// 是否提供指定能力类型
    pub fn provides(&self, capability: TypeInfo) -> bool {
        self.provisions
            .iter()
            .any(|provision| provision.capability == capability)
    }

    /// 查找指定能力类型的声明
    pub fn provision(&self, capability: TypeInfo) -> Option<&Provision> {
        self.provisions
            .iter()
            .find(|provision| provision.capability == capability)
    }

    /// 配置来源，仅配置类型有
    pub fn configuration_source(&self) -> Option<&ConfigurationSource> {
        match &self.role {
            Role::Configuration(source) => Some(source),
            _ => None,
        }
    }

    /// 命令声明，仅命令类型有
    pub fn command_spec(&self) -> Option<&CommandSpec> {
        match &self.role {
            Role::Command(spec) => Some(spec),
            _ => None,
        }
    }

    /// 按角色筛选方法
    pub fn methods_where(&self, predicate: fn(&Method) -> bool) -> impl Iterator<Item = &Method> {
        self.methods.iter().filter(move |method| predicate(method))
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("type", &self.type_info.name)
            .field("role", &self.role)
            .field("condition", &self.condition)
            .field("constructors", &self.constructors.len())
            .field("provisions", &self.provisions)
            .field("inject_fields", &self.inject_fields)
            .field("values", &self.values.fields.len())
            .field("methods", &self.methods)
            .finish()
    }
}

/// Bean 方法声明
pub struct BeanMethod<T: 'static, B: 'static> {
    name: String,
    parameters: Parameters,
    factory: Arc<dyn Fn(&T, &Arguments) -> Result<Option<B>, BoxError> + Send + Sync>,
    provisions: Vec<Provision>,
}

impl<T, B> BeanMethod<T, B>
where
    T: Send + Sync + 'static,
    B: Send + Sync + 'static,
{
    /// 创建 Bean 方法，工厂返回 `None` 时不注册任何值
    pub fn new<F>(name: impl Into<String>, parameters: Parameters, factory: F) -> Self
    where
        F: Fn(&T, &Arguments) -> Result<Option<B>, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            parameters,
            factory: Arc::new(factory),
            provisions: Vec::new(),
        }
    }

    /// 声明产出值提供的能力类型
    pub fn provides<I>(mut self, cast: fn(Arc<B>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.provisions.push(Provision::of(cast));
        self
    }

    fn into_method(self) -> Method {
        let factory = self.factory;
        Method {
            name: self.name,
            visibility: Visibility::Public,
            parameters: self.parameters,
            role: MethodRole::Bean {
                produces: TypeInfo::of::<B>(),
                provisions: self.provisions,
            },
            invoke: Arc::new(
                move |instance: &Instance, arguments: &Arguments| -> Result<Option<Instance>, BoxError> {
                    let bean = factory(host_ref::<T>(instance)?, arguments)?;
                    Ok(bean.map(|bean| Instance::new(Arc::new(bean))))
                },
            ),
        }
    }
}

/// 类型化的描述符构建器
pub struct DescriptorBuilder<T> {
    role: Role,
    condition: Option<ConfigCondition>,
    constructors: Vec<Constructor>,
    provisions: Vec<Provision>,
    inject_fields: Vec<InjectField>,
    schema: Schema<T>,
    methods: Vec<Method>,
    command_handler: Option<CommandCast>,
    tab_completer: Option<CompleterCast>,
}

impl<T: Send + Sync + 'static> DescriptorBuilder<T> {
    fn new(role: Role) -> Self {
        Self {
            role,
            condition: None,
            constructors: Vec::new(),
            provisions: Vec::new(),
            inject_fields: Vec::new(),
            schema: Schema::new(),
            methods: Vec::new(),
            command_handler: None,
            tab_completer: None,
        }
    }

    /// 声明构造函数
    pub fn constructor<F>(mut self, parameters: Parameters, factory: F) -> Self
    where
        F: Fn(&Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor {
            parameters,
            factory: Arc::new(move |arguments: &Arguments| -> Result<Instance, BoxError> {
                Ok(Instance::new(Arc::new(factory(arguments)?)))
            }),
        });
        self
    }

    /// 声明提供的能力类型
    pub fn provides<I>(mut self, cast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.provisions.push(Provision::of(cast));
        self
    }

    /// 设置注册条件
    pub fn conditional_on(mut self, condition: ConfigCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// 声明注入字段
    pub fn inject<D>(mut self, name: impl Into<String>, accessor: fn(&T) -> &Injected<D>) -> Self
    where
        D: ?Sized + Send + Sync + 'static,
    {
        let assign: AssignDependency = Arc::new(
            move |host: &Instance, dependency: &Instance| -> Result<(), BoxError> {
                let dependency = dependency.downcast::<D>().ok_or_else(|| {
                    format!("依赖类型不匹配: 期望 {}", std::any::type_name::<D>())
                })?;
                if accessor(host_ref::<T>(host)?).set(dependency).is_err() {
                    debug!(
                        "字段已注入，保留原值: {} <- {}",
                        std::any::type_name::<T>(),
                        std::any::type_name::<D>()
                    );
                }
                Ok(())
            },
        );
        self.inject_fields.push(InjectField {
            name: name.into(),
            dependency: TypeInfo::of::<D>(),
            assign,
        });
        self
    }

    /// 声明标量配置字段
    pub fn value<V>(mut self, tag: ValueTag, accessor: fn(&T) -> &ConfigValue<V>) -> Self
    where
        V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.schema = self.schema.value(tag, accessor);
        self
    }

    /// 声明枚举配置字段
    pub fn enumeration<E>(mut self, tag: ValueTag, accessor: fn(&T) -> &ConfigValue<E>) -> Self
    where
        E: ConfigEnum,
    {
        self.schema = self.schema.enumeration(tag, accessor);
        self
    }

    /// 声明映射配置字段
    pub fn map<V>(
        mut self,
        tag: ValueTag,
        accessor: fn(&T) -> &ConfigValue<HashMap<String, V>>,
    ) -> Self
    where
        V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.schema = self.schema.map(tag, accessor);
        self
    }

    /// 声明嵌套配置节字段
    pub fn section<S>(mut self, tag: ValueTag, accessor: fn(&T) -> &ConfigValue<S>) -> Self
    where
        S: ConfigurationSection,
    {
        self.schema = self.schema.section(tag, accessor);
        self
    }

    /// 声明经转换器转换的配置字段
    pub fn transformed<Tr>(
        mut self,
        tag: ValueTag,
        accessor: fn(&T) -> &ConfigValue<Tr::Value>,
    ) -> Self
    where
        Tr: ValueTransformer + Default,
        Tr::Value: Clone + Send + Sync + 'static,
    {
        self.schema = self.schema.transformed::<Tr>(tag, accessor);
        self
    }

    /// 声明无参数的生命周期钩子
    pub fn post_construct<F>(self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.post_construct_with(name, Parameters::new(), move |host: &T, _: &Arguments| {
            hook(host)
        })
    }

    /// 声明带参数列表的生命周期钩子
    ///
    /// 生命周期钩子不允许有参数，装配时会以 PostConstruct 错误拒绝
    pub fn post_construct_with<F>(
        mut self,
        name: impl Into<String>,
        parameters: Parameters,
        hook: F,
    ) -> Self
    where
        F: Fn(&T, &Arguments) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.methods.push(Method {
            name: name.into(),
            visibility: Visibility::Public,
            parameters,
            role: MethodRole::PostConstruct,
            invoke: unit_invoke(hook),
        });
        self
    }

    /// 声明公开、无参数的定时任务
    pub fn task<F>(self, name: impl Into<String>, spec: TaskSpec, job: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.task_with(
            name,
            spec,
            Parameters::new(),
            Visibility::Public,
            move |host: &T, _: &Arguments| job(host),
        )
    }

    /// 声明任意形态的定时任务
    ///
    /// 只有公开且无参数的任务能注册到调度器
    pub fn task_with<F>(
        mut self,
        name: impl Into<String>,
        spec: TaskSpec,
        parameters: Parameters,
        visibility: Visibility,
        job: F,
    ) -> Self
    where
        F: Fn(&T, &Arguments) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.methods.push(Method {
            name: name.into(),
            visibility,
            parameters,
            role: MethodRole::Task(spec),
            invoke: unit_invoke(job),
        });
        self
    }

    /// 声明无参数的 Bean 方法
    pub fn bean<B, F>(self, name: impl Into<String>, factory: F) -> Self
    where
        B: Send + Sync + 'static,
        F: Fn(&T) -> Result<B, BoxError> + Send + Sync + 'static,
    {
        self.bean_method(BeanMethod::new(
            name,
            Parameters::new(),
            move |host: &T, _: &Arguments| factory(host).map(Some),
        ))
    }

    /// 声明 Bean 方法
    pub fn bean_method<B>(mut self, method: BeanMethod<T, B>) -> Self
    where
        B: Send + Sync + 'static,
    {
        self.methods.push(method.into_method());
        self
    }

    /// 生成描述符
    pub fn build(self) -> ComponentDescriptor {
        ComponentDescriptor {
            type_info: TypeInfo::of::<T>(),
            role: self.role,
            condition: self.condition,
            constructors: self.constructors,
            provisions: self.provisions,
            inject_fields: self.inject_fields,
            values: self.schema.build(),
            methods: self.methods,
            command_handler: self.command_handler,
            tab_completer: self.tab_completer,
            host: host_of::<T>,
        }
    }
}

impl<T: TabCompleter + 'static> DescriptorBuilder<T> {
    /// 注册命令时一并提供补全器
    pub fn tab_completer(mut self) -> Self {
        self.tab_completer = Some(Arc::new(
            |instance: &Instance| -> Option<Arc<dyn TabCompleter>> {
                instance
                    .downcast::<T>()
                    .map(|completer| completer as Arc<dyn TabCompleter>)
            },
        ));
        self
    }
}

fn unit_invoke<T, F>(f: F) -> Invoke
where
    T: Send + Sync + 'static,
    F: Fn(&T, &Arguments) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(
        move |instance: &Instance, arguments: &Arguments| -> Result<Option<Instance>, BoxError> {
            f(host_ref::<T>(instance)?, arguments)?;
            Ok(None)
        },
    )
}

fn host_ref<T: Send + Sync + 'static>(instance: &Instance) -> Result<&T, BoxError> {
    instance.downcast_ref::<T>().ok_or_else(|| {
        format!(
            "实例类型不匹配: 期望 {}, 实际 {}",
            std::any::type_name::<T>(),
            instance.type_info()
        )
        .into()
    })
}

fn host_of<T: Send + Sync + 'static>(instance: &Instance) -> Option<&dyn Any> {
    instance.downcast_ref::<T>().map(|value| value as &dyn Any)
}
