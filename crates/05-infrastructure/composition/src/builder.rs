//! 应用构建器

use crate::application::{Application, ApplicationContext};
use crate::commands::{CommandManager, ListenerRegistry};
use crate::scheduler::TokioTaskScheduler;
use config_abstractions::ConfigurationManager;
use config_impl::FileConfigurationManager;
use di_abstractions::{
    CommandRegistrar, ComponentDescriptor, ComponentRegistry, Instance, ListenerRegistrar,
    Provision, ScanScope, TaskScheduler,
};
use di_impl::{Injector, TypeRegistry};
use infrastructure_common::{InfrastructureError, InfrastructureResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant as Clock;
use tracing::{debug, info};

/// 应用构建器
///
/// 使用建造者模式收集组件描述符与平台实例，[`ApplicationBuilder::build`] 时完成装配
pub struct ApplicationBuilder {
    /// 应用名称
    name: String,
    /// 数据目录，配置文件相对于此目录
    data_folder: PathBuf,
    /// 扫描范围
    scope: ScanScope,
    /// 预注册的实例
    instances: Vec<Instance>,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 日志配置
    logging_config: LoggingConfig,
}

impl ApplicationBuilder {
    /// 创建新的应用构建器
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            scope: ScanScope::new(name.clone()),
            name,
            data_folder: PathBuf::from("."),
            instances: Vec::new(),
            logging_enabled: false, // 默认不启用日志初始化
            logging_config: LoggingConfig::default(),
        }
    }

    /// 设置数据目录
    pub fn data_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.data_folder = folder.into();
        self
    }

    /// 加入组件描述符
    pub fn component(mut self, descriptor: ComponentDescriptor) -> InfrastructureResult<Self> {
        debug!("加入组件: {}", descriptor.name());
        self.scope.register(descriptor)?;
        Ok(self)
    }

    /// 批量加入组件描述符
    pub fn components<I>(self, descriptors: I) -> InfrastructureResult<Self>
    where
        I: IntoIterator<Item = ComponentDescriptor>,
    {
        descriptors
            .into_iter()
            .try_fold(self, |builder, descriptor| builder.component(descriptor))
    }

    /// 预注册平台实例，组件可以把它声明为依赖
    pub fn instance<T>(mut self, value: Arc<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.instances.push(Instance::new(value));
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self.logging_enabled = true; // 启用日志初始化
        self
    }

    /// 装配并构建应用
    pub fn build(self) -> InfrastructureResult<Application> {
        // 只有在明确配置了日志时才初始化日志
        // 避免在测试环境中重复初始化
        if self.logging_enabled {
            self.logging_config.initialize()?;
        }

        info!("开始构建应用: {}", self.name);
        let started = Clock::now();

        if !self.data_folder.exists() {
            std::fs::create_dir_all(&self.data_folder).map_err(|e| {
                InfrastructureError::BootstrapFailed {
                    message: format!("创建数据目录失败: {}: {}", self.data_folder.display(), e),
                }
            })?;
        }

        let configuration = Arc::new(FileConfigurationManager::new(&self.data_folder));
        let scheduler = Arc::new(TokioTaskScheduler::new());
        let commands = Arc::new(CommandManager::new());
        let listeners = Arc::new(ListenerRegistry::new());
        let context = Arc::new(ApplicationContext::new(&self.name, &self.data_folder));

        let registry = Arc::new(TypeRegistry::new());
        registry.register_instance(Arc::clone(&context))?;
        registry.register_instance_providing(
            Arc::clone(&configuration),
            &[Provision::of::<FileConfigurationManager, dyn ConfigurationManager>(|c| c)],
        )?;
        registry.register_instance_providing(
            Arc::clone(&scheduler),
            &[Provision::of::<TokioTaskScheduler, dyn TaskScheduler>(|s| s)],
        )?;
        registry.register_instance_providing(
            Arc::clone(&commands),
            &[Provision::of::<CommandManager, dyn CommandRegistrar>(|c| c)],
        )?;
        registry.register_instance_providing(
            Arc::clone(&listeners),
            &[Provision::of::<ListenerRegistry, dyn ListenerRegistrar>(|l| l)],
        )?;
        for instance in self.instances {
            registry.register(instance, None, &[])?;
        }

        let injector = Injector::with_registry(
            self.scope,
            Arc::clone(&configuration) as Arc<dyn ConfigurationManager>,
            registry,
        )
        .with_scheduler(Arc::clone(&scheduler) as Arc<dyn TaskScheduler>)
        .with_command_registrar(Arc::clone(&commands) as Arc<dyn CommandRegistrar>)
        .with_listener_registrar(Arc::clone(&listeners) as Arc<dyn ListenerRegistrar>);

        injector.inject()?;

        let application = Application::new(
            context,
            configuration,
            injector,
            scheduler,
            commands,
            listeners,
            started.elapsed(),
        );
        info!("应用构建完成: {}", self.name);
        Ok(application)
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    /// 初始化全局日志订阅者
    ///
    /// `RUST_LOG` 存在时优先使用其过滤规则
    pub fn initialize(&self) -> InfrastructureResult<()> {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(self.level.as_str()));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .with_file(self.show_file)
            .with_line_number(self.show_line_number);

        if self.json_format {
            subscriber.json().try_init()
        } else {
            subscriber.try_init()
        }
        .map_err(|e| InfrastructureError::BootstrapFailed {
            message: format!("日志初始化失败: {}", e),
        })?;

        info!("日志系统初始化完成");
        Ok(())
    }
}
