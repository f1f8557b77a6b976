//! 应用主入口

use crate::builder::ApplicationBuilder;
use crate::commands::{CommandManager, ListenerRegistry};
use crate::scheduler::TokioTaskScheduler;
use config_impl::FileConfigurationManager;
use di_abstractions::{ComponentRegistry, Registration};
use di_impl::{Injector, TypeRegistry};
use infrastructure_common::{DependencyError, InfrastructureError, InfrastructureResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 应用上下文
///
/// 装配前预注册到注册表，组件可以把它声明为依赖
#[derive(Debug, Clone)]
pub struct ApplicationContext {
    name: String,
    data_folder: PathBuf,
}

impl ApplicationContext {
    /// 创建应用上下文
    pub fn new(name: impl Into<String>, data_folder: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            data_folder: data_folder.into(),
        }
    }

    /// 应用名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 数据目录
    pub fn data_folder(&self) -> &Path {
        &self.data_folder
    }
}

/// 已装配的应用
///
/// 持有注入器与平台协作者，对象图在构建后固定，只有配置值可以重新加载
pub struct Application {
    context: Arc<ApplicationContext>,
    configuration: Arc<FileConfigurationManager>,
    injector: Injector,
    scheduler: Arc<TokioTaskScheduler>,
    commands: Arc<CommandManager>,
    listeners: Arc<ListenerRegistry>,
    /// 运行状态
    status: RwLock<ApplicationStatus>,
    /// 统计信息
    metrics: RwLock<ApplicationMetrics>,
}

impl Application {
    /// 创建应用构建器
    pub fn builder(name: impl Into<String>) -> ApplicationBuilder {
        ApplicationBuilder::new(name)
    }

    /// 内部构造函数
    pub(crate) fn new(
        context: Arc<ApplicationContext>,
        configuration: Arc<FileConfigurationManager>,
        injector: Injector,
        scheduler: Arc<TokioTaskScheduler>,
        commands: Arc<CommandManager>,
        listeners: Arc<ListenerRegistry>,
        wiring_duration: Duration,
    ) -> Self {
        let metrics = ApplicationMetrics {
            registered_components_count: injector.registry().len(),
            scheduled_tasks_count: scheduler.task_count(),
            commands_count: commands.len(),
            listeners_count: listeners.len(),
            wiring_duration_ms: u64::try_from(wiring_duration.as_millis()).unwrap_or(u64::MAX),
            ..ApplicationMetrics::default()
        };

        Self {
            context,
            configuration,
            injector,
            scheduler,
            commands,
            listeners,
            status: RwLock::new(ApplicationStatus::Wired),
            metrics: RwLock::new(metrics),
        }
    }

    /// 应用上下文
    pub fn context(&self) -> &ApplicationContext {
        &self.context
    }

    /// 按类型获取已注册的实例，可以是具体类型或能力类型
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.injector.registry().get::<T>()
    }

    /// 按类型获取已注册的实例，不存在时返回错误
    pub fn resolve<T>(&self) -> InfrastructureResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get::<T>().ok_or_else(|| {
            DependencyError::ComponentNotRegistered {
                type_name: std::any::type_name::<T>().to_string(),
            }
            .into()
        })
    }

    /// 注册表
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        self.injector.registry()
    }

    /// 全部注册条目
    pub fn registrations(&self) -> Vec<Registration> {
        self.injector.registry().registrations()
    }

    /// 配置管理器
    pub fn configuration(&self) -> &Arc<FileConfigurationManager> {
        &self.configuration
    }

    /// 任务调度器
    pub fn scheduler(&self) -> &Arc<TokioTaskScheduler> {
        &self.scheduler
    }

    /// 命令管理器
    pub fn commands(&self) -> &Arc<CommandManager> {
        &self.commands
    }

    /// 监听器注册表
    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    /// 重新加载全部配置类型
    ///
    /// 配置实例原地更新，对象图不变
    pub fn reload_configurations(&self) -> InfrastructureResult<usize> {
        let count = self.injector.reload_configurations()?;
        self.metrics.write().config_reload_count += 1;
        Ok(count)
    }

    /// 启动定时任务，必须在 tokio 运行时内调用
    pub async fn start(&self) -> InfrastructureResult<()> {
        info!("启动应用: {}", self.context.name());
        {
            let mut status = self.status.write();
            if *status == ApplicationStatus::Running {
                return Err(InfrastructureError::BootstrapFailed {
                    message: "应用已在运行".to_string(),
                });
            }
            *status = ApplicationStatus::Running;
        }

        self.scheduler.start();
        self.metrics.write().start_time = Some(chrono::Utc::now());
        info!("应用启动完成");
        Ok(())
    }

    /// 停止定时任务
    pub async fn stop(&self) -> InfrastructureResult<()> {
        info!("停止应用: {}", self.context.name());
        self.scheduler.stop();
        *self.status.write() = ApplicationStatus::Stopped;
        self.metrics.write().stop_time = Some(chrono::Utc::now());
        info!("应用停止完成");
        Ok(())
    }

    /// 运行状态
    pub fn status(&self) -> ApplicationStatus {
        *self.status.read()
    }

    /// 统计信息
    pub fn metrics(&self) -> ApplicationMetrics {
        self.metrics.read().clone()
    }
}

/// 应用运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    /// 已装配
    Wired,
    /// 运行中
    Running,
    /// 已停止
    Stopped,
}

/// 应用统计信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationMetrics {
    /// 启动时间
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    /// 停止时间
    pub stop_time: Option<chrono::DateTime<chrono::Utc>>,
    /// 已注册的实例数量
    pub registered_components_count: usize,
    /// 定时任务数量
    pub scheduled_tasks_count: usize,
    /// 命令数量
    pub commands_count: usize,
    /// 监听器数量
    pub listeners_count: usize,
    /// 装配耗时（毫秒）
    pub wiring_duration_ms: u64,
    /// 配置重载次数
    pub config_reload_count: u64,
}

impl ApplicationMetrics {
    /// 计算运行时间
    pub fn uptime(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.stop_time) {
            (Some(start), Some(stop)) => Some(stop - start),
            (Some(start), None) => Some(chrono::Utc::now() - start),
            _ => None,
        }
    }
}
