//! 容器外部协作者抽象接口
//!
//! 调度器、命令注册与监听器注册由宿主应用提供，容器只在装配时调用这些接口

use crate::instance::Instance;
use crate::roles::TaskSpec;
use infrastructure_common::{BoxError, DependencyError, DependencyResult};
use std::fmt;
use std::sync::Arc;

/// 命令处理器 trait
pub trait CommandHandler: Send + Sync {
    /// 执行命令
    fn execute(&self, label: &str, args: &[String]) -> Result<(), BoxError>;
}

/// 命令补全 trait
pub trait TabCompleter: Send + Sync {
    /// 返回补全候选项
    fn complete(&self, label: &str, args: &[String]) -> Vec<String>;
}

/// 调度器执行的任务闭包
///
/// 每次调用独立返回结果，失败不影响后续调用
pub type TaskJob = Arc<dyn Fn() -> Result<(), DependencyError> + Send + Sync>;

/// 定时任务描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptor {
    /// 方法名称
    pub method: String,
    /// 声明类型名称
    pub owner: String,
    /// 调度声明
    pub spec: TaskSpec,
}

/// 任务调度器 trait
pub trait TaskScheduler: Send + Sync {
    /// 注册定时任务
    fn register_task(&self, task: TaskDescriptor, job: TaskJob) -> DependencyResult<()>;
}

/// 命令注册信息
#[derive(Clone)]
pub struct CommandRegistration {
    /// 命令名称
    pub name: String,
    /// 别名
    pub aliases: Vec<String>,
    /// 所需权限
    pub permission: Option<String>,
    /// 命令处理器
    pub handler: Arc<dyn CommandHandler>,
    /// 可选的补全器
    pub tab_completer: Option<Arc<dyn TabCompleter>>,
    /// 是否覆盖同名命令
    pub override_existing: bool,
}

impl fmt::Debug for CommandRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistration")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("permission", &self.permission)
            .field("tab_completer", &self.tab_completer.is_some())
            .field("override_existing", &self.override_existing)
            .finish()
    }
}

/// 命令注册器 trait
pub trait CommandRegistrar: Send + Sync {
    /// 注册命令
    fn register_command(&self, registration: CommandRegistration) -> DependencyResult<()>;
}

/// 监听器注册器 trait
pub trait ListenerRegistrar: Send + Sync {
    /// 注册监听器组实例
    fn register(&self, listener: Instance) -> DependencyResult<()>;
}
