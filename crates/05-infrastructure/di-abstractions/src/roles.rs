//! 角色标记定义
//!
//! 类型级角色决定组件在装配流程中的阶段，方法级角色决定全局处理阶段的行为

use config_abstractions::StorageKind;
use std::fmt;
use std::time::Duration;

/// 类型级角色种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleKind {
    /// 配置类型
    Configuration,
    /// Bean 工厂
    BeanFactory,
    /// 命令
    Command,
    /// 监听器组
    ListenerGroup,
    /// 普通组件
    Component,
    /// 管理器
    Manager,
    /// 服务
    Service,
}

impl RoleKind {
    /// 装配阶段顺序
    pub const PHASE_ORDER: [RoleKind; 7] = [
        RoleKind::Configuration,
        RoleKind::BeanFactory,
        RoleKind::Command,
        RoleKind::ListenerGroup,
        RoleKind::Component,
        RoleKind::Manager,
        RoleKind::Service,
    ];

    /// 获取角色名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration",
            Self::BeanFactory => "BeanFactory",
            Self::Command => "Command",
            Self::ListenerGroup => "ListenerGroup",
            Self::Component => "Component",
            Self::Manager => "Manager",
            Self::Service => "Service",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 配置来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationSource {
    /// 存储格式
    pub storage: StorageKind,
    /// 相对数据目录的文件路径
    pub file_path: String,
}

impl ConfigurationSource {
    /// 创建配置来源
    pub fn new(storage: StorageKind, file_path: impl Into<String>) -> Self {
        Self {
            storage,
            file_path: file_path.into(),
        }
    }

    /// YAML 文件来源
    pub fn yaml(file_path: impl Into<String>) -> Self {
        Self::new(StorageKind::Yaml, file_path)
    }
}

impl Default for ConfigurationSource {
    fn default() -> Self {
        Self::yaml(StorageKind::DEFAULT_FILE)
    }
}

/// 命令声明
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// 命令名称
    pub name: String,
    /// 别名
    pub aliases: Vec<String>,
    /// 所需权限
    pub permission: Option<String>,
    /// 是否覆盖同名命令
    pub override_existing: bool,
}

impl CommandSpec {
    /// 创建命令声明
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            permission: None,
            override_existing: false,
        }
    }

    /// 设置别名
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// 设置所需权限
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    /// 覆盖已存在的同名命令
    pub fn override_existing(mut self) -> Self {
        self.override_existing = true;
        self
    }
}

/// 类型级角色
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// 配置类型，带有自身的配置来源
    Configuration(ConfigurationSource),
    /// Bean 工厂
    BeanFactory,
    /// 命令
    Command(CommandSpec),
    /// 监听器组
    ListenerGroup,
    /// 普通组件
    Component,
    /// 管理器
    Manager,
    /// 服务
    Service,
}

impl Role {
    /// 获取角色种类
    pub fn kind(&self) -> RoleKind {
        match self {
            Self::Configuration(_) => RoleKind::Configuration,
            Self::BeanFactory => RoleKind::BeanFactory,
            Self::Command(_) => RoleKind::Command,
            Self::ListenerGroup => RoleKind::ListenerGroup,
            Self::Component => RoleKind::Component,
            Self::Manager => RoleKind::Manager,
            Self::Service => RoleKind::Service,
        }
    }
}

/// 配置属性条件
///
/// 读取配置属性并与期望值比较，决定组件是否参与注册
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigCondition {
    /// 存储格式
    pub storage: StorageKind,
    /// 配置文件路径
    pub file_path: String,
    /// 属性路径
    pub property_path: String,
    /// 期望值的字符串形式
    pub having_value: String,
    /// 属性缺失时是否视为满足
    pub match_if_missing: bool,
}

impl ConfigCondition {
    /// 在默认配置文件上创建条件
    pub fn property(property_path: impl Into<String>, having_value: impl Into<String>) -> Self {
        Self {
            storage: StorageKind::Yaml,
            file_path: StorageKind::DEFAULT_FILE.to_string(),
            property_path: property_path.into(),
            having_value: having_value.into(),
            match_if_missing: false,
        }
    }

    /// 指定配置文件
    pub fn in_file(mut self, storage: StorageKind, file_path: impl Into<String>) -> Self {
        self.storage = storage;
        self.file_path = file_path.into();
        self
    }

    /// 设置属性缺失时的结果
    pub fn match_if_missing(mut self, match_if_missing: bool) -> Self {
        self.match_if_missing = match_if_missing;
        self
    }
}

/// 定时任务声明
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    /// 执行周期
    pub period: Duration,
    /// 首次执行前的延迟
    pub initial_delay: Duration,
}

impl TaskSpec {
    /// 按固定周期执行
    pub fn every(period: Duration) -> Self {
        Self {
            period,
            initial_delay: Duration::ZERO,
        }
    }

    /// 设置首次延迟
    pub fn delayed(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }
}

/// 方法可见性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// 可被调度器直接调用
    #[default]
    Public,
    /// 仅类型内部可见
    Private,
}
