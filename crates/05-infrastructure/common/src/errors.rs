//! 错误类型定义

use thiserror::Error;

/// 通用错误来源类型
///
/// 用户提供的构造函数、生命周期方法与转换器都以此类型报告失败
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置文件写入失败: {path}, 原因: {source}")]
    FileWriteError {
        path: String,
        source: std::io::Error,
    },

    #[error("配置解析失败: {path}, 原因: {source}")]
    ParseError { path: String, source: BoxError },

    #[error("配置序列化失败: {source}")]
    SerializationError { source: BoxError },
}

/// 依赖注入错误类型
///
/// 除 `TaskExecution` 在定时执行阶段外，所有错误都会中止整个装配过程
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("注入上下文无效: {message}")]
    InvalidContext { message: String },

    #[error("检测到循环依赖: {type_name}")]
    CircularDependency { type_name: String },

    #[error("注入失败: {target}, 原因: {source}")]
    FailedInjection { target: String, source: BoxError },

    #[error("PostConstruct 方法失败: {method} ({type_name}), 原因: {source}")]
    PostConstruct {
        method: String,
        type_name: String,
        source: BoxError,
    },

    #[error("Bean 创建失败: {method} ({type_name}), 原因: {source}")]
    Bean {
        method: String,
        type_name: String,
        source: BoxError,
    },

    #[error("任务执行失败: {method} ({type_name}), 原因: {source}")]
    TaskExecution {
        method: String,
        type_name: String,
        source: BoxError,
    },

    #[error("组件未注册: {type_name}")]
    ComponentNotRegistered { type_name: String },

    #[error("组件注册失败: {type_name}, 原因: {message}")]
    RegistrationError { type_name: String, message: String },
}

impl DependencyError {
    /// 创建注入上下文无效错误
    pub fn invalid_context(message: impl Into<String>) -> Self {
        Self::InvalidContext {
            message: message.into(),
        }
    }

    /// 创建注入失败错误
    pub fn failed_injection(target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::FailedInjection {
            target: target.into(),
            source: source.into(),
        }
    }

    /// 创建 PostConstruct 错误
    pub fn post_construct(
        method: impl Into<String>,
        type_name: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::PostConstruct {
            method: method.into(),
            type_name: type_name.into(),
            source: source.into(),
        }
    }

    /// 创建 Bean 错误
    pub fn bean(
        method: impl Into<String>,
        type_name: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Bean {
            method: method.into(),
            type_name: type_name.into(),
            source: source.into(),
        }
    }

    /// 创建任务执行错误
    pub fn task_execution(
        method: impl Into<String>,
        type_name: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::TaskExecution {
            method: method.into(),
            type_name: type_name.into(),
            source: source.into(),
        }
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_failed_injection_keeps_source() {
        let error = DependencyError::failed_injection("demo::Service", "boom");
        assert!(error.to_string().contains("demo::Service"));
        assert_eq!(error.source().map(ToString::to_string), Some("boom".to_string()));
    }

    #[test]
    fn test_infrastructure_error_from_dependency_error() {
        let error: InfrastructureError = DependencyError::CircularDependency {
            type_name: "demo::A".to_string(),
        }
        .into();
        assert!(matches!(error, InfrastructureError::DependencyError { .. }));
        assert!(error.to_string().contains("demo::A"));
    }
}
