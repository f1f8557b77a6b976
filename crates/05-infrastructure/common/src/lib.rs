//! # Infrastructure Common
//!
//! 这个 crate 提供了依赖注入容器与配置绑定子系统共享的基础类型。
//!
//! ## 核心内容
//!
//! - [`TypeInfo`] - 类型标识，注册表的键
//! - [`DependencyError`] / [`ConfigError`] - 错误分类
//! - [`NamingConventions`] - 配置路径命名约定（驼峰转短横线）
//!
//! ## 设计原则
//!
//! - 基于 Rust 类型系统的编译时安全
//! - 显式注册表代替运行时反射
//! - 约定优于配置

pub mod conventions;
pub mod errors;
pub mod metadata;

pub use conventions::*;
pub use errors::*;
pub use metadata::*;
