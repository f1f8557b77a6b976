//! # Configuration Implementation
//!
//! 配置管理的具体实现：文件存储、文档访问与字段绑定。
//!
//! ## 主要组件
//!
//! - [`FileConfigurationManager`] - 基于数据目录的配置文件管理器（YAML/JSON/TOML）
//! - [`TreeDocument`] - 树形配置文档
//! - [`ConfigurationBinder`] - 按绑定模式写入配置字段
//! - [`TransformerRegistry`] - 配置值转换器缓存

pub mod binder;
pub mod providers;

pub use binder::*;
pub use providers::*;
