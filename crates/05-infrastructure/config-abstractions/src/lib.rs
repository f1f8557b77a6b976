//! # Configuration Abstractions
//!
//! 配置管理抽象层，定义配置文档访问接口与声明式绑定模式。
//!
//! ## 核心接口
//!
//! - [`ConfigDocument`] - 以点号路径寻址的配置文档
//! - [`ConfigurationManager`] - 配置文档的加载、重载与默认值生成
//! - [`Schema`] / [`BindingSchema`] - 字段绑定声明
//! - [`ConfigurationSection`] - 可递归绑定的配置节
//! - [`ConfigEnum`] - 按名称绑定的枚举
//! - [`ValueTransformer`] - 自定义配置值转换器

pub mod document;
pub mod manager;
pub mod schema;
pub mod transform;

pub use document::*;
pub use manager::*;
pub use schema::*;
pub use transform::*;
