//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义组件描述、注册和依赖解析的核心接口。
//!
//! ## 核心接口
//!
//! - [`ComponentDescriptor`] - 组件描述符，取代运行时反射的显式注册表项
//! - [`ComponentRegistry`] - 组件注册表接口
//! - [`ComponentScanner`] - 组件扫描器接口
//! - [`DependencyResolver`] - 依赖解析器接口
//! - [`TaskScheduler`] / [`CommandRegistrar`] / [`ListenerRegistrar`] - 外部协作者接口

pub mod container;
pub mod descriptor;
pub mod instance;
pub mod registry;
pub mod resolver;
pub mod roles;
pub mod scanner;

pub use container::*;
pub use descriptor::*;
pub use instance::*;
pub use registry::*;
pub use resolver::*;
pub use roles::*;
pub use scanner::*;
