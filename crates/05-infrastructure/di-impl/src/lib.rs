//! # 依赖注入具体实现
//!
//! 提供类型注册表、角色扫描器、依赖解析器和生命周期编排器的实现
//!
//! ## 装配流程
//!
//! 1. 校验构造函数并检测循环依赖
//! 2. 按 Configuration、BeanFactory、Command、ListenerGroup、Component、Manager、Service 顺序实例化
//! 3. 全局处理：字段注入、配置字段绑定、生命周期钩子、定时任务注册

pub mod injector;
pub mod registry;
pub mod resolver;
pub mod scanner;

pub use injector::Injector;
pub use registry::TypeRegistry;
pub use resolver::Resolver;
pub use scanner::RoleScanner;
