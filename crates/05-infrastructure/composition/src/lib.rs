//! # 应用组合层
//!
//! 将依赖注入容器、配置管理器与平台协作者组合成一个可运行的应用。
//!
//! ## 主要功能
//!
//! - **应用构建器**: 使用构建者模式收集组件描述符并完成装配
//! - **任务调度**: 基于 tokio 按初始延迟与周期执行定时任务
//! - **命令管理**: 按名称与别名登记、分发和补全命令
//! - **监听器注册**: 按注册顺序保存监听器组实例
//! - **生命周期管理**: 启动、停止与配置重载
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use di_abstractions::{ComponentDescriptor, Parameters};
//! use infrastructure_composition::{Application, LoggingConfig};
//!
//! struct Greeter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let application = Application::builder("demo")
//!         .data_folder("./data")
//!         .with_logging(LoggingConfig::development())
//!         .component(
//!             ComponentDescriptor::service::<Greeter>()
//!                 .constructor(Parameters::new(), |_| Ok(Greeter))
//!                 .build(),
//!         )?
//!         .build()?;
//!
//!     application.start().await?;
//!     let _greeter = application.resolve::<Greeter>()?;
//!     application.stop().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod builder;
pub mod commands;
pub mod scheduler;

// 重新导出主要类型
pub use application::{Application, ApplicationContext, ApplicationMetrics, ApplicationStatus};
pub use builder::{ApplicationBuilder, LoggingConfig};
pub use commands::{CommandError, CommandManager, ListenerRegistry, RegisteredCommand};
pub use scheduler::{ScheduledTask, TokioTaskScheduler};

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;
