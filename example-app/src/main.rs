//! # 示例应用程序
//!
//! 演示声明式依赖注入与配置绑定：配置类型、能力类型、命令、监听器组与定时任务

use clap::Parser;
use config_abstractions::{config_enum, ConfigValue, ConfigurationSection, Schema, ValueTag};
use di_abstractions::{
    CommandHandler, CommandSpec, ComponentDescriptor, ConfigCondition, ConfigurationSource,
    Injected, Parameters, TabCompleter, TaskSpec,
};
use infrastructure_common::BoxError;
use infrastructure_composition::{Application, LoggingConfig};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "声明式依赖注入示例应用")]
struct Args {
    /// 数据目录，配置文件相对于此目录
    #[arg(short, long, default_value = "data")]
    data_folder: PathBuf,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 使用 JSON 日志格式
    #[arg(long)]
    json_logs: bool,

    /// 启动后执行的命令，例如 `--command "greet world"`
    #[arg(short, long = "command")]
    commands: Vec<String>,

    /// 运行秒数，0 表示等待退出信号
    #[arg(long, default_value_t = 0)]
    run_for: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let logging = LoggingConfig {
        level: parse_log_level(&args.log_level),
        ..if args.json_logs {
            LoggingConfig::production()
        } else {
            LoggingConfig::development()
        }
    };

    let application = build_application(&args, logging)?;
    application.start().await?;

    for line in &args.commands {
        run_command(&application, line);
    }

    if args.run_for == 0 {
        tokio::signal::ctrl_c().await?;
        info!("收到退出信号，正在关闭应用");
    } else {
        tokio::time::sleep(Duration::from_secs(args.run_for)).await;
    }

    application.stop().await?;
    info!("应用已关闭: {:?}", application.metrics());
    Ok(())
}

/// 构建应用
fn build_application(args: &Args, logging: LoggingConfig) -> anyhow::Result<Application> {
    let application = Application::builder("example-app")
        .data_folder(&args.data_folder)
        .with_logging(logging)
        .components([
            AppSettings::descriptor(),
            ConsoleGreeter::descriptor(),
            GreetingService::descriptor(),
            GreetCommand::descriptor(),
            JoinAnnouncer::descriptor(),
            Heartbeat::descriptor(),
        ])?
        .build()?;

    info!(
        "应用构建完成: {} 个实例, {} 个命令",
        application.registrations().len(),
        application.commands().len()
    );
    Ok(application)
}

/// 执行一行命令
fn run_command(application: &Application, line: &str) {
    let mut parts = line.split_whitespace();
    let Some(label) = parts.next() else {
        return;
    };
    let args: Vec<String> = parts.map(str::to_string).collect();

    if let Err(e) = application.commands().dispatch(label, &args) {
        error!("{}", e);
    }
}

/// 解析日志级别
fn parse_log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

// 示例配置

/// 问候风格
#[derive(Debug, Clone, PartialEq)]
pub enum Style {
    /// 普通
    Plain,
    /// 大写
    Loud,
}

config_enum!(Style { Plain => "PLAIN", Loud => "LOUD" });

/// 问候配置节
#[derive(Debug, Clone, Default)]
pub struct GreetingSection {
    /// 问候语
    pub prefix: ConfigValue<String>,
    /// 最大重复次数
    pub max_repeat: ConfigValue<u32>,
}

impl ConfigurationSection for GreetingSection {
    fn schema() -> Schema<Self> {
        Schema::<Self>::new()
            .value(ValueTag::field("prefix"), |section| &section.prefix)
            .value(ValueTag::field("maxRepeat"), |section| &section.max_repeat)
    }
}

/// 应用配置，对应数据目录下的 `app.yml`
pub struct AppSettings {
    /// 问候配置
    pub greeting: ConfigValue<GreetingSection>,
    /// 问候风格
    pub style: ConfigValue<Style>,
}

impl AppSettings {
    fn descriptor() -> ComponentDescriptor {
        ComponentDescriptor::configuration::<AppSettings>(ConfigurationSource::yaml("app.yml"))
            .constructor(Parameters::new(), |_| {
                Ok(AppSettings {
                    greeting: ConfigValue::new(GreetingSection {
                        prefix: ConfigValue::new("Hello".to_string()),
                        max_repeat: ConfigValue::new(3),
                    }),
                    style: ConfigValue::new(Style::Plain),
                })
            })
            .section(ValueTag::field("greeting"), |settings| &settings.greeting)
            .enumeration(ValueTag::field("style"), |settings| &settings.style)
            .build()
    }
}

// 示例组件

/// 问候输出能力
pub trait Greeter: Send + Sync {
    /// 输出问候
    fn greet(&self, text: &str);
}

/// 输出到日志的问候器
pub struct ConsoleGreeter;

impl Greeter for ConsoleGreeter {
    fn greet(&self, text: &str) {
        info!("{}", text);
    }
}

impl ConsoleGreeter {
    fn descriptor() -> ComponentDescriptor {
        ComponentDescriptor::component::<ConsoleGreeter>()
            .constructor(Parameters::new(), |_| Ok(ConsoleGreeter))
            .provides::<dyn Greeter>(|greeter| greeter)
            .build()
    }
}

/// 问候服务
pub struct GreetingService {
    settings: Arc<AppSettings>,
    greeter: Injected<dyn Greeter>,
    greeted: AtomicU64,
}

impl GreetingService {
    fn descriptor() -> ComponentDescriptor {
        ComponentDescriptor::service::<GreetingService>()
            .constructor(
                Parameters::new().dependency::<AppSettings>("settings"),
                |arguments| {
                    Ok(GreetingService {
                        settings: arguments.instance::<AppSettings>(0)?,
                        greeter: Injected::new(),
                        greeted: AtomicU64::new(0),
                    })
                },
            )
            .inject::<dyn Greeter>("greeter", |service| &service.greeter)
            .post_construct("announce", |service| {
                info!("问候服务就绪，风格 {:?}", service.settings.style.get());
                Ok(())
            })
            .build()
    }

    /// 按配置问候
    pub fn greet(&self, name: &str, repeat: u32) -> Result<(), BoxError> {
        let greeter = self.greeter.get().ok_or("问候器未注入")?;
        let section = self.settings.greeting.get();
        let repeat = repeat.min(section.max_repeat.get()).max(1);

        let mut text = format!("{}, {}!", section.prefix.get(), name);
        if self.settings.style.get() == Style::Loud {
            text = text.to_uppercase();
        }
        for _ in 0..repeat {
            greeter.greet(&text);
        }
        self.greeted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// 已问候次数
    pub fn greeted(&self) -> u64 {
        self.greeted.load(Ordering::Relaxed)
    }
}

/// `greet <name> [repeat]` 命令
pub struct GreetCommand {
    service: Arc<GreetingService>,
}

impl GreetCommand {
    fn descriptor() -> ComponentDescriptor {
        ComponentDescriptor::command::<GreetCommand>(
            CommandSpec::new("greet").aliases(["hi"]).permission("example.greet"),
        )
        .constructor(
            Parameters::new().dependency::<GreetingService>("service"),
            |arguments| {
                Ok(GreetCommand {
                    service: arguments.instance::<GreetingService>(0)?,
                })
            },
        )
        .tab_completer()
        .build()
    }
}

impl CommandHandler for GreetCommand {
    fn execute(&self, _label: &str, args: &[String]) -> Result<(), BoxError> {
        let name = args.first().ok_or("用法: greet <name> [repeat]")?;
        let repeat = match args.get(1) {
            Some(raw) => raw.parse::<u32>()?,
            None => 1,
        };
        self.service.greet(name, repeat)
    }
}

impl TabCompleter for GreetCommand {
    fn complete(&self, _label: &str, args: &[String]) -> Vec<String> {
        match args.len() {
            0 | 1 => vec!["world".to_string()],
            _ => vec!["1".to_string(), "2".to_string(), "3".to_string()],
        }
    }
}

/// 加入事件监听器组
pub struct JoinAnnouncer;

impl JoinAnnouncer {
    fn descriptor() -> ComponentDescriptor {
        ComponentDescriptor::listener_group::<JoinAnnouncer>()
            .constructor(Parameters::new(), |_| Ok(JoinAnnouncer))
            .build()
    }
}

/// 心跳任务，`heartbeat.enabled` 为 false 时不注册
pub struct Heartbeat {
    service: Arc<GreetingService>,
}

impl Heartbeat {
    fn descriptor() -> ComponentDescriptor {
        ComponentDescriptor::manager::<Heartbeat>()
            .constructor(
                Parameters::new().dependency::<GreetingService>("service"),
                |arguments| {
                    Ok(Heartbeat {
                        service: arguments.instance::<GreetingService>(0)?,
                    })
                },
            )
            .conditional_on(ConfigCondition::property("heartbeat.enabled", "true").match_if_missing(true))
            .task(
                "beat",
                TaskSpec::every(Duration::from_secs(5)).delayed(Duration::from_secs(1)),
                |heartbeat| {
                    info!("心跳: 已问候 {} 次", heartbeat.service.greeted());
                    Ok(())
                },
            )
            .build()
    }
}
