//! 命令管理器与监听器注册表

use dashmap::DashMap;
use di_abstractions::{
    CommandHandler, CommandRegistrar, CommandRegistration, Instance, ListenerRegistrar,
    TabCompleter,
};
use infrastructure_common::{BoxError, DependencyError, DependencyResult};
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// 命令执行错误
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("未知命令: {label}")]
    UnknownCommand { label: String },

    #[error("命令执行失败: {name}, 原因: {source}")]
    ExecutionFailed { name: String, source: BoxError },
}

/// 已登记的命令
#[derive(Clone)]
pub struct RegisteredCommand {
    /// 命令名称
    pub name: String,
    /// 别名
    pub aliases: Vec<String>,
    /// 所需权限
    pub permission: Option<String>,
    handler: Arc<dyn CommandHandler>,
    tab_completer: Option<Arc<dyn TabCompleter>>,
}

impl std::fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

/// 命令管理器
///
/// 按名称与别名登记命令。同名命令只有在声明覆盖时才替换先前的登记，别名先到先得。
#[derive(Default)]
pub struct CommandManager {
    commands: DashMap<String, Arc<RegisteredCommand>>,
    aliases: DashMap<String, String>,
}

impl CommandManager {
    /// 创建命令管理器
    pub fn new() -> Self {
        Self::default()
    }

    /// 按名称或别名查找命令
    pub fn find(&self, label: &str) -> Option<Arc<RegisteredCommand>> {
        let label = label.to_lowercase();
        if let Some(command) = self.commands.get(&label) {
            return Some(Arc::clone(command.value()));
        }
        let name = self.aliases.get(&label)?.value().clone();
        self.commands
            .get(&name)
            .map(|command| Arc::clone(command.value()))
    }

    /// 执行命令
    pub fn dispatch(&self, label: &str, args: &[String]) -> Result<(), CommandError> {
        let command = self
            .find(label)
            .ok_or_else(|| CommandError::UnknownCommand {
                label: label.to_string(),
            })?;
        debug!("执行命令 {} ({})", command.name, label);
        command
            .handler
            .execute(label, args)
            .map_err(|source| CommandError::ExecutionFailed {
                name: command.name.clone(),
                source,
            })
    }

    /// 返回补全候选项，命令不存在或没有补全器时为空
    pub fn complete(&self, label: &str, args: &[String]) -> Vec<String> {
        self.find(label)
            .and_then(|command| {
                command
                    .tab_completer
                    .as_ref()
                    .map(|completer| completer.complete(label, args))
            })
            .unwrap_or_default()
    }

    /// 全部命令名称，按字母排序
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.commands.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// 命令数量
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// 是否没有命令
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl CommandRegistrar for CommandManager {
    fn register_command(&self, registration: CommandRegistration) -> DependencyResult<()> {
        let name = registration.name.to_lowercase();
        if name.is_empty() {
            return Err(DependencyError::RegistrationError {
                type_name: "command".to_string(),
                message: "命令名称不能为空".to_string(),
            });
        }

        if let Some(previous) = self.commands.get(&name).map(|entry| Arc::clone(entry.value())) {
            if !registration.override_existing {
                return Err(DependencyError::RegistrationError {
                    type_name: name,
                    message: "命令已存在且未声明覆盖".to_string(),
                });
            }
            info!("覆盖命令: {}", name);
            self.aliases
                .retain(|_, target| target.as_str() != previous.name.as_str());
        }

        let mut aliases = Vec::new();
        for alias in &registration.aliases {
            let alias = alias.to_lowercase();
            if alias == name || self.commands.contains_key(&alias) {
                continue;
            }
            match self.aliases.entry(alias.clone()) {
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(name.clone());
                    aliases.push(alias);
                }
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    debug!("别名 {} 已被占用，{} 不使用该别名", alias, name);
                }
            }
        }

        info!("注册命令: {} (别名 {:?})", name, aliases);
        self.commands.insert(
            name.clone(),
            Arc::new(RegisteredCommand {
                name,
                aliases,
                permission: registration.permission,
                handler: registration.handler,
                tab_completer: registration.tab_completer,
            }),
        );
        Ok(())
    }
}

/// 监听器注册表
///
/// 按注册顺序保存监听器组实例
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Instance>>,
}

impl ListenerRegistry {
    /// 创建监听器注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部监听器
    pub fn listeners(&self) -> Vec<Instance> {
        self.listeners.read().clone()
    }

    /// 指定类型的监听器
    pub fn of_type<T>(&self) -> Vec<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.listeners
            .read()
            .iter()
            .filter_map(Instance::downcast::<T>)
            .collect()
    }

    /// 监听器数量
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// 是否没有监听器
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

impl ListenerRegistrar for ListenerRegistry {
    fn register(&self, listener: Instance) -> DependencyResult<()> {
        info!("注册监听器: {}", listener.type_info().short_name());
        self.listeners.write().push(listener);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Echo {
        calls: Mutex<Vec<String>>,
        reply: &'static str,
    }

    impl Echo {
        fn new(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                reply,
            })
        }
    }

    impl CommandHandler for Echo {
        fn execute(&self, label: &str, args: &[String]) -> Result<(), BoxError> {
            if args.first().map(String::as_str) == Some("fail") {
                return Err("requested failure".into());
            }
            self.calls.lock().push(format!("{label}:{}", self.reply));
            Ok(())
        }
    }

    impl TabCompleter for Echo {
        fn complete(&self, _label: &str, _args: &[String]) -> Vec<String> {
            vec![self.reply.to_string()]
        }
    }

    fn registration(name: &str, handler: &Arc<Echo>, override_existing: bool) -> CommandRegistration {
        CommandRegistration {
            name: name.to_string(),
            aliases: vec!["e".to_string()],
            permission: None,
            handler: Arc::clone(handler) as Arc<dyn CommandHandler>,
            tab_completer: Some(Arc::clone(handler) as Arc<dyn TabCompleter>),
            override_existing,
        }
    }

    #[test]
    fn test_dispatch_by_name_and_alias() {
        let manager = CommandManager::new();
        let echo = Echo::new("first");
        manager.register_command(registration("echo", &echo, false)).unwrap();

        manager.dispatch("echo", &[]).unwrap();
        manager.dispatch("E", &[]).unwrap();

        assert_eq!(*echo.calls.lock(), vec!["echo:first".to_string(), "E:first".to_string()]);
        assert_eq!(manager.complete("e", &[]), vec!["first".to_string()]);
        assert!(matches!(
            manager.dispatch("missing", &[]),
            Err(CommandError::UnknownCommand { .. })
        ));
    }

    #[test]
    fn test_duplicate_requires_override() {
        let manager = CommandManager::new();
        let first = Echo::new("first");
        let second = Echo::new("second");
        manager.register_command(registration("echo", &first, false)).unwrap();

        assert!(manager
            .register_command(registration("echo", &second, false))
            .is_err());
        manager.register_command(registration("echo", &second, true)).unwrap();

        manager.dispatch("e", &[]).unwrap();
        assert!(first.calls.lock().is_empty());
        assert_eq!(second.calls.lock().len(), 1);
        assert_eq!(manager.names(), vec!["echo".to_string()]);
    }

    #[test]
    fn test_handler_failure_is_reported() {
        let manager = CommandManager::new();
        manager
            .register_command(registration("echo", &Echo::new("x"), false))
            .unwrap();
        let error = manager.dispatch("echo", &["fail".to_string()]).unwrap_err();
        assert!(matches!(error, CommandError::ExecutionFailed { .. }));
    }

    struct Audit;

    #[test]
    fn test_listener_registry_keeps_order_and_type() {
        let registry = ListenerRegistry::new();
        registry.register(Instance::new(Arc::new(Audit))).unwrap();
        registry.register(Instance::new(Echo::new("x"))).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.of_type::<Audit>().len(), 1);
        assert!(registry.listeners()[1].is::<Echo>());
    }
}
