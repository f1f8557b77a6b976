//! 类型注册表

use di_abstractions::{ComponentDescriptor, ComponentRegistry, Instance, Provision, Registration, RoleKind};
use infrastructure_common::{DependencyError, DependencyResult, TypeInfo};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Default)]
struct RegistryState {
    /// 具体实例，按注册顺序
    entries: Vec<Registration>,
    /// 具体类型与能力类型别名到实例的索引
    index: HashMap<TypeInfo, Instance>,
}

/// 类型注册表
///
/// 每个类型对应一个共享实例。具体类型后到覆盖，能力类型别名先到先得，不存在移除操作。
#[derive(Default)]
pub struct TypeRegistry {
    state: RwLock<RegistryState>,
}

impl TypeRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 预注册平台实例
    pub fn register_instance<T>(&self, value: Arc<T>) -> DependencyResult<()>
    where
        T: Send + Sync + 'static,
    {
        self.register(Instance::new(value), None, &[])
    }

    /// 预注册平台实例，并登记它提供的能力类型
    pub fn register_instance_providing<T>(
        &self,
        value: Arc<T>,
        provisions: &[Provision],
    ) -> DependencyResult<()>
    where
        T: Send + Sync + 'static,
    {
        self.register(Instance::new(value), None, provisions)
    }

    /// 类型是否已登记，包括能力类型别名
    pub fn contains(&self, type_info: TypeInfo) -> bool {
        self.state.read().index.contains_key(&type_info)
    }

    /// 全部条目的快照
    pub fn registrations(&self) -> Vec<Registration> {
        self.state.read().entries.clone()
    }
}

impl ComponentRegistry for TypeRegistry {
    fn register(
        &self,
        instance: Instance,
        descriptor: Option<Arc<ComponentDescriptor>>,
        provisions: &[Provision],
    ) -> DependencyResult<()> {
        let type_info = instance.type_info();
        if let Some(descriptor) = &descriptor {
            if descriptor.type_info != type_info {
                return Err(DependencyError::RegistrationError {
                    type_name: type_info.name.to_string(),
                    message: format!("实例类型与描述符 {} 不一致", descriptor.name()),
                });
            }
        }

        let mut state = self.state.write();
        // 先转换全部别名，失败时注册表保持不变
        let mut aliases = Vec::with_capacity(provisions.len());
        for provision in provisions {
            let alias = provision
                .apply(&instance)
                .ok_or_else(|| DependencyError::RegistrationError {
                    type_name: type_info.name.to_string(),
                    message: format!("无法转换为能力类型 {}", provision.capability),
                })?;
            aliases.push((provision.capability, alias));
        }

        if state.index.insert(type_info, instance.clone()).is_some() {
            debug!("类型 {} 已有实例，由新实例覆盖", type_info.short_name());
        }
        for (capability, alias) in aliases {
            match state.index.entry(capability) {
                Entry::Vacant(slot) => {
                    debug!("登记能力类型 {} -> {}", capability.short_name(), type_info.short_name());
                    slot.insert(alias);
                }
                Entry::Occupied(_) => {
                    debug!(
                        "能力类型 {} 已被占用，{} 不覆盖",
                        capability.short_name(),
                        type_info.short_name()
                    );
                }
            }
        }

        let role = descriptor.as_ref().map(|descriptor| descriptor.kind());
        state.entries.push(Registration {
            type_info,
            role,
            descriptor,
            instance,
        });

        match role {
            Some(role) => info!("注册组件: {} ({})", type_info.short_name(), role),
            None => info!("注册实例: {}", type_info.short_name()),
        }
        Ok(())
    }

    fn lookup(&self, type_info: TypeInfo) -> Option<Instance> {
        self.state.read().index.get(&type_info).cloned()
    }

    fn all_of_role(&self, role: RoleKind) -> Vec<Registration> {
        self.state
            .read()
            .entries
            .iter()
            .filter(|entry| entry.role == Some(role))
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    fn entry_at(&self, index: usize) -> Option<Registration> {
        self.state.read().entries.get(index).cloned()
    }
}
