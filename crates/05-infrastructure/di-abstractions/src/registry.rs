//! 组件注册表抽象接口

use crate::descriptor::{ComponentDescriptor, Provision};
use crate::instance::Instance;
use crate::roles::RoleKind;
use infrastructure_common::{DependencyResult, TypeInfo};
use std::sync::Arc;

/// 注册表条目
#[derive(Debug, Clone)]
pub struct Registration {
    /// 具体类型
    pub type_info: TypeInfo,
    /// 类型级角色，预注册的平台实例没有角色
    pub role: Option<RoleKind>,
    /// 来源描述符
    pub descriptor: Option<Arc<ComponentDescriptor>>,
    /// 共享实例
    pub instance: Instance,
}

/// 组件注册表 trait
///
/// 类型到唯一共享实例的映射，只增不减
pub trait ComponentRegistry: Send + Sync {
    /// 注册实例
    ///
    /// 实例以自身类型登记，再按声明顺序登记每个能力类型别名，
    /// 已被先前注册占用的别名保持不变
    fn register(
        &self,
        instance: Instance,
        descriptor: Option<Arc<ComponentDescriptor>>,
        provisions: &[Provision],
    ) -> DependencyResult<()>;

    /// 按类型查找实例，可以是具体类型或能力类型
    fn lookup(&self, type_info: TypeInfo) -> Option<Instance>;

    /// 按注册顺序返回指定角色的全部条目
    fn all_of_role(&self, role: RoleKind) -> Vec<Registration>;

    /// 已注册的具体实例数量
    fn len(&self) -> usize;

    /// 注册表是否为空
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按注册顺序取第 `index` 个条目
    ///
    /// 全局阶段以递增下标遍历，期间新增的条目也会被访问到
    fn entry_at(&self, index: usize) -> Option<Registration>;

    /// 按类型取出并转换实例
    fn get<T>(&self) -> Option<Arc<T>>
    where
        Self: Sized,
        T: ?Sized + Send + Sync + 'static,
    {
        self.lookup(TypeInfo::of::<T>())
            .and_then(|instance| instance.downcast::<T>())
    }
}
