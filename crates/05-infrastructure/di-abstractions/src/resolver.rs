//! 依赖解析器抽象接口
//!
//! 提供构造函数校验、循环依赖检测和依赖解析的能力

use crate::instance::Instance;
use crate::scanner::ScanScope;
use infrastructure_common::{DependencyError, DependencyResult, TypeInfo};

/// 依赖解析器 trait
pub trait DependencyResolver: Send + Sync {
    /// 校验全部带角色类型的构造函数，并逐个检测循环依赖
    fn validate_all(&self, scope: &ScanScope) -> DependencyResult<()>;

    /// 从指定类型出发检测循环依赖
    fn check_cycles(&self, type_info: TypeInfo, path: &mut CyclePath) -> DependencyResult<()>;

    /// 解析类型，必要时递归实例化并注册
    fn resolve(&self, type_info: TypeInfo) -> DependencyResult<Instance>;

    /// 类型是否可作为受管类型解析
    ///
    /// 直接带角色的类型，或至少有一个可用实现的能力类型
    fn is_managed(&self, type_info: TypeInfo) -> bool;
}

/// 循环检测路径
#[derive(Debug, Clone, Default)]
pub struct CyclePath {
    chain: Vec<TypeInfo>,
}

impl CyclePath {
    /// 创建空路径
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加类型到路径，已存在时报告循环依赖
    pub fn push(&mut self, type_info: TypeInfo) -> DependencyResult<()> {
        if self.contains(type_info) {
            return Err(DependencyError::CircularDependency {
                type_name: type_info.name.to_string(),
            });
        }
        self.chain.push(type_info);
        Ok(())
    }

    /// 从路径中移除最后的类型
    pub fn pop(&mut self) {
        self.chain.pop();
    }

    /// 路径中是否包含类型
    pub fn contains(&self, type_info: TypeInfo) -> bool {
        self.chain.contains(&type_info)
    }

    /// 路径深度
    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// 以 `A -> B -> C` 形式描述路径
    pub fn describe(&self) -> String {
        self.chain
            .iter()
            .map(|type_info| type_info.short_name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}
