//! 组件扫描器抽象接口
//!
//! 扫描范围是启动时显式构建的描述符表，扫描顺序即插入顺序

use crate::descriptor::ComponentDescriptor;
use crate::roles::RoleKind;
use infrastructure_common::{DependencyError, DependencyResult, TypeInfo};
use std::collections::HashMap;
use std::sync::Arc;

/// 扫描范围
#[derive(Debug, Clone, Default)]
pub struct ScanScope {
    name: String,
    descriptors: Vec<Arc<ComponentDescriptor>>,
    index: HashMap<TypeInfo, usize>,
}

impl ScanScope {
    /// 创建扫描范围
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptors: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// 范围名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 加入描述符，同一具体类型只能出现一次
    pub fn register(&mut self, descriptor: ComponentDescriptor) -> DependencyResult<()> {
        if self.index.contains_key(&descriptor.type_info) {
            return Err(DependencyError::RegistrationError {
                type_name: descriptor.name().to_string(),
                message: format!("类型已存在于扫描范围 {}", self.name),
            });
        }
        self.index
            .insert(descriptor.type_info, self.descriptors.len());
        self.descriptors.push(Arc::new(descriptor));
        Ok(())
    }

    /// 链式加入描述符
    pub fn with(mut self, descriptor: ComponentDescriptor) -> DependencyResult<Self> {
        self.register(descriptor)?;
        Ok(self)
    }

    /// 按具体类型查找描述符
    pub fn get(&self, type_info: TypeInfo) -> Option<&Arc<ComponentDescriptor>> {
        self.index
            .get(&type_info)
            .and_then(|index| self.descriptors.get(*index))
    }

    /// 按扫描顺序列出提供指定能力类型的描述符
    pub fn implementers(&self, capability: TypeInfo) -> Vec<Arc<ComponentDescriptor>> {
        self.descriptors
            .iter()
            .filter(|descriptor| descriptor.provides(capability))
            .cloned()
            .collect()
    }

    /// 全部描述符
    pub fn descriptors(&self) -> &[Arc<ComponentDescriptor>] {
        &self.descriptors
    }

    /// 描述符数量
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// 扫描候选项
#[derive(Debug, Clone)]
pub struct Candidate {
    /// 描述符
    pub descriptor: Arc<ComponentDescriptor>,
    /// 条件门控结果
    pub eligible: bool,
}

/// 组件扫描器 trait
pub trait ComponentScanner: Send + Sync {
    /// 按扫描顺序列出指定角色的候选项，并附带条件门控结果
    fn candidates_with_role(&self, scope: &ScanScope, role: RoleKind) -> Vec<Candidate>;

    /// 评估单个描述符的条件门控
    fn is_eligible(&self, descriptor: &ComponentDescriptor) -> bool;
}
