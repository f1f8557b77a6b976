//! 角色扫描器

use config_abstractions::{string_form, ConfigurationManager};
use di_abstractions::{Candidate, ComponentDescriptor, ComponentScanner, RoleKind, ScanScope};
use std::sync::Arc;
use tracing::{debug, trace};

/// 角色扫描器
///
/// 按扫描顺序筛选指定角色的描述符，并评估配置属性条件
pub struct RoleScanner {
    configuration: Arc<dyn ConfigurationManager>,
}

impl RoleScanner {
    /// 创建角色扫描器
    pub fn new(configuration: Arc<dyn ConfigurationManager>) -> Self {
        Self { configuration }
    }
}

impl ComponentScanner for RoleScanner {
    fn candidates_with_role(&self, scope: &ScanScope, role: RoleKind) -> Vec<Candidate> {
        scope
            .descriptors()
            .iter()
            .filter(|descriptor| descriptor.kind() == role)
            .map(|descriptor| Candidate {
                descriptor: Arc::clone(descriptor),
                eligible: self.is_eligible(descriptor),
            })
            .collect()
    }

    fn is_eligible(&self, descriptor: &ComponentDescriptor) -> bool {
        let Some(condition) = &descriptor.condition else {
            return true;
        };

        // 文档无法读取与属性缺失同样处理
        let value = match self
            .configuration
            .get_or_load(condition.storage, &condition.file_path)
        {
            Ok(document) => document.get(&condition.property_path),
            Err(error) => {
                debug!("条件文档 {} 读取失败: {}", condition.file_path, error);
                None
            }
        };

        let eligible = match &value {
            None => condition.match_if_missing,
            Some(value) => string_form(value) == condition.having_value,
        };
        trace!(
            "条件 {}={:?} (期望 '{}') -> {}: {}",
            condition.property_path,
            value,
            condition.having_value,
            descriptor.type_info.short_name(),
            eligible
        );
        eligible
    }
}
