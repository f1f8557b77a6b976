//! 配置管理器抽象接口

use crate::document::{ConfigDocument, StorageKind};
use infrastructure_common::ConfigResult;
use serde_json::Value;
use std::sync::Arc;

/// 配置管理器 trait
///
/// 负责配置文档的加载、缓存、重载与持久化。容器只通过这个接口访问配置文件。
pub trait ConfigurationManager: Send + Sync {
    /// 获取已缓存的文档，未缓存时从存储加载
    fn get_or_load(&self, kind: StorageKind, file_path: &str)
        -> ConfigResult<Arc<dyn ConfigDocument>>;

    /// 从存储重新读取文档并替换缓存
    fn reload(&self, kind: StorageKind, file_path: &str) -> ConfigResult<Arc<dyn ConfigDocument>>;

    /// 文档不存在时以给定默认值创建，返回是否写入了文件
    fn create_default(&self, kind: StorageKind, file_path: &str, defaults: &Value)
        -> ConfigResult<bool>;

    /// 覆盖保存文档
    fn save(&self, kind: StorageKind, file_path: &str, content: &Value) -> ConfigResult<()>;
}
