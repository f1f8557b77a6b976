//! 配置文档与文件配置管理器实现

use config_abstractions::{ConfigDocument, ConfigurationManager, StorageKind};
use dashmap::DashMap;
use infrastructure_common::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// 树形配置文档
///
/// 所有存储格式统一规范化为 JSON 值树
#[derive(Debug, Clone, Default)]
pub struct TreeDocument {
    root: Value,
}

impl TreeDocument {
    /// 创建空文档
    pub fn empty() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// 从值树创建文档，`null` 根视为空文档
    pub fn from_value(root: Value) -> Self {
        match root {
            Value::Null => Self::empty(),
            root => Self { root },
        }
    }

    /// 按存储格式解析文本
    pub fn parse(kind: StorageKind, content: &str, origin: &str) -> ConfigResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::empty());
        }

        let parse_error = |source: Box<dyn std::error::Error + Send + Sync>| {
            ConfigError::ParseError {
                path: origin.to_string(),
                source,
            }
        };

        let root = match kind {
            StorageKind::Yaml => {
                serde_yaml::from_str::<Value>(content).map_err(|e| parse_error(Box::new(e)))?
            }
            StorageKind::Json => {
                serde_json::from_str::<Value>(content).map_err(|e| parse_error(Box::new(e)))?
            }
            StorageKind::Toml => {
                let table = toml::from_str::<toml::Value>(content)
                    .map_err(|e| parse_error(Box::new(e)))?;
                toml_to_json(&table)
            }
        };

        Ok(Self::from_value(root))
    }

    /// 按存储格式序列化文档树
    pub fn render(kind: StorageKind, root: &Value) -> ConfigResult<String> {
        let serialization_error = |source: Box<dyn std::error::Error + Send + Sync>| {
            ConfigError::SerializationError { source }
        };

        match kind {
            StorageKind::Yaml => {
                serde_yaml::to_string(root).map_err(|e| serialization_error(Box::new(e)))
            }
            StorageKind::Json => {
                serde_json::to_string_pretty(root).map_err(|e| serialization_error(Box::new(e)))
            }
            StorageKind::Toml => {
                let table = toml::Value::try_from(without_nulls(root))
                    .map_err(|e| serialization_error(Box::new(e)))?;
                toml::to_string_pretty(&table).map_err(|e| serialization_error(Box::new(e)))
            }
        }
    }

    /// 从嵌套路径获取值
    fn get_nested_value(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.root);
        }

        let mut current = &self.root;
        for part in path.split('.') {
            current = current.as_object()?.get(part)?;
        }

        Some(current)
    }
}

impl ConfigDocument for TreeDocument {
    fn get(&self, path: &str) -> Option<Value> {
        match self.get_nested_value(path) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.clone()),
        }
    }

    fn root(&self) -> Value {
        self.root.clone()
    }
}

/// 文件配置管理器
///
/// 以数据目录为根读写配置文件，已加载的文档按（格式, 路径）缓存
#[derive(Debug)]
pub struct FileConfigurationManager {
    data_folder: PathBuf,
    documents: DashMap<(StorageKind, String), Arc<TreeDocument>>,
}

impl FileConfigurationManager {
    /// 创建新的文件配置管理器
    pub fn new(data_folder: impl Into<PathBuf>) -> Self {
        Self {
            data_folder: data_folder.into(),
            documents: DashMap::new(),
        }
    }

    /// 数据目录
    pub fn data_folder(&self) -> &Path {
        &self.data_folder
    }

    /// 解析配置文件的完整路径
    pub fn resolve_path(&self, file_path: &str) -> PathBuf {
        self.data_folder.join(file_path)
    }

    /// 已缓存的文档数量
    pub fn cached_count(&self) -> usize {
        self.documents.len()
    }

    /// 从磁盘读取文档，文件不存在时返回空文档
    fn load(&self, kind: StorageKind, file_path: &str) -> ConfigResult<TreeDocument> {
        let path = self.resolve_path(file_path);
        if !path.exists() {
            debug!("配置文件不存在，使用空文档: {}", path.display());
            return Ok(TreeDocument::empty());
        }

        debug!("加载 {} 配置文件: {}", kind, path.display());
        let content = std::fs::read_to_string(&path)?;
        TreeDocument::parse(kind, &content, &path.display().to_string())
    }

    fn write(&self, kind: StorageKind, file_path: &str, content: &Value) -> ConfigResult<()> {
        let path = self.resolve_path(file_path);
        let text = TreeDocument::render(kind, content)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::FileWriteError {
                path: parent.display().to_string(),
                source,
            })?;
        }

        std::fs::write(&path, text).map_err(|source| ConfigError::FileWriteError {
            path: path.display().to_string(),
            source,
        })
    }

    fn cache_key(kind: StorageKind, file_path: &str) -> (StorageKind, String) {
        (kind, file_path.to_string())
    }
}

impl ConfigurationManager for FileConfigurationManager {
    fn get_or_load(
        &self,
        kind: StorageKind,
        file_path: &str,
    ) -> ConfigResult<Arc<dyn ConfigDocument>> {
        let key = Self::cache_key(kind, file_path);
        if let Some(document) = self.documents.get(&key) {
            return Ok(Arc::clone(document.value()) as Arc<dyn ConfigDocument>);
        }

        let document = Arc::new(self.load(kind, file_path)?);
        self.documents.insert(key, Arc::clone(&document));
        Ok(document as Arc<dyn ConfigDocument>)
    }

    fn reload(&self, kind: StorageKind, file_path: &str) -> ConfigResult<Arc<dyn ConfigDocument>> {
        info!("重新加载配置文件: {}", file_path);
        let document = Arc::new(self.load(kind, file_path)?);
        self.documents
            .insert(Self::cache_key(kind, file_path), Arc::clone(&document));
        Ok(document as Arc<dyn ConfigDocument>)
    }

    fn create_default(
        &self,
        kind: StorageKind,
        file_path: &str,
        defaults: &Value,
    ) -> ConfigResult<bool> {
        if self.resolve_path(file_path).exists() {
            return Ok(false);
        }

        info!("创建默认配置文件: {}", file_path);
        self.write(kind, file_path, defaults)?;
        self.documents.remove(&Self::cache_key(kind, file_path));
        Ok(true)
    }

    fn save(&self, kind: StorageKind, file_path: &str, content: &Value) -> ConfigResult<()> {
        debug!("保存配置文件: {}", file_path);
        self.write(kind, file_path, content)?;
        self.documents.insert(
            Self::cache_key(kind, file_path),
            Arc::new(TreeDocument::from_value(content.clone())),
        );
        Ok(())
    }
}

/// 将 TOML 值转换为 JSON 值
fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Number(serde_json::Number::from(*i)),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Array(arr) => Value::Array(arr.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
    }
}

/// TOML 不能表示空值，写出前移除
fn without_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), without_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(without_nulls).collect()),
        other => other.clone(),
    }
}
