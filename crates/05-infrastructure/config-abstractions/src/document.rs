//! 配置文档抽象接口

use serde_json::Value;
use std::fmt;

/// 配置存储格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageKind {
    /// YAML 文件
    #[default]
    Yaml,
    /// JSON 文件
    Json,
    /// TOML 文件
    Toml,
}

impl StorageKind {
    /// 默认配置文件名
    pub const DEFAULT_FILE: &'static str = "config.yml";

    /// 获取格式名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }

    /// 根据文件扩展名推断存储格式
    pub fn from_extension(path: &str) -> Option<Self> {
        let extension = path.rsplit_once('.')?.1.to_ascii_lowercase();
        match extension.as_str() {
            "yml" | "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 配置文档 trait
///
/// 以点号分隔的路径寻址的键值树，路径的某一段本身可以是嵌套的配置节
pub trait ConfigDocument: Send + Sync + fmt::Debug {
    /// 读取路径上的值，不存在时返回 `None`
    fn get(&self, path: &str) -> Option<Value>;

    /// 获取整个文档树的快照
    fn root(&self) -> Value;

    /// 检查路径是否存在
    fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// 检查路径是否指向配置节
    fn is_section(&self, path: &str) -> bool {
        matches!(self.get(path), Some(Value::Object(_)))
    }
}

/// 获取配置值的字符串形式
///
/// 字符串不带引号，其余值使用 JSON 文本表示
pub fn string_form(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
