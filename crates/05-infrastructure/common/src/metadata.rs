//! 元数据定义
//!
//! 提供类型标识信息，作为注册表与依赖图的键

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 类型信息
///
/// 相等性与哈希只取决于 [`TypeId`]，名称仅用于日志与错误消息。
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    /// 类型ID
    pub id: TypeId,
    /// 完整类型名称（包含模块路径）
    pub name: &'static str,
}

impl TypeInfo {
    /// 从类型获取类型信息，支持 `dyn Trait` 这样的非固定大小类型
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }

    /// 判断是否为指定类型
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 去掉模块路径，保留泛型参数部分
fn short_type_name(full: &'static str) -> &'static str {
    let generic_start = full.find('<').unwrap_or(full.len());
    match full[..generic_start].rfind("::") {
        Some(index) => &full[index + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample;
    trait Capability {}

    #[test]
    fn test_type_info_identity_ignores_name() {
        let a = TypeInfo::of::<Sample>();
        let b = TypeInfo {
            id: TypeId::of::<Sample>(),
            name: "renamed",
        };
        assert_eq!(a, b);
        assert!(a.is::<Sample>());
        assert!(!a.is::<String>());
    }

    #[test]
    fn test_short_name() {
        assert_eq!(TypeInfo::of::<Sample>().short_name(), "Sample");
        assert_eq!(
            TypeInfo::of::<Vec<String>>().short_name(),
            "Vec<alloc::string::String>"
        );
    }

    #[test]
    fn test_trait_object_type_info() {
        let info = TypeInfo::of::<dyn Capability>();
        assert_ne!(info, TypeInfo::of::<Sample>());
        assert!(info.name.contains("Capability"));
    }
}
