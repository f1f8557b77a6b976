//! 配置值转换器

use infrastructure_common::{BoxError, TypeInfo};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 配置值转换器 trait
///
/// 在原始配置值与字段的领域类型之间双向转换
pub trait ValueTransformer: Send + Sync + 'static {
    /// 转换后的领域类型
    type Value;

    /// 从原始配置值转换
    fn from_config_value(&self, raw: &Value) -> Result<Self::Value, BoxError>;

    /// 转换回原始配置值，用于生成默认配置文件
    fn to_config_value(&self, value: &Self::Value) -> Result<Value, BoxError>;
}

/// 类型擦除后的转换器实例
pub type SharedTransformer = Arc<dyn Any + Send + Sync>;

/// 转换器描述
///
/// 记录转换器类型及其构造方式，实例由绑定器按类型缓存
#[derive(Clone)]
pub struct TransformerSpec {
    /// 转换器类型
    pub type_info: TypeInfo,
    create: fn() -> SharedTransformer,
}

impl TransformerSpec {
    /// 从转换器类型创建描述
    pub fn of<Tr>() -> Self
    where
        Tr: ValueTransformer + Default,
    {
        fn create<Tr: ValueTransformer + Default>() -> SharedTransformer {
            Arc::new(Tr::default())
        }

        Self {
            type_info: TypeInfo::of::<Tr>(),
            create: create::<Tr>,
        }
    }

    /// 创建新的转换器实例
    pub fn create(&self) -> SharedTransformer {
        (self.create)()
    }
}

impl fmt::Debug for TransformerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerSpec")
            .field("type_info", &self.type_info)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Celsius;

    impl ValueTransformer for Celsius {
        type Value = f64;

        fn from_config_value(&self, raw: &Value) -> Result<f64, BoxError> {
            let text = raw.as_str().ok_or("期望字符串")?;
            Ok(text.trim_end_matches('C').parse()?)
        }

        fn to_config_value(&self, value: &f64) -> Result<Value, BoxError> {
            Ok(json!(format!("{value}C")))
        }
    }

    #[test]
    fn test_spec_creates_transformer_of_declared_type() {
        let spec = TransformerSpec::of::<Celsius>();
        assert!(spec.type_info.is::<Celsius>());

        let transformer = spec.create();
        let celsius = transformer.downcast_ref::<Celsius>().expect("转换器类型");
        assert_eq!(celsius.from_config_value(&json!("21.5C")).unwrap(), 21.5);
        assert_eq!(celsius.to_config_value(&3.0).unwrap(), json!("3C"));
    }
}
