//! 配置绑定模式
//!
//! 组件以 [`Schema`] 声明哪些字段从配置文档绑定。声明构建后被擦除为
//! [`BindingSchema`]，由绑定器按字段种类逐一处理。
//!
//! 组件实例在容器中以共享引用持有，所以可绑定字段统一使用 [`ConfigValue`] 单元，
//! 绑定与重载都通过内部可变性完成。

use crate::transform::{TransformerSpec, ValueTransformer};
use infrastructure_common::{BoxError, TypeInfo};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 配置值标记
///
/// 对应字段或参数上的 Value 标签：成员名称加可选的显式路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueTag {
    name: String,
    path: Option<String>,
}

impl ValueTag {
    /// 以成员名称创建标记，路径由名称推导
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }

    /// 设置显式路径
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// 成员名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 显式路径
    pub fn explicit_path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

/// 可绑定的配置值单元
pub struct ConfigValue<T> {
    value: RwLock<T>,
}

impl<T> ConfigValue<T> {
    /// 以初始值创建
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// 写入新值
    pub fn set(&self, value: T) {
        *self.value.write() = value;
    }

    /// 在读锁内访问当前值
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }
}

impl<T: Clone> ConfigValue<T> {
    /// 获取当前值的副本
    pub fn get(&self) -> T {
        self.value.read().clone()
    }
}

impl<T: Default> Default for ConfigValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone> Clone for ConfigValue<T> {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl<T: fmt::Debug> fmt::Debug for ConfigValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConfigValue").field(&*self.value.read()).finish()
    }
}

impl<T> From<T> for ConfigValue<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

/// 配置枚举 trait
///
/// 枚举按变体名称绑定，区分大小写且必须完全匹配。通常由 [`config_enum!`] 实现。
///
/// [`config_enum!`]: crate::config_enum
pub trait ConfigEnum: Sized + Clone + Send + Sync + 'static {
    /// 全部变体名称
    fn variants() -> &'static [&'static str];

    /// 根据名称查找变体
    fn from_variant(name: &str) -> Option<Self>;

    /// 当前变体名称
    fn variant(&self) -> &'static str;
}

/// 为枚举实现 [`ConfigEnum`]
///
/// ```
/// use config_abstractions::config_enum;
///
/// #[derive(Debug, Clone, PartialEq)]
/// enum Mode {
///     Test,
///     Live,
/// }
///
/// config_enum!(Mode { Test => "TEST", Live => "LIVE" });
/// ```
#[macro_export]
macro_rules! config_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $crate::ConfigEnum for $ty {
            fn variants() -> &'static [&'static str] {
                &[$($name),+]
            }

            fn from_variant(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn variant(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}

/// 配置节 trait
///
/// 标记可递归绑定的嵌套类型。配置节先以默认值构造，绑定完成后整体写回宿主字段。
pub trait ConfigurationSection: Default + Clone + Send + Sync + 'static {
    /// 配置节的绑定模式
    fn schema() -> Schema<Self>;
}

/// 从原始值写入字段
pub type AssignValue = Arc<dyn Fn(&dyn Any, &Value) -> Result<(), BoxError> + Send + Sync>;
/// 读取字段当前值
pub type ReadValue = Arc<dyn Fn(&dyn Any) -> Result<Value, BoxError> + Send + Sync>;
/// 按变体名称写入枚举字段
pub type AssignVariant = Arc<dyn Fn(&dyn Any, &str) -> Result<(), BoxError> + Send + Sync>;
/// 经转换器写入字段
pub type AssignTransformed =
    Arc<dyn Fn(&dyn Any, &dyn Any, &Value) -> Result<(), BoxError> + Send + Sync>;
/// 经转换器读取字段
pub type ReadTransformed = Arc<dyn Fn(&dyn Any, &dyn Any) -> Result<Value, BoxError> + Send + Sync>;
/// 类型擦除的配置节实例
pub type SectionBox = Box<dyn Any + Send + Sync>;

/// 字段种类
#[derive(Clone)]
pub enum FieldKind {
    /// 标量，按字段类型做常规转换
    Scalar { assign: AssignValue, read: ReadValue },
    /// 枚举，按变体名称匹配
    Enumeration {
        variants: &'static [&'static str],
        assign: AssignVariant,
        read: ReadValue,
    },
    /// 映射，复制配置节下每个子键
    Map { assign: AssignValue, read: ReadValue },
    /// 经转换器转换的值
    Transformed {
        transformer: TransformerSpec,
        assign: AssignTransformed,
        read: ReadTransformed,
    },
    /// 嵌套配置节
    Section {
        schema: Arc<dyn Fn() -> BindingSchema + Send + Sync>,
        create: Arc<dyn Fn() -> SectionBox + Send + Sync>,
        assign: Arc<dyn Fn(&dyn Any, SectionBox) -> Result<(), BoxError> + Send + Sync>,
        read: Arc<dyn Fn(&dyn Any) -> Result<SectionBox, BoxError> + Send + Sync>,
    },
}

impl FieldKind {
    /// 种类名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scalar { .. } => "scalar",
            Self::Enumeration { .. } => "enum",
            Self::Map { .. } => "map",
            Self::Transformed { .. } => "transformed",
            Self::Section { .. } => "section",
        }
    }
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enumeration { variants, .. } => {
                f.debug_struct("Enumeration").field("variants", variants).finish()
            }
            Self::Transformed { transformer, .. } => f
                .debug_struct("Transformed")
                .field("transformer", transformer)
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// 可绑定字段
#[derive(Debug, Clone)]
pub struct ValueField {
    /// 成员名称
    pub name: String,
    /// 显式路径
    pub path: Option<String>,
    /// 字段种类
    pub kind: FieldKind,
}

impl ValueField {
    fn new(tag: ValueTag, kind: FieldKind) -> Self {
        Self {
            name: tag.name,
            path: tag.path,
            kind,
        }
    }

    /// 显式路径
    pub fn explicit_path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

/// 类型擦除后的绑定模式
#[derive(Debug, Clone)]
pub struct BindingSchema {
    /// 声明字段的宿主类型
    pub host: TypeInfo,
    /// 字段列表，按声明顺序
    pub fields: Vec<ValueField>,
}

impl BindingSchema {
    /// 创建空模式
    pub fn empty(host: TypeInfo) -> Self {
        Self {
            host,
            fields: Vec::new(),
        }
    }

    /// 是否没有任何字段
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// 类型化的绑定模式构建器
pub struct Schema<H> {
    fields: Vec<ValueField>,
    _host: PhantomData<fn(&H)>,
}

impl<H: Send + Sync + 'static> Schema<H> {
    /// 创建空的模式
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            _host: PhantomData,
        }
    }

    /// 声明标量字段
    pub fn value<V>(mut self, tag: ValueTag, accessor: fn(&H) -> &ConfigValue<V>) -> Self
    where
        V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let assign: AssignValue = Arc::new(move |host: &dyn Any, raw: &Value| -> Result<(), BoxError> {
            let value = coerce_scalar::<V>(raw)?;
            accessor(host_of::<H>(host)?).set(value);
            Ok(())
        });
        let read: ReadValue = Arc::new(move |host: &dyn Any| -> Result<Value, BoxError> {
            Ok(serde_json::to_value(accessor(host_of::<H>(host)?).get())?)
        });
        self.fields
            .push(ValueField::new(tag, FieldKind::Scalar { assign, read }));
        self
    }

    /// 声明枚举字段
    pub fn enumeration<E>(mut self, tag: ValueTag, accessor: fn(&H) -> &ConfigValue<E>) -> Self
    where
        E: ConfigEnum,
    {
        let assign: AssignVariant = Arc::new(move |host: &dyn Any, name: &str| -> Result<(), BoxError> {
            let variant = E::from_variant(name).ok_or_else(|| {
                format!("未知的枚举值 {name}，可选值: {:?}", E::variants())
            })?;
            accessor(host_of::<H>(host)?).set(variant);
            Ok(())
        });
        let read: ReadValue = Arc::new(move |host: &dyn Any| -> Result<Value, BoxError> {
            let name = accessor(host_of::<H>(host)?).read(E::variant);
            Ok(Value::String(name.to_string()))
        });
        self.fields.push(ValueField::new(
            tag,
            FieldKind::Enumeration {
                variants: E::variants(),
                assign,
                read,
            },
        ));
        self
    }

    /// 声明映射字段
    pub fn map<V>(
        mut self,
        tag: ValueTag,
        accessor: fn(&H) -> &ConfigValue<HashMap<String, V>>,
    ) -> Self
    where
        V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let assign: AssignValue = Arc::new(move |host: &dyn Any, raw: &Value| -> Result<(), BoxError> {
            let Value::Object(entries) = raw else {
                return Err(format!("期望配置节，实际为 {raw}").into());
            };
            let mut map = HashMap::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(key.clone(), coerce_scalar::<V>(value)?);
            }
            accessor(host_of::<H>(host)?).set(map);
            Ok(())
        });
        let read: ReadValue = Arc::new(move |host: &dyn Any| -> Result<Value, BoxError> {
            Ok(serde_json::to_value(accessor(host_of::<H>(host)?).get())?)
        });
        self.fields
            .push(ValueField::new(tag, FieldKind::Map { assign, read }));
        self
    }

    /// 声明嵌套配置节字段
    pub fn section<S>(mut self, tag: ValueTag, accessor: fn(&H) -> &ConfigValue<S>) -> Self
    where
        S: ConfigurationSection,
    {
        let schema = Arc::new(|| S::schema().build());
        let create = Arc::new(|| -> SectionBox { Box::new(S::default()) });
        let assign = Arc::new(move |host: &dyn Any, section: SectionBox| -> Result<(), BoxError> {
            let section = section
                .downcast::<S>()
                .map_err(|_| format!("配置节类型不匹配，期望 {}", std::any::type_name::<S>()))?;
            accessor(host_of::<H>(host)?).set(*section);
            Ok(())
        });
        let read = Arc::new(move |host: &dyn Any| -> Result<SectionBox, BoxError> {
            Ok(Box::new(accessor(host_of::<H>(host)?).get()))
        });
        self.fields.push(ValueField::new(
            tag,
            FieldKind::Section {
                schema,
                create,
                assign,
                read,
            },
        ));
        self
    }

    /// 声明经转换器转换的字段
    pub fn transformed<Tr>(
        mut self,
        tag: ValueTag,
        accessor: fn(&H) -> &ConfigValue<Tr::Value>,
    ) -> Self
    where
        Tr: ValueTransformer + Default,
        Tr::Value: Clone + Send + Sync + 'static,
    {
        let assign: AssignTransformed = Arc::new(
            move |host: &dyn Any, transformer: &dyn Any, raw: &Value| -> Result<(), BoxError> {
                let value = transformer_of::<Tr>(transformer)?.from_config_value(raw)?;
                accessor(host_of::<H>(host)?).set(value);
                Ok(())
            },
        );
        let read: ReadTransformed = Arc::new(
            move |host: &dyn Any, transformer: &dyn Any| -> Result<Value, BoxError> {
                let transformer = transformer_of::<Tr>(transformer)?;
                accessor(host_of::<H>(host)?).read(|value| transformer.to_config_value(value))
            },
        );
        self.fields.push(ValueField::new(
            tag,
            FieldKind::Transformed {
                transformer: TransformerSpec::of::<Tr>(),
                assign,
                read,
            },
        ));
        self
    }

    /// 已声明的字段数量
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 是否没有声明字段
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 擦除类型，生成绑定模式
    pub fn build(self) -> BindingSchema {
        BindingSchema {
            host: TypeInfo::of::<H>(),
            fields: self.fields,
        }
    }
}

impl<H: Send + Sync + 'static> Default for Schema<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// 按字段类型转换标量
///
/// 先直接反序列化；失败时对字符串尝试按字面量解析，对其它标量尝试按字符串形式解析
pub fn coerce_scalar<V: DeserializeOwned>(raw: &Value) -> Result<V, BoxError> {
    let error = match V::deserialize(raw) {
        Ok(value) => return Ok(value),
        Err(error) => error,
    };

    let fallback = match raw {
        Value::String(text) => serde_json::from_str::<V>(text.trim()).ok(),
        Value::Number(_) | Value::Bool(_) => {
            V::deserialize(&Value::String(crate::document::string_form(raw))).ok()
        }
        _ => None,
    };

    fallback.ok_or_else(|| error.into())
}

fn host_of<H: 'static>(host: &dyn Any) -> Result<&H, BoxError> {
    host.downcast_ref::<H>().ok_or_else(|| {
        format!("宿主类型不匹配，期望 {}", std::any::type_name::<H>()).into()
    })
}

fn transformer_of<Tr: 'static>(transformer: &dyn Any) -> Result<&Tr, BoxError> {
    transformer.downcast_ref::<Tr>().ok_or_else(|| {
        format!("转换器类型不匹配，期望 {}", std::any::type_name::<Tr>()).into()
    })
}
