//! 实例句柄与注入单元

use config_abstractions::coerce_scalar;
use infrastructure_common::{BoxError, TypeInfo};
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 类型擦除的组件实例
///
/// 内部保存 `Arc<T>`，`T` 可以是 `dyn Trait`。同一对象以不同能力类型注册时，
/// 各个句柄指向同一地址，[`Instance::same_object`] 以此判断身份。
#[derive(Clone)]
pub struct Instance {
    type_info: TypeInfo,
    value: Arc<dyn Any + Send + Sync>,
    address: usize,
}

impl Instance {
    /// 包装共享实例
    pub fn new<T>(value: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let address = Arc::as_ptr(&value) as *const () as usize;
        Self {
            type_info: TypeInfo::of::<T>(),
            value: Arc::new(value),
            address,
        }
    }

    /// 实例的注册类型
    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    /// 对象地址
    pub fn address(&self) -> usize {
        self.address
    }

    /// 是否指向同一对象
    pub fn same_object(&self, other: &Instance) -> bool {
        self.address == other.address
    }

    /// 判断注册类型
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_info.is::<T>()
    }

    /// 取出指定类型的共享引用
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        (*self.value).downcast_ref::<Arc<T>>().cloned()
    }

    /// 借用指定类型的实例
    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        (*self.value)
            .downcast_ref::<Arc<T>>()
            .map(|value| &**value)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.type_info.name)
            .field("address", &format_args!("{:#x}", self.address))
            .finish()
    }
}

/// 注入字段单元
///
/// 组件实例构造后由全局阶段写入一次
pub struct Injected<T: ?Sized> {
    cell: OnceCell<Arc<T>>,
}

impl<T: ?Sized> Injected<T> {
    /// 创建未注入的单元
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// 获取已注入的依赖
    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }

    /// 是否已注入
    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }

    /// 写入依赖，已注入时返回传入的值
    pub fn set(&self, value: Arc<T>) -> Result<(), Arc<T>> {
        self.cell.set(value)
    }
}

impl<T: ?Sized> Default for Injected<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Injected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injected")
            .field("type", &std::any::type_name::<T>())
            .field("set", &self.is_set())
            .finish()
    }
}

/// 已解析的参数
#[derive(Debug, Clone)]
pub enum Argument {
    /// 受管依赖
    Instance(Instance),
    /// 配置值，缺失时为 `None`
    Value(Option<Value>),
}

/// 构造函数或方法的实参列表
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<Argument>,
}

impl Arguments {
    /// 创建实参列表
    pub fn new(values: Vec<Argument>) -> Self {
        Self { values }
    }

    /// 空实参列表
    pub fn empty() -> Self {
        Self::default()
    }

    /// 实参数量
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否没有实参
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 取出第 `index` 个受管依赖
    pub fn instance<D>(&self, index: usize) -> Result<Arc<D>, BoxError>
    where
        D: ?Sized + Send + Sync + 'static,
    {
        match self.values.get(index) {
            Some(Argument::Instance(instance)) => instance.downcast::<D>().ok_or_else(|| {
                format!(
                    "参数 {index} 类型不匹配: 期望 {}, 实际 {}",
                    std::any::type_name::<D>(),
                    instance.type_info()
                )
                .into()
            }),
            Some(Argument::Value(_)) => Err(format!("参数 {index} 是配置值而不是依赖").into()),
            None => Err(format!("参数 {index} 不存在").into()),
        }
    }

    /// 取出第 `index` 个配置值，缺失时为 `None`
    pub fn value<V: DeserializeOwned>(&self, index: usize) -> Result<Option<V>, BoxError> {
        match self.values.get(index) {
            Some(Argument::Value(Some(raw))) => coerce_scalar::<V>(raw).map(Some),
            Some(Argument::Value(None)) => Ok(None),
            Some(Argument::Instance(_)) => Err(format!("参数 {index} 是依赖而不是配置值").into()),
            None => Err(format!("参数 {index} 不存在").into()),
        }
    }

    /// 取出第 `index` 个配置值，缺失时使用默认值
    pub fn value_or<V: DeserializeOwned>(&self, index: usize, default: V) -> Result<V, BoxError> {
        Ok(self.value(index)?.unwrap_or(default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_capability_alias_is_same_object() {
        let concrete = Arc::new(English);
        let as_concrete = Instance::new(Arc::clone(&concrete));
        let as_greeter = Instance::new(concrete as Arc<dyn Greeter>);

        assert!(as_concrete.same_object(&as_greeter));
        assert!(as_greeter.is::<dyn Greeter>());
        assert_eq!(as_greeter.downcast::<dyn Greeter>().unwrap().greet(), "hello");
        assert!(as_greeter.downcast::<English>().is_none());
        assert!(as_concrete.downcast_ref::<English>().is_some());
    }

    #[test]
    fn test_distinct_objects_differ() {
        let a = Instance::new(Arc::new(English));
        let b = Instance::new(Arc::new(English));
        assert!(!a.same_object(&b));
    }

    #[test]
    fn test_injected_sets_once() {
        let cell: Injected<dyn Greeter> = Injected::new();
        assert!(cell.get().is_none());
        assert!(cell.set(Arc::new(English)).is_ok());
        assert!(cell.set(Arc::new(English)).is_err());
        assert_eq!(cell.get().unwrap().greet(), "hello");
    }

    #[test]
    fn test_arguments_accessors() {
        let arguments = Arguments::new(vec![
            Argument::Instance(Instance::new(Arc::new(English))),
            Argument::Value(Some(json!("25"))),
            Argument::Value(None),
        ]);

        assert!(arguments.instance::<English>(0).is_ok());
        assert!(arguments.instance::<String>(0).is_err());
        assert_eq!(arguments.value::<u32>(1).unwrap(), Some(25));
        assert_eq!(arguments.value_or(2, 9u32).unwrap(), 9);
        assert!(arguments.value::<u32>(0).is_err());
        assert!(arguments.instance::<English>(5).is_err());
    }
}
