//! 配置绑定器实现

use config_abstractions::{
    string_form, BindingSchema, ConfigDocument, FieldKind, SharedTransformer, TransformerSpec,
    ValueField,
};
use dashmap::DashMap;
use infrastructure_common::{
    BoxError, DependencyError, DependencyResult, NamingConventions,
};
use serde_json::{Map, Value};
use std::any::{Any, TypeId};
use tracing::{debug, trace};

/// 转换器注册表
///
/// 按转换器类型缓存实例，同一类型只创建一次
#[derive(Default)]
pub struct TransformerRegistry {
    cache: DashMap<TypeId, SharedTransformer>,
}

impl TransformerRegistry {
    /// 创建新的转换器注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取缓存的转换器，不存在时创建
    pub fn get_or_create(&self, spec: &TransformerSpec) -> SharedTransformer {
        self.cache
            .entry(spec.type_info.id)
            .or_insert_with(|| {
                debug!("创建配置值转换器: {}", spec.type_info);
                spec.create()
            })
            .clone()
    }

    /// 已缓存的转换器数量
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// 是否没有缓存任何转换器
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl std::fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformerRegistry")
            .field("cached", &self.cache.len())
            .finish()
    }
}

/// 配置绑定器
///
/// 按绑定模式把配置文档中的值写入宿主实例的字段。缺失的键不会覆盖字段当前值。
#[derive(Debug, Default)]
pub struct ConfigurationBinder {
    transformers: TransformerRegistry,
}

impl ConfigurationBinder {
    /// 创建新的配置绑定器
    pub fn new() -> Self {
        Self::default()
    }

    /// 转换器注册表
    pub fn transformers(&self) -> &TransformerRegistry {
        &self.transformers
    }

    /// 绑定宿主实例的全部配置字段
    ///
    /// `prefix` 为空或以 `.` 结尾
    pub fn bind(
        &self,
        host: &dyn Any,
        schema: &BindingSchema,
        document: &dyn ConfigDocument,
        prefix: &str,
    ) -> DependencyResult<()> {
        trace!("绑定配置: {} (前缀 '{}')", schema.host, prefix);

        for field in &schema.fields {
            let full_path =
                NamingConventions::config_path(prefix, &field.name, field.explicit_path());
            self.bind_field(host, schema, field, document, &full_path)?;
        }

        Ok(())
    }

    fn bind_field(
        &self,
        host: &dyn Any,
        schema: &BindingSchema,
        field: &ValueField,
        document: &dyn ConfigDocument,
        full_path: &str,
    ) -> DependencyResult<()> {
        // 配置节只做结构递归，不在本层读取文档
        if let FieldKind::Section {
            schema: section_schema,
            create,
            assign,
            ..
        } = &field.kind
        {
            let section = create();
            let nested = section_schema();
            self.bind(
                &*section,
                &nested,
                document,
                &NamingConventions::section_prefix(full_path),
            )?;
            return assign(host, section).map_err(|source| failed(schema, field, full_path, source));
        }

        let Some(raw) = document.get(full_path) else {
            trace!("配置键不存在，保留默认值: {}", full_path);
            return Ok(());
        };

        debug!("绑定配置字段 {}.{} <- {}", schema.host.short_name(), field.name, full_path);
        self.assign_raw(host, &field.kind, &raw)
            .map_err(|source| failed(schema, field, full_path, source))
    }

    fn assign_raw(&self, host: &dyn Any, kind: &FieldKind, raw: &Value) -> Result<(), BoxError> {
        match kind {
            FieldKind::Enumeration { assign, .. } => assign(host, &string_form(raw)),
            FieldKind::Map { assign, .. } => assign(host, raw),
            FieldKind::Transformed {
                transformer,
                assign,
                ..
            } => {
                let transformer = self.transformers.get_or_create(transformer);
                assign(host, &*transformer, raw)
            }
            FieldKind::Scalar { assign, .. } => assign(host, raw),
            FieldKind::Section { .. } => Err("配置节不能直接赋值".into()),
        }
    }

    /// 读取构造参数或方法参数的标量配置值
    ///
    /// 只做单层查找，不处理配置节、枚举、映射或转换器
    pub fn get_scalar(
        &self,
        document: &dyn ConfigDocument,
        prefix: &str,
        name: &str,
        explicit_path: Option<&str>,
    ) -> Option<Value> {
        let full_path = NamingConventions::config_path(prefix, name, explicit_path);
        let value = document.get(&full_path);
        trace!("读取参数配置 {} -> {:?}", full_path, value);
        value
    }

    /// 以宿主当前字段值生成默认配置树
    ///
    /// 用于在配置文件不存在时写出默认文档
    pub fn defaults(&self, host: &dyn Any, schema: &BindingSchema) -> DependencyResult<Value> {
        let mut root = Map::new();

        for field in &schema.fields {
            let key = NamingConventions::config_path("", &field.name, field.explicit_path());
            let value = self
                .read_field(host, &field.kind)
                .map_err(|source| failed(schema, field, &key, source))?;
            match value {
                FieldDefault::Value(Value::Null) => {}
                FieldDefault::Value(value) => insert_path(&mut root, &key, value),
                FieldDefault::Section(section, section_schema) => {
                    let value = self.defaults(&*section, &section_schema)?;
                    insert_path(&mut root, &key, value);
                }
            }
        }

        Ok(Value::Object(root))
    }

    fn read_field(&self, host: &dyn Any, kind: &FieldKind) -> Result<FieldDefault, BoxError> {
        let value = match kind {
            FieldKind::Scalar { read, .. }
            | FieldKind::Enumeration { read, .. }
            | FieldKind::Map { read, .. } => read(host)?,
            FieldKind::Transformed {
                transformer, read, ..
            } => {
                let transformer = self.transformers.get_or_create(transformer);
                read(host, &*transformer)?
            }
            FieldKind::Section { schema, read, .. } => {
                return Ok(FieldDefault::Section(read(host)?, schema()));
            }
        };
        Ok(FieldDefault::Value(value))
    }
}

enum FieldDefault {
    Value(Value),
    Section(Box<dyn Any + Send + Sync>, BindingSchema),
}

fn failed(
    schema: &BindingSchema,
    field: &ValueField,
    full_path: &str,
    source: BoxError,
) -> DependencyError {
    DependencyError::failed_injection(
        format!(
            "{}.{} (配置键 {})",
            schema.host.short_name(),
            field.name,
            full_path
        ),
        source,
    )
}

/// 按点号路径写入嵌套对象
fn insert_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = root;

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }

        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
}
