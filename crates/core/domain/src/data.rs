//! 设备模型中的值类型。
//!
//! [`Value`] 是封闭的和类型：协议访问层只在这些种类之间转换，
//! 类型映射按 [`ValueKind`] 精确分派。

use std::collections::BTreeMap;
use std::fmt;

/// 值的种类（精确运行时类型）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Struct,
    Multi,
}

impl ValueKind {
    /// 是否为带类型 setter 的基础类型。
    pub fn is_primitive(self) -> bool {
        !matches!(self, Self::Null | Self::Struct | Self::Multi)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Struct => "struct",
            Self::Multi => "multi",
        };
        f.write_str(name)
    }
}

/// 属性、操作参数与返回值。
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Struct(StructValue),
    /// 有序多值属性。
    Multi(Vec<Value>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Byte(_) => ValueKind::Byte,
            Self::Short(_) => ValueKind::Short,
            Self::Int(_) => ValueKind::Int,
            Self::Long(_) => ValueKind::Long,
            Self::Float(_) => ValueKind::Float,
            Self::Double(_) => ValueKind::Double,
            Self::String(_) => ValueKind::String,
            Self::Struct(_) => ValueKind::Struct,
            Self::Multi(_) => ValueKind::Multi,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Byte(v) => write!(f, "{}", v),
            Self::Short(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Long(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => f.write_str(v),
            Self::Struct(v) => write!(f, "{}", v),
            Self::Multi(values) => {
                f.write_str("[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i8> for Value {
    fn from(value: i8) -> Self {
        Self::Byte(value)
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Self::Short(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<StructValue> for Value {
    fn from(value: StructValue) -> Self {
        Self::Struct(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Self::Multi(values)
    }
}

// 精确类型提取：种类不一致时原样返回值，不做隐式拓宽。

impl TryFrom<Value> for bool {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl TryFrom<Value> for i8 {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Byte(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl TryFrom<Value> for i16 {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Short(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl TryFrom<Value> for i32 {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Long(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl TryFrom<Value> for f32 {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Float(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Double(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(v) => Ok(v),
            other => Err(other),
        }
    }
}

/// 结构体（record）值。字段按名称有序保存。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructValue {
    pub type_name: String,
    pub fields: BTreeMap<String, Value>,
}

impl StructValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// 追加字段（构建器风格）。
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl fmt::Display for StructValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.type_name)?;
        for (index, (name, value)) in self.fields.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        f.write_str("}")
    }
}

/// 结构体字段声明。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: ValueKind,
}

/// 自定义结构体类型声明，注册后才能按结构体读写。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDescriptor {
    pub type_name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl StructDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            kind,
        });
        self
    }

    /// 校验结构体值是否符合声明：类型名一致，声明的字段都存在且种类一致
    /// （`Null` 视为缺省值），不允许未声明字段。
    pub fn validate(&self, value: &StructValue) -> Result<(), String> {
        if value.type_name != self.type_name {
            return Err(format!(
                "struct type {} does not match {}",
                value.type_name, self.type_name
            ));
        }
        for field in &self.fields {
            match value.fields.get(&field.name) {
                Some(v) if v.kind() == field.kind || v.is_null() => {}
                Some(v) => {
                    return Err(format!(
                        "field {} expects {}, got {}",
                        field.name,
                        field.kind,
                        v.kind()
                    ));
                }
                None => return Err(format!("field {} missing", field.name)),
            }
        }
        if let Some(extra) = value
            .fields
            .keys()
            .find(|name| !self.fields.iter().any(|field| &field.name == *name))
        {
            return Err(format!("field {} not declared in {}", extra, self.type_name));
        }
        Ok(())
    }
}
