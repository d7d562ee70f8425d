//! 默认类型转换器。
//!
//! 输入转换器把协议读出的值宽松地转换为应用侧类型（数值间转换带范围检查，
//! 字符串按文本解析）；输出转换器把应用侧值包装为协议值。协议访问层可以
//! 替换其中任意一个（例如寄存器把布尔映射为 0/1）。

use crate::error::ConnectorError;
use domain::{StructValue, Value};

fn out_of_range(value: &Value, target: &str) -> ConnectorError {
    ConnectorError::OutOfRange(format!("{} does not fit into {}", value, target))
}

fn not_convertible(value: &Value, target: &str) -> ConnectorError {
    ConnectorError::ConversionFailed(format!("cannot convert {} {} to {}", value.kind(), value, target))
}

/// 整数视图（布尔按 0/1）。
fn integral(value: &Value) -> Option<i128> {
    match value {
        Value::Bool(v) => Some(i128::from(*v)),
        Value::Byte(v) => Some(i128::from(*v)),
        Value::Short(v) => Some(i128::from(*v)),
        Value::Int(v) => Some(i128::from(*v)),
        Value::Long(v) => Some(i128::from(*v)),
        _ => None,
    }
}

fn to_integer<T: TryFrom<i128>>(value: &Value, target: &str) -> Result<T, ConnectorError> {
    let wide = match value {
        Value::Float(v) => float_to_integer(f64::from(*v), value, target)?,
        Value::Double(v) => float_to_integer(*v, value, target)?,
        Value::String(text) => text
            .trim()
            .parse::<i128>()
            .map_err(|_| not_convertible(value, target))?,
        other => integral(other).ok_or_else(|| not_convertible(value, target))?,
    };
    T::try_from(wide).map_err(|_| out_of_range(value, target))
}

fn float_to_integer(v: f64, value: &Value, target: &str) -> Result<i128, ConnectorError> {
    if !v.is_finite() {
        return Err(out_of_range(value, target));
    }
    let truncated = v.trunc();
    if truncated < i128::MIN as f64 || truncated > i128::MAX as f64 {
        return Err(out_of_range(value, target));
    }
    Ok(truncated as i128)
}

fn to_floating(value: &Value, target: &str) -> Result<f64, ConnectorError> {
    match value {
        Value::Float(v) => Ok(f64::from(*v)),
        Value::Double(v) => Ok(*v),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| not_convertible(value, target)),
        other => integral(other)
            .map(|v| v as f64)
            .ok_or_else(|| not_convertible(value, target)),
    }
}

/// 协议值 → 应用类型。
pub trait InputConverter: Send + Sync {
    fn to_bool(&self, value: &Value) -> Result<bool, ConnectorError> {
        match value {
            Value::Bool(v) => Ok(*v),
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" => Ok(true),
                "false" | "0" | "off" => Ok(false),
                _ => Err(not_convertible(value, "bool")),
            },
            Value::Float(_) | Value::Double(_) => Ok(to_floating(value, "bool")? != 0.0),
            other => integral(other)
                .map(|v| v != 0)
                .ok_or_else(|| not_convertible(value, "bool")),
        }
    }

    fn to_byte(&self, value: &Value) -> Result<i8, ConnectorError> {
        to_integer(value, "byte")
    }

    fn to_short(&self, value: &Value) -> Result<i16, ConnectorError> {
        to_integer(value, "short")
    }

    fn to_int(&self, value: &Value) -> Result<i32, ConnectorError> {
        to_integer(value, "int")
    }

    fn to_long(&self, value: &Value) -> Result<i64, ConnectorError> {
        to_integer(value, "long")
    }

    fn to_float(&self, value: &Value) -> Result<f32, ConnectorError> {
        let v = to_floating(value, "float")?;
        if v.is_finite() && v.abs() > f64::from(f32::MAX) {
            return Err(out_of_range(value, "float"));
        }
        Ok(v as f32)
    }

    fn to_double(&self, value: &Value) -> Result<f64, ConnectorError> {
        to_floating(value, "double")
    }

    /// 任意值的文本形式；`Null` 转为空串。
    fn to_string(&self, value: &Value) -> Result<String, ConnectorError> {
        match value {
            Value::Null => Ok(String::new()),
            other => Ok(other.to_string()),
        }
    }

    /// 多值；单值包装为单元素序列，`Null` 为空序列。
    fn to_list(&self, value: &Value) -> Result<Vec<Value>, ConnectorError> {
        match value {
            Value::Multi(values) => Ok(values.clone()),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other.clone()]),
        }
    }

    fn to_struct(&self, value: &Value) -> Result<StructValue, ConnectorError> {
        match value {
            Value::Struct(v) => Ok(v.clone()),
            _ => Err(not_convertible(value, "struct")),
        }
    }
}

/// 应用类型 → 协议值。
pub trait OutputConverter: Send + Sync {
    fn from_bool(&self, value: bool) -> Value {
        Value::Bool(value)
    }

    fn from_byte(&self, value: i8) -> Value {
        Value::Byte(value)
    }

    fn from_short(&self, value: i16) -> Value {
        Value::Short(value)
    }

    fn from_int(&self, value: i32) -> Value {
        Value::Int(value)
    }

    fn from_long(&self, value: i64) -> Value {
        Value::Long(value)
    }

    fn from_float(&self, value: f32) -> Value {
        Value::Float(value)
    }

    fn from_double(&self, value: f64) -> Value {
        Value::Double(value)
    }

    fn from_string(&self, value: &str) -> Value {
        Value::String(value.to_string())
    }

    fn from_list(&self, values: Vec<Value>) -> Value {
        Value::Multi(values)
    }

    fn from_struct(&self, value: StructValue) -> Value {
        Value::Struct(value)
    }
}

/// 默认输入转换器。
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelInputConverter;

impl InputConverter for ModelInputConverter {}

/// 默认输出转换器。
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelOutputConverter;

impl OutputConverter for ModelOutputConverter {}
