//! 寄存器布局（`SERVER_STRUCTURE` 设置）

use crate::error::CodecError;
use domain::ValueKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 寄存器数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterType {
    /// 16位有符号整数
    #[serde(alias = "short")]
    Int16,
    /// 16位无符号整数
    #[serde(alias = "ushort")]
    Uint16,
    /// 32位有符号整数（2个寄存器）
    #[serde(alias = "integer")]
    Int32,
    /// 32位无符号整数（2个寄存器）
    #[serde(alias = "uinteger")]
    Uint32,
    /// 64位有符号整数（4个寄存器）
    #[serde(alias = "long")]
    Int64,
    /// 64位无符号整数（4个寄存器）
    #[serde(alias = "ulong")]
    Uint64,
    /// 32位浮点数（2个寄存器）
    #[serde(alias = "float")]
    Float32,
    /// 64位浮点数（4个寄存器）
    #[serde(alias = "double")]
    Float64,
    /// ASCII 字符串（每个寄存器 2 个字符）
    Ascii,
    /// UTC 时间戳，epoch 毫秒（4个寄存器）
    #[serde(alias = "datetime")]
    DateTime,
}

impl Default for RegisterType {
    fn default() -> Self {
        Self::Int16
    }
}

impl RegisterType {
    /// 占用寄存器数量；ASCII 由 `count` 决定。
    pub fn register_count(self, count: u16) -> u16 {
        match self {
            Self::Int16 | Self::Uint16 => 1,
            Self::Int32 | Self::Uint32 | Self::Float32 => 2,
            Self::Int64 | Self::Uint64 | Self::Float64 | Self::DateTime => 4,
            Self::Ascii => count.max(1),
        }
    }

    /// 读出值的种类。无符号类型拓宽到下一个有符号种类。
    ///
    /// `uint64` 超出 `i64` 范围的读数为十进制字符串。
    pub fn value_kind(self) -> ValueKind {
        match self {
            Self::Int16 => ValueKind::Short,
            Self::Uint16 | Self::Int32 => ValueKind::Int,
            Self::Uint32 | Self::Int64 | Self::Uint64 | Self::DateTime => ValueKind::Long,
            Self::Float32 => ValueKind::Float,
            Self::Float64 => ValueKind::Double,
            Self::Ascii => ValueKind::String,
        }
    }
}

impl fmt::Display for RegisterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Ascii => "ascii",
            Self::DateTime => "date_time",
        };
        f.write_str(name)
    }
}

/// 单个变量的寄存器位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSpec {
    /// 寄存器起始地址
    pub offset: u16,
    /// 数据类型
    #[serde(rename = "type", default)]
    pub data_type: RegisterType,
    /// ASCII 字符串占用的寄存器数量
    #[serde(default = "default_register_count")]
    pub count: u16,
}

fn default_register_count() -> u16 {
    1
}

impl RegisterSpec {
    pub fn new(offset: u16, data_type: RegisterType) -> Self {
        Self {
            offset,
            data_type,
            count: default_register_count(),
        }
    }

    pub fn register_count(&self) -> u16 {
        self.data_type.register_count(self.count)
    }

    /// 结束地址（不含）。
    pub fn end(&self) -> usize {
        usize::from(self.offset) + usize::from(self.register_count())
    }
}

/// 变量名 → 寄存器位置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegisterLayout {
    variables: BTreeMap<String, RegisterSpec>,
}

impl RegisterLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, spec: RegisterSpec) -> Self {
        self.variables.insert(name.into(), spec);
        self
    }

    /// 从 JSON 文本解析
    pub fn from_json(json: &str) -> Result<Self, CodecError> {
        serde_json::from_str(json).map_err(|e| CodecError::Layout(e.to_string()))
    }

    /// 从设置值解析：JSON 字符串或 JSON 对象
    pub fn from_setting(value: &serde_json::Value) -> Result<Self, CodecError> {
        match value {
            serde_json::Value::String(json) => Self::from_json(json),
            other => serde_json::from_value(other.clone())
                .map_err(|e| CodecError::Layout(e.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RegisterSpec> {
        self.variables.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RegisterSpec)> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// 容纳全部变量所需的寄存器数量
    pub fn required_registers(&self) -> usize {
        self.variables
            .values()
            .map(RegisterSpec::end)
            .max()
            .unwrap_or(0)
    }
}
