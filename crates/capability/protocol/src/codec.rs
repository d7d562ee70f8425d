//! 寄存器编解码
//!
//! 多寄存器整数按字序组合；`BIGBYTE`（默认 true）表示低位字在前。
//! 浮点数使用相反的字序，`BIGBYTE = true` 时高位字在前。
//! 时间戳（epoch 毫秒）固定高位字在前，不受 `BIGBYTE` 影响。
//! ASCII 每个寄存器存 2 个字符，高字节在前，不足部分补 0。

use crate::error::CodecError;
use crate::layout::{RegisterSpec, RegisterType};
use domain::Value;

/// 多寄存器数值的字序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WordOrder {
    /// 低位字在前（`BIGBYTE = true`）
    #[default]
    LowFirst,
    /// 高位字在前
    HighFirst,
}

impl WordOrder {
    pub fn from_big_byte(big_byte: bool) -> Self {
        if big_byte {
            Self::LowFirst
        } else {
            Self::HighFirst
        }
    }

    /// 浮点数的字序与整数相反。
    pub fn for_float(self) -> Self {
        match self {
            Self::LowFirst => Self::HighFirst,
            Self::HighFirst => Self::LowFirst,
        }
    }
}

fn combine(registers: &[u16], order: WordOrder) -> u64 {
    let fold = |acc: u64, word: &u16| (acc << 16) | u64::from(*word);
    match order {
        WordOrder::HighFirst => registers.iter().fold(0, fold),
        WordOrder::LowFirst => registers.iter().rev().fold(0, fold),
    }
}

fn split(bits: u64, count: usize, order: WordOrder) -> Vec<u16> {
    let mut words: Vec<u16> = (0..count)
        .rev()
        .map(|index| (bits >> (16 * index)) as u16)
        .collect();
    if order == WordOrder::LowFirst {
        words.reverse();
    }
    words
}

/// 解析寄存器数据
pub fn decode(
    spec: &RegisterSpec,
    registers: &[u16],
    order: WordOrder,
) -> Result<Value, CodecError> {
    let expected = usize::from(spec.register_count());
    if registers.len() < expected {
        return Err(CodecError::Length {
            data_type: spec.data_type,
            expected,
            actual: registers.len(),
        });
    }
    let registers = &registers[..expected];

    let value = match spec.data_type {
        RegisterType::Int16 => Value::Short(registers[0] as i16),
        RegisterType::Uint16 => Value::Int(i32::from(registers[0])),
        RegisterType::Int32 => Value::Int(combine(registers, order) as u32 as i32),
        RegisterType::Uint32 => Value::Long(i64::from(combine(registers, order) as u32)),
        RegisterType::Int64 => Value::Long(combine(registers, order) as i64),
        RegisterType::Uint64 => {
            let wide = combine(registers, order);
            match i64::try_from(wide) {
                Ok(v) => Value::Long(v),
                Err(_) => Value::String(wide.to_string()),
            }
        }
        RegisterType::Float32 => {
            Value::Float(f32::from_bits(combine(registers, order.for_float()) as u32))
        }
        RegisterType::Float64 => {
            Value::Double(f64::from_bits(combine(registers, order.for_float())))
        }
        RegisterType::DateTime => Value::Long(combine(registers, WordOrder::HighFirst) as i64),
        RegisterType::Ascii => {
            let bytes: Vec<u8> = registers
                .iter()
                .flat_map(|register| register.to_be_bytes())
                .collect();
            let text = String::from_utf8_lossy(&bytes);
            Value::String(text.trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string())
        }
    };

    Ok(value)
}

/// 编码为寄存器数据。值种类必须与 [`RegisterType::value_kind`] 一致。
pub fn encode(spec: &RegisterSpec, value: &Value, order: WordOrder) -> Result<Vec<u16>, CodecError> {
    let mismatch = || CodecError::Type {
        data_type: spec.data_type,
        value: value.to_string(),
    };
    let overflow = || CodecError::Overflow(format!("{} for {}", value, spec.data_type));

    let registers = match (spec.data_type, value) {
        (RegisterType::Int16, Value::Short(v)) => vec![*v as u16],
        (RegisterType::Uint16, Value::Int(v)) => {
            vec![u16::try_from(*v).map_err(|_| overflow())?]
        }
        (RegisterType::Int32, Value::Int(v)) => split(u64::from(*v as u32), 2, order),
        (RegisterType::Uint32, Value::Long(v)) => {
            split(u64::from(u32::try_from(*v).map_err(|_| overflow())?), 2, order)
        }
        (RegisterType::Int64, Value::Long(v)) => split(*v as u64, 4, order),
        (RegisterType::Uint64, Value::Long(v)) => {
            split(u64::try_from(*v).map_err(|_| overflow())?, 4, order)
        }
        (RegisterType::Uint64, Value::String(text)) => {
            split(text.trim().parse::<u64>().map_err(|_| mismatch())?, 4, order)
        }
        (RegisterType::Float32, Value::Float(v)) => {
            split(u64::from(v.to_bits()), 2, order.for_float())
        }
        (RegisterType::Float64, Value::Double(v)) => split(v.to_bits(), 4, order.for_float()),
        (RegisterType::DateTime, Value::Long(v)) => split(*v as u64, 4, WordOrder::HighFirst),
        (RegisterType::Ascii, Value::String(text)) => {
            if !text.is_ascii() {
                return Err(mismatch());
            }
            let capacity = usize::from(spec.register_count()) * 2;
            if text.len() > capacity {
                return Err(overflow());
            }
            let mut bytes = text.as_bytes().to_vec();
            bytes.resize(capacity, 0);
            bytes
                .chunks(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect()
        }
        _ => return Err(mismatch()),
    };

    Ok(registers)
}
