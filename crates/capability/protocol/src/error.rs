//! 协议错误类型定义

use crate::layout::RegisterType;
use mconn_model::ConnectorError;

/// 寄存器布局与编解码错误
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// 布局解析错误
    #[error("layout parse error: {0}")]
    Layout(String),

    /// 寄存器数量不足
    #[error("need {expected} registers for {data_type}, got {actual}")]
    Length {
        data_type: RegisterType,
        expected: usize,
        actual: usize,
    },

    /// 值种类与寄存器类型不符
    #[error("value {value} does not match register type {data_type}")]
    Type { data_type: RegisterType, value: String },

    /// 超出寄存器容量
    #[error("value {0} exceeds register capacity")]
    Overflow(String),
}

impl From<CodecError> for ConnectorError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Layout(_) | CodecError::Length { .. } => {
                ConnectorError::Protocol(err.to_string())
            }
            CodecError::Type { .. } => ConnectorError::ConversionFailed(err.to_string()),
            CodecError::Overflow(_) => ConnectorError::OutOfRange(err.to_string()),
        }
    }
}
