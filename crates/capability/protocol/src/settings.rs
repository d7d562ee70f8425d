//! 寄存器协议的特定设置
//!
//! | 键 | 含义 | 默认 |
//! |----|------|------|
//! | `SERVER_STRUCTURE` | 变量布局（JSON 字符串或对象） | 必填 |
//! | `UNITID` | Modbus 从站 ID | 1 |
//! | `TIMEOUT` | 单次请求超时（毫秒） | 1000 |
//! | `BIGBYTE` | 整数低位字在前、浮点数高位字在前 | true |

use crate::codec::WordOrder;
use crate::error::CodecError;
use crate::layout::RegisterLayout;
use domain::ConnectorParameter;
use std::time::Duration;

pub const SERVER_STRUCTURE: &str = "SERVER_STRUCTURE";
pub const UNIT_ID: &str = "UNITID";
pub const TIMEOUT: &str = "TIMEOUT";
pub const BIG_BYTE: &str = "BIGBYTE";

pub const DEFAULT_UNIT_ID: u8 = 1;
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct RegisterSettings {
    pub layout: RegisterLayout,
    pub unit_id: u8,
    pub timeout: Duration,
    pub word_order: WordOrder,
}

impl RegisterSettings {
    pub fn from_parameter(parameter: &ConnectorParameter) -> Result<Self, CodecError> {
        let layout = match parameter.specific_setting(SERVER_STRUCTURE) {
            Some(value) => RegisterLayout::from_setting(value)?,
            None => {
                return Err(CodecError::Layout(format!("{} is not set", SERVER_STRUCTURE)));
            }
        };

        let unit_id = match parameter.specific_setting_str(UNIT_ID) {
            Some(text) => text
                .trim()
                .parse::<u8>()
                .map_err(|_| CodecError::Layout(format!("invalid {}: {}", UNIT_ID, text)))?,
            None => DEFAULT_UNIT_ID,
        };

        let timeout_ms = match parameter.specific_setting_str(TIMEOUT) {
            Some(text) => text
                .trim()
                .parse::<u64>()
                .map_err(|_| CodecError::Layout(format!("invalid {}: {}", TIMEOUT, text)))?,
            None => DEFAULT_TIMEOUT_MS,
        };

        let big_byte = match parameter.specific_setting_str(BIG_BYTE) {
            Some(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    return Err(CodecError::Layout(format!("invalid {}: {}", BIG_BYTE, text)));
                }
            },
            None => true,
        };

        Ok(Self {
            layout,
            unit_id,
            timeout: Duration::from_millis(timeout_ms),
            word_order: WordOrder::from_big_byte(big_byte),
        })
    }
}
