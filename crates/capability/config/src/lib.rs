//! 连接器运行配置加载。

use domain::{ConnectorParameter, Schema};
use std::env;
use std::fs;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 寄存器驱动的数据源。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    /// 进程内寄存器库
    Memory,
    /// Modbus TCP 从站
    ModbusTcp,
}

/// 连接器运行配置。
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub driver: DriverKind,
    pub schema: Schema,
    pub host: String,
    pub port: u16,
    pub notification_interval_ms: u64,
    pub request_timeout_ms: u64,
    /// 寄存器布局（JSON）
    pub server_structure: serde_json::Value,
    pub unit_id: u8,
    pub big_byte: bool,
    pub modbus_timeout_ms: u64,
}

impl ConnectorConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let driver = match env::var("MCONN_DRIVER") {
            Ok(value) => match value.to_ascii_lowercase().as_str() {
                "memory" => DriverKind::Memory,
                "modbus" | "modbus-tcp" => DriverKind::ModbusTcp,
                _ => return Err(ConfigError::Invalid("MCONN_DRIVER".to_string(), value)),
            },
            Err(_) => DriverKind::Memory,
        };
        let schema = match env::var("MCONN_SCHEMA") {
            Ok(value) => value
                .parse::<Schema>()
                .map_err(|_| ConfigError::Invalid("MCONN_SCHEMA".to_string(), value))?,
            Err(_) => Schema::Tcp,
        };
        let host = env::var("MCONN_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = read_u16_with_default("MCONN_PORT", 502)?;
        let notification_interval_ms =
            read_u64_with_default("MCONN_NOTIFICATION_INTERVAL_MS", 1000)?;
        let request_timeout_ms = read_u64_with_default("MCONN_REQUEST_TIMEOUT_MS", 5000)?;
        let server_structure = read_server_structure()?;
        let unit_id = read_u8_with_default("MCONN_UNIT_ID", 1)?;
        let big_byte = read_bool_with_default("MCONN_BIGBYTE", true);
        let modbus_timeout_ms = read_u64_with_default("MCONN_MODBUS_TIMEOUT_MS", 1000)?;

        Ok(Self {
            driver,
            schema,
            host,
            port,
            notification_interval_ms,
            request_timeout_ms,
            server_structure,
            unit_id,
            big_byte,
            modbus_timeout_ms,
        })
    }

    /// 构建连接参数，寄存器设置放入协议特定设置。
    pub fn to_parameter(&self) -> ConnectorParameter {
        ConnectorParameter::builder(self.host.clone(), self.port)
            .schema(self.schema)
            .notification_interval_ms(self.notification_interval_ms)
            .request_timeout_ms(self.request_timeout_ms)
            .specific_setting("SERVER_STRUCTURE", self.server_structure.clone())
            .specific_setting("UNITID", self.unit_id)
            .specific_setting("TIMEOUT", self.modbus_timeout_ms)
            .specific_setting("BIGBYTE", self.big_byte)
            .build()
    }
}

/// 内联 JSON 优先，其次读取文件。
fn read_server_structure() -> Result<serde_json::Value, ConfigError> {
    let (key, text) = if let Some(inline) = read_optional("MCONN_SERVER_STRUCTURE") {
        ("MCONN_SERVER_STRUCTURE", inline)
    } else if let Some(path) = read_optional("MCONN_SERVER_STRUCTURE_FILE") {
        let text = fs::read_to_string(&path).map_err(|e| {
            ConfigError::Invalid("MCONN_SERVER_STRUCTURE_FILE".to_string(), format!("{}: {}", path, e))
        })?;
        ("MCONN_SERVER_STRUCTURE_FILE", text)
    } else {
        return Err(ConfigError::Missing("MCONN_SERVER_STRUCTURE".to_string()));
    };
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| ConfigError::Invalid(key.to_string(), e.to_string()))?;
    if !value.is_object() {
        return Err(ConfigError::Invalid(
            key.to_string(),
            "expected a JSON object".to_string(),
        ));
    }
    Ok(value)
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u8_with_default(key: &str, default: u8) -> Result<u8, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u8>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
