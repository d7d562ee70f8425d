//! 连接参数：连接时一次性构建、之后只读。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 默认请求超时（毫秒）。
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;
/// 默认通知/轮询间隔（毫秒）。
pub const DEFAULT_NOTIFICATION_INTERVAL_MS: u64 = 1000;

/// 端点协议方案。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    #[default]
    Tcp,
    Ssl,
    Http,
    Https,
    Ws,
    Wss,
    /// 不使用网络端点（例如内存模型）。
    Ignore,
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tcp => "tcp",
            Self::Ssl => "ssl",
            Self::Http => "http",
            Self::Https => "https",
            Self::Ws => "ws",
            Self::Wss => "wss",
            Self::Ignore => "ignore",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown schema: {0}")]
pub struct ParseSchemaError(pub String);

impl FromStr for Schema {
    type Err = ParseSchemaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "ssl" => Ok(Self::Ssl),
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            "ws" => Ok(Self::Ws),
            "wss" => Ok(Self::Wss),
            "ignore" => Ok(Self::Ignore),
            _ => Err(ParseSchemaError(value.to_string())),
        }
    }
}

/// 连接参数。
///
/// 通过 [`ConnectorParameter::builder`] 构建，之后只提供读取方法。
/// 协议特定设置以字符串键保存任意 JSON 值，由各协议访问层自行解释。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorParameter {
    schema: Schema,
    host: String,
    port: u16,
    #[serde(default)]
    endpoint_path: String,
    #[serde(default = "default_request_timeout_ms")]
    request_timeout_ms: u64,
    #[serde(default = "default_notification_interval_ms")]
    notification_interval_ms: u64,
    #[serde(default)]
    specific_settings: HashMap<String, serde_json::Value>,
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_notification_interval_ms() -> u64 {
    DEFAULT_NOTIFICATION_INTERVAL_MS
}

impl ConnectorParameter {
    /// 创建参数构建器。
    pub fn builder(host: impl Into<String>, port: u16) -> ConnectorParameterBuilder {
        ConnectorParameterBuilder::new(host, port)
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn endpoint_path(&self) -> &str {
        &self.endpoint_path
    }

    /// `schema://host:port/path` 形式的端点地址。
    pub fn endpoint_url(&self) -> String {
        let path = self.endpoint_path.trim_start_matches('/');
        if path.is_empty() {
            format!("{}://{}:{}", self.schema, self.host, self.port)
        } else {
            format!("{}://{}:{}/{}", self.schema, self.host, self.port, path)
        }
    }

    pub fn request_timeout_ms(&self) -> u64 {
        self.request_timeout_ms
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn notification_interval_ms(&self) -> u64 {
        self.notification_interval_ms
    }

    pub fn notification_interval(&self) -> Duration {
        Duration::from_millis(self.notification_interval_ms)
    }

    pub fn specific_settings(&self) -> &HashMap<String, serde_json::Value> {
        &self.specific_settings
    }

    pub fn specific_setting(&self, key: &str) -> Option<&serde_json::Value> {
        self.specific_settings.get(key)
    }

    /// 读取字符串设置；JSON 字符串直接返回，其他值按 JSON 文本返回。
    pub fn specific_setting_str(&self, key: &str) -> Option<String> {
        self.specific_settings.get(key).map(|value| match value {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }
}

/// [`ConnectorParameter`] 构建器。
#[derive(Debug, Clone)]
pub struct ConnectorParameterBuilder {
    inner: ConnectorParameter,
}

impl ConnectorParameterBuilder {
    fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            inner: ConnectorParameter {
                schema: Schema::default(),
                host: host.into(),
                port,
                endpoint_path: String::new(),
                request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
                notification_interval_ms: DEFAULT_NOTIFICATION_INTERVAL_MS,
                specific_settings: HashMap::new(),
            },
        }
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.inner.schema = schema;
        self
    }

    pub fn endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.inner.endpoint_path = path.into();
        self
    }

    pub fn request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.inner.request_timeout_ms = timeout_ms;
        self
    }

    pub fn notification_interval_ms(mut self, interval_ms: u64) -> Self {
        self.inner.notification_interval_ms = interval_ms;
        self
    }

    pub fn specific_setting(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.inner.specific_settings.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> ConnectorParameter {
        self.inner
    }
}
