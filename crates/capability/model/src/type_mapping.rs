//! 按值的精确种类分派到类型化写入。

use crate::access::ModelAccess;
use crate::error::ConnectorError;
use async_trait::async_trait;
use domain::Value;

/// 按值种类分派写入的模型访问。
///
/// 实现方的 [`ModelAccess::set`] 应委托给 [`TypeMappingAccess::set_mapped`]。
/// 因此每个 `put_*` 必须直接写入协议，不得经由 `ModelAccess::set` 或
/// `ModelAccess::set_*`（它们最终回到 `set_mapped`，形成无限递归）。
///
/// 没有对应 `put_*` 的种类（`Null`、结构体、多值）退化为
/// `put_string(qname, value.to_string())`。
#[async_trait]
pub trait TypeMappingAccess: ModelAccess {
    async fn put_bool(&self, qname: &str, value: bool) -> Result<(), ConnectorError>;
    async fn put_byte(&self, qname: &str, value: i8) -> Result<(), ConnectorError>;
    async fn put_short(&self, qname: &str, value: i16) -> Result<(), ConnectorError>;
    async fn put_int(&self, qname: &str, value: i32) -> Result<(), ConnectorError>;
    async fn put_long(&self, qname: &str, value: i64) -> Result<(), ConnectorError>;
    async fn put_float(&self, qname: &str, value: f32) -> Result<(), ConnectorError>;
    async fn put_double(&self, qname: &str, value: f64) -> Result<(), ConnectorError>;
    async fn put_string(&self, qname: &str, value: &str) -> Result<(), ConnectorError>;

    async fn set_mapped(&self, qname: &str, value: Value) -> Result<(), ConnectorError> {
        match value {
            Value::Bool(v) => self.put_bool(qname, v).await,
            Value::Byte(v) => self.put_byte(qname, v).await,
            Value::Short(v) => self.put_short(qname, v).await,
            Value::Int(v) => self.put_int(qname, v).await,
            Value::Long(v) => self.put_long(qname, v).await,
            Value::Float(v) => self.put_float(qname, v).await,
            Value::Double(v) => self.put_double(qname, v).await,
            Value::String(v) => self.put_string(qname, &v).await,
            other => self.put_string(qname, &other.to_string()).await,
        }
    }
}
