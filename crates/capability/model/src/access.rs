//! 统一的模型访问接口。
//!
//! 协议访问层只需实现 [`ModelAccess::base`]、[`ModelAccess::get`] 与
//! [`ModelAccess::set`]，其余能力（调用、结构体、多值、监控）按协议覆盖，
//! 默认返回 [`ConnectorError::NotSupported`]。

use crate::base::AccessBase;
use crate::converter::{InputConverter, ModelInputConverter, ModelOutputConverter, OutputConverter};
use crate::error::ConnectorError;
use async_trait::async_trait;
use domain::{StructDescriptor, StructValue, Value, ValueKind, compose_iqname, compose_qname};
use std::time::Duration;

/// 精确类型检查，不做隐式拓宽。
fn exact<T>(qname: &str, expected: ValueKind, value: Value) -> Result<T, ConnectorError>
where
    T: TryFrom<Value, Error = Value>,
{
    T::try_from(value).map_err(|other| {
        ConnectorError::ConversionFailed(format!(
            "{}: expected {}, found {}",
            qname,
            expected,
            other.kind()
        ))
    })
}

/// 设备数据模型的查询/命令接口。
#[async_trait]
pub trait ModelAccess: Send + Sync {
    /// 共享的访问状态。
    fn base(&self) -> &AccessBase;

    /// 限定名分隔符（可为空串）。
    fn qseparator(&self) -> &str {
        self.base().separator()
    }

    fn top_instances_qname(&self) -> &str {
        self.base().top_instances()
    }

    /// 组合限定名。
    fn qname(&self, names: &[&str]) -> String {
        compose_qname(self.qseparator(), names)
    }

    /// 组合带实例前缀的限定名。
    fn iqname(&self, names: &[&str]) -> String {
        compose_iqname(self.top_instances_qname(), self.qseparator(), names)
    }

    async fn get(&self, qname: &str) -> Result<Value, ConnectorError>;

    async fn set(&self, qname: &str, value: Value) -> Result<(), ConnectorError>;

    async fn get_bool(&self, qname: &str) -> Result<bool, ConnectorError> {
        exact(qname, ValueKind::Bool, self.get(qname).await?)
    }

    async fn get_byte(&self, qname: &str) -> Result<i8, ConnectorError> {
        exact(qname, ValueKind::Byte, self.get(qname).await?)
    }

    async fn get_short(&self, qname: &str) -> Result<i16, ConnectorError> {
        exact(qname, ValueKind::Short, self.get(qname).await?)
    }

    async fn get_int(&self, qname: &str) -> Result<i32, ConnectorError> {
        exact(qname, ValueKind::Int, self.get(qname).await?)
    }

    async fn get_long(&self, qname: &str) -> Result<i64, ConnectorError> {
        exact(qname, ValueKind::Long, self.get(qname).await?)
    }

    async fn get_float(&self, qname: &str) -> Result<f32, ConnectorError> {
        exact(qname, ValueKind::Float, self.get(qname).await?)
    }

    async fn get_double(&self, qname: &str) -> Result<f64, ConnectorError> {
        exact(qname, ValueKind::Double, self.get(qname).await?)
    }

    async fn get_string(&self, qname: &str) -> Result<String, ConnectorError> {
        exact(qname, ValueKind::String, self.get(qname).await?)
    }

    async fn set_bool(&self, qname: &str, value: bool) -> Result<(), ConnectorError> {
        self.set(qname, Value::Bool(value)).await
    }

    async fn set_byte(&self, qname: &str, value: i8) -> Result<(), ConnectorError> {
        self.set(qname, Value::Byte(value)).await
    }

    async fn set_short(&self, qname: &str, value: i16) -> Result<(), ConnectorError> {
        self.set(qname, Value::Short(value)).await
    }

    async fn set_int(&self, qname: &str, value: i32) -> Result<(), ConnectorError> {
        self.set(qname, Value::Int(value)).await
    }

    async fn set_long(&self, qname: &str, value: i64) -> Result<(), ConnectorError> {
        self.set(qname, Value::Long(value)).await
    }

    async fn set_float(&self, qname: &str, value: f32) -> Result<(), ConnectorError> {
        self.set(qname, Value::Float(value)).await
    }

    async fn set_double(&self, qname: &str, value: f64) -> Result<(), ConnectorError> {
        self.set(qname, Value::Double(value)).await
    }

    async fn set_string(&self, qname: &str, value: &str) -> Result<(), ConnectorError> {
        self.set(qname, Value::String(value.to_string())).await
    }

    /// 调用设备侧操作。
    async fn call(&self, qname: &str, _args: Vec<Value>) -> Result<Value, ConnectorError> {
        Err(ConnectorError::NotSupported(format!("call {}", qname)))
    }

    /// 读取已注册自定义类型的结构体。
    async fn get_struct(&self, qname: &str, _type_name: &str) -> Result<StructValue, ConnectorError> {
        Err(ConnectorError::NotSupported(format!("get_struct {}", qname)))
    }

    async fn set_struct(&self, qname: &str, _value: StructValue) -> Result<(), ConnectorError> {
        Err(ConnectorError::NotSupported(format!("set_struct {}", qname)))
    }

    async fn register_custom_type(&self, descriptor: StructDescriptor) -> Result<(), ConnectorError> {
        Err(ConnectorError::NotSupported(format!(
            "register_custom_type {}",
            descriptor.type_name
        )))
    }

    async fn get_multi_value(&self, qname: &str) -> Result<Vec<Value>, ConnectorError> {
        Err(ConnectorError::NotSupported(format!("get_multi_value {}", qname)))
    }

    async fn set_multi_value(&self, qname: &str, _values: Vec<Value>) -> Result<(), ConnectorError> {
        Err(ConnectorError::NotSupported(format!("set_multi_value {}", qname)))
    }

    /// 监控指定元素，使用连接参数中的通知间隔。
    async fn monitor(&self, qnames: &[&str]) -> Result<(), ConnectorError> {
        self.monitor_with_interval(self.base().notification_interval(), qnames)
            .await
    }

    async fn monitor_with_interval(
        &self,
        _interval: Duration,
        _qnames: &[&str],
    ) -> Result<(), ConnectorError> {
        Err(ConnectorError::not_supported("monitor"))
    }

    /// 监控模型结构变化，使用连接参数中的通知间隔。
    async fn monitor_model_changes(&self) -> Result<(), ConnectorError> {
        self.monitor_model_changes_with_interval(self.base().notification_interval())
            .await
    }

    async fn monitor_model_changes_with_interval(
        &self,
        _interval: Duration,
    ) -> Result<(), ConnectorError> {
        Err(ConnectorError::not_supported("monitor_model_changes"))
    }

    /// 切换采集模式：`true` 为事件推送，`false` 为定时轮询。
    fn use_notifications(&self, notifications: bool) {
        self.base().use_notifications(notifications);
    }

    /// 推送变化时是否携带完整的元素信息。
    fn set_detail_notified_item(&self, detail: bool) {
        self.base().set_detail_notified_item(detail);
    }

    fn step_into(&self, name: &str) {
        self.base().step_into(name);
    }

    /// 已在根作用域时返回 `None`。
    fn step_out(&self) -> Option<String> {
        self.base().step_out()
    }

    /// 释放协议侧资源，每个实例调用一次。
    async fn dispose(&self) -> Result<(), ConnectorError> {
        Ok(())
    }

    fn input_converter(&self) -> &dyn InputConverter {
        &ModelInputConverter
    }

    fn output_converter(&self) -> &dyn OutputConverter {
        &ModelOutputConverter
    }
}
