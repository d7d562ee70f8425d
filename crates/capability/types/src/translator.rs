//! 协议表示与连接器数据对象之间的双向翻译。

use async_trait::async_trait;
use domain::Value;
use mconn_model::{ConnectorError, ModelAccess};

/// 协议输出 → 连接器输出。
#[async_trait]
pub trait OutputTranslator: Send + Sync + 'static {
    type Protocol: Send + 'static;
    type Connector: Send + 'static;

    /// 每次连接调用一次：设置通知模式并注册需要推送的监控。
    async fn initialize_model_access(&self, _access: &dyn ModelAccess) -> Result<(), ConnectorError> {
        Ok(())
    }

    /// 通过访问层读取字段，构造连接器输出。
    async fn to(
        &self,
        access: &dyn ModelAccess,
        data: Self::Protocol,
    ) -> Result<Self::Connector, ConnectorError>;
}

/// 连接器输入（命令）→ 协议输入。
///
/// 只写入调用方标记为已变更的字段，参见 [`Field`]。
#[async_trait]
pub trait InputTranslator: Send + Sync + 'static {
    type Connector: Send + 'static;
    type Protocol: Send + 'static;

    async fn from(
        &self,
        access: &dyn ModelAccess,
        data: Self::Connector,
    ) -> Result<Self::Protocol, ConnectorError>;
}

/// 带变更标记的命令字段。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Field<T> {
    value: T,
    changed: bool,
}

impl<T> Field<T> {
    /// 未标记变更的字段。
    pub fn new(value: T) -> Self {
        Self {
            value,
            changed: false,
        }
    }

    /// 已标记变更的字段。
    pub fn changed(value: T) -> Self {
        Self {
            value,
            changed: true,
        }
    }

    /// 赋值并标记变更。
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.changed = true;
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn changed_value(&self) -> Option<&T> {
        self.changed.then_some(&self.value)
    }

    pub fn clear_changed(&mut self) {
        self.changed = false;
    }
}

/// 仅在字段已标记变更时写入；返回是否写入。
pub async fn write_changed<T>(
    access: &dyn ModelAccess,
    qname: &str,
    field: &Field<T>,
) -> Result<bool, ConnectorError>
where
    T: Clone + Into<Value> + Sync,
{
    match field.changed_value() {
        Some(value) => {
            access.set(qname, value.clone().into()).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}
