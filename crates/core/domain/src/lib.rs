pub mod data;
pub mod parameter;
pub mod qname;

pub use data::{FieldDescriptor, StructDescriptor, StructValue, Value, ValueKind};
pub use parameter::{ConnectorParameter, ConnectorParameterBuilder, ParseSchemaError, Schema};
pub use qname::{compose_iqname, compose_qname};

/// 数据采集模式：事件推送或定时轮询。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationMode {
    /// 协议驱动主动推送变化。
    Notifications,
    /// 连接器按通知间隔定时读取。
    Polling,
}

impl NotificationMode {
    /// 由 `use_notifications(bool)` 的参数得到模式。
    pub fn from_notifications(notifications: bool) -> Self {
        if notifications {
            Self::Notifications
        } else {
            Self::Polling
        }
    }

    pub fn is_notifications(self) -> bool {
        matches!(self, Self::Notifications)
    }
}
