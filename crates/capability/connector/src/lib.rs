//! # 连接器能力模块
//!
//! 连接器拥有一次连接的完整生命周期：
//!
//! ```text
//! connect(parameter)
//!   └─ ConnectorDriver::connect_impl ──► ModelAccess
//!        └─ ProtocolAdapter::bind_model_access / initialize_model_access
//!             └─ 轮询任务（Polling）或驱动推送（Notifications）
//!
//! 轮询 tick / Notifier::notify
//!   └─ ProtocolAdapter::adapt_output ──► ReceptionCallback<T>
//!
//! write(command)
//!   └─ ProtocolAdapter::adapt_input ──► ConnectorDriver::write_impl
//!
//! disconnect()
//!   └─ 关闭接收闸门 → 停止轮询 → 解绑 → dispose → disconnect_impl
//! ```

mod connector;
mod dispatch;
mod driver;
mod reception;

pub use connector::{Connector, ConnectorState};
pub use driver::{ConnectorDriver, ModelContext, Notifier, OutputSink};
pub use reception::ReceptionCallback;
